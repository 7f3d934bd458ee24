use log::debug;
use serde::Deserialize;
use url::Url;

use crate::geocoder::transport::Transport;
use crate::geocoder::{GeocodeError, Geocoder};
use crate::Point;

/// Nominatim-compatible service used when no other base URL is given.
pub const DEFAULT_BASE_URL: &str = "http://open.mapquestapi.com/nominatim/v1/";

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
}

#[derive(Debug, Deserialize)]
struct ReverseResult {
    error: Option<String>,
    address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
struct Address {
    road: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    country_code: Option<String>,
}

impl Address {
    fn display(self) -> String {
        [self.road, self.city, self.state, self.postcode, self.country_code]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn parse_coordinate(field: &'static str, value: &str) -> Result<f64, GeocodeError> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(GeocodeError::InvalidCoordinate {
            field,
            value: value.to_string(),
        }),
    }
}

/// Reads the first hit of a `search` response.
pub fn parse_search_response(query: &str, body: &[u8]) -> Result<Point, GeocodeError> {
    let results: Vec<SearchResult> = serde_json::from_slice(body)?;
    let Some(first) = results.into_iter().next() else {
        return Err(GeocodeError::NoMatch {
            query: query.to_string(),
        });
    };
    Ok(Point::new(
        parse_coordinate("lat", &first.lat)?,
        parse_coordinate("lon", &first.lon)?,
    ))
}

/// Flattens the `address` object of a `reverse` response into one line.
pub fn parse_reverse_response(point: &Point, body: &[u8]) -> Result<String, GeocodeError> {
    let result: ReverseResult = serde_json::from_slice(body)?;
    if let Some(error) = result.error {
        debug!("Reverse geocoding {},{} failed: {}", point.lat, point.lng, error);
        return Err(GeocodeError::NoMatch {
            query: format!("{},{}", point.lat, point.lng),
        });
    }
    Ok(result.address.unwrap_or_default().display())
}

/// Geocoder speaking the Nominatim `search.php` / `reverse.php` API.
pub struct NominatimGeocoder<T> {
    base_url: Url,
    transport: T,
}

impl<T: Transport> NominatimGeocoder<T> {
    pub fn new(transport: T) -> Result<Self, GeocodeError> {
        Self::with_base_url(DEFAULT_BASE_URL, transport)
    }

    pub fn with_base_url(base_url: &str, transport: T) -> Result<Self, GeocodeError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(NominatimGeocoder {
            base_url,
            transport,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, GeocodeError> {
        let mut url = self.base_url.join(path)?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }
}

impl<T: Transport> Geocoder for NominatimGeocoder<T> {
    fn geocode(&self, query: &str) -> Result<Point, GeocodeError> {
        let url = self.endpoint("search.php", &[("q", query), ("format", "json")])?;
        let body = self.transport.get(&url)?;
        let point = parse_search_response(query, &body)?;
        debug!("Geocoded {:?} to {},{}", query, point.lat, point.lng);
        Ok(point)
    }

    fn reverse_geocode(&self, point: &Point) -> Result<String, GeocodeError> {
        let lat = point.lat.to_string();
        let lon = point.lng.to_string();
        let url = self.endpoint(
            "reverse.php",
            &[("lat", lat.as_str()), ("lon", lon.as_str()), ("format", "json")],
        )?;
        let body = self.transport.get(&url)?;
        parse_reverse_response(point, &body)
    }
}
