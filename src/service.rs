use log::warn;
use serde::{Deserialize, Serialize};

use crate::geocoder::Geocoder;
use crate::mapper::{Mapper, Row};
use crate::Point;

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeoRequest {
    Distance {
        origin: Point,
        destination: Point,
    },
    Project {
        origin: Point,
        distance_km: f64,
        bearing: f64,
    },
    WithinRadius {
        origin: Point,
        radius_km: f64,
    },
    Geocode {
        query: String,
    },
    ReverseGeocode {
        point: Point,
    },
}

impl GeoRequest {
    /// Whether answering this request touches the mapper.
    pub fn needs_mapper(&self) -> bool {
        matches!(self, GeoRequest::WithinRadius { .. })
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeoResponse {
    Distance { km: f64 },
    Project { point: Point },
    WithinRadius { rows: Vec<Row> },
    Geocode { point: Point },
    ReverseGeocode { address: String },
    Error { message: String },
}

impl GeoResponse {
    pub fn error(message: impl Into<String>) -> Self {
        GeoResponse::Error {
            message: message.into(),
        }
    }
}

/// Answers a single request. Backend failures become [`GeoResponse::Error`].
///
/// `mapper` may be `None` when the caller knows the request does not need one
/// (see [`GeoRequest::needs_mapper`]); a radius query without a mapper is
/// answered with an error.
pub fn dispatch(
    req: GeoRequest,
    mapper: Option<&dyn Mapper>,
    geocoder: &dyn Geocoder,
) -> GeoResponse {
    match req {
        GeoRequest::Distance {
            origin,
            destination,
        } => GeoResponse::Distance {
            km: origin.great_circle_distance(&destination),
        },
        GeoRequest::Project {
            origin,
            distance_km,
            bearing,
        } => GeoResponse::Project {
            point: origin.point_at_distance_and_bearing(distance_km, bearing),
        },
        GeoRequest::WithinRadius { origin, radius_km } => {
            let Some(mapper) = mapper else {
                return GeoResponse::error("no mapper available for radius query");
            };
            match mapper.points_within_radius(&origin, radius_km) {
                Ok(rows) => GeoResponse::WithinRadius { rows },
                Err(err) => {
                    warn!("Radius query failed: {err}");
                    GeoResponse::error(err.to_string())
                }
            }
        }
        GeoRequest::Geocode { query } => match geocoder.geocode(&query) {
            Ok(point) => GeoResponse::Geocode { point },
            Err(err) => {
                warn!("Geocoding {query:?} failed: {err}");
                GeoResponse::error(err.to_string())
            }
        },
        GeoRequest::ReverseGeocode { point } => match geocoder.reverse_geocode(&point) {
            Ok(address) => GeoResponse::ReverseGeocode { address },
            Err(err) => {
                warn!("Reverse geocoding failed: {err}");
                GeoResponse::error(err.to_string())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoder::GeocodeError;
    use crate::mapper::memory::InMemoryMapper;
    use assert_approx_eq::assert_approx_eq;

    struct StubGeocoder;

    impl Geocoder for StubGeocoder {
        fn geocode(&self, query: &str) -> Result<Point, GeocodeError> {
            match query {
                "London" => Ok(Point::new(51.5, -0.12)),
                _ => Err(GeocodeError::NoMatch {
                    query: query.to_string(),
                }),
            }
        }

        fn reverse_geocode(&self, _point: &Point) -> Result<String, GeocodeError> {
            Ok("London gb".into())
        }
    }

    fn request(json: &str) -> GeoRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn distance_request() {
        let req = request(
            r#"{"kind":"distance","origin":{"lat":0.0,"lng":0.0},"destination":{"lat":0.0,"lng":90.0}}"#,
        );
        match dispatch(req, None, &StubGeocoder) {
            GeoResponse::Distance { km } => {
                assert_approx_eq!(km, std::f64::consts::FRAC_PI_2 * crate::EARTH_RADIUS_KM, 1e-6)
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn project_request() {
        let req = request(
            r#"{"kind":"project","origin":{"lat":50.0,"lng":-4.0},"distance_km":100.0,"bearing":90.0}"#,
        );
        match dispatch(req, None, &StubGeocoder) {
            GeoResponse::Project { point } => assert!(point.lng > -4.0),
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn within_radius_request() {
        let mapper = InMemoryMapper::new(vec![
            Row::new(Point::new(0.0, 0.0)).with_column("label", "here"),
            Row::new(Point::new(10.0, 10.0)).with_column("label", "there"),
        ]);
        let req = request(r#"{"kind":"within_radius","origin":{"lat":0.0,"lng":0.1},"radius_km":50.0}"#);
        match dispatch(req, Some(&mapper), &StubGeocoder) {
            GeoResponse::WithinRadius { rows } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].columns["label"], "here");
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn geocode_failure_becomes_error_response() {
        let req = request(r#"{"kind":"geocode","query":"Atlantis"}"#);
        let resp = dispatch(req, None, &StubGeocoder);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["message"], "no match for `Atlantis`");
    }

    #[test]
    fn reverse_geocode_request() {
        let req = request(r#"{"kind":"reverse_geocode","point":{"lat":51.5,"lng":-0.12}}"#);
        let resp = dispatch(req, None, &StubGeocoder);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["kind"], "reverse_geocode");
        assert_eq!(json["address"], "London gb");
    }

    #[test]
    fn radius_query_without_mapper_is_an_error() {
        let req = request(r#"{"kind":"within_radius","origin":{"lat":0.0,"lng":0.0},"radius_km":5.0}"#);
        let json = serde_json::to_value(dispatch(req, None, &StubGeocoder)).unwrap();
        assert_eq!(json["kind"], "error");
        assert_eq!(json["message"], "no mapper available for radius query");
    }

    #[test]
    fn only_radius_queries_need_a_mapper() {
        assert!(request(r#"{"kind":"within_radius","origin":{"lat":0,"lng":0},"radius_km":1}"#).needs_mapper());
        assert!(!request(r#"{"kind":"geocode","query":"x"}"#).needs_mapper());
    }
}
