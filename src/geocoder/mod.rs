pub mod nominatim;
pub mod transport;

use thiserror::Error;

use crate::Point;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },
    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid {field} coordinate `{value}`")]
    InvalidCoordinate { field: &'static str, value: String },
    #[error("no match for `{query}`")]
    NoMatch { query: String },
}

/// Converts between free-text addresses and points.
pub trait Geocoder {
    fn geocode(&self, query: &str) -> Result<Point, GeocodeError>;

    fn reverse_geocode(&self, point: &Point) -> Result<String, GeocodeError>;
}

