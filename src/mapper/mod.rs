pub mod memory;
pub mod sql;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::Point;

#[derive(Debug, Error)]
pub enum MapperError {
    #[error("unsupported SQL driver `{0}`")]
    UnsupportedDriver(String),
    #[error("failed to open database `{open_str}`: {source}")]
    Open {
        open_str: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error("query error: {0}")]
    Query(#[from] rusqlite::Error),
    #[error("column `{0}` missing from result set")]
    MissingColumn(String),
}

/// A stored record matched by a radius query.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Row {
    pub point: Point,
    /// Every selected column, keyed by column name.
    pub columns: Map<String, Value>,
}

impl Row {
    pub fn new(point: Point) -> Self {
        Row {
            point,
            columns: Map::new(),
        }
    }

    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(name.into(), value.into());
        self
    }
}

/// Spatial radius queries over some storage backend.
pub trait Mapper {
    /// Returns every stored row whose great-circle distance from `origin` is
    /// at most `radius_km`.
    fn points_within_radius(&self, origin: &Point, radius_km: f64) -> Result<Vec<Row>, MapperError>;
}

