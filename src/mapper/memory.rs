use crate::mapper::{Mapper, MapperError, Row};
use crate::Point;

/// Brute-force mapper over rows held in memory.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMapper {
    pub rows: Vec<Row>,
}

impl InMemoryMapper {
    pub fn new(rows: Vec<Row>) -> Self {
        InMemoryMapper { rows }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }
}

impl Mapper for InMemoryMapper {
    fn points_within_radius(&self, origin: &Point, radius_km: f64) -> Result<Vec<Row>, MapperError> {
        Ok(self
            .rows
            .iter()
            .filter(|row| origin.great_circle_distance(&row.point) <= radius_km)
            .cloned()
            .collect())
    }
}
