use log::debug;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter, Connection};
use serde_json::{Map, Number, Value};

use crate::config::SqlConf;
use crate::mapper::{Mapper, MapperError, Row};
use crate::{Point, EARTH_RADIUS_KM};

/// Drivers this mapper can open.
const SUPPORTED_DRIVERS: [&str; 2] = ["sqlite", "sqlite3"];

/// Generated radius query. `params` holds `[lat, lng, radius]` and binds to
/// `?1`, `?2` and `?3` in `sql`.
#[derive(Clone, Debug, PartialEq)]
pub struct RadiusQuery {
    pub sql: String,
    pub params: [f64; 3],
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Builds the spherical law of cosines radius filter for `conf`'s table.
///
/// Only identifiers are written into the SQL text; coordinates and radius
/// travel as bound parameters.
pub fn radius_query(conf: &SqlConf, origin: &Point, radius_km: f64) -> RadiusQuery {
    let table = quote_ident(&conf.table);
    let lat = format!("{table}.{}", quote_ident(&conf.lat_col));
    let lng = format!("{table}.{}", quote_ident(&conf.lng_col));

    let sql = format!(
        "SELECT * FROM {table} WHERE acos(sin(radians(?1))*sin(radians({lat})) + \
         cos(radians(?1))*cos(radians({lat}))*cos(radians({lng}) - radians(?2))) * {EARTH_RADIUS_KM} <= ?3"
    );

    RadiusQuery {
        sql,
        params: [origin.lat, origin.lng, radius_km],
    }
}

fn register_unary(conn: &Connection, name: &str, f: fn(f64) -> f64) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        name,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        move |ctx| {
            let x: Option<f64> = ctx.get(0)?;
            Ok(x.map(f))
        },
    )
}

/// SQLite only ships trigonometry when built with math functions enabled.
fn register_math_functions(conn: &Connection) -> rusqlite::Result<()> {
    register_unary(conn, "radians", f64::to_radians)?;
    register_unary(conn, "sin", f64::sin)?;
    register_unary(conn, "cos", f64::cos)?;
    // coincident points can land a hair above 1.0
    register_unary(conn, "acos", |x| x.clamp(-1.0, 1.0).acos())?;
    Ok(())
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::from(b.to_vec()),
    }
}

/// Mapper backed by a SQLite table, scanned row by row.
pub struct SqlMapper {
    conf: SqlConf,
    conn: Connection,
}

impl SqlMapper {
    pub fn open(conf: SqlConf) -> Result<Self, MapperError> {
        if !SUPPORTED_DRIVERS.contains(&conf.driver.as_str()) {
            return Err(MapperError::UnsupportedDriver(conf.driver));
        }
        let conn = Connection::open(&conf.open_str).map_err(|source| MapperError::Open {
            open_str: conf.open_str.clone(),
            source,
        })?;
        Self::with_connection(conn, conf)
    }

    pub fn with_connection(conn: Connection, conf: SqlConf) -> Result<Self, MapperError> {
        register_math_functions(&conn)?;
        Ok(SqlMapper { conf, conn })
    }

    /// Creates the configured table if it does not exist yet.
    pub fn ensure_table(&self) -> Result<(), MapperError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY, label TEXT, {} REAL NOT NULL, {} REAL NOT NULL)",
            quote_ident(&self.conf.table),
            quote_ident(&self.conf.lat_col),
            quote_ident(&self.conf.lng_col),
        );
        self.conn.execute_batch(&sql)?;
        Ok(())
    }

    /// Stores a point and returns its row id.
    pub fn insert(&self, point: &Point, label: Option<&str>) -> Result<i64, MapperError> {
        let sql = format!(
            "INSERT INTO {} (label, {}, {}) VALUES (?1, ?2, ?3)",
            quote_ident(&self.conf.table),
            quote_ident(&self.conf.lat_col),
            quote_ident(&self.conf.lng_col),
        );
        self.conn.execute(&sql, params![label, point.lat, point.lng])?;
        Ok(self.conn.last_insert_rowid())
    }

    fn column_index(names: &[String], column: &str) -> Result<usize, MapperError> {
        names
            .iter()
            .position(|name| name.eq_ignore_ascii_case(column))
            .ok_or_else(|| MapperError::MissingColumn(column.to_string()))
    }
}

impl Mapper for SqlMapper {
    fn points_within_radius(&self, origin: &Point, radius_km: f64) -> Result<Vec<Row>, MapperError> {
        let query = radius_query(&self.conf, origin, radius_km);
        debug!("Radius query {} with {:?}", query.sql, query.params);

        let mut stmt = self.conn.prepare(&query.sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let lat_idx = Self::column_index(&names, &self.conf.lat_col)?;
        let lng_idx = Self::column_index(&names, &self.conf.lng_col)?;

        let rows = stmt.query_map(params_from_iter(query.params.iter()), |row| {
            let point = Point::new(row.get(lat_idx)?, row.get(lng_idx)?);
            let mut columns = Map::new();
            for (idx, name) in names.iter().enumerate() {
                columns.insert(name.clone(), to_json(row.get_ref(idx)?));
            }
            Ok(Row { point, columns })
        })?;

        let rows = rows.collect::<Result<Vec<_>, _>>()?;
        debug!("Radius query matched {} rows", rows.len());
        Ok(rows)
    }
}
