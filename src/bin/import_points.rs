use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use geo_mapper::config::{self, SqlConf};
use geo_mapper::geocoder::nominatim::{NominatimGeocoder, DEFAULT_BASE_URL};
use geo_mapper::geocoder::transport::ReqwestTransport;
use geo_mapper::geocoder::{GeocodeError, Geocoder};
use geo_mapper::mapper::sql::SqlMapper;
use log::{info, warn};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ImportSummary {
    source: String,
    table: String,
    imported: usize,
    unmatched: Vec<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let source = env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("usage: import_points <addresses-file>"))?;

    let conf = config::load_sql_conf(".").context("failed to load configuration")?;
    let mapper = open_mapper(&conf)?;

    let base_url = config::geocoder_base_url().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    let transport = ReqwestTransport::new().context("failed to build HTTP client")?;
    let geocoder = NominatimGeocoder::with_base_url(&base_url, transport)
        .with_context(|| format!("invalid geocoder URL {base_url}"))?;

    let contents = fs::read_to_string(&source)
        .with_context(|| format!("failed to read {}", source.display()))?;

    let mut summary = ImportSummary {
        source: source.display().to_string(),
        table: conf.table.clone(),
        imported: 0,
        unmatched: Vec::new(),
    };

    for address in addresses(&contents) {
        let point = match geocoder.geocode(address) {
            Ok(point) => point,
            Err(GeocodeError::NoMatch { .. }) => {
                warn!("No match for {address:?}, skipping");
                summary.unmatched.push(address.to_string());
                continue;
            }
            Err(err) => return Err(err).with_context(|| format!("failed to geocode {address:?}")),
        };
        let id = mapper
            .insert(&point, Some(address))
            .with_context(|| format!("failed to store {address:?}"))?;
        info!("Stored {address:?} at {},{} as row {id}", point.lat, point.lng);
        summary.imported += 1;
    }

    info!(
        "Imported {} addresses into {} ({} unmatched)",
        summary.imported,
        summary.table,
        summary.unmatched.len()
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn open_mapper(conf: &SqlConf) -> Result<SqlMapper> {
    let mapper = SqlMapper::open(conf.clone())
        .with_context(|| format!("failed to open {} database {}", conf.driver, conf.open_str))?;
    mapper
        .ensure_table()
        .with_context(|| format!("failed to create table {}", conf.table))?;
    Ok(mapper)
}

/// Non-empty lines that are not `#` comments.
fn addresses(contents: &str) -> impl Iterator<Item = &str> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}
