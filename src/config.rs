use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

/// Location of the configuration file, relative to the working directory.
pub const CONFIG_FILE: &str = "config/geo.toml";

/// Environment variable selecting the table inside the configuration file.
pub const ENV_NAME_GEO_ENV: &str = "GEO_ENV";

pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Overrides the geocoding service base URL.
pub const ENV_NAME_GEOCODER_URL: &str = "GEO_GEOCODER_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("no `{0}` environment in configuration")]
    MissingEnvironment(String),
    #[error("invalid `{env}` configuration: {source}")]
    Invalid {
        env: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("`{env}.{key}` must not be empty")]
    EmptyKey { env: String, key: &'static str },
}

/// Settings for [`crate::mapper::sql::SqlMapper`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SqlConf {
    pub driver: String,
    pub open_str: String,
    pub table: String,
    pub lat_col: String,
    pub lng_col: String,
}

impl SqlConf {
    /// Builds a configuration, rejecting empty fields.
    pub fn new(
        env: &str,
        driver: impl Into<String>,
        open_str: impl Into<String>,
        table: impl Into<String>,
        lat_col: impl Into<String>,
        lng_col: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let conf = SqlConf {
            driver: driver.into(),
            open_str: open_str.into(),
            table: table.into(),
            lat_col: lat_col.into(),
            lng_col: lng_col.into(),
        };
        conf.validate(env)?;
        Ok(conf)
    }

    fn validate(&self, env: &str) -> Result<(), ConfigError> {
        let fields = [
            ("driver", &self.driver),
            ("openStr", &self.open_str),
            ("table", &self.table),
            ("latCol", &self.lat_col),
            ("lngCol", &self.lng_col),
        ];
        if let Some((key, _)) = fields.into_iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::EmptyKey {
                env: env.to_string(),
                key,
            });
        }
        Ok(())
    }
}

impl Default for SqlConf {
    fn default() -> Self {
        SqlConf {
            driver: "postgres".into(),
            open_str: "user=postgres password=postgres dbname=points sslmode=disable".into(),
            table: "points".into(),
            lat_col: "lat".into(),
            lng_col: "lng".into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSqlConf {
    driver: String,
    open_str: String,
    table: String,
    lat_col: String,
    lng_col: String,
}

/// Name of the active environment, from `GEO_ENV` or the default.
pub fn active_environment() -> String {
    env::var(ENV_NAME_GEO_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

/// Geocoder base URL from `GEO_GEOCODER_URL`, if set.
pub fn geocoder_base_url() -> Option<String> {
    env::var(ENV_NAME_GEOCODER_URL).ok().filter(|v| !v.is_empty())
}

/// Loads `config/geo.toml` below `dir` for the active environment.
pub fn load_sql_conf<P: AsRef<Path>>(dir: P) -> Result<SqlConf, ConfigError> {
    load_sql_conf_for(dir, &active_environment())
}

/// Loads `config/geo.toml` below `dir` for `env`.
///
/// A missing file yields [`SqlConf::default`]; any other problem is an error.
pub fn load_sql_conf_for<P: AsRef<Path>>(dir: P, env: &str) -> Result<SqlConf, ConfigError> {
    let path = dir.as_ref().join(CONFIG_FILE);
    match fs::read_to_string(&path) {
        Ok(contents) => {
            debug!("Reading {} for environment {}", path.display(), env);
            parse_sql_conf(&contents, env)
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            info!("{} not found, using default configuration", path.display());
            Ok(SqlConf::default())
        }
        Err(source) => Err(ConfigError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

/// Parses the `env` table out of a TOML document.
pub fn parse_sql_conf(contents: &str, env: &str) -> Result<SqlConf, ConfigError> {
    let document: toml::Table = toml::from_str(contents)?;
    let section = document
        .get(env)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvironment(env.to_string()))?;
    let raw: RawSqlConf = section.try_into().map_err(|source| ConfigError::Invalid {
        env: env.to_string(),
        source,
    })?;
    SqlConf::new(env, raw.driver, raw.open_str, raw.table, raw.lat_col, raw.lng_col)
}
