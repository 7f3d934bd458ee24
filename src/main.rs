use std::sync::Arc;

use geo_mapper::config::{self, SqlConf};
use geo_mapper::geocoder::nominatim::{NominatimGeocoder, DEFAULT_BASE_URL};
use geo_mapper::geocoder::transport::ReqwestTransport;
use geo_mapper::mapper::sql::SqlMapper;
use geo_mapper::service::{dispatch, GeoRequest, GeoResponse};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use log::{info, warn};

struct Backends {
    conf: SqlConf,
    geocoder: NominatimGeocoder<ReqwestTransport>,
}

impl Backends {
    fn from_env() -> Result<Self, Error> {
        let conf = config::load_sql_conf(".")?;
        let base_url = config::geocoder_base_url().unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let geocoder = NominatimGeocoder::with_base_url(&base_url, ReqwestTransport::new()?)?;
        info!(
            "Serving table {} via {} driver, geocoding through {}",
            conf.table,
            conf.driver,
            geocoder.base_url()
        );
        Ok(Backends { conf, geocoder })
    }

    fn answer(&self, req: GeoRequest) -> GeoResponse {
        // geodesy and geocoding never touch the database
        if !req.needs_mapper() {
            return dispatch(req, None, &self.geocoder);
        }
        match SqlMapper::open(self.conf.clone()) {
            Ok(mapper) => dispatch(req, Some(&mapper), &self.geocoder),
            Err(err) => {
                warn!("Cannot open mapper: {err}");
                GeoResponse::error(err.to_string())
            }
        }
    }
}

async fn handler(backends: Arc<Backends>, event: LambdaEvent<GeoRequest>) -> Result<GeoResponse, Error> {
    let req = event.payload;
    let resp = tokio::task::spawn_blocking(move || backends.answer(req)).await?;
    Ok(resp)
}

fn main() -> Result<(), Error> {
    env_logger::init();

    // Built outside the runtime: the blocking HTTP client must not be
    // created or dropped on an async worker.
    let backends = Arc::new(Backends::from_env()?);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let shared = Arc::clone(&backends);
    let func = service_fn(move |event| handler(Arc::clone(&shared), event));
    runtime.block_on(lambda_runtime::run(func))
}
