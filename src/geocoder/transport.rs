use url::Url;

use crate::geocoder::GeocodeError;

/// Blocking HTTP GET used by geocoders. Returns the body of a 2xx response.
pub trait Transport {
    fn get(&self, url: &Url) -> Result<Vec<u8>, GeocodeError>;
}

impl<F> Transport for F
where
    F: Fn(&Url) -> Result<Vec<u8>, GeocodeError>,
{
    fn get(&self, url: &Url) -> Result<Vec<u8>, GeocodeError> {
        self(url)
    }
}

#[cfg(feature = "http")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "http")]
mod reqwest_transport {
    use log::debug;
    use reqwest::blocking::Client;
    use url::Url;

    use super::Transport;
    use crate::geocoder::GeocodeError;

    const USER_AGENT: &str = concat!("geo-mapper/", env!("CARGO_PKG_VERSION"));

    fn transport_error(err: reqwest::Error) -> GeocodeError {
        GeocodeError::Transport(Box::new(err))
    }

    /// [`Transport`] over a `reqwest` blocking client with default timeouts.
    #[derive(Clone, Debug)]
    pub struct ReqwestTransport {
        client: Client,
    }

    impl ReqwestTransport {
        pub fn new() -> Result<Self, GeocodeError> {
            let client = Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .map_err(transport_error)?;
            Ok(ReqwestTransport { client })
        }
    }

    impl Transport for ReqwestTransport {
        fn get(&self, url: &Url) -> Result<Vec<u8>, GeocodeError> {
            debug!("GET {url}");
            let response = self
                .client
                .get(url.as_str())
                .send()
                .map_err(transport_error)?;
            let status = response.status();
            if !status.is_success() {
                return Err(GeocodeError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }
            let body = response.bytes().map_err(transport_error)?;
            Ok(body.to_vec())
        }
    }
}
