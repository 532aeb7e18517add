use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::catalog::CatalogError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Somewhere a fresh copy of the raw catalog text can be pulled from.
pub trait CatalogSource {
    fn fetch(&self) -> Result<String, CatalogError>;
}

pub struct HttpCatalogSource {
    url: String,
    client: Client,
}

impl HttpCatalogSource {
    pub fn new(url: impl Into<String>) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl CatalogSource for HttpCatalogSource {
    fn fetch(&self) -> Result<String, CatalogError> {
        log::info!("Fetching catalog from {}", self.url);
        let response = self.client.get(&self.url).send()?;

        // Redirects are disabled, so a 3xx lands here too.
        if response.status() != StatusCode::OK {
            return Err(CatalogError::Network(format!(
                "status was {}",
                response.status()
            )));
        }

        let body = response.text()?;
        Ok(normalize(&body))
    }
}

/// Trim every line of a downloaded catalog so it can be stored verbatim.
pub fn normalize(raw: &str) -> String {
    raw.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}
