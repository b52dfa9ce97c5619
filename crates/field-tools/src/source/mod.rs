//! Data Sources
//!
//! External data APIs behind small traits, so tools can run against the
//! real services or canned data.

mod http;
mod mock;

pub use http::{NominatimGeoCoder, OpenLibraryCatalog, OpenMeteoWeather};
pub use mock::{MockBookCatalog, MockGeoCoder, MockWeather};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use crate::error::{Result, ToolsError};
use crate::model::{Book, Coordinates, Temperature};

/// City name → coordinates
#[async_trait]
pub trait GeoCoder: Send + Sync {
    async fn locate(&self, city: &str) -> Result<Coordinates>;

    fn name(&self) -> &str;
}

/// Coordinates → current temperature
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn current_temperature(&self, lat: f64, lon: f64) -> Result<Temperature>;

    fn name(&self) -> &str;
}

/// Theme → one book
#[async_trait]
pub trait BookCatalog: Send + Sync {
    async fn book_by_theme(&self, theme: &str) -> Result<Book>;

    fn name(&self) -> &str;
}

/// One attempt at a JSON GET. Every outbound call goes through here.
pub async fn attempt_get_json(
    service: &'static str,
    request: RequestBuilder,
) -> Result<Value> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ToolsError::Upstream {
            service,
            message: format!("HTTP {status}"),
        });
    }
    let body = response.json::<Value>().await?;
    tracing::debug!(service, "Fetched JSON");
    Ok(body)
}

/// Shared client with a bounded request time
pub fn default_client() -> Result<Client> {
    Ok(Client::builder()
        .timeout(std::time::Duration::from_secs(15))
        .build()?)
}
