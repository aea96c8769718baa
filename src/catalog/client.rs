//! HTTP catalog client
//!
//! One GET per call, no retries: failures surface to the scheduler, which
//! simply tries again on the next tick.

use super::wire::{parse_inventory, parse_listing, InventoryRow, ListedProduct};
use crate::config::ApiConfig;
use crate::error::CatalogError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER, USER_AGENT};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0";

/// Source of catalog data for a locale.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// SKU/name listing for the locale.
    async fn fetch_listing(&self, locale: &str) -> Result<Vec<ListedProduct>, CatalogError>;

    /// Availability rows for the given SKUs, in one request.
    async fn fetch_inventory(
        &self,
        locale: &str,
        skus: &[String],
    ) -> Result<Vec<InventoryRow>, CatalogError>;
}

/// reqwest-backed client for the vendor's public store API.
pub struct HttpCatalogClient {
    client: reqwest::Client,
    api: ApiConfig,
}

impl HttpCatalogClient {
    pub fn new(api: ApiConfig) -> Result<Self, CatalogError> {
        let origin = HeaderValue::from_str(&api.origin)
            .map_err(|e| CatalogError::Setup(format!("invalid origin '{}': {}", api.origin, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(REFERER, origin.clone());
        headers.insert(ORIGIN, origin);

        let client = reqwest::Client::builder()
            .timeout(api.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| CatalogError::Setup(e.to_string()))?;

        Ok(Self { client, api })
    }

    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<Vec<u8>, CatalogError> {
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::UpstreamUnavailable(format!(
                "{} returned {}",
                url, status
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn fetch_listing(&self, locale: &str) -> Result<Vec<ListedProduct>, CatalogError> {
        let query = [
            ("locale", locale.to_string()),
            ("page", "1".to_string()),
            ("limit", self.api.listing_limit.to_string()),
            ("manufacturer", self.api.manufacturer.clone()),
        ];

        let body = self.get(&self.api.search_url, &query).await?;
        parse_listing(&body)
    }

    async fn fetch_inventory(
        &self,
        locale: &str,
        skus: &[String],
    ) -> Result<Vec<InventoryRow>, CatalogError> {
        let query = [("locale", locale.to_string()), ("skus", skus.join(","))];

        let body = self.get(&self.api.inventory_url, &query).await?;
        parse_inventory(&body, &self.api.store_url)
    }
}
