pub mod error;
pub mod pricing;

pub use error::ProviderClientError;
pub use pricing::PricingSync;

use async_trait::async_trait;
use common::config::ProviderConfig;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

/// Raw body of the provider's pricing endpoint. Amounts are in minor
/// currency units until [`pricing::PricingSync`] normalises them.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingResponse {
    pub tables: HashMap<String, Decimal>,
}

/// The provider surface the rest of the system consumes. Both calls are
/// billable on the provider side, so everything that talks to the provider
/// goes through one explicitly-constructed client rather than a module
/// global.
#[async_trait]
pub trait VehicleDataApi: Send + Sync {
    /// One table lookup for one registration. A billable event.
    async fn fetch_table(&self, table: &str, vrm: &str) -> Result<Value, ProviderClientError>;

    /// Current per-table price list.
    async fn fetch_pricing(&self) -> Result<PricingResponse, ProviderClientError>;
}

#[derive(Debug, Clone)]
pub struct VehicleDataClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl VehicleDataClient {
    /// Build a client from config. A missing API key fails here, at
    /// construction, not on first use.
    pub fn from_config(cfg: &ProviderConfig) -> Result<Self, ProviderClientError> {
        let api_key = cfg
            .resolved_api_key()
            .map_err(|e| ProviderClientError::missing_credentials(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl VehicleDataApi for VehicleDataClient {
    async fn fetch_table(&self, table: &str, vrm: &str) -> Result<Value, ProviderClientError> {
        let url = format!("{}/vehicledata/{}", self.base_url, table);
        let resp = self
            .http
            .get(&url)
            .query(&[("apikey", self.api_key.as_str()), ("vrm", vrm)])
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let body: Value = resp.json().await?;
            Ok(body)
        } else {
            Err(ProviderClientError::unexpected_status(format!(
                "table '{}' returned {}",
                table, status
            )))
        }
    }

    async fn fetch_pricing(&self) -> Result<PricingResponse, ProviderClientError> {
        let url = format!("{}/pricing", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let body: PricingResponse = resp.json().await?;
            Ok(body)
        } else {
            Err(ProviderClientError::unexpected_status(format!(
                "pricing endpoint returned {}",
                status
            )))
        }
    }
}
