pub mod error;

use crate::config::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Environment variable consulted when the config file carries no API key.
pub const API_KEY_ENV: &str = "CCD_API_KEY";

fn default_minor_units() -> u32 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_field_prefix() -> String {
    "ccd".to_string()
}

/// Registration used when sampling provider tables for schema inference.
fn default_test_vrm() -> String {
    "AB12CDE".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Field-key namespace for everything ingested from this provider.
    #[serde(default = "default_field_prefix")]
    pub field_prefix: String,
    /// The pricing endpoint is assumed to report minor currency units
    /// (pence). The divisor is configurable because that assumption is not a
    /// verified provider contract.
    #[serde(default = "default_minor_units")]
    pub minor_units_per_major: u32,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_test_vrm")]
    pub test_vrm: String,
}

impl ProviderConfig {
    /// Resolve the API key from config or environment. Absence is a
    /// constructor-time error for anything that bills against the provider.
    pub fn resolved_api_key(&self) -> Result<String, ConfigError> {
        if let Some(key) = &self.api_key {
            if !key.trim().is_empty() {
                return Ok(key.clone());
            }
        }
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::missing_credential(format!(
                "no provider API key in config and {} is unset",
                API_KEY_ENV
            ))),
        }
    }

    pub fn has_api_key(&self) -> bool {
        self.resolved_api_key().is_ok()
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:8099".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub web: WebConfig,
}

pub fn read_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::incorrect_path(path));
    }
    let file = fs::File::open(path)?;
    let config: AppConfig = serde_yaml::from_reader(file)?;
    Ok(config)
}
