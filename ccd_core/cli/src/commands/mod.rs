mod lookup;
mod web;

pub use lookup::{handle_lookup, handle_pricing, handle_sync_schema, LookupArgs, SyncSchemaArgs};
pub use web::{handle_web, WebArgs};

use common::config::{read_config, AppConfig};
use common::error::CcdError;
use std::path::PathBuf;

const DEFAULT_CONFIG: &str = "ccd.yaml";

pub(crate) fn load_config(path: Option<PathBuf>) -> Result<AppConfig, CcdError> {
    let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    read_config(&path).map_err(CcdError::init)
}
