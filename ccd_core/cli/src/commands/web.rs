use std::path::PathBuf;

use clap::Args;
use common::error::CcdError;
use lookup_web::{init_logging, run_backend, AppState, BackendConfig};
use tokio::runtime::Runtime;

#[derive(Debug, Args)]
pub struct WebArgs {
    /// Address to bind the backend server; defaults to web.bind_addr from
    /// the config file
    #[arg(long)]
    pub addr: Option<String>,
}

pub fn handle_web(args: WebArgs, config_path: Option<PathBuf>) -> Result<(), CcdError> {
    let cfg = super::load_config(config_path)?;
    let addr = args.addr.unwrap_or_else(|| cfg.web.bind_addr.clone());

    init_logging();
    let state = AppState::from_config(&cfg);

    let rt = Runtime::new().map_err(CcdError::run)?;
    rt.block_on(run_backend(BackendConfig { addr }, state))
        .map_err(CcdError::run)
}
