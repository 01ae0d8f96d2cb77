use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use catalog::TableCatalog;
use clap::Args;
use common::error::CcdError;
use fetcher::FetchOrchestrator;
use log::info;
use mapper::ResponseMapper;
use provider_client::{PricingSync, VehicleDataApi, VehicleDataClient};
use schema_sync::SchemaSync;
use serde_json::{json, Value};
use tokio::runtime::Runtime;

#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Registration mark of the vehicle to look up
    pub registration: String,

    /// Provider tables to fetch, comma separated
    #[arg(long, value_delimiter = ',', default_value = "vehicleregistration")]
    pub tables: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SyncSchemaArgs {
    /// Print the generated DDL instead of running the sync
    #[arg(long)]
    pub ddl: bool,
}

pub fn handle_lookup(args: LookupArgs, config_path: Option<PathBuf>) -> Result<(), CcdError> {
    let cfg = super::load_config(config_path)?;
    let catalog = TableCatalog::new();
    let client: Arc<dyn VehicleDataApi> =
        Arc::new(VehicleDataClient::from_config(&cfg.provider).map_err(CcdError::init)?);
    let pricing = Arc::new(PricingSync::new(
        Some(client.clone()),
        catalog,
        cfg.provider.minor_units_per_major,
    ));
    let orchestrator = FetchOrchestrator::new(client, pricing.clone());
    let mapper = ResponseMapper::new(cfg.provider.field_prefix.clone());

    let rt = Runtime::new().map_err(CcdError::run)?;
    let result = rt
        .block_on(async {
            pricing.refresh().await;
            orchestrator
                .fetch_vehicle_data(&args.registration, &args.tables)
                .await
        })
        .map_err(CcdError::run)?;

    let mapped: BTreeMap<String, Value> = mapper
        .map_to_record(&result)
        .into_iter()
        .map(|(key, value)| (key, value.as_json()))
        .collect();

    let out = json!({
        "success": result.success,
        "data": result.data,
        "mappedData": mapped,
        "cost": result.cost,
        "tablesFetched": result.tables_fetched,
        "error": result.error,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&out).map_err(CcdError::run)?
    );
    Ok(())
}

pub fn handle_pricing(config_path: Option<PathBuf>) -> Result<(), CcdError> {
    let cfg = super::load_config(config_path)?;
    let catalog = TableCatalog::new();
    let client: Option<Arc<dyn VehicleDataApi>> = match VehicleDataClient::from_config(&cfg.provider)
    {
        Ok(client) => Some(Arc::new(client)),
        Err(err) => {
            info!("provider client unavailable, using catalog defaults: {err}");
            None
        }
    };
    let pricing = PricingSync::new(
        client,
        catalog.clone(),
        cfg.provider.minor_units_per_major,
    );

    let rt = Runtime::new().map_err(CcdError::run)?;
    let snapshot = rt.block_on(pricing.refresh());
    if snapshot.is_none() {
        println!("live pricing unavailable; showing catalog defaults\n");
    }
    for table in catalog.list() {
        println!(
            "{:<24} {:>8}",
            table.name,
            pricing.table_cost_now(table.name)
        );
    }
    Ok(())
}

pub fn handle_sync_schema(
    args: SyncSchemaArgs,
    config_path: Option<PathBuf>,
) -> Result<(), CcdError> {
    let cfg = super::load_config(config_path)?;
    let catalog = TableCatalog::new();
    let client: Option<Arc<dyn VehicleDataApi>> = match VehicleDataClient::from_config(&cfg.provider)
    {
        Ok(client) => Some(Arc::new(client)),
        Err(err) => {
            info!("provider client unavailable: {err}");
            None
        }
    };
    let sync = SchemaSync::new(client, catalog, cfg.provider.test_vrm.clone());

    let rt = Runtime::new().map_err(CcdError::run)?;
    if args.ddl {
        match rt.block_on(sync.generate_ddl()) {
            Ok(ddl) => {
                println!("{ddl}");
                Ok(())
            }
            Err(aborted) => Err(CcdError::run_msg(aborted.errors.join("; "))),
        }
    } else {
        let result = rt.block_on(sync.sync_schema());
        println!(
            "{}",
            serde_json::to_string_pretty(&result).map_err(CcdError::run)?
        );
        if result.success {
            Ok(())
        } else {
            Err(CcdError::run_msg(result.errors.join("; ")))
        }
    }
}
