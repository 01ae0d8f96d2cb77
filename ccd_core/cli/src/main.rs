mod commands;

use crate::commands::{
    handle_lookup, handle_pricing, handle_sync_schema, handle_web, LookupArgs, SyncSchemaArgs,
    WebArgs,
};

use clap::{Parser, Subcommand};
use common::error::CcdError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ccd")]
pub struct Cli {
    #[arg(
        long = "config-path",
        short = 'c',
        help = "path to config file",
        global = true
    )]
    pub config_path: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Fetch provider tables for a registration and print the merged record
    Lookup(LookupArgs),
    /// Show current per-table lookup costs
    Pricing,
    /// Infer table schemas from live samples and report the outcome
    SyncSchema(SyncSchemaArgs),
    /// Run the lookup web backend
    Web(WebArgs),
}

fn run_cmd(func: Result<(), CcdError>) {
    if let Err(e) = func {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn main() {
    logging::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Cmd::Lookup(args) => run_cmd(handle_lookup(args, cli.config_path.clone())),
        Cmd::Pricing => run_cmd(handle_pricing(cli.config_path.clone())),
        Cmd::SyncSchema(args) => run_cmd(handle_sync_schema(args, cli.config_path.clone())),
        Cmd::Web(args) => run_cmd(handle_web(args, cli.config_path.clone())),
    }
}
