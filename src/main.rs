use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{debug, info};

mod args;
mod audit;
mod auth;
mod cfg;
mod commands;
mod gate;
mod input;
mod range;
mod requests;
mod sheets;
#[cfg(test)]
mod testing;

use args::Args;
use audit::AuditLogger;
use auth::{ClientFactory, ScopeSet};
use cfg::Cfg;
use commands::Context;
use gate::ChangeGate;
use sheets::SheetsApi;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level)?;

    info!("Starting sheets_cli");

    // Load configuration
    let cfg = Cfg::load(&args)?;
    cfg.validate()?;

    let factory = ClientFactory::new(cfg.credentials.clone());
    let scopes = if args.command.is_read_only() {
        ScopeSet::read_only()
    } else {
        ScopeSet::read_write()
    };
    debug!("Command scopes: {:?}", scopes);

    let api: Arc<dyn SheetsApi> = factory.sheets(&scopes).await?;
    let writer: Arc<dyn SheetsApi> = factory.sheets(&ScopeSet::read_write()).await?;

    let ctx = Context {
        api: api.clone(),
        gate: ChangeGate::new(api, AuditLogger::new(writer, cfg.audit.clone())),
    };

    let output = commands::run_with_error_handling(args.command, &ctx).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = match level {
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        other => anyhow::bail!("Unknown log level: {}", other),
    };

    // stdout carries the JSON result only
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}
