//! # Seriewatch
//!
//! Binary entry point: reads configuration, opens the store and serves the
//! series routes until Ctrl-C.

mod config;

use anyhow::Context;
use clap::Parser;
use config::{Cli, LogFormat};
use seriewatch_core::{
    register_routes, Database, LoggingMiddleware, Server, SeriesService, TimingMiddleware,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("seriewatch=info,seriewatch_core=info"),
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    info!(db = %cli.db_url.display(), "Opening store");
    let db = Database::open(cli.db_url.clone()).await;
    let service = Arc::new(SeriesService::new(db));

    let mut server = Server::new(cli.server_config()?);
    server.add_middleware(LoggingMiddleware::new());
    server.add_middleware(TimingMiddleware::new());
    register_routes(&mut server, service.clone()).context("failed to register routes")?;

    server.serve().await?;

    service
        .flush()?
        .wait()
        .await
        .context("failed to write store on shutdown")?;
    info!("Store saved, bye");
    Ok(())
}
