//! Command line and environment configuration.

use clap::{Parser, ValueEnum};
use seriewatch_core::ServerConfig;
use anyhow::Context;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    Pretty,
    /// One JSON object per event
    Json,
}

/// Seriewatch HTTP service
#[derive(Debug, Parser)]
#[command(name = "seriewatch")]
#[command(about = "Tracks watched TV series per streaming platform", long_about = None)]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3333)]
    pub port: u16,

    /// JSON file backing the store
    #[arg(long, env = "DB_URL", default_value = "db.json")]
    pub db_url: PathBuf,

    /// Largest accepted request body, in bytes
    #[arg(long, env = "MAX_BODY_SIZE", default_value_t = 1024 * 1024)]
    pub max_body_size: usize,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Server settings derived from the flags
    ///
    /// # Errors
    ///
    /// Fails when the host is not an IP address.
    pub fn server_config(&self) -> anyhow::Result<ServerConfig> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("invalid host address: {}", self.host))?;
        Ok(ServerConfig {
            address: SocketAddr::new(ip, self.port),
            max_body_size: self.max_body_size,
            ..ServerConfig::default()
        })
    }
}
