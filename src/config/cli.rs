use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::LogLevel;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, env = "GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check the local /v1/health endpoint (for container health checks)
    Healthcheck {
        /// Port the receiver listens on
        #[arg(long, env = "OTLP_HTTP_PORT", default_value = "4318")]
        port: u16,

        /// Check over HTTPS (receiver started with TLS)
        #[arg(long, env = "OTLP_HEALTHCHECK_TLS")]
        tls: bool,
    },
}
