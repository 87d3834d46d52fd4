//! Gateway configuration.
//!
//! Settings come from an optional TOML file, then environment overrides, then
//! validation. The CLI only selects the file and the log level.

mod cli;
pub mod groups;
pub mod serde_helpers;
mod validation;

use std::path::Path;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use serde_helpers::{get_env_or_file, load_env_string, load_env_var};

pub use cli::{Cli, Command};
pub use groups::{
    ForwarderSettings, GrpcSettings, HttpSettings, ReceiverSettings, ReceiverTlsSettings,
    RetrySettings,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("File error: {0}")]
    FileError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Environment error: {0}")]
    EnvError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Top-level settings. A missing section disables that side of the gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub receiver: Option<ReceiverSettings>,
    pub forwarder: Option<ForwarderSettings>,
}

impl Settings {
    /// Loads the TOML file (if any), applies environment overrides and
    /// validates the result.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match path {
            Some(path) => {
                info!(path = %path.display(), "Loading configuration file");
                Self::from_toml(&std::fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        settings.apply_env()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Environment variables override file values. Setting a receiver tag or
    /// a forward endpoint enables that section.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(tag) = std::env::var("OTLP_RECEIVER_TAG") {
            self.receiver.get_or_insert_with(Default::default).tag = tag;
        }
        if let Some(receiver) = self.receiver.as_mut() {
            load_env_string("OTLP_RECEIVER_BIND", &mut receiver.bind);
            load_env_var("OTLP_HTTP_PORT", &mut receiver.port)?;
        }

        if let Ok(endpoint) = std::env::var("OTLP_FORWARD_ENDPOINT") {
            let forwarder = self.forwarder.get_or_insert_with(Default::default);
            forwarder.http.get_or_insert_with(Default::default).endpoint = endpoint;
        }
        if let Ok(endpoint) = std::env::var("OTLP_FORWARD_GRPC_ENDPOINT") {
            let forwarder = self.forwarder.get_or_insert_with(Default::default);
            forwarder.grpc = Some(GrpcSettings { endpoint });
        }
        if let Some(forwarder) = self.forwarder.as_mut() {
            load_env_var("OTLP_FORWARD_COMPRESS", &mut forwarder.compress)?;
            if let Some(passphrase) = get_env_or_file("OTLP_TLS_KEY_PASSPHRASE")? {
                forwarder
                    .tls
                    .get_or_insert_with(Default::default)
                    .private_key_passphrase = Some(passphrase);
            }
        }
        Ok(())
    }
}
