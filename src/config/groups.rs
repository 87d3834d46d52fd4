use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use super::ConfigError;
use crate::adapter::RetryConfig;
use crate::dispatch::config::DEFAULT_HTTP_ENDPOINT;
use crate::dispatch::{Compression, TlsSettings, Transport, TransportConfig};

/// `[receiver]`: the OTLP/HTTP listener.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReceiverSettings {
    /// Routing tag attached to every emitted record.
    pub tag: String,
    pub bind: String,
    pub port: u16,
    pub tls: Option<ReceiverTlsSettings>,
}

impl Default for ReceiverSettings {
    fn default() -> Self {
        Self {
            tag: String::new(),
            bind: "0.0.0.0".to_string(),
            port: 4318,
            tls: None,
        }
    }
}

impl ReceiverSettings {
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReceiverTlsSettings {
    pub cert_path: PathBuf,
    pub private_key_path: PathBuf,
}

/// `[forwarder]`: outbound OTLP export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForwarderSettings {
    pub compress: Compression,
    pub retryable_response_codes: Vec<u16>,
    pub error_response_as_unrecoverable: bool,
    pub timeout_secs: u64,
    pub workers: usize,
    pub queue_capacity: usize,
    pub retry: RetrySettings,
    pub http: Option<HttpSettings>,
    pub grpc: Option<GrpcSettings>,
    pub tls: Option<TlsSettings>,
}

impl Default for ForwarderSettings {
    fn default() -> Self {
        Self {
            compress: Compression::None,
            retryable_response_codes: Vec::new(),
            error_response_as_unrecoverable: true,
            timeout_secs: 30,
            workers: 1,
            queue_capacity: 1024,
            retry: RetrySettings::default(),
            http: None,
            grpc: None,
            tls: None,
        }
    }
}

impl ForwarderSettings {
    /// HTTP wins when both transports are configured; with neither, the
    /// default HTTP endpoint is used.
    pub fn transport(&self) -> Result<Transport, ConfigError> {
        if let Some(grpc) = self.grpc.as_ref().filter(|_| self.http.is_none()) {
            return Ok(Transport::Grpc {
                endpoint: grpc.endpoint.clone(),
            });
        }

        let http = self.http.clone().unwrap_or_default();
        let endpoint = Url::parse(&http.endpoint).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid forward endpoint '{}': {e}", http.endpoint))
        })?;
        let proxy = http
            .proxy
            .as_deref()
            .map(|proxy| {
                Url::parse(proxy)
                    .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{proxy}': {e}")))
            })
            .transpose()?;
        Ok(Transport::Http { endpoint, proxy })
    }

    pub fn transport_config(&self) -> Result<TransportConfig, ConfigError> {
        let mut config = TransportConfig::new(self.transport()?)
            .with_compression(self.compress)
            .with_retryable_codes(self.retryable_response_codes.iter().copied())
            .with_error_response_as_unrecoverable(self.error_response_as_unrecoverable)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(tls) = &self.tls {
            config = config.with_tls(tls.clone());
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpSettings {
    pub endpoint: String,
    pub proxy: Option<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_HTTP_ENDPOINT.to_string(),
            proxy: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrpcSettings {
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
            max_delay_ms: 60_000,
            jitter: true,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            jitter: settings.jitter,
        }
    }
}
