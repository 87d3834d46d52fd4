//! Immutable forwarding configuration.
//!
//! Built once at startup and shared read-only by every dispatch.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_HTTP_ENDPOINT: &str = "http://127.0.0.1:4318";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub transport: Transport,
    pub tls: Option<TlsSettings>,
    pub compression: Compression,
    /// Response codes that make a failed export retryable.
    pub retryable_response_codes: BTreeSet<u16>,
    /// Non-retryable error responses are fatal when set; logged and treated
    /// as sent otherwise.
    pub error_response_as_unrecoverable: bool,
    pub timeout: Duration,
}

impl TransportConfig {
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            tls: None,
            compression: Compression::None,
            retryable_response_codes: BTreeSet::new(),
            error_response_as_unrecoverable: true,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn http(endpoint: Url) -> Self {
        Self::new(Transport::Http {
            endpoint,
            proxy: None,
        })
    }

    pub fn grpc(endpoint: impl Into<String>) -> Self {
        Self::new(Transport::Grpc {
            endpoint: endpoint.into(),
        })
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn with_retryable_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_response_codes = codes.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_error_response_as_unrecoverable(mut self, fatal: bool) -> Self {
        self.error_response_as_unrecoverable = fatal;
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: TlsSettings) -> Self {
        self.tls = Some(tls);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Exactly one outbound transport per dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Http { endpoint: Url, proxy: Option<Url> },
    Grpc { endpoint: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    #[default]
    #[serde(rename = "text", alias = "none")]
    None,
    Gzip,
}

impl std::str::FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" | "none" => Ok(Compression::None),
            "gzip" => Ok(Compression::Gzip),
            other => Err(format!("Invalid compression: {other} (expected text or gzip)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "TLSv1")]
    Tls1_0,
    #[serde(rename = "TLSv1_1")]
    Tls1_1,
    #[serde(rename = "TLSv1_2")]
    Tls1_2,
    #[serde(rename = "TLSv1_3")]
    Tls1_3,
}

impl TlsVersion {
    pub fn as_reqwest(self) -> reqwest::tls::Version {
        match self {
            TlsVersion::Tls1_0 => reqwest::tls::Version::TLS_1_0,
            TlsVersion::Tls1_1 => reqwest::tls::Version::TLS_1_1,
            TlsVersion::Tls1_2 => reqwest::tls::Version::TLS_1_2,
            TlsVersion::Tls1_3 => reqwest::tls::Version::TLS_1_3,
        }
    }
}

/// Client TLS material. All paths are PEM files.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsSettings {
    pub cert_path: Option<PathBuf>,
    pub private_key_path: Option<PathBuf>,
    pub private_key_passphrase: Option<String>,
    pub ca_path: Option<PathBuf>,
    pub min_version: Option<TlsVersion>,
    pub max_version: Option<TlsVersion>,
    /// Skip peer verification.
    pub insecure: bool,
}

impl fmt::Debug for TlsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsSettings")
            .field("cert_path", &self.cert_path)
            .field("private_key_path", &self.private_key_path)
            .field(
                "private_key_passphrase",
                &self.private_key_passphrase.as_ref().map(|_| "<redacted>"),
            )
            .field("ca_path", &self.ca_path)
            .field("min_version", &self.min_version)
            .field("max_version", &self.max_version)
            .field("insecure", &self.insecure)
            .finish()
    }
}
