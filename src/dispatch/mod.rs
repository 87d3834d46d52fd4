//! Forwarding dispatcher.
//!
//! Turns one stored record into one outbound OTLP export and classifies the
//! result as an [`ExportOutcome`]. The dispatcher never sleeps or loops;
//! re-attempting retryable outcomes is the caller's job.

pub mod config;
pub mod grpc;
pub mod http;
mod tls;

use std::fmt;

use thiserror::Error;
use tonic::Code;
use tracing::{error, instrument, warn};

use crate::codec::{self, response::PartialSuccess};
use crate::domain::{EmittedRecord, SignalKind};

pub use config::{Compression, TlsSettings, TlsVersion, Transport, TransportConfig};
pub use grpc::GrpcTransport;
pub use http::HttpTransport;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Invalid TLS configuration: {0}")]
    InvalidTls(String),

    #[error("Failed to read TLS material from {path}: {source}")]
    TlsMaterial {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unusable private key at {path}: {reason}")]
    PrivateKey { path: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Failed to configure gRPC channel: {0}")]
    Grpc(#[from] tonic::transport::Error),
}

/// Status code returned by the downstream receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Http(u16),
    Grpc(Code),
}

impl ResponseCode {
    /// HTTP status equivalent, used when matching against the retryable set.
    #[must_use]
    pub fn as_http_status(self) -> u16 {
        match self {
            ResponseCode::Http(status) => status,
            ResponseCode::Grpc(code) => match code {
                Code::Ok => 200,
                Code::Cancelled => 499,
                Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => 400,
                Code::DeadlineExceeded => 504,
                Code::NotFound => 404,
                Code::AlreadyExists | Code::Aborted => 409,
                Code::PermissionDenied => 403,
                Code::ResourceExhausted => 429,
                Code::Unimplemented => 501,
                Code::Unavailable => 503,
                Code::Unauthenticated => 401,
                _ => 500,
            },
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::Http(status) => write!(f, "{status}"),
            ResponseCode::Grpc(code) => write!(f, "{} ({code:?})", *code as i32),
        }
    }
}

/// Result of one forwarding attempt, as reported to the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Success,
    /// Try again later. `code` is absent for transport faults.
    RetryableFailure {
        code: Option<ResponseCode>,
        message: String,
    },
    /// Drop the record.
    FatalFailure { message: String },
}

impl ExportOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Success)
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExportOutcome::RetryableFailure { .. })
    }

    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExportOutcome::FatalFailure { .. })
    }
}

/// What a transport observed, before policy is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Acknowledged { partial: Option<PartialSuccess> },
    Rejected { code: ResponseCode, message: String },
    Unreachable { message: String },
}

#[derive(Debug, Clone)]
enum Sender {
    Http(HttpTransport),
    Grpc(GrpcTransport),
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: TransportConfig,
    sender: Sender,
}

impl Dispatcher {
    /// Builds the transport named by `config`. A gRPC transport needs a
    /// running Tokio runtime.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let sender = match &config.transport {
            Transport::Http { endpoint, proxy } => Sender::Http(HttpTransport::new(
                endpoint.clone(),
                proxy.as_ref(),
                config.tls.as_ref(),
                config.timeout,
            )?),
            Transport::Grpc { endpoint } => Sender::Grpc(GrpcTransport::new(
                endpoint,
                config.tls.as_ref(),
                config.timeout,
                config.compression == Compression::Gzip,
            )?),
        };
        Ok(Self { config, sender })
    }

    /// Where a record of `kind` is sent, for log context.
    #[must_use]
    pub fn target(&self, kind: SignalKind) -> String {
        match &self.sender {
            Sender::Http(transport) => transport.url_for(kind),
            Sender::Grpc(transport) => {
                format!("{}/{}/Export", transport.endpoint(), kind.grpc_service())
            }
        }
    }

    #[instrument(skip_all, fields(signal = %record.kind))]
    pub async fn dispatch(&self, record: &EmittedRecord) -> ExportOutcome {
        let kind = record.kind;
        let canonical = match record.decode() {
            Ok(canonical) => canonical,
            Err(e) => {
                error!(error = %e, "Stored record does not decode");
                return ExportOutcome::FatalFailure {
                    message: e.to_string(),
                };
            }
        };

        let delivery = match &self.sender {
            Sender::Http(transport) => {
                let body = codec::encode_protobuf(&canonical);
                match self.config.compression {
                    Compression::None => transport.send(kind, body, false).await,
                    Compression::Gzip => match codec::gzip(&body) {
                        Ok(gzipped) => transport.send(kind, gzipped, true).await,
                        Err(e) => {
                            error!(error = %e, "Failed to compress export body");
                            return ExportOutcome::FatalFailure {
                                message: e.to_string(),
                            };
                        }
                    },
                }
            }
            Sender::Grpc(transport) => transport.send(canonical).await,
        };

        classify(&self.config, &self.target(kind), delivery)
    }
}

/// Applies the retry policy to what the transport observed.
///
/// The retryable set is consulted before the fatal flag.
#[must_use]
pub fn classify(config: &TransportConfig, target: &str, delivery: Delivery) -> ExportOutcome {
    match delivery {
        Delivery::Acknowledged { partial } => {
            if let Some(partial) = partial.filter(PartialSuccess::is_partial) {
                warn!(
                    rejected = partial.rejected,
                    error_message = %partial.error_message,
                    "'{target}' accepted the export with rejected items"
                );
            }
            ExportOutcome::Success
        }
        Delivery::Rejected { code, message } => {
            if config
                .retryable_response_codes
                .contains(&code.as_http_status())
            {
                warn!(body = %message, "got error response from '{target}', response code is {code}, will retry");
                ExportOutcome::RetryableFailure {
                    code: Some(code),
                    message,
                }
            } else if config.error_response_as_unrecoverable {
                error!(body = %message, "got unrecoverable error response from '{target}', response code is {code}");
                ExportOutcome::FatalFailure { message }
            } else {
                error!(body = %message, "got error response from '{target}', response code is {code}");
                ExportOutcome::Success
            }
        }
        Delivery::Unreachable { message } => {
            warn!(error = %message, "failed to reach '{target}'");
            ExportOutcome::RetryableFailure {
                code: None,
                message,
            }
        }
    }
}
