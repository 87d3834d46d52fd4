use axum::{
    body::Bytes,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::codec::{CONTENT_TYPE_PLAIN, CodecError};
use crate::dispatch::TransportError;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Failed to load configuration: {0}")]
    Config(String),

    #[error("Failed to bind to address {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to set up forwarder: {0}")]
    Transport(#[from] TransportError),

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Failure to hand a record to the downstream pipeline.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("record queue is closed")]
    Closed,

    #[error("failed to write record: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("sink rejected record: {0}")]
    Rejected(String),
}

/// Why an OTLP/HTTP request was not accepted.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("unsupported content type: {received:?}")]
    UnsupportedMediaType { received: Option<String> },

    #[error("unsupported content encoding: {received}")]
    UnsupportedEncoding {
        content_type: &'static str,
        received: String,
    },

    #[error("request body does not match the OTLP schema: {source}")]
    SchemaViolation {
        content_type: &'static str,
        #[source]
        source: CodecError,
    },

    #[error("failed to emit record: {source}")]
    Emit {
        content_type: &'static str,
        #[source]
        source: SinkError,
    },
}

pub(crate) const UNSUPPORTED_MEDIA_TYPE_BODY: &str = "415 unsupported media type, supported: [application/json, application/x-protobuf]";

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            IngestError::UnsupportedMediaType { .. } => (
                status,
                [(header::CONTENT_TYPE, CONTENT_TYPE_PLAIN)],
                UNSUPPORTED_MEDIA_TYPE_BODY,
            )
                .into_response(),
            IngestError::UnsupportedEncoding { content_type, .. }
            | IngestError::SchemaViolation { content_type, .. }
            | IngestError::Emit { content_type, .. } => (
                status,
                [(header::CONTENT_TYPE, content_type)],
                Bytes::new(),
            )
                .into_response(),
        }
    }
}

impl IngestError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            IngestError::UnsupportedEncoding { .. } | IngestError::SchemaViolation { .. } => {
                StatusCode::BAD_REQUEST
            }
            IngestError::Emit { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
