//! OTLP wire codec.
//!
//! Transcodes between OTLP binary protobuf, the OTLP JSON mapping and
//! [`CanonicalRecord`]. This is the only place where a payload is checked
//! against the OTLP schema; everything downstream trusts the decoded value.

mod json;
pub mod response;

use std::io::{Read, Write};

use bytes::Bytes;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use opentelemetry_proto::tonic::collector::{
    logs::v1::ExportLogsServiceRequest, metrics::v1::ExportMetricsServiceRequest,
    trace::v1::ExportTraceServiceRequest,
};
use prost::Message;
use thiserror::Error;

use crate::domain::{CanonicalRecord, SignalKind};

pub const CONTENT_TYPE_PROTOBUF: &str = "application/x-protobuf";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_PLAIN: &str = "text/plain";
pub const CONTENT_ENCODING_GZIP: &str = "gzip";

/// Upper bound on an inflated request body.
pub const MAX_DECOMPRESSED_BYTES: u64 = 64 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("{kind} request does not conform to the OTLP protobuf schema: {source}")]
    Protobuf {
        kind: SignalKind,
        #[source]
        source: prost::DecodeError,
    },

    #[error("{kind} request does not conform to the OTLP JSON mapping: {source}")]
    Json {
        kind: SignalKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decompress gzip body: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("gzip body inflates beyond {limit} bytes")]
    DecompressedTooLarge { limit: u64 },

    #[error("failed to compress body: {0}")]
    Compress(#[source] std::io::Error),

    #[error("stored record is not a valid envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("failed to serialize {kind} record: {message}")]
    Serialize { kind: SignalKind, message: String },
}

/// Body encoding of an OTLP request or response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Protobuf,
    Json,
}

impl WireFormat {
    /// Matches a `Content-Type` header value exactly.
    #[must_use]
    pub fn from_content_type(value: &str) -> Option<Self> {
        match value {
            CONTENT_TYPE_PROTOBUF => Some(WireFormat::Protobuf),
            CONTENT_TYPE_JSON => Some(WireFormat::Json),
            _ => None,
        }
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            WireFormat::Protobuf => CONTENT_TYPE_PROTOBUF,
            WireFormat::Json => CONTENT_TYPE_JSON,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentEncoding {
    #[default]
    Identity,
    Gzip,
}

impl ContentEncoding {
    /// Absent header means identity; only `gzip` is accepted otherwise.
    #[must_use]
    pub fn from_header(value: Option<&str>) -> Option<Self> {
        match value {
            None => Some(ContentEncoding::Identity),
            Some(CONTENT_ENCODING_GZIP) => Some(ContentEncoding::Gzip),
            Some(_) => None,
        }
    }
}

/// A request or response body as it appears on the wire.
#[derive(Debug, Clone)]
pub struct WireEnvelope {
    pub format: WireFormat,
    pub encoding: ContentEncoding,
    pub body: Bytes,
}

impl WireEnvelope {
    /// Inflates the body if needed and decodes it as `kind`.
    ///
    /// A body that fails to inflate is reported like any other schema
    /// violation.
    pub fn decode(&self, kind: SignalKind) -> Result<CanonicalRecord, CodecError> {
        match self.encoding {
            ContentEncoding::Identity => decode(&self.body, self.format, kind),
            ContentEncoding::Gzip => decode(&gunzip(&self.body)?, self.format, kind),
        }
    }
}

/// Decodes `bytes` as an OTLP export request of the given kind.
pub fn decode(
    bytes: &[u8],
    format: WireFormat,
    kind: SignalKind,
) -> Result<CanonicalRecord, CodecError> {
    let spec = kind.spec();
    match format {
        WireFormat::Protobuf => {
            (spec.decode_protobuf)(bytes).map_err(|source| CodecError::Protobuf { kind, source })
        }
        WireFormat::Json => {
            (spec.decode_json)(bytes).map_err(|source| CodecError::Json { kind, source })
        }
    }
}

/// Encodes a record. Protobuf encoding cannot fail.
pub fn encode(record: &CanonicalRecord, format: WireFormat) -> Result<Vec<u8>, CodecError> {
    match format {
        WireFormat::Protobuf => Ok(encode_protobuf(record)),
        WireFormat::Json => {
            let result = match record {
                CanonicalRecord::Logs(request) => json::to_vec(request),
                CanonicalRecord::Metrics(request) => json::to_vec(request),
                CanonicalRecord::Traces(request) => json::to_vec(request),
            };
            result.map_err(|e| CodecError::Serialize {
                kind: record.kind(),
                message: e.to_string(),
            })
        }
    }
}

#[must_use]
pub fn encode_protobuf(record: &CanonicalRecord) -> Vec<u8> {
    match record {
        CanonicalRecord::Logs(request) => request.encode_to_vec(),
        CanonicalRecord::Metrics(request) => request.encode_to_vec(),
        CanonicalRecord::Traces(request) => request.encode_to_vec(),
    }
}

pub fn gzip(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 2), Compression::default());
    encoder.write_all(bytes).map_err(CodecError::Compress)?;
    encoder.finish().map_err(CodecError::Compress)
}

pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    gunzip_with_limit(bytes, MAX_DECOMPRESSED_BYTES)
}

/// Inflates at most `limit` bytes; a longer stream is an error.
pub fn gunzip_with_limit(bytes: &[u8], limit: u64) -> Result<Vec<u8>, CodecError> {
    let mut decoder = GzDecoder::new(bytes).take(limit.saturating_add(1));
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(CodecError::Decompress)?;
    if decompressed.len() as u64 > limit {
        return Err(CodecError::DecompressedTooLarge { limit });
    }
    Ok(decompressed)
}

// Per-kind decoders referenced from the signal strategy table.

pub(crate) fn decode_logs_protobuf(bytes: &[u8]) -> Result<CanonicalRecord, prost::DecodeError> {
    ExportLogsServiceRequest::decode(bytes).map(CanonicalRecord::Logs)
}

pub(crate) fn decode_metrics_protobuf(
    bytes: &[u8],
) -> Result<CanonicalRecord, prost::DecodeError> {
    ExportMetricsServiceRequest::decode(bytes).map(CanonicalRecord::Metrics)
}

pub(crate) fn decode_traces_protobuf(
    bytes: &[u8],
) -> Result<CanonicalRecord, prost::DecodeError> {
    ExportTraceServiceRequest::decode(bytes).map(CanonicalRecord::Traces)
}

pub(crate) fn decode_logs_json(bytes: &[u8]) -> Result<CanonicalRecord, serde_json::Error> {
    json::from_slice::<ExportLogsServiceRequest>(bytes, json::Shape::ExportLogs)
        .map(CanonicalRecord::Logs)
}

pub(crate) fn decode_metrics_json(bytes: &[u8]) -> Result<CanonicalRecord, serde_json::Error> {
    json::from_slice::<ExportMetricsServiceRequest>(bytes, json::Shape::ExportMetrics)
        .map(CanonicalRecord::Metrics)
}

pub(crate) fn decode_traces_json(bytes: &[u8]) -> Result<CanonicalRecord, serde_json::Error> {
    json::from_slice::<ExportTraceServiceRequest>(bytes, json::Shape::ExportTraces)
        .map(CanonicalRecord::Traces)
}
