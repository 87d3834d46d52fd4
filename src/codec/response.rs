//! OTLP export response bodies.
//!
//! Every accepted request is answered with an export response carrying a
//! partial-success section, serialized in the request's wire format.

use opentelemetry_proto::tonic::collector::{
    logs::v1::{ExportLogsPartialSuccess, ExportLogsServiceResponse},
    metrics::v1::{ExportMetricsPartialSuccess, ExportMetricsServiceResponse},
    trace::v1::{ExportTracePartialSuccess, ExportTraceServiceResponse},
};
use prost::Message;
use serde::Serialize;
use tracing::error;

use super::WireFormat;
use crate::domain::SignalKind;

/// Builds an export response body for `kind`.
#[must_use]
pub fn build(kind: SignalKind, rejected: i64, error_message: &str, format: WireFormat) -> Vec<u8> {
    (kind.spec().build_response)(rejected, error_message, format)
}

/// Full-acceptance response: zero rejected items, empty error message.
#[must_use]
pub fn success(kind: SignalKind, format: WireFormat) -> Vec<u8> {
    build(kind, 0, "", format)
}

pub(crate) fn logs_response(rejected: i64, error_message: &str, format: WireFormat) -> Vec<u8> {
    let response = ExportLogsServiceResponse {
        partial_success: Some(ExportLogsPartialSuccess {
            rejected_log_records: rejected,
            error_message: error_message.to_string(),
        }),
    };
    serialize(SignalKind::Logs, &response, format)
}

pub(crate) fn metrics_response(rejected: i64, error_message: &str, format: WireFormat) -> Vec<u8> {
    let response = ExportMetricsServiceResponse {
        partial_success: Some(ExportMetricsPartialSuccess {
            rejected_data_points: rejected,
            error_message: error_message.to_string(),
        }),
    };
    serialize(SignalKind::Metrics, &response, format)
}

pub(crate) fn traces_response(rejected: i64, error_message: &str, format: WireFormat) -> Vec<u8> {
    let response = ExportTraceServiceResponse {
        partial_success: Some(ExportTracePartialSuccess {
            rejected_spans: rejected,
            error_message: error_message.to_string(),
        }),
    };
    serialize(SignalKind::Traces, &response, format)
}

fn serialize<M>(kind: SignalKind, response: &M, format: WireFormat) -> Vec<u8>
where
    M: Message + Serialize,
{
    match format {
        WireFormat::Protobuf => response.encode_to_vec(),
        WireFormat::Json => serde_json::to_vec(response).unwrap_or_else(|e| {
            error!(signal = %kind, error = %e, "Failed to serialize export response");
            b"{}".to_vec()
        }),
    }
}

/// Partial-success section read back from an upstream export response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartialSuccess {
    pub rejected: i64,
    pub error_message: String,
}

impl PartialSuccess {
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.rejected > 0 || !self.error_message.is_empty()
    }
}

/// Parses an upstream export response body. Returns `None` when the body is
/// empty, unparseable or has no partial-success section.
#[must_use]
pub fn parse_partial_success(
    kind: SignalKind,
    body: &[u8],
    format: WireFormat,
) -> Option<PartialSuccess> {
    if body.is_empty() {
        return None;
    }
    match kind {
        SignalKind::Logs => parse::<ExportLogsServiceResponse>(body, format)?
            .partial_success
            .map(|p| PartialSuccess {
                rejected: p.rejected_log_records,
                error_message: p.error_message,
            }),
        SignalKind::Metrics => parse::<ExportMetricsServiceResponse>(body, format)?
            .partial_success
            .map(|p| PartialSuccess {
                rejected: p.rejected_data_points,
                error_message: p.error_message,
            }),
        SignalKind::Traces => parse::<ExportTraceServiceResponse>(body, format)?
            .partial_success
            .map(|p| PartialSuccess {
                rejected: p.rejected_spans,
                error_message: p.error_message,
            }),
    }
}

fn parse<M>(body: &[u8], format: WireFormat) -> Option<M>
where
    M: Message + Default + serde::de::DeserializeOwned,
{
    match format {
        WireFormat::Protobuf => M::decode(body).ok(),
        WireFormat::Json => serde_json::from_slice(body).ok(),
    }
}
