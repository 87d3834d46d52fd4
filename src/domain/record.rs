use opentelemetry_proto::tonic::collector::{
    logs::v1::ExportLogsServiceRequest, metrics::v1::ExportMetricsServiceRequest,
    trace::v1::ExportTraceServiceRequest,
};
use opentelemetry_proto::tonic::metrics::v1::metric::Data;
use serde::{Deserialize, Serialize};

use crate::codec::{self, CodecError, WireFormat};
use crate::domain::SignalKind;

/// A decoded OTLP export request.
///
/// The signal kind is the enum variant, so a record can never carry a payload
/// of one kind tagged as another.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalRecord {
    Logs(ExportLogsServiceRequest),
    Metrics(ExportMetricsServiceRequest),
    Traces(ExportTraceServiceRequest),
}

impl CanonicalRecord {
    #[must_use]
    pub fn kind(&self) -> SignalKind {
        match self {
            CanonicalRecord::Logs(_) => SignalKind::Logs,
            CanonicalRecord::Metrics(_) => SignalKind::Metrics,
            CanonicalRecord::Traces(_) => SignalKind::Traces,
        }
    }

    /// Number of log records, metric data points or spans in the request.
    #[must_use]
    pub fn item_count(&self) -> usize {
        match self {
            CanonicalRecord::Logs(request) => request
                .resource_logs
                .iter()
                .flat_map(|rl| &rl.scope_logs)
                .map(|sl| sl.log_records.len())
                .sum(),
            CanonicalRecord::Metrics(request) => request
                .resource_metrics
                .iter()
                .flat_map(|rm| &rm.scope_metrics)
                .flat_map(|sm| &sm.metrics)
                .map(|metric| match &metric.data {
                    Some(Data::Gauge(gauge)) => gauge.data_points.len(),
                    Some(Data::Sum(sum)) => sum.data_points.len(),
                    Some(Data::Histogram(histogram)) => histogram.data_points.len(),
                    Some(Data::ExponentialHistogram(histogram)) => histogram.data_points.len(),
                    Some(Data::Summary(summary)) => summary.data_points.len(),
                    None => 0,
                })
                .sum(),
            CanonicalRecord::Traces(request) => request
                .resource_spans
                .iter()
                .flat_map(|rs| &rs.scope_spans)
                .map(|ss| ss.spans.len())
                .sum(),
        }
    }
}

/// The shape handed to the record sink and read back by the forwarder.
///
/// Serialized as `{"type": "otlp_logs", "message": "<OTLP JSON>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedRecord {
    #[serde(rename = "type", alias = "signalKind")]
    pub kind: SignalKind,
    pub message: String,
}

impl EmittedRecord {
    /// Renders a canonical record into its stored form.
    pub fn from_canonical(record: &CanonicalRecord) -> Result<Self, CodecError> {
        let bytes = codec::encode(record, WireFormat::Json)?;
        let message = String::from_utf8(bytes).map_err(|e| CodecError::Serialize {
            kind: record.kind(),
            message: e.to_string(),
        })?;
        Ok(Self {
            kind: record.kind(),
            message,
        })
    }

    /// Parses a stored record envelope, e.g. one line read back from a buffer.
    pub fn from_json(bytes: &[u8]) -> Result<Self, CodecError> {
        serde_json::from_slice(bytes).map_err(CodecError::Envelope)
    }

    /// Decodes the stored message back into a canonical record of the tagged kind.
    pub fn decode(&self) -> Result<CanonicalRecord, CodecError> {
        codec::decode(self.message.as_bytes(), WireFormat::Json, self.kind)
    }
}
