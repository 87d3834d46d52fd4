//! OTLP signal kinds and the per-kind strategy table.
//!
//! Everything that differs between logs, metrics and traces (HTTP path,
//! gRPC service, schema decoders, response builder) is
//! looked up through [`SignalKind::spec`]. Handlers and the dispatcher are
//! written once and parameterized by the kind.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::codec::{self, WireFormat, response};
use crate::domain::CanonicalRecord;

/// Which of the three OTLP telemetry types a request or record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    #[serde(rename = "otlp_logs")]
    Logs,
    #[serde(rename = "otlp_metrics")]
    Metrics,
    #[serde(rename = "otlp_traces")]
    Traces,
}

/// Static description of one signal kind.
pub struct SignalSpec {
    pub kind: SignalKind,
    /// OTLP/HTTP path, shared by the receiver routes and the HTTP exporter.
    pub path: &'static str,
    /// Fully qualified gRPC collector service.
    pub grpc_service: &'static str,
    pub decode_protobuf: fn(&[u8]) -> Result<CanonicalRecord, prost::DecodeError>,
    pub decode_json: fn(&[u8]) -> Result<CanonicalRecord, serde_json::Error>,
    pub build_response: fn(i64, &str, WireFormat) -> Vec<u8>,
}

static LOGS: SignalSpec = SignalSpec {
    kind: SignalKind::Logs,
    path: "/v1/logs",
    grpc_service: "opentelemetry.proto.collector.logs.v1.LogsService",
    decode_protobuf: codec::decode_logs_protobuf,
    decode_json: codec::decode_logs_json,
    build_response: response::logs_response,
};

static METRICS: SignalSpec = SignalSpec {
    kind: SignalKind::Metrics,
    path: "/v1/metrics",
    grpc_service: "opentelemetry.proto.collector.metrics.v1.MetricsService",
    decode_protobuf: codec::decode_metrics_protobuf,
    decode_json: codec::decode_metrics_json,
    build_response: response::metrics_response,
};

static TRACES: SignalSpec = SignalSpec {
    kind: SignalKind::Traces,
    path: "/v1/traces",
    grpc_service: "opentelemetry.proto.collector.trace.v1.TraceService",
    decode_protobuf: codec::decode_traces_protobuf,
    decode_json: codec::decode_traces_json,
    build_response: response::traces_response,
};

impl SignalKind {
    pub const ALL: [SignalKind; 3] = [SignalKind::Logs, SignalKind::Metrics, SignalKind::Traces];

    #[must_use]
    pub fn spec(self) -> &'static SignalSpec {
        match self {
            SignalKind::Logs => &LOGS,
            SignalKind::Metrics => &METRICS,
            SignalKind::Traces => &TRACES,
        }
    }

    #[must_use]
    pub fn path(self) -> &'static str {
        self.spec().path
    }

    #[must_use]
    pub fn grpc_service(self) -> &'static str {
        self.spec().grpc_service
    }

    /// Short lowercase name used in log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::Logs => "logs",
            SignalKind::Metrics => "metrics",
            SignalKind::Traces => "traces",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
