//! OTLP HTTP Receiver implementation
//!
//! Supports:
//! - POST /v1/logs
//! - POST /v1/metrics
//! - POST /v1/traces
//!
//! Each accepts `application/x-protobuf` or `application/json`, optionally
//! gzip-encoded, and answers in the same content type.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::{error, info, instrument, warn};

use crate::codec::{ContentEncoding, WireEnvelope, WireFormat, response};
use crate::domain::{EmittedRecord, SignalKind};
use crate::error::IngestError;
use crate::port::RecordSink;

/// Application state for OTLP handlers
#[derive(Clone)]
pub struct OTLPState {
    pub sink: Arc<dyn RecordSink>,
    /// Routing tag attached to every emitted record.
    pub tag: Arc<str>,
}

impl OTLPState {
    pub fn new(sink: Arc<dyn RecordSink>, tag: impl Into<Arc<str>>) -> Self {
        Self {
            sink,
            tag: tag.into(),
        }
    }
}

/// Create Axum router for OTLP HTTP endpoints
pub fn otlp_routes(state: OTLPState) -> Router {
    Router::new()
        .route(SignalKind::Logs.path(), post(receive_logs_http))
        .route(SignalKind::Metrics.path(), post(receive_metrics_http))
        .route(SignalKind::Traces.path(), post(receive_traces_http))
        .with_state(state)
}

async fn receive_logs_http(
    State(state): State<OTLPState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    respond(handle_export(&state, SignalKind::Logs, &headers, body).await)
}

async fn receive_metrics_http(
    State(state): State<OTLPState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    respond(handle_export(&state, SignalKind::Metrics, &headers, body).await)
}

async fn receive_traces_http(
    State(state): State<OTLPState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    respond(handle_export(&state, SignalKind::Traces, &headers, body).await)
}

fn respond(result: Result<Response, IngestError>) -> Response {
    result.unwrap_or_else(IntoResponse::into_response)
}

/// Runs one export request through negotiation, decoding and emission.
///
/// The record is emitted before the success response is built, so a 200
/// always means the sink accepted it.
#[instrument(skip(state, headers, body), fields(signal = %kind, body_size = body.len()))]
pub async fn handle_export(
    state: &OTLPState,
    kind: SignalKind,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, IngestError> {
    let envelope = negotiate(headers, body)?;
    let content_type = envelope.format.content_type();

    let record = envelope.decode(kind).map_err(|source| {
        warn!(error = %source, "Rejected OTLP request");
        IngestError::SchemaViolation {
            content_type,
            source,
        }
    })?;
    let item_count = record.item_count();

    let emitted = EmittedRecord::from_canonical(&record).map_err(|source| {
        error!(error = %source, "Failed to render OTLP record");
        IngestError::SchemaViolation {
            content_type,
            source,
        }
    })?;

    state
        .sink
        .emit(&state.tag, emitted)
        .await
        .map_err(|source| {
            error!(error = %source, "Failed to emit OTLP record");
            IngestError::Emit {
                content_type,
                source,
            }
        })?;

    info!(count = item_count, "Accepted OTLP request");

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        Bytes::from(response::success(kind, envelope.format)),
    )
        .into_response())
}

/// Validates `Content-Type` and `Content-Encoding` and wraps the body.
fn negotiate(headers: &HeaderMap, body: Bytes) -> Result<WireEnvelope, IngestError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
    let format = content_type
        .as_deref()
        .and_then(WireFormat::from_content_type)
        .ok_or_else(|| {
            warn!(content_type = ?content_type, "Unsupported media type");
            IngestError::UnsupportedMediaType {
                received: content_type.clone(),
            }
        })?;

    let content_encoding = headers
        .get(header::CONTENT_ENCODING)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
    let encoding = ContentEncoding::from_header(content_encoding.as_deref()).ok_or_else(|| {
        let received = content_encoding.clone().unwrap_or_default();
        warn!(content_encoding = %received, "Unsupported content encoding");
        IngestError::UnsupportedEncoding {
            content_type: format.content_type(),
            received,
        }
    })?;

    Ok(WireEnvelope {
        format,
        encoding,
        body,
    })
}
