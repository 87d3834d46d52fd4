//! Stored-record reader for forwarder-only deployments.
//!
//! Reads JSON lines, either the `{"tag", "time", "record"}` lines written by
//! [`JsonLinesSink`](super::JsonLinesSink) or bare `{"type", "message"}`
//! records, and emits them into a sink.

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::codec::CodecError;
use crate::domain::EmittedRecord;
use crate::error::SinkError;
use crate::port::RecordSink;

#[derive(Deserialize)]
struct TaggedLine {
    tag: String,
    record: EmittedRecord,
}

/// A tagged sink line, or a bare envelope that takes the default tag.
fn parse_line(line: &str) -> Result<(Option<String>, EmittedRecord), CodecError> {
    if let Ok(TaggedLine { tag, record }) = serde_json::from_str(line) {
        return Ok((Some(tag), record));
    }
    EmittedRecord::from_json(line.as_bytes()).map(|record| (None, record))
}

/// Emits every readable line and returns how many were emitted.
///
/// Unreadable lines are logged and skipped. Stops at end of input or at the
/// first sink failure.
pub async fn pump_lines<R>(
    reader: R,
    sink: &dyn RecordSink,
    default_tag: &str,
) -> Result<u64, SinkError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut emitted = 0_u64;
    let mut line_no = 0_u64;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok((Some(tag), record)) => sink.emit(&tag, record).await?,
            Ok((None, record)) => sink.emit(default_tag, record).await?,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping unreadable stored record");
                continue;
            }
        }
        emitted += 1;
    }

    info!(emitted, "Reached end of stored records");
    Ok(emitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalKind;
    use crate::test_support::MockSink;

    #[tokio::test]
    async fn test_reads_tagged_and_bare_lines() {
        let input = concat!(
            r#"{"tag":"otlp.a","time":"2026-01-01T00:00:00Z","record":{"type":"otlp_logs","message":"{}"}}"#,
            "\n",
            r#"{"type":"otlp_traces","message":"{}"}"#,
            "\n\n",
            "not json\n",
        );
        let sink = MockSink::new();

        let emitted = pump_lines(input.as_bytes(), &sink, "otlp.default")
            .await
            .unwrap();

        assert_eq!(emitted, 2);
        let records = sink.emitted();
        assert_eq!(records[0].0, "otlp.a");
        assert_eq!(records[0].1.kind, SignalKind::Logs);
        assert_eq!(records[1].0, "otlp.default");
        assert_eq!(records[1].1.kind, SignalKind::Traces);
    }

    #[tokio::test]
    async fn test_signal_kind_alias_is_read_and_unknown_type_skipped() {
        let input = concat!(
            r#"{"type":"otlp_profiles","message":"{}"}"#,
            "\n",
            r#"{"signalKind":"otlp_metrics","message":"{}"}"#,
            "\n",
        );
        let sink = MockSink::new();

        let emitted = pump_lines(input.as_bytes(), &sink, "otlp.default")
            .await
            .unwrap();

        assert_eq!(emitted, 1);
        assert_eq!(sink.emitted()[0].1.kind, SignalKind::Metrics);
    }

    #[tokio::test]
    async fn test_sink_failure_stops_reading() {
        let sink = MockSink::new();
        sink.set_should_fail(true);
        let input = r#"{"type":"otlp_logs","message":"{}"}"#;
        assert!(pump_lines(input.as_bytes(), &sink, "t").await.is_err());
    }
}
