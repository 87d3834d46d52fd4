//! JSON-lines sink used when no forwarder is configured.
//!
//! Writes one `{"tag": ..., "time": ..., "record": {...}}` object per line.

use std::future::Future;
use std::io::{self, Write};
use std::pin::Pin;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::EmittedRecord;
use crate::error::SinkError;
use crate::port::RecordSink;

#[derive(Serialize)]
struct Line<'a> {
    tag: &'a str,
    time: DateTime<Utc>,
    record: &'a EmittedRecord,
}

pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl JsonLinesSink<io::Stdout> {
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_line(&self, tag: &str, record: &EmittedRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(&Line {
            tag,
            time: Utc::now(),
            record,
        })?;
        line.push(b'\n');

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SinkError::Rejected("writer lock poisoned".to_string()))?;
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> RecordSink for JsonLinesSink<W> {
    fn emit<'a>(
        &'a self,
        tag: &'a str,
        record: EmittedRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>> {
        let result = self.write_line(tag, &record);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalKind;

    #[tokio::test]
    async fn test_writes_one_json_object_per_line() {
        let sink = JsonLinesSink::new(Vec::new());
        let record = EmittedRecord {
            kind: SignalKind::Metrics,
            message: r#"{"resourceMetrics":[]}"#.to_string(),
        };
        sink.emit("otlp.metrics", record.clone()).await.unwrap();
        sink.emit("otlp.metrics", record).await.unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["tag"], "otlp.metrics");
        assert_eq!(value["record"]["type"], "otlp_metrics");
        assert!(value["time"].is_string());
    }
}
