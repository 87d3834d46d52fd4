//! Bounded in-process record queue.
//!
//! The receiver emits into a `QueueSink`; flush workers pull from the paired
//! `RecordQueue`. Emission waits for capacity, so a full queue applies
//! backpressure to OTLP clients instead of dropping records.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::domain::EmittedRecord;
use crate::error::SinkError;
use crate::port::RecordSink;

/// A record together with the routing tag it was emitted under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedRecord {
    pub tag: String,
    pub record: EmittedRecord,
}

#[derive(Debug, Clone)]
pub struct QueueSink {
    tx: mpsc::Sender<QueuedRecord>,
}

/// Receiving half, shared by every flush worker.
#[derive(Debug, Clone)]
pub struct RecordQueue {
    rx: Arc<Mutex<mpsc::Receiver<QueuedRecord>>>,
}

impl QueueSink {
    #[must_use]
    pub fn channel(capacity: usize) -> (QueueSink, RecordQueue) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            QueueSink { tx },
            RecordQueue {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }
}

impl RecordSink for QueueSink {
    fn emit<'a>(
        &'a self,
        tag: &'a str,
        record: EmittedRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>> {
        Box::pin(async move {
            self.tx
                .send(QueuedRecord {
                    tag: tag.to_string(),
                    record,
                })
                .await
                .map_err(|_| SinkError::Closed)
        })
    }
}

impl RecordQueue {
    /// Next record, or `None` once every sender is gone and the queue is empty.
    pub async fn recv(&self) -> Option<QueuedRecord> {
        self.rx.lock().await.recv().await
    }

    /// Next record if one is ready right now.
    pub async fn try_recv(&self) -> Option<QueuedRecord> {
        self.rx.lock().await.try_recv().ok()
    }

    /// Stops accepting new records; queued ones stay readable.
    pub async fn close(&self) {
        self.rx.lock().await.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SignalKind;

    fn record() -> EmittedRecord {
        EmittedRecord {
            kind: SignalKind::Logs,
            message: "{}".to_string(),
        }
    }

    #[tokio::test]
    async fn test_emitted_record_reaches_queue_with_tag() {
        let (sink, queue) = QueueSink::channel(4);
        sink.emit("otlp.app", record()).await.unwrap();

        let queued = queue.recv().await.unwrap();
        assert_eq!(queued.tag, "otlp.app");
        assert_eq!(queued.record, record());
    }

    #[tokio::test]
    async fn test_closed_queue_rejects_emit() {
        let (sink, queue) = QueueSink::channel(4);
        queue.close().await;
        let err = sink.emit("otlp.app", record()).await.unwrap_err();
        assert!(matches!(err, SinkError::Closed));
    }

    #[tokio::test]
    async fn test_recv_ends_after_senders_drop() {
        let (sink, queue) = QueueSink::channel(4);
        sink.emit("t", record()).await.unwrap();
        drop(sink);
        assert!(queue.recv().await.is_some());
        assert!(queue.recv().await.is_none());
    }
}
