use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapter::{FlushWorkers, JsonLinesSink, QueueSink, RetryConfig, spawn_workers};
use crate::config::Settings;
use crate::dispatch::Dispatcher;
use crate::error::GatewayError;
use crate::port::RecordSink;

/// Shared application state: where records go and who drains them.
pub struct AppState {
    pub sink: Arc<dyn RecordSink>,
    workers: Option<FlushWorkers>,
    worker_shutdown: CancellationToken,
}

impl AppState {
    /// With a forwarder configured, records are queued and drained by flush
    /// workers; otherwise they are written to stdout as JSON lines.
    ///
    /// Must be called inside the Tokio runtime.
    pub fn from_settings(settings: &Settings) -> Result<Self, GatewayError> {
        let worker_shutdown = CancellationToken::new();

        let Some(forwarder) = &settings.forwarder else {
            info!("No forwarder configured, writing records to stdout");
            return Ok(Self {
                sink: Arc::new(JsonLinesSink::stdout()),
                workers: None,
                worker_shutdown,
            });
        };

        let transport = forwarder
            .transport_config()
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        info!(transport = ?transport.transport, compression = ?transport.compression, "Forwarder configured");
        let dispatcher = Arc::new(Dispatcher::new(transport)?);

        let (sink, queue) = QueueSink::channel(forwarder.queue_capacity);
        let workers = spawn_workers(
            queue,
            dispatcher,
            RetryConfig::from(&forwarder.retry),
            forwarder.workers,
            worker_shutdown.clone(),
        );

        Ok(Self {
            sink: Arc::new(sink),
            workers: Some(workers),
            worker_shutdown,
        })
    }

    /// Stops the flush workers after they drain the queue.
    pub async fn shutdown(self) {
        self.worker_shutdown.cancel();
        if let Some(workers) = self.workers {
            let stats = workers.join().await;
            info!(sent = stats.sent, dropped = stats.dropped, "Flush workers stopped");
        }
    }
}
