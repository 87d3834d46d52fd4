pub mod flush;
pub mod queue;
pub mod stdin;
pub mod stdout;

pub use flush::{FlushStats, FlushWorkers, RetryConfig, spawn_workers};
pub use queue::{QueueSink, QueuedRecord, RecordQueue};
pub use stdin::pump_lines;
pub use stdout::JsonLinesSink;
