pub mod record;
pub mod signal;

pub use record::{CanonicalRecord, EmittedRecord};
pub use signal::{SignalKind, SignalSpec};
