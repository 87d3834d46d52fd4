pub mod forwarder;
pub mod record_sink;

pub use forwarder::Forwarder;
pub use record_sink::RecordSink;
