pub mod receiver;

pub use receiver::{OTLPState, handle_export, otlp_routes};
