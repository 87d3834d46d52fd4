//! RecordSink trait: where the receiver hands off emitted records.
//!
//! Boxed futures keep the trait dyn-compatible so handlers can hold an
//! `Arc<dyn RecordSink>` and tests can swap in a mock.

use std::future::Future;
use std::pin::Pin;

use crate::domain::EmittedRecord;
use crate::error::SinkError;

pub trait RecordSink: Send + Sync {
    /// Hands one record to the downstream pipeline under `tag`.
    ///
    /// Returning `Ok` means the record is owned by the pipeline; the caller
    /// answers the client with success only after this resolves.
    fn emit<'a>(
        &'a self,
        tag: &'a str,
        record: EmittedRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>>;
}
