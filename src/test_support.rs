//! Shared test support utilities
//!
//! Provides `MockSink`, a `RecordSink` that captures emitted records, for use
//! in unit and integration tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::domain::EmittedRecord;
use crate::error::SinkError;
use crate::port::RecordSink;

/// Mock sink that records every `(tag, record)` pair it is given.
#[derive(Default)]
pub struct MockSink {
    emitted: Arc<Mutex<Vec<(String, EmittedRecord)>>>,
    should_fail: AtomicBool,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    pub fn emitted(&self) -> Vec<(String, EmittedRecord)> {
        self.emitted.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn emitted_count(&self) -> usize {
        self.emitted.lock().map(|v| v.len()).unwrap_or_default()
    }
}

impl RecordSink for MockSink {
    fn emit<'a>(
        &'a self,
        tag: &'a str,
        record: EmittedRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>> {
        Box::pin(async move {
            if self.should_fail.load(Ordering::SeqCst) {
                return Err(SinkError::Rejected("Mock emit failure".to_string()));
            }
            if let Ok(mut emitted) = self.emitted.lock() {
                emitted.push((tag.to_string(), record));
            }
            Ok(())
        })
    }
}
