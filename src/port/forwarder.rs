//! Forwarder trait: what flush workers call to send one record downstream.

use std::future::Future;
use std::pin::Pin;

use crate::dispatch::{Dispatcher, ExportOutcome};
use crate::domain::EmittedRecord;

pub trait Forwarder: Send + Sync {
    fn forward<'a>(
        &'a self,
        record: &'a EmittedRecord,
    ) -> Pin<Box<dyn Future<Output = ExportOutcome> + Send + 'a>>;
}

impl Forwarder for Dispatcher {
    fn forward<'a>(
        &'a self,
        record: &'a EmittedRecord,
    ) -> Pin<Box<dyn Future<Output = ExportOutcome> + Send + 'a>> {
        Box::pin(self.dispatch(record))
    }
}
