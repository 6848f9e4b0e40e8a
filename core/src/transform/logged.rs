//! transform/logged.rs
//!
//! `Logged<T>` decorates any `FileTransform` with a tracing span per file,
//! an outcome log line, and an optional `BatchEvent` forwarded to a sink.
//! A panicking transform is recorded as failed, then the panic continues
//! to the executor.

use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, info_span, warn};

use crate::executor::pool::panic_message;
use crate::executor::CancelToken;
use crate::journal::{BatchEvent, EventSink};
use crate::transform::types::{FileOutcome, FileTask, FileTransform, Operation};
use crate::types::FileError;

pub struct Logged<T: FileTransform> {
    inner: T,
    operation: Operation,
    sink: Option<Arc<dyn EventSink>>,
}

impl<T: FileTransform> Logged<T> {
    pub fn new(inner: T, operation: Operation) -> Self {
        Self { inner, operation, sink: None }
    }

    pub fn with_sink(mut self, sink: Option<Arc<dyn EventSink>>) -> Self {
        self.sink = sink;
        self
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

impl<T: FileTransform> FileTransform for Logged<T> {
    fn apply(&self, task: &FileTask, cancel: &CancelToken) -> Result<FileOutcome, FileError> {
        let source = task.source_name();
        let span = info_span!("file", op = %self.operation, source = %source);
        let _enter = span.enter();

        let started = Instant::now();
        let result = match catch_unwind(AssertUnwindSafe(|| self.inner.apply(task, cancel))) {
            Ok(result) => result,
            Err(payload) => {
                let error = FileError::Panicked(panic_message(payload.as_ref()));
                warn!(error = %error, "panicked");
                self.record_failure(source, &error, started);
                resume_unwind(payload);
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(outcome) => {
                info!(output = %outcome.output_name(), size = outcome.output_size, elapsed_ms, "ok");
                if let Some(sink) = &self.sink {
                    sink.record(BatchEvent::FileSucceeded {
                        operation: self.operation,
                        source,
                        output: outcome.output_name(),
                        output_size: outcome.output_size,
                        elapsed_ms,
                    });
                }
            }
            Err(e) => {
                warn!(error = %e, elapsed_ms, "failed");
                self.record_failure(source, e, started);
            }
        }
        result
    }
}

impl<T: FileTransform> Logged<T> {
    fn record_failure(&self, source: String, error: &FileError, started: Instant) {
        if let Some(sink) = &self.sink {
            sink.record(BatchEvent::FileFailed {
                operation: self.operation,
                source,
                error: error.to_string(),
                elapsed_ms: started.elapsed().as_millis() as u64,
            });
        }
    }
}
