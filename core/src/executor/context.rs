//! executor/context.rs
//! Explicit per-batch context: configuration, event sink, cancellation,
//! and the external interrupt signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam::channel::{bounded, Receiver, Sender};

use crate::config::BatchConfig;
use crate::journal::{BatchEvent, EventSink};

/// Shared cooperative cancellation flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Caller-side half of the interrupt pair. Cloneable; safe to move into a
/// signal handler thread.
#[derive(Debug, Clone)]
pub struct InterruptHandle {
    tx: Sender<()>,
}

impl InterruptHandle {
    /// Request that the running batch abort. Repeated calls coalesce.
    pub fn interrupt(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Executor-side half of the interrupt pair.
#[derive(Debug, Clone)]
pub struct InterruptSignal {
    rx: Receiver<()>,
    // Keeps the channel connected after every handle is dropped.
    _keepalive: Sender<()>,
}

impl InterruptSignal {
    pub(crate) fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }

    pub fn is_raised(&self) -> bool {
        !self.rx.is_empty()
    }
}

/// Create a connected interrupt pair.
pub fn interrupt_pair() -> (InterruptHandle, InterruptSignal) {
    let (tx, rx) = bounded(1);
    (InterruptHandle { tx: tx.clone() }, InterruptSignal { rx, _keepalive: tx })
}

/// One context per batch: a token cancelled by a timeout stays cancelled.
pub struct ExecutionContext {
    pub config: BatchConfig,
    pub events: Option<Arc<dyn EventSink>>,
    pub cancel: CancelToken,
    pub interrupt: Option<InterruptSignal>,
}

impl ExecutionContext {
    pub fn new(config: BatchConfig) -> Self {
        Self { config, events: None, cancel: CancelToken::new(), interrupt: None }
    }

    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Attach an interrupt signal, returning the handle that raises it.
    pub fn interruptible(mut self) -> (Self, InterruptHandle) {
        let (handle, signal) = interrupt_pair();
        self.interrupt = Some(signal);
        (self, handle)
    }

    pub fn with_interrupt(mut self, signal: InterruptSignal) -> Self {
        self.interrupt = Some(signal);
        self
    }

    pub(crate) fn emit(&self, event: BatchEvent) {
        if let Some(sink) = &self.events {
            sink.record(event);
        }
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(BatchConfig::default())
    }
}
