//! executor/pool.rs
//!
//! Design notes:
//! - Pool size = `min(workers or CPUs, tasks)`, at least 1.
//! - All jobs are queued up front, then the queue is closed; workers exit
//!   when it drains.
//! - The orchestrating thread waits on results, the interrupt signal, and the
//!   batch deadline at once. On timeout it cancels, grants `cancel_grace`
//!   for in-flight tasks to stop, then synthesizes failures for the rest.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{at, never, select, unbounded, Receiver};
use tracing::{debug, info, warn};

use crate::executor::context::ExecutionContext;
use crate::journal::BatchEvent;
use crate::result::{ExecutionResult, FileResult};
use crate::telemetry::{FileCounters, StageTimes, TelemetrySnapshot, TelemetryTimer};
use crate::transform::{FileOutcome, FileTask, FileTransform, Operation};
use crate::types::{BatchError, FileError};

type Slot = Option<Result<FileOutcome, FileError>>;

/// Run `transform` over `tasks` on a bounded pool.
///
/// Returns one `FileResult` per task, in submission order. The only error is
/// batch-level: an interrupt raised through `ctx.interrupt`, or a pool that
/// could not be started.
pub fn execute_in_parallel<T>(
    tasks: Vec<FileTask>,
    transform: Arc<T>,
    operation: Operation,
    ctx: &ExecutionContext,
) -> Result<ExecutionResult, BatchError>
where
    T: FileTransform + ?Sized + 'static,
{
    let total = tasks.len();
    let pool_size = ctx.config.pool_size(total);
    let mut timer = TelemetryTimer::new();

    if total == 0 {
        debug!("empty batch");
        return Ok(ExecutionResult::new(0, pool_size, Vec::new(), TelemetrySnapshot::default()));
    }

    info!(%operation, total, pool_size, "batch started");
    ctx.emit(BatchEvent::BatchStarted { operation, total_files: total, pool_size });

    let names: Vec<String> = tasks.iter().map(FileTask::source_name).collect();

    let (job_tx, job_rx) = unbounded::<(usize, FileTask)>();
    let (res_tx, res_rx) = unbounded::<(usize, Result<FileOutcome, FileError>)>();

    for job in tasks.into_iter().enumerate() {
        // Receiver is alive in this scope; send cannot fail.
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(pool_size);
    for i in 0..pool_size {
        let rx = job_rx.clone();
        let tx = res_tx.clone();
        let transform = Arc::clone(&transform);
        let cancel = ctx.cancel.clone();

        let spawned = thread::Builder::new()
            .name(format!("envelock-worker-{i}"))
            .spawn(move || {
                for (idx, task) in rx.iter() {
                    let outcome = if cancel.is_cancelled() {
                        Err(FileError::Cancelled)
                    } else {
                        catch_unwind(AssertUnwindSafe(|| transform.apply(&task, &cancel)))
                            .unwrap_or_else(|payload| Err(FileError::Panicked(panic_message(payload.as_ref()))))
                    };
                    if tx.send((idx, outcome)).is_err() {
                        break;
                    }
                }
            });

        match spawned {
            Ok(handle) => workers.push(handle),
            Err(e) => {
                ctx.cancel.cancel();
                warn!(error = %e, "worker spawn failed; batch aborted");
                return Err(BatchError::Spawn(e));
            }
        }
    }
    drop(job_rx);
    drop(res_tx);

    let mut slots: Vec<Slot> = (0..total).map(|_| None).collect();
    let mut received = 0usize;
    // A timeout too large to represent as an Instant means no deadline.
    let deadline_rx: Receiver<Instant> = match Instant::now().checked_add(ctx.config.timeout) {
        Some(deadline) => at(deadline),
        None => never(),
    };
    let never_interrupted = never::<()>();
    let interrupt_rx: &Receiver<()> = ctx.interrupt.as_ref().map(|s| s.receiver()).unwrap_or(&never_interrupted);

    let mut timed_out = false;
    while received < total {
        select! {
            recv(res_rx) -> msg => match msg {
                Ok((idx, outcome)) => {
                    if slots[idx].is_none() {
                        received += 1;
                    }
                    slots[idx] = Some(outcome);
                }
                // Every worker exited; whatever is missing gets synthesized below.
                Err(_) => break,
            },
            recv(interrupt_rx) -> _ => {
                warn!(%operation, completed = received, total, "batch interrupted; cancelling outstanding work");
                ctx.cancel.cancel();
                drain_until(&res_rx, &mut slots, grace_deadline(ctx.config.cancel_grace));
                return Err(BatchError::Interrupted);
            },
            recv(deadline_rx) -> _ => {
                timed_out = true;
                break;
            }
        }
    }

    if timed_out {
        let pending = total - received;
        warn!(%operation, pending, timeout = ?ctx.config.timeout, "batch timed out; cancelling remaining work");
        ctx.emit(BatchEvent::BatchTimedOut { pending });
        ctx.cancel.cancel();
        drain_until(&res_rx, &mut slots, grace_deadline(ctx.config.cancel_grace));
    } else {
        for handle in workers {
            let _ = handle.join();
        }
    }

    let mut stage_times = StageTimes::default();
    let mut counters = FileCounters::default();
    let mut files_ok = 0u64;

    let results: Vec<FileResult> = slots
        .into_iter()
        .zip(names)
        .map(|(slot, name)| match slot {
            Some(Ok(outcome)) => {
                files_ok += 1;
                stage_times.merge(&outcome.stage_times);
                counters.merge(&outcome.counters);
                let output = outcome.output_name();
                FileResult::success(outcome.source_name, output, outcome.output_size)
            }
            Some(Err(e)) => FileResult::failure(name, e.to_string()),
            None if timed_out => {
                FileResult::failure(name, "batch timed out before this file completed".to_string())
            }
            None => FileResult::failure(name, "worker exited without reporting a result".to_string()),
        })
        .collect();

    timer.finish();
    let telemetry = TelemetrySnapshot::from(files_ok, &counters, stage_times, &timer);
    let result = ExecutionResult::new(total, pool_size, results, telemetry);

    ctx.emit(BatchEvent::BatchFinished {
        operation,
        succeeded: result.success_count(),
        failed: result.failure_count(),
        elapsed_ms: timer.elapsed().as_millis() as u64,
    });
    info!(
        %operation,
        succeeded = result.success_count(),
        failed = result.failure_count(),
        elapsed_ms = timer.elapsed().as_millis() as u64,
        "batch finished"
    );
    Ok(result)
}

fn grace_deadline(grace: Duration) -> Option<Instant> {
    Instant::now().checked_add(grace)
}

/// Collect late results until every slot is filled or `until` passes;
/// `None` waits until every worker has reported or exited.
fn drain_until(
    res_rx: &Receiver<(usize, Result<FileOutcome, FileError>)>,
    slots: &mut [Slot],
    until: Option<Instant>,
) {
    while slots.iter().any(Option::is_none) {
        let next = match until {
            Some(until) => res_rx.recv_deadline(until).ok(),
            None => res_rx.recv().ok(),
        };
        match next {
            Some((idx, outcome)) => slots[idx] = Some(outcome),
            None => break,
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
