//! telemetry/snapshot.rs
//!
//! Immutable per-batch telemetry, built once after all results are collected.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::counters::FileCounters;
use crate::telemetry::timers::{Stage, StageTimes, TelemetryTimer};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Files that completed successfully.
    pub files: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub bytes_overhead: u64,
    /// `bytes_in / elapsed`, 0.0 when nothing was timed.
    pub throughput_bytes_per_sec: f64,
    pub elapsed: Duration,
    /// Stage durations summed across all files (CPU time, not wall time).
    pub stage_times: StageTimes,
}

impl TelemetrySnapshot {
    pub fn from(files: u64, counters: &FileCounters, stage_times: StageTimes, timer: &TelemetryTimer) -> Self {
        let elapsed = timer.elapsed();
        let throughput = if elapsed.as_secs_f64() > 0.0 {
            counters.bytes_in as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        Self {
            files,
            bytes_in: counters.bytes_in,
            bytes_out: counters.bytes_out,
            bytes_overhead: counters.bytes_overhead,
            throughput_bytes_per_sec: throughput,
            elapsed,
            stage_times,
        }
    }

    pub fn total_stage_time(&self) -> Duration {
        self.stage_times.total()
    }

    pub fn has_all_stages(&self, expected: &[Stage]) -> bool {
        self.stage_times.has_all(expected)
    }
}
