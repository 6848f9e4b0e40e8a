//! Execution result model.
//!
//! Results are write-once. `success_count` / `failure_count` are computed
//! from the result list on every call, never stored.

use serde::Serialize;
use tracing::{info, warn};

use crate::telemetry::TelemetrySnapshot;
use crate::transform::Operation;
use crate::utils::format_bytes;

/// Outcome of one file task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileResult {
    Success {
        source_name: String,
        output_name: String,
        output_size: u64,
    },
    Failure {
        source_name: String,
        error_message: String,
    },
}

impl FileResult {
    pub fn success(source_name: impl Into<String>, output_name: impl Into<String>, output_size: u64) -> Self {
        FileResult::Success {
            source_name: source_name.into(),
            output_name: output_name.into(),
            output_size,
        }
    }

    pub fn failure(source_name: impl Into<String>, error_message: impl Into<String>) -> Self {
        FileResult::Failure { source_name: source_name.into(), error_message: error_message.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileResult::Success { .. })
    }

    pub fn source_name(&self) -> &str {
        match self {
            FileResult::Success { source_name, .. } | FileResult::Failure { source_name, .. } => source_name,
        }
    }

    pub fn output_name(&self) -> Option<&str> {
        match self {
            FileResult::Success { output_name, .. } => Some(output_name),
            FileResult::Failure { .. } => None,
        }
    }

    pub fn output_size(&self) -> Option<u64> {
        match self {
            FileResult::Success { output_size, .. } => Some(*output_size),
            FileResult::Failure { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            FileResult::Failure { error_message, .. } => Some(error_message),
            FileResult::Success { .. } => None,
        }
    }

    /// Report line: `✓ src → out (1.50 KB)` or `✗ src (Error: msg)`.
    pub fn summary_line(&self) -> String {
        match self {
            FileResult::Success { source_name, output_name, output_size } => {
                format!("✓ {} → {} ({})", source_name, output_name, format_bytes(*output_size))
            }
            FileResult::Failure { source_name, error_message } => {
                format!("✗ {} (Error: {})", source_name, error_message)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult {
    total_files: usize,
    thread_pool_size: usize,
    results: Vec<FileResult>,
    telemetry: TelemetrySnapshot,
}

#[derive(Serialize)]
struct Report<'a> {
    operation: Operation,
    total_files: usize,
    success_count: usize,
    failure_count: usize,
    thread_pool_size: usize,
    results: &'a [FileResult],
    telemetry: &'a TelemetrySnapshot,
}

impl ExecutionResult {
    pub fn new(
        total_files: usize,
        thread_pool_size: usize,
        results: Vec<FileResult>,
        telemetry: TelemetrySnapshot,
    ) -> Self {
        Self { total_files, thread_pool_size, results, telemetry }
    }

    pub fn total_files(&self) -> usize {
        self.total_files
    }

    pub fn thread_pool_size(&self) -> usize {
        self.thread_pool_size
    }

    /// Per-file results in submission order.
    pub fn results(&self) -> &[FileResult] {
        &self.results
    }

    pub fn telemetry(&self) -> &TelemetrySnapshot {
        &self.telemetry
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.results.iter().filter(|r| !r.is_success()).count()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failure_count() == 0 && self.results.len() == self.total_files
    }

    pub fn summary_lines(&self, operation: Operation) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.results.len() + 3);
        lines.push(format!("=== {} Complete ===", operation.noun()));
        lines.extend(self.results.iter().map(FileResult::summary_line));
        lines.push(format!(
            "Total files {}: {}/{}",
            operation.past_tense(),
            self.success_count(),
            self.total_files
        ));
        lines.push(format!("Thread pool size used: {}", self.thread_pool_size));
        lines
    }

    /// Emit the summary through `tracing`; failed files at warn level.
    pub fn log_summary(&self, operation: Operation) {
        info!("=== {} Complete ===", operation.noun());
        for r in &self.results {
            if r.is_success() {
                info!("{}", r.summary_line());
            } else {
                warn!("{}", r.summary_line());
            }
        }
        info!("Total files {}: {}/{}", operation.past_tense(), self.success_count(), self.total_files);
        info!("Thread pool size used: {}", self.thread_pool_size);
    }

    /// Pretty JSON report including the derived counts.
    pub fn to_json(&self, operation: Operation) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&Report {
            operation,
            total_files: self.total_files,
            success_count: self.success_count(),
            failure_count: self.failure_count(),
            thread_pool_size: self.thread_pool_size,
            results: &self.results,
            telemetry: &self.telemetry,
        })
    }
}
