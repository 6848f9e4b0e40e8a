//! Batch configuration and destination resolution.
//!
//! `BatchConfig` carries the tunables; `BatchPlan` turns a list of source
//! paths into the ordered, de-duplicated `FileTask` list the executor runs.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{
    DEFAULT_BATCH_TIMEOUT, DEFAULT_BUFFER_SIZE, DEFAULT_CANCEL_GRACE, LOCKED_SUFFIX, MAX_BUFFER_SIZE,
    MIN_BUFFER_SIZE,
};
use crate::transform::FileTask;
use crate::types::BatchError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// One directory for every output; `None` writes next to each source.
    pub destination_dir: Option<PathBuf>,
    /// Upper bound on worker threads; `None` uses the available CPUs.
    pub workers: Option<usize>,
    /// Bounded wait for the whole batch.
    pub timeout: Duration,
    /// After a timeout, how long in-flight tasks get to observe cancellation.
    pub cancel_grace: Duration,
    pub buffer_size: usize,
    pub suffix: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            destination_dir: None,
            workers: None,
            timeout: DEFAULT_BATCH_TIMEOUT,
            cancel_grace: DEFAULT_CANCEL_GRACE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            suffix: LOCKED_SUFFIX.to_string(),
        }
    }
}

impl BatchConfig {
    pub fn with_destination(mut self, dir: impl Into<PathBuf>) -> Self {
        self.destination_dir = Some(dir.into());
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&self.buffer_size) {
            return Err(BatchError::Validation(format!(
                "buffer size {} outside {}..={}",
                self.buffer_size, MIN_BUFFER_SIZE, MAX_BUFFER_SIZE
            )));
        }
        validate_suffix(&self.suffix)?;
        if self.workers == Some(0) {
            return Err(BatchError::Validation("workers must be at least 1".into()));
        }
        if self.timeout.is_zero() {
            return Err(BatchError::Validation("timeout must be non-zero".into()));
        }
        Ok(())
    }

    /// Pool size for `task_count` tasks: `min(workers or CPUs, tasks)`, at least 1.
    pub fn pool_size(&self, task_count: usize) -> usize {
        let available = self.workers.unwrap_or_else(num_cpus::get);
        available.min(task_count).max(1)
    }
}

/// An encrypted-format suffix starts with '.' and names an extension.
pub fn validate_suffix(suffix: &str) -> Result<(), BatchError> {
    if suffix.len() < 2 || !suffix.starts_with('.') {
        return Err(BatchError::Validation(format!(
            "suffix {:?} must start with '.' and name an extension",
            suffix
        )));
    }
    Ok(())
}

/// Ordered source -> destination mapping for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    tasks: Vec<FileTask>,
    destination_dir: Option<PathBuf>,
}

impl BatchPlan {
    /// Resolve each source to its destination directory. Input order is
    /// kept; a repeated source keeps only its first occurrence.
    pub fn new<I, P>(sources: I, config: &BatchConfig) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut seen = HashSet::new();
        let mut tasks = Vec::new();
        for source in sources {
            let source = absolutize(source.as_ref());
            if !seen.insert(source.clone()) {
                debug!(source = %source.display(), "duplicate source skipped");
                continue;
            }
            let dest = match &config.destination_dir {
                Some(dir) => absolutize(dir),
                None => parent_dir(&source),
            };
            tasks.push(FileTask::new(source, dest));
        }
        Self { tasks, destination_dir: config.destination_dir.clone() }
    }

    pub fn from_tasks(tasks: Vec<FileTask>) -> Self {
        Self { tasks, destination_dir: None }
    }

    pub fn tasks(&self) -> &[FileTask] {
        &self.tasks
    }

    pub fn into_tasks(self) -> Vec<FileTask> {
        self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// At least one source, every source exists, no two tasks share an
    /// output, and the configured destination (if any) is an existing
    /// directory.
    pub fn validate(&self) -> Result<(), BatchError> {
        if self.tasks.is_empty() {
            return Err(BatchError::Validation("no source files given".into()));
        }
        self.check_destinations()?;
        if let Some(dir) = &self.destination_dir {
            if !dir.is_dir() {
                return Err(BatchError::Validation(format!(
                    "destination directory does not exist: {}",
                    dir.display()
                )));
            }
        }
        if let Some(missing) = self.tasks.iter().find(|t| !t.source.exists()) {
            return Err(BatchError::Validation(format!(
                "source file not found: {}",
                missing.source.display()
            )));
        }
        Ok(())
    }

    /// Two sources with the same file name resolved into one directory would
    /// write the same output for either operation.
    pub fn check_destinations(&self) -> Result<(), BatchError> {
        let mut claimed = HashMap::new();
        for task in &self.tasks {
            let Some(name) = task.source.file_name() else { continue };
            let key = (task.destination_dir.as_path(), name);
            if let Some(first) = claimed.insert(key, task.source.as_path()) {
                return Err(BatchError::Validation(format!(
                    "{} and {} would both write {}",
                    first.display(),
                    task.source.display(),
                    task.destination_dir.join(name).display()
                )));
            }
        }
        Ok(())
    }
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

fn parent_dir(source: &Path) -> PathBuf {
    match source.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
