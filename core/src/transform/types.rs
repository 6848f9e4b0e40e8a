//! transform/types.rs
//! Task, outcome, and the `FileTransform` seam used by the executor.

use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::executor::CancelToken;
use crate::telemetry::{FileCounters, StageTimes};
use crate::types::FileError;

/// Immutable pairing of one source file and its destination directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileTask {
    pub source: PathBuf,
    pub destination_dir: PathBuf,
}

impl FileTask {
    pub fn new(source: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>) -> Self {
        Self { source: source.into(), destination_dir: destination_dir.into() }
    }

    /// File name used in reports. Falls back to the full path when the
    /// source has no final component.
    pub fn source_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }

    /// Strict UTF-8 file name, required to derive an output name.
    pub fn file_name(&self) -> Result<&str, FileError> {
        self.source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| FileError::InvalidFileName { path: self.source.clone() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Encrypt,
    Decrypt,
}

impl Operation {
    /// "Encryption" / "Decryption", used as the report title.
    pub fn noun(&self) -> &'static str {
        match self {
            Operation::Encrypt => "Encryption",
            Operation::Decrypt => "Decryption",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            Operation::Encrypt => "encrypted",
            Operation::Decrypt => "decrypted",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Encrypt => "encrypt",
            Operation::Decrypt => "decrypt",
        })
    }
}

/// Successful outcome of one task. Telemetry rides along and is merged by
/// the executor; the public report only keeps names and size.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub source_name: String,
    pub output_path: PathBuf,
    pub output_size: u64,
    pub stage_times: StageTimes,
    pub counters: FileCounters,
}

impl FileOutcome {
    pub fn new(source_name: impl Into<String>, output_path: impl Into<PathBuf>, output_size: u64) -> Self {
        Self {
            source_name: source_name.into(),
            output_path: output_path.into(),
            output_size,
            stage_times: StageTimes::default(),
            counters: FileCounters { bytes_out: output_size, ..FileCounters::default() },
        }
    }

    pub fn output_name(&self) -> String {
        self.output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.output_path.display().to_string())
    }
}

/// Transform applied by the executor to each task.
///
/// Implementations must be shareable across worker threads. Errors are
/// per-file; the executor folds them into failure results.
pub trait FileTransform: Send + Sync {
    fn apply(&self, task: &FileTask, cancel: &CancelToken) -> Result<FileOutcome, FileError>;
}

impl<F> FileTransform for F
where
    F: Fn(&FileTask, &CancelToken) -> Result<FileOutcome, FileError> + Send + Sync,
{
    fn apply(&self, task: &FileTask, cancel: &CancelToken) -> Result<FileOutcome, FileError> {
        self(task, cancel)
    }
}

/// Hidden scratch file next to `output_path`. Dropped without
/// [`commit_output`] it is removed, so a failed or cancelled task never
/// touches a file already sitting at the destination.
pub(crate) fn stage_output(output_path: &Path) -> Result<NamedTempFile, FileError> {
    let dir = output_path.parent().unwrap_or_else(|| Path::new("."));
    let name = output_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    let staged = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".partial")
        .tempfile_in(dir)?;
    debug!(staged = %staged.path().display(), "staging output");
    Ok(staged)
}

/// Sync the staged file and rename it over `output_path`.
pub(crate) fn commit_output(staged: NamedTempFile, output_path: &Path) -> Result<File, FileError> {
    staged.as_file().sync_all()?;
    let file = staged.persist(output_path).map_err(|e| e.error)?;
    Ok(file)
}

/// Copy `source` into `sink` through one fixed-size buffer, polling `cancel`
/// before every read. Returns the number of bytes moved.
pub(crate) fn pump<R: Read, W: Write>(
    source: &mut R,
    sink: &mut W,
    buffer_size: usize,
    cancel: &CancelToken,
) -> Result<u64, FileError> {
    let mut buf = vec![0u8; buffer_size];
    let mut total = 0u64;
    loop {
        if cancel.is_cancelled() {
            return Err(FileError::Cancelled);
        }
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        sink.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok(total)
}
