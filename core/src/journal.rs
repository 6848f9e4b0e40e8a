//! Structured batch-event journal.
//!
//! `BatchJournal` appends one JSON object per line from a background thread.
//! After `rotation_limit` lines the file is renamed to
//! `<path>.<UTC timestamp>.<seq>` and compressed to `.zst` on a helper
//! thread; the live journal starts fresh at `<path>`.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{unbounded, Sender};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::JOURNAL_ZSTD_LEVEL;
use crate::transform::Operation;

/// One structured event emitted while a batch runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BatchEvent {
    BatchStarted {
        operation: Operation,
        total_files: usize,
        pool_size: usize,
    },
    FileSucceeded {
        operation: Operation,
        source: String,
        output: String,
        output_size: u64,
        elapsed_ms: u64,
    },
    FileFailed {
        operation: Operation,
        source: String,
        error: String,
        elapsed_ms: u64,
    },
    BatchTimedOut {
        pending: usize,
    },
    BatchFinished {
        operation: Operation,
        succeeded: usize,
        failed: usize,
        elapsed_ms: u64,
    },
}

/// Receiver of batch events. Called from worker threads.
pub trait EventSink: Send + Sync {
    fn record(&self, event: BatchEvent);
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<BatchEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BatchEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: BatchEvent) {
        match self.events.lock() {
            Ok(mut guard) => guard.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct JournalLine {
    ts: String,
    #[serde(flatten)]
    event: BatchEvent,
}

enum JournalCommand {
    Append(BatchEvent),
    Rotate,
    Flush(Sender<()>),
}

/// Background JSON-lines journal. Dropping it drains pending events, waits
/// for archive compression, and closes the file.
pub struct BatchJournal {
    tx: Option<Sender<JournalCommand>>,
    worker: Option<JoinHandle<()>>,
    path: PathBuf,
}

impl BatchJournal {
    /// Open (append) the journal at `path` and start the writer thread.
    pub fn open(path: impl AsRef<Path>, rotation_limit: usize) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let (tx, rx) = unbounded::<JournalCommand>();
        let thread_path = path.clone();
        let rotation_limit = rotation_limit.max(1);

        let worker = thread::Builder::new()
            .name("envelock-journal".into())
            .spawn(move || {
                let mut writer = Some(BufWriter::new(file));
                let mut count = 0usize;
                let mut seq = 0u64;
                let mut archivers: Vec<JoinHandle<()>> = Vec::new();

                for cmd in rx.iter() {
                    match cmd {
                        JournalCommand::Append(event) => {
                            let Some(w) = writer.as_mut() else { continue };
                            if let Err(e) = write_line(w, event) {
                                warn!(error = %e, "journal write failed");
                                continue;
                            }
                            count += 1;
                            if count >= rotation_limit {
                                count = 0;
                                seq += 1;
                                writer = rotate(writer, &thread_path, seq, &mut archivers);
                            }
                        }
                        JournalCommand::Rotate => {
                            count = 0;
                            seq += 1;
                            writer = rotate(writer, &thread_path, seq, &mut archivers);
                        }
                        JournalCommand::Flush(ack) => {
                            if let Some(w) = writer.as_mut() {
                                let _ = w.flush();
                            }
                            let _ = ack.send(());
                        }
                    }
                }
                if let Some(mut w) = writer {
                    let _ = w.flush();
                }
                for handle in archivers {
                    let _ = handle.join();
                }
            })?;

        Ok(Self { tx: Some(tx), worker: Some(worker), path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Non-blocking append.
    pub fn append(&self, event: BatchEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(JournalCommand::Append(event)).is_err() {
                warn!("journal writer thread is gone; event dropped");
            }
        }
    }

    /// Force a rotation regardless of the line count.
    pub fn rotate(&self) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(JournalCommand::Rotate);
        }
    }

    /// Block until every event sent so far is on disk.
    pub fn flush(&self) {
        if let Some(tx) = &self.tx {
            let (ack_tx, ack_rx) = unbounded();
            if tx.send(JournalCommand::Flush(ack_tx)).is_ok() {
                let _ = ack_rx.recv();
            }
        }
    }

    /// Stream raw journal lines (for replay tooling).
    pub fn stream_log(path: impl AsRef<Path>) -> io::Result<impl Iterator<Item = io::Result<String>>> {
        let file = File::open(path)?;
        Ok(BufReader::new(file).lines())
    }

    /// Parse every event in a journal file, skipping blank lines.
    pub fn read_events(path: impl AsRef<Path>) -> io::Result<Vec<BatchEvent>> {
        let mut out = Vec::new();
        for line in Self::stream_log(path)? {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let parsed: JournalLine = serde_json::from_str(&line)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            out.push(parsed.event);
        }
        Ok(out)
    }
}

impl EventSink for BatchJournal {
    fn record(&self, event: BatchEvent) {
        self.append(event);
    }
}

impl Drop for BatchJournal {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn write_line(writer: &mut BufWriter<File>, event: BatchEvent) -> io::Result<()> {
    let line = JournalLine { ts: chrono::Utc::now().to_rfc3339(), event };
    serde_json::to_writer(&mut *writer, &line).map_err(io::Error::from)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

fn rotate(
    writer: Option<BufWriter<File>>,
    path: &Path,
    seq: u64,
    archivers: &mut Vec<JoinHandle<()>>,
) -> Option<BufWriter<File>> {
    if let Some(mut w) = writer {
        let _ = w.flush();
    }

    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%S");
    let archived = PathBuf::from(format!("{}.{}.{}", path.display(), timestamp, seq));
    match fs::rename(path, &archived) {
        Ok(()) => {
            debug!(archive = %archived.display(), "journal rotated");
            if let Ok(handle) = thread::Builder::new()
                .name("envelock-journal-zstd".into())
                .spawn(move || compress_archive(&archived))
            {
                archivers.push(handle);
            }
        }
        Err(e) => warn!(error = %e, "journal rotation failed"),
    }

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(f) => Some(BufWriter::new(f)),
        Err(e) => {
            warn!(error = %e, "journal reopen failed; further events are discarded");
            None
        }
    }
}

fn compress_archive(src: &Path) {
    let dest = PathBuf::from(format!("{}.zst", src.display()));
    let result = File::open(src).and_then(|s| {
        let d = File::create(&dest)?;
        zstd::stream::copy_encode(s, d, JOURNAL_ZSTD_LEVEL)
    });
    match result {
        Ok(()) => {
            let _ = fs::remove_file(src);
        }
        Err(e) => warn!(archive = %src.display(), error = %e, "journal archive compression failed"),
    }
}
