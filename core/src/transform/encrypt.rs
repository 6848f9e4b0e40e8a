//! transform/encrypt.rs
//!
//! Encrypt one file: `<dest>/<name><suffix>` = envelope header + AES-CBC body.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

use rsa::RsaPublicKey;
use tracing::debug;

use crate::config::{validate_suffix, BatchConfig};
use crate::constants::{DEFAULT_BUFFER_SIZE, LOCKED_SUFFIX};
use crate::crypto::{generate_iv, generate_symmetric_key, key_fingerprint, open_encrypt_stream, wrap_key};
use crate::envelope::write_header;
use crate::executor::CancelToken;
use crate::telemetry::{FileCounters, Stage, StageTimes};
use crate::transform::types::{commit_output, pump, stage_output, FileOutcome, FileTask, FileTransform};
use crate::types::{BatchError, FileError};

/// Encrypting transform bound to one recipient public key.
#[derive(Debug, Clone)]
pub struct Encryptor {
    public_key: RsaPublicKey,
    buffer_size: usize,
    suffix: String,
}

impl Encryptor {
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self { public_key, buffer_size: DEFAULT_BUFFER_SIZE, suffix: LOCKED_SUFFIX.to_string() }
    }

    pub fn from_config(public_key: RsaPublicKey, config: &BatchConfig) -> Self {
        Self { public_key, buffer_size: config.buffer_size, suffix: config.suffix.clone() }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Rejects a suffix that would not change the file name.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Result<Self, BatchError> {
        let suffix = suffix.into();
        validate_suffix(&suffix)?;
        self.suffix = suffix;
        Ok(self)
    }

    pub fn fingerprint(&self) -> String {
        key_fingerprint(&self.public_key)
    }

    /// `<dest>/<name><suffix>` for `task`.
    pub fn output_path(&self, task: &FileTask) -> Result<PathBuf, FileError> {
        let name = task.file_name()?;
        let output_path = task.destination_dir.join(format!("{}{}", name, self.suffix));
        if output_path == task.source {
            return Err(FileError::OutputIsSource { path: output_path });
        }
        Ok(output_path)
    }

    /// Encrypt `task.source` into `task.destination_dir`.
    pub fn encrypt_file(&self, task: &FileTask, cancel: &CancelToken) -> Result<FileOutcome, FileError> {
        let output_path = self.output_path(task)?;
        let source = File::open(&task.source)?;
        self.encrypt_into(source, task, output_path, cancel)
    }

    /// Encrypt bytes read from `source`, named and placed as `task` says.
    pub fn encrypt_reader<R: Read>(
        &self,
        source: R,
        task: &FileTask,
        cancel: &CancelToken,
    ) -> Result<FileOutcome, FileError> {
        let output_path = self.output_path(task)?;
        self.encrypt_into(source, task, output_path, cancel)
    }

    fn encrypt_into<R: Read>(
        &self,
        source: R,
        task: &FileTask,
        output_path: PathBuf,
        cancel: &CancelToken,
    ) -> Result<FileOutcome, FileError> {
        if cancel.is_cancelled() {
            return Err(FileError::Cancelled);
        }
        let name = task.file_name()?;
        let mut times = StageTimes::default();
        let mut counters = FileCounters::default();

        let key = times.time(Stage::Keygen, generate_symmetric_key)?;
        let iv = times.time(Stage::Keygen, generate_iv)?;
        let wrapped = times.time(Stage::Wrap, || wrap_key(&key, &self.public_key))?;

        let mut source = BufReader::with_capacity(self.buffer_size, source);

        let staged = stage_output(&output_path)?;
        let mut sink = BufWriter::with_capacity(self.buffer_size, staged);

        let t = Instant::now();
        write_header(&mut sink, iv.as_bytes(), &wrapped)?;
        times.add(Stage::Header, t.elapsed());
        counters.add_header(4 + iv.as_bytes().len() + 4 + wrapped.len());

        let t = Instant::now();
        let mut writer = open_encrypt_stream(sink, &key, iv.as_bytes())?;
        let moved = pump(&mut source, &mut writer, self.buffer_size, cancel)?;
        let mut sink = writer.finish()?;
        sink.flush()?;
        let staged = sink.into_inner().map_err(|e| e.into_error())?;
        let file = commit_output(staged, &output_path)?;
        times.add(Stage::Cipher, t.elapsed());
        counters.add_transfer(moved as usize);

        let output_size = file.metadata()?.len();
        counters.bytes_out = output_size;

        debug!(source = %task.source.display(), output = %output_path.display(), output_size, "file encrypted");
        Ok(FileOutcome {
            source_name: name.to_string(),
            output_path,
            output_size,
            stage_times: times,
            counters,
        })
    }
}

impl FileTransform for Encryptor {
    fn apply(&self, task: &FileTask, cancel: &CancelToken) -> Result<FileOutcome, FileError> {
        self.encrypt_file(task, cancel)
    }
}
