//! transform/decrypt.rs
//!
//! Decrypt one `<name><suffix>` file back to `<dest>/<name>`.
//! Output is staged beside the destination once the envelope parsed and the
//! key unwrapped, and only renamed into place after the whole body deciphered.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::time::Instant;

use rsa::RsaPrivateKey;
use tracing::debug;

use crate::config::{validate_suffix, BatchConfig};
use crate::constants::{DEFAULT_BUFFER_SIZE, LOCKED_SUFFIX};
use crate::crypto::{open_decrypt_stream, unwrap_key, InitializationVector};
use crate::envelope::read_header;
use crate::executor::CancelToken;
use crate::telemetry::{FileCounters, Stage, StageTimes};
use crate::transform::types::{commit_output, pump, stage_output, FileOutcome, FileTask, FileTransform};
use crate::types::{BatchError, FileError};

/// Decrypting transform bound to one private key.
#[derive(Clone)]
pub struct Decryptor {
    private_key: RsaPrivateKey,
    buffer_size: usize,
    suffix: String,
}

impl Decryptor {
    pub fn new(private_key: RsaPrivateKey) -> Self {
        Self { private_key, buffer_size: DEFAULT_BUFFER_SIZE, suffix: LOCKED_SUFFIX.to_string() }
    }

    pub fn from_config(private_key: RsaPrivateKey, config: &BatchConfig) -> Self {
        Self { private_key, buffer_size: config.buffer_size, suffix: config.suffix.clone() }
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

    /// Output file name for an encrypted name, or `SuffixMismatch`.
    pub fn output_name<'a>(&self, name: &'a str) -> Result<&'a str, FileError> {
        match name.strip_suffix(self.suffix.as_str()) {
            Some(stem) if !stem.is_empty() => Ok(stem),
            _ => Err(FileError::SuffixMismatch { file_name: name.to_string(), suffix: self.suffix.clone() }),
        }
    }

    /// `<dest>/<stem>` for `task`, or `SuffixMismatch`.
    pub fn output_path(&self, task: &FileTask) -> Result<PathBuf, FileError> {
        let stem = self.output_name(task.file_name()?)?;
        let output_path = task.destination_dir.join(stem);
        if output_path == task.source {
            return Err(FileError::OutputIsSource { path: output_path });
        }
        Ok(output_path)
    }

    pub fn decrypt_file(&self, task: &FileTask, cancel: &CancelToken) -> Result<FileOutcome, FileError> {
        let output_path = self.output_path(task)?;
        let source = File::open(&task.source)?;
        self.decrypt_into(source, task, output_path, cancel)
    }

    /// Decrypt an envelope read from `source`, named and placed as `task` says.
    pub fn decrypt_reader<R: Read>(
        &self,
        source: R,
        task: &FileTask,
        cancel: &CancelToken,
    ) -> Result<FileOutcome, FileError> {
        let output_path = self.output_path(task)?;
        self.decrypt_into(source, task, output_path, cancel)
    }

    fn decrypt_into<R: Read>(
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

        let mut source = BufReader::with_capacity(self.buffer_size, source);

        let t = Instant::now();
        let header = read_header(&mut source)?;
        times.add(Stage::Header, t.elapsed());
        counters.add_header(header.encoded_len());

        let iv = InitializationVector::from_slice(&header.iv)?;
        let key = times.time(Stage::Unwrap, || unwrap_key(&header.wrapped_key, &self.private_key))?;

        let t = Instant::now();
        let mut reader = open_decrypt_stream(source, &key, iv.as_bytes())?;

        let staged = stage_output(&output_path)?;
        let mut sink = BufWriter::with_capacity(self.buffer_size, staged);

        let moved = pump(&mut reader, &mut sink, self.buffer_size, cancel)?;
        sink.flush()?;
        let staged = sink.into_inner().map_err(|e| e.into_error())?;
        let file = commit_output(staged, &output_path)?;
        times.add(Stage::Cipher, t.elapsed());
        counters.add_transfer(moved as usize);

        let output_size = file.metadata()?.len();
        counters.bytes_out = output_size;

        debug!(source = %task.source.display(), output = %output_path.display(), output_size, "file decrypted");
        Ok(FileOutcome {
            source_name: name.to_string(),
            output_path,
            output_size,
            stage_times: times,
            counters,
        })
    }
}

impl FileTransform for Decryptor {
    fn apply(&self, task: &FileTask, cancel: &CancelToken) -> Result<FileOutcome, FileError> {
        self.decrypt_file(task, cancel)
    }
}
