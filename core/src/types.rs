use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::{crypto::CipherError, envelope::EnvelopeError, keystore::KeyStoreError};

/// Per-file error. Never crosses the executor boundary: every variant is
/// folded into a failure `FileResult` for the file that raised it.
#[derive(Debug, Error)]
pub enum FileError {
    /// I/O failure on this file's source or destination.
    #[error("I/O error: {0}")]
    Io(io::Error),

    /// Key generation, wrap/unwrap, or stream cipher failure.
    #[error("{0}")]
    Cipher(#[from] CipherError),

    /// Malformed or truncated envelope header.
    #[error("{0}")]
    Envelope(#[from] EnvelopeError),

    /// Decrypt input does not carry the encrypted-format suffix.
    #[error("file must have {suffix} extension: {file_name}")]
    SuffixMismatch { file_name: String, suffix: String },

    /// The derived output path is the source itself.
    #[error("output would overwrite its own source: {}", path.display())]
    OutputIsSource { path: PathBuf },

    /// Source path has no usable UTF-8 file name component.
    #[error("invalid file name: {}", path.display())]
    InvalidFileName { path: PathBuf },

    /// Batch was cancelled (timeout or interrupt) before this file finished.
    #[error("cancelled before completion")]
    Cancelled,

    /// The transform panicked; the payload message is preserved.
    #[error("task panicked: {0}")]
    Panicked(String),
}

impl From<io::Error> for FileError {
    fn from(e: io::Error) -> Self {
        // Stream cipher failures surface through io::Read/io::Write as
        // InvalidData errors carrying a CipherError; report them as such.
        let cipher = e
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<CipherError>())
            .cloned();
        match cipher {
            Some(c) => FileError::Cipher(c),
            None => FileError::Io(e),
        }
    }
}

/// Batch-level error: the whole batch fails, no partial result is returned.
#[derive(Debug, Error)]
pub enum BatchError {
    /// Key material missing or unusable; the batch cannot start.
    #[error("key store error: {0}")]
    KeyStore(#[from] KeyStoreError),

    /// The orchestrating caller was interrupted while waiting on the pool.
    #[error("execution was interrupted")]
    Interrupted,

    /// Invalid batch configuration or plan.
    #[error("validation error: {0}")]
    Validation(String),

    /// The worker pool could not be started.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(io::Error),
}
