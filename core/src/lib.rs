//! envelock-core
//!
//! Hybrid file encryption engine: per-file AES-256-CBC keys wrapped with RSA,
//! applied across many files by a bounded worker pool.
//! No Python, no PyO3, no FFI.

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;
pub mod utils;

// Engine layers, leaves first
pub mod crypto;
pub mod envelope;
pub mod transform;
pub mod executor;
pub mod result;

// Collaborators and observability
pub mod config;
pub mod keystore;
pub mod telemetry;
pub mod journal;

mod batch;
pub use batch::{decrypt_files, encrypt_files};

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::config::{BatchConfig, BatchPlan};
    pub use crate::executor::{execute_in_parallel, CancelToken, ExecutionContext, InterruptHandle};
    pub use crate::journal::{BatchEvent, BatchJournal, EventSink};
    pub use crate::keystore::{KeyStore, KeyStoreError, MemoryKeyStore, PemKeyStore};
    pub use crate::result::{ExecutionResult, FileResult};
    pub use crate::transform::{Decryptor, Encryptor, FileOutcome, FileTask, FileTransform, Logged, Operation};
    pub use crate::types::{BatchError, FileError};
    pub use crate::{decrypt_files, encrypt_files};
}
