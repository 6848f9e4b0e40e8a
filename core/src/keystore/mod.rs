//! keystore/mod.rs
//! Key-store collaborator: resolves an alias to RSA key halves.
//!
//! Notes:
//! - Every failure here is fatal for the batch; it is raised before any
//!   file task is submitted.
//! - Key generation is not performed by the engine. A store can hold keys
//!   generated elsewhere (`insert`).

pub mod pem;
pub mod memory;

pub use pem::*;
pub use memory::*;

use std::io;
use std::path::PathBuf;

use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("no key material for alias '{alias}'")]
    NotFound { alias: String },

    #[error("cannot access key file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unusable key for alias '{alias}': {reason}")]
    Parse { alias: String, reason: String },
}

pub trait KeyStore: Send + Sync {
    /// Public half, used to wrap per-file keys.
    fn public_key(&self, alias: &str) -> Result<RsaPublicKey, KeyStoreError>;

    /// Private half, used to unwrap per-file keys.
    fn private_key(&self, alias: &str) -> Result<RsaPrivateKey, KeyStoreError>;

    /// Whether a usable keypair exists for `alias`.
    fn contains(&self, alias: &str) -> bool;
}
