use std::fmt;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{IV_LEN, SYMMETRIC_KEY_LEN};

/// Per-file AES-256 key. Lives only in memory; only its wrapped form is
/// ever written to disk. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; SYMMETRIC_KEY_LEN],
}

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; SYMMETRIC_KEY_LEN]) -> Self {
        Self { bytes }
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self, CipherError> {
        let bytes: [u8; SYMMETRIC_KEY_LEN] = raw.try_into().map_err(|_| CipherError::InvalidKeyLen {
            expected: SYMMETRIC_KEY_LEN,
            actual: raw.len(),
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// CBC initialization vector. Not secret; stored in clear in the envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InitializationVector {
    bytes: [u8; IV_LEN],
}

impl InitializationVector {
    pub fn from_bytes(bytes: [u8; IV_LEN]) -> Self {
        Self { bytes }
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self, CipherError> {
        let bytes: [u8; IV_LEN] = raw.try_into().map_err(|_| CipherError::InvalidIvLen {
            expected: IV_LEN,
            actual: raw.len(),
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; IV_LEN] {
        &self.bytes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    /// OS random source unavailable. Fatal for the file, never retried.
    #[error("secure random source unavailable: {0}")]
    RandomUnavailable(String),

    /// Public key rejected the key material (malformed key or too small a modulus).
    #[error("key wrap failed: {0}")]
    KeyWrap(String),

    /// Padding/format mismatch on unwrap: wrong keypair or corrupted file.
    #[error("key unwrap failed (wrong key or corrupted file): {0}")]
    KeyUnwrap(String),

    #[error("invalid key length: expected={expected}, actual={actual}")]
    InvalidKeyLen { expected: usize, actual: usize },

    #[error("invalid IV length: expected={expected}, actual={actual}")]
    InvalidIvLen { expected: usize, actual: usize },

    /// Final block does not carry valid PKCS#7 padding.
    #[error("invalid PKCS#7 padding in final block")]
    InvalidPadding,

    /// Ciphertext body is empty or not a whole number of blocks.
    #[error("truncated ciphertext: {0}")]
    TruncatedCiphertext(String),
}
