//! envelope/types.rs
//! Envelope header struct, bounds, and errors.

use std::fmt;
use std::io;

use crate::constants::{MAX_IV_LEN, MAX_WRAPPED_KEY_LEN};

/// Decoded envelope header. Owns the IV and wrapped key bytes read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub iv: Vec<u8>,
    pub wrapped_key: Vec<u8>,
}

impl EnvelopeHeader {
    pub fn new(iv: Vec<u8>, wrapped_key: Vec<u8>) -> Self {
        Self { iv, wrapped_key }
    }

    /// Bytes this header occupies on disk.
    pub fn encoded_len(&self) -> usize {
        4 + self.iv.len() + 4 + self.wrapped_key.len()
    }

    pub fn validate(&self) -> Result<(), EnvelopeError> {
        check_iv_len(self.iv.len() as u64)?;
        check_wrapped_key_len(self.wrapped_key.len() as u64)?;
        Ok(())
    }
}

/// `0 < len <= MAX_IV_LEN`
#[inline]
pub fn check_iv_len(len: u64) -> Result<(), EnvelopeError> {
    if len == 0 || len > MAX_IV_LEN as u64 {
        return Err(EnvelopeError::InvalidIvLength { have: len, max: MAX_IV_LEN });
    }
    Ok(())
}

/// `0 < len <= MAX_WRAPPED_KEY_LEN`
#[inline]
pub fn check_wrapped_key_len(len: u64) -> Result<(), EnvelopeError> {
    if len == 0 || len > MAX_WRAPPED_KEY_LEN as u64 {
        return Err(EnvelopeError::InvalidWrappedKeyLength { have: len, max: MAX_WRAPPED_KEY_LEN });
    }
    Ok(())
}

/// Header field names, used to report where a stream ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeField {
    IvLength,
    Iv,
    WrappedKeyLength,
    WrappedKey,
}

impl fmt::Display for EnvelopeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EnvelopeField::IvLength => "iv length",
            EnvelopeField::Iv => "iv",
            EnvelopeField::WrappedKeyLength => "wrapped key length",
            EnvelopeField::WrappedKey => "wrapped key",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub enum EnvelopeError {
    /// IV length field is zero or above the accepted maximum.
    InvalidIvLength { have: u64, max: u32 },

    /// Wrapped key length field is zero or above the accepted maximum.
    InvalidWrappedKeyLength { have: u64, max: u32 },

    /// Stream ended inside a header field.
    Truncated { field: EnvelopeField },

    /// Underlying read/write failure.
    Io(io::Error),
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use EnvelopeError::*;
        match self {
            InvalidIvLength { have, max } =>
                write!(f, "invalid envelope: iv length {} outside 1..={}", have, max),
            InvalidWrappedKeyLength { have, max } =>
                write!(f, "invalid envelope: wrapped key length {} outside 1..={}", have, max),
            Truncated { field } =>
                write!(f, "invalid envelope: stream ended while reading {}", field),
            Io(e) =>
                write!(f, "envelope io error: {}", e),
        }
    }
}

impl std::error::Error for EnvelopeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EnvelopeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for EnvelopeError {
    fn from(e: io::Error) -> Self {
        EnvelopeError::Io(e)
    }
}
