//! envelope/encode.rs
//!
//! Design notes:
//! - Bounds are validated before the first byte is written, so a rejected
//!   header never leaves a half-written prefix in the sink.

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use tracing::debug;

use crate::envelope::types::{check_iv_len, check_wrapped_key_len, EnvelopeError};

/// Write `[iv_len][iv][wrapped_len][wrapped_key]` to `sink`.
pub fn write_header<W: Write>(sink: &mut W, iv: &[u8], wrapped_key: &[u8]) -> Result<(), EnvelopeError> {
    check_iv_len(iv.len() as u64)?;
    check_wrapped_key_len(wrapped_key.len() as u64)?;

    sink.write_u32::<BigEndian>(iv.len() as u32)?;
    sink.write_all(iv)?;
    sink.write_u32::<BigEndian>(wrapped_key.len() as u32)?;
    sink.write_all(wrapped_key)?;

    debug!(iv_len = iv.len(), wrapped_len = wrapped_key.len(), "envelope header written");
    Ok(())
}

/// Encode a header into a fresh buffer.
pub fn encode_header(iv: &[u8], wrapped_key: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let mut out = Vec::with_capacity(8 + iv.len() + wrapped_key.len());
    write_header(&mut out, iv, wrapped_key)?;
    Ok(out)
}
