//! envelope/decode.rs
//!
//! Design notes:
//! - Reads exactly the header bytes and leaves `source` positioned at the
//!   first ciphertext byte.
//! - Each length is validated before its buffer is allocated; the largest
//!   allocation an adversarial header can cause is `MAX_WRAPPED_KEY_LEN`.
//! - End of stream inside any field is `Truncated { field }`.

use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt};
use tracing::debug;

use crate::envelope::types::{
    check_iv_len, check_wrapped_key_len, EnvelopeError, EnvelopeField, EnvelopeHeader,
};

fn eof_as(field: EnvelopeField) -> impl Fn(io::Error) -> EnvelopeError {
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            EnvelopeError::Truncated { field }
        } else {
            EnvelopeError::Io(e)
        }
    }
}

/// Read and validate an envelope header from `source`.
pub fn read_header<R: Read>(source: &mut R) -> Result<EnvelopeHeader, EnvelopeError> {
    let iv_len = source
        .read_u32::<BigEndian>()
        .map_err(eof_as(EnvelopeField::IvLength))?;
    check_iv_len(iv_len as u64)?;
    let mut iv = vec![0u8; iv_len as usize];
    source.read_exact(&mut iv).map_err(eof_as(EnvelopeField::Iv))?;

    let wrapped_len = source
        .read_u32::<BigEndian>()
        .map_err(eof_as(EnvelopeField::WrappedKeyLength))?;
    check_wrapped_key_len(wrapped_len as u64)?;
    let mut wrapped_key = vec![0u8; wrapped_len as usize];
    source
        .read_exact(&mut wrapped_key)
        .map_err(eof_as(EnvelopeField::WrappedKey))?;

    debug!(iv_len, wrapped_len, "envelope header read");
    Ok(EnvelopeHeader { iv, wrapped_key })
}

/// Decode a header from the front of `buf`, returning it with the number of
/// bytes consumed.
pub fn decode_header(buf: &[u8]) -> Result<(EnvelopeHeader, usize), EnvelopeError> {
    let mut cursor = io::Cursor::new(buf);
    let header = read_header(&mut cursor)?;
    Ok((header, cursor.position() as usize))
}
