//! AES-256-CBC streaming wrappers over `io::Write` / `io::Read`.
//!
//! Design notes:
//! - Blocks are enciphered as soon as they are complete; at most one
//!   partial block (writer) or one held-back block (reader) is buffered.
//! - PKCS#7 padding: the writer always emits a final padding block on
//!   `finish()`, so ciphertext length is a positive multiple of 16.
//! - The reader holds back the last deciphered block until EOF, then
//!   validates and strips the padding.
//! - Cipher failures surface as `io::ErrorKind::InvalidData` wrapping a
//!   `CipherError`, so callers can recover the typed error.

use std::io::{self, Read, Write};

use aes::Aes256;
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::constants::{CIPHER_BLOCK_LEN, DEFAULT_BUFFER_SIZE, IV_LEN, SYMMETRIC_KEY_LEN};
use crate::crypto::types::{CipherError, SymmetricKey};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

fn invalid_data(e: CipherError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e)
}

fn check_iv(iv: &[u8]) -> Result<(), CipherError> {
    if iv.len() != IV_LEN {
        return Err(CipherError::InvalidIvLen { expected: IV_LEN, actual: iv.len() });
    }
    Ok(())
}

/// Wrap `sink` so that every write is enciphered.
pub fn open_encrypt_stream<W: Write>(
    sink: W,
    key: &SymmetricKey,
    iv: &[u8],
) -> Result<CipherWriter<W>, CipherError> {
    check_iv(iv)?;
    let enc = Aes256CbcEnc::new_from_slices(key.as_bytes(), iv).map_err(|_| CipherError::InvalidKeyLen {
        expected: SYMMETRIC_KEY_LEN,
        actual: key.as_bytes().len(),
    })?;
    Ok(CipherWriter {
        inner: sink,
        enc,
        pending: [0u8; CIPHER_BLOCK_LEN],
        pending_len: 0,
        scratch: Vec::with_capacity(DEFAULT_BUFFER_SIZE + CIPHER_BLOCK_LEN),
    })
}

/// Wrap `source` so that every read is deciphered.
pub fn open_decrypt_stream<R: Read>(
    source: R,
    key: &SymmetricKey,
    iv: &[u8],
) -> Result<CipherReader<R>, CipherError> {
    check_iv(iv)?;
    let dec = Aes256CbcDec::new_from_slices(key.as_bytes(), iv).map_err(|_| CipherError::InvalidKeyLen {
        expected: SYMMETRIC_KEY_LEN,
        actual: key.as_bytes().len(),
    })?;
    Ok(CipherReader {
        inner: source,
        dec,
        raw: Vec::with_capacity(DEFAULT_BUFFER_SIZE + CIPHER_BLOCK_LEN),
        held: None,
        out: Vec::with_capacity(DEFAULT_BUFFER_SIZE + CIPHER_BLOCK_LEN),
        out_pos: 0,
        done: false,
    })
}

/// Enciphering writer. Call [`CipherWriter::finish`] to emit the padding block;
/// dropping the writer without finishing leaves an unreadable ciphertext.
pub struct CipherWriter<W: Write> {
    inner: W,
    enc: Aes256CbcEnc,
    pending: [u8; CIPHER_BLOCK_LEN],
    pending_len: usize,
    scratch: Vec<u8>,
}

impl<W: Write> CipherWriter<W> {
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Pad and encipher the final block, flush, and hand back the sink.
    pub fn finish(mut self) -> io::Result<W> {
        let pad = (CIPHER_BLOCK_LEN - self.pending_len) as u8; // 1..=16
        for b in &mut self.pending[self.pending_len..] {
            *b = pad;
        }
        let mut last = self.pending;
        self.enc.encrypt_block_mut(GenericArray::from_mut_slice(&mut last));
        self.inner.write_all(&last)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for CipherWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut input = data;
        self.scratch.clear();

        // Complete a previously started block first.
        if self.pending_len > 0 {
            let take = (CIPHER_BLOCK_LEN - self.pending_len).min(input.len());
            self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&input[..take]);
            self.pending_len += take;
            input = &input[take..];
            if self.pending_len == CIPHER_BLOCK_LEN {
                self.scratch.extend_from_slice(&self.pending);
                self.pending_len = 0;
            }
        }

        let whole = input.len() / CIPHER_BLOCK_LEN * CIPHER_BLOCK_LEN;
        self.scratch.extend_from_slice(&input[..whole]);

        let rest = &input[whole..];
        if !rest.is_empty() {
            self.pending[..rest.len()].copy_from_slice(rest);
            self.pending_len = rest.len();
        }

        for block in self.scratch.chunks_exact_mut(CIPHER_BLOCK_LEN) {
            self.enc.encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
        self.inner.write_all(&self.scratch)?;
        Ok(data.len())
    }

    /// Flushes the sink only; the padding block is written by `finish()`.
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Deciphering reader.
pub struct CipherReader<R: Read> {
    inner: R,
    dec: Aes256CbcDec,
    raw: Vec<u8>,
    held: Option<[u8; CIPHER_BLOCK_LEN]>,
    out: Vec<u8>,
    out_pos: usize,
    done: bool,
}

impl<R: Read> CipherReader<R> {
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn refill(&mut self) -> io::Result<()> {
        self.out.clear();
        self.out_pos = 0;

        while self.out.is_empty() && !self.done {
            let start = self.raw.len();
            self.raw.resize(start + DEFAULT_BUFFER_SIZE, 0);
            let n = loop {
                match self.inner.read(&mut self.raw[start..]) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        self.raw.truncate(start);
                        return Err(e);
                    }
                }
            };
            self.raw.truncate(start + n);

            if n == 0 {
                return self.finish_stream();
            }

            let whole = self.raw.len() / CIPHER_BLOCK_LEN * CIPHER_BLOCK_LEN;
            if whole == 0 {
                continue;
            }

            let mut blocks: Vec<u8> = self.raw.drain(..whole).collect();
            for block in blocks.chunks_exact_mut(CIPHER_BLOCK_LEN) {
                self.dec.decrypt_block_mut(GenericArray::from_mut_slice(block));
            }

            if let Some(prev) = self.held.take() {
                self.out.extend_from_slice(&prev);
            }
            let (body, last) = blocks.split_at(whole - CIPHER_BLOCK_LEN);
            self.out.extend_from_slice(body);
            let mut tail = [0u8; CIPHER_BLOCK_LEN];
            tail.copy_from_slice(last);
            self.held = Some(tail);
        }
        Ok(())
    }

    fn finish_stream(&mut self) -> io::Result<()> {
        self.done = true;
        if !self.raw.is_empty() {
            return Err(invalid_data(CipherError::TruncatedCiphertext(format!(
                "{} trailing bytes do not form a whole block",
                self.raw.len()
            ))));
        }
        let last = self.held.take().ok_or_else(|| {
            invalid_data(CipherError::TruncatedCiphertext("missing final padding block".into()))
        })?;

        let pad = last[CIPHER_BLOCK_LEN - 1] as usize;
        if pad == 0 || pad > CIPHER_BLOCK_LEN || last[CIPHER_BLOCK_LEN - pad..].iter().any(|&b| b as usize != pad) {
            return Err(invalid_data(CipherError::InvalidPadding));
        }
        self.out.extend_from_slice(&last[..CIPHER_BLOCK_LEN - pad]);
        Ok(())
    }
}

impl<R: Read> Read for CipherReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.out_pos >= self.out.len() {
            if self.done {
                return Ok(0);
            }
            self.refill()?;
        }
        let available = &self.out[self.out_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.out_pos += n;
        Ok(n)
    }
}
