//! RSA key wrapping for the per-file symmetric key.
//!
//! Design notes:
//! - PKCS#1 v1.5 encryption padding; output is randomized by the padding,
//!   so wrapping the same key twice yields different bytes.
//! - Only the 32-byte AES key is ever wrapped, well below the block
//!   capacity of a 2048-bit modulus. A wrap failure means misconfiguration.
//! - Unwrap failure is the primary signal of a wrong keypair or a corrupted
//!   file, and is reported per file.

use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use tracing::debug;
use zeroize::Zeroize;

use crate::constants::SYMMETRIC_KEY_LEN;
use crate::crypto::types::{CipherError, SymmetricKey};

/// Encrypt the raw key bytes under the recipient's public key.
pub fn wrap_key(key: &SymmetricKey, public_key: &RsaPublicKey) -> Result<Vec<u8>, CipherError> {
    debug!(modulus_bits = public_key.size() * 8, "wrapping symmetric key");
    public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, key.as_bytes())
        .map_err(|e| CipherError::KeyWrap(e.to_string()))
}

/// Inverse of [`wrap_key`]. The recovered key must be exactly 32 bytes.
pub fn unwrap_key(wrapped: &[u8], private_key: &RsaPrivateKey) -> Result<SymmetricKey, CipherError> {
    debug!(wrapped_len = wrapped.len(), "unwrapping symmetric key");
    let mut raw = private_key
        .decrypt(Pkcs1v15Encrypt, wrapped)
        .map_err(|e| CipherError::KeyUnwrap(e.to_string()))?;

    let key = SymmetricKey::from_slice(&raw).map_err(|_| {
        CipherError::KeyUnwrap(format!(
            "unwrapped key has {} bytes, expected {}",
            raw.len(),
            SYMMETRIC_KEY_LEN
        ))
    });
    raw.zeroize();
    key
}

/// Short, stable identifier for a public key: first 8 bytes of
/// SHA-256(modulus || exponent), hex encoded. Used in logs and journals.
pub fn key_fingerprint(public_key: &RsaPublicKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(public_key.n().to_bytes_be());
    hasher.update(public_key.e().to_bytes_be());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}
