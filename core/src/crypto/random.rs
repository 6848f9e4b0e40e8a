//! Fresh key and IV material, one pair per file and direction.

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroize;

use crate::constants::{IV_LEN, SYMMETRIC_KEY_LEN};
use crate::crypto::types::{CipherError, InitializationVector, SymmetricKey};

/// Generate a 256-bit AES key from the OS CSPRNG.
pub fn generate_symmetric_key() -> Result<SymmetricKey, CipherError> {
    debug!(bits = SYMMETRIC_KEY_LEN * 8, "generating symmetric key");
    let mut bytes = [0u8; SYMMETRIC_KEY_LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CipherError::RandomUnavailable(e.to_string()))?;
    let key = SymmetricKey::from_bytes(bytes);
    bytes.zeroize();
    Ok(key)
}

/// Generate a 16-byte IV from the OS CSPRNG.
pub fn generate_iv() -> Result<InitializationVector, CipherError> {
    debug!("generating initialization vector");
    let mut bytes = [0u8; IV_LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CipherError::RandomUnavailable(e.to_string()))?;
    Ok(InitializationVector::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_and_ivs_are_fresh() {
        let k1 = generate_symmetric_key().unwrap();
        let k2 = generate_symmetric_key().unwrap();
        assert_ne!(k1.as_bytes(), k2.as_bytes());

        let iv1 = generate_iv().unwrap();
        let iv2 = generate_iv().unwrap();
        assert_ne!(iv1, iv2);
    }

    #[test]
    fn key_debug_is_redacted() {
        let k = generate_symmetric_key().unwrap();
        assert_eq!(format!("{:?}", k), "SymmetricKey(<redacted>)");
    }
}
