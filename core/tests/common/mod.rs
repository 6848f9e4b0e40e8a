// Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use envelock_core::constants::DEFAULT_KEY_ALIAS;
use envelock_core::keystore::MemoryKeyStore;
use rand::rngs::OsRng;
use rsa::{RsaPrivateKey, RsaPublicKey};

// 1024-bit keys keep debug-build keygen fast; the wrapped key is 128 bytes.
pub const TEST_KEY_BITS: usize = 1024;

pub fn private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, TEST_KEY_BITS).expect("rsa keygen"))
}

pub fn public_key() -> RsaPublicKey {
    RsaPublicKey::from(private_key())
}

/// A second, unrelated keypair for wrong-key cases.
pub fn other_private_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| RsaPrivateKey::new(&mut OsRng, TEST_KEY_BITS).expect("rsa keygen"))
}

pub fn memory_store() -> MemoryKeyStore {
    let store = MemoryKeyStore::new();
    store.insert(DEFAULT_KEY_ALIAS, private_key().clone());
    store
}

/// Deterministic, non-repeating-per-block test content.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) ^ (i >> 8)) as u8).collect()
}

pub fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, data).expect("write fixture");
    path
}
