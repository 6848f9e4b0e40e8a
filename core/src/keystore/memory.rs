//! keystore/memory.rs

use std::collections::HashMap;
use std::sync::RwLock;

use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::keystore::{KeyStore, KeyStoreError};

#[derive(Clone)]
enum Entry {
    Pair(RsaPrivateKey),
    PublicOnly(RsaPublicKey),
}

/// In-process key store. A public-only entry can encrypt but not decrypt.
#[derive(Default)]
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, alias: impl Into<String>, private_key: RsaPrivateKey) {
        self.put(alias.into(), Entry::Pair(private_key));
    }

    pub fn insert_public(&self, alias: impl Into<String>, public_key: RsaPublicKey) {
        self.put(alias.into(), Entry::PublicOnly(public_key));
    }

    fn put(&self, alias: String, entry: Entry) {
        let mut map = match self.entries.write() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.insert(alias, entry);
    }

    fn get(&self, alias: &str) -> Option<Entry> {
        let map = match self.entries.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.get(alias).cloned()
    }
}

impl KeyStore for MemoryKeyStore {
    fn public_key(&self, alias: &str) -> Result<RsaPublicKey, KeyStoreError> {
        match self.get(alias) {
            Some(Entry::Pair(private)) => Ok(RsaPublicKey::from(&private)),
            Some(Entry::PublicOnly(public)) => Ok(public),
            None => Err(KeyStoreError::NotFound { alias: alias.to_string() }),
        }
    }

    fn private_key(&self, alias: &str) -> Result<RsaPrivateKey, KeyStoreError> {
        match self.get(alias) {
            Some(Entry::Pair(private)) => Ok(private),
            _ => Err(KeyStoreError::NotFound { alias: alias.to_string() }),
        }
    }

    fn contains(&self, alias: &str) -> bool {
        matches!(self.get(alias), Some(Entry::Pair(_)))
    }
}
