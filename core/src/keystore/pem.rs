//! keystore/pem.rs
//!
//! Directory of PEM files: `<alias>.pub.pem` (SPKI) and `<alias>.pem` (PKCS#8).
//! When only the private half is present the public key is derived from it.

use std::fs;
use std::path::{Path, PathBuf};

use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::{debug, info};

use crate::constants::{PRIVATE_KEY_PEM_SUFFIX, PUBLIC_KEY_PEM_SUFFIX};
use crate::keystore::{KeyStore, KeyStoreError};

#[derive(Debug, Clone)]
pub struct PemKeyStore {
    dir: PathBuf,
}

impl PemKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn public_key_path(&self, alias: &str) -> PathBuf {
        self.dir.join(format!("{alias}{PUBLIC_KEY_PEM_SUFFIX}"))
    }

    pub fn private_key_path(&self, alias: &str) -> PathBuf {
        self.dir.join(format!("{alias}{PRIVATE_KEY_PEM_SUFFIX}"))
    }

    /// Store an externally generated keypair under `alias`, overwriting any
    /// previous files.
    pub fn insert(&self, alias: &str, private_key: &RsaPrivateKey) -> Result<(), KeyStoreError> {
        let parse = |e: String| KeyStoreError::Parse { alias: alias.to_string(), reason: e };

        let private_pem = private_key.to_pkcs8_pem(LineEnding::LF).map_err(|e| parse(e.to_string()))?;
        let public_pem = RsaPublicKey::from(private_key)
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| parse(e.to_string()))?;

        fs::create_dir_all(&self.dir).map_err(|source| KeyStoreError::Io { path: self.dir.clone(), source })?;
        let priv_path = self.private_key_path(alias);
        fs::write(&priv_path, private_pem.as_bytes())
            .map_err(|source| KeyStoreError::Io { path: priv_path, source })?;
        let pub_path = self.public_key_path(alias);
        fs::write(&pub_path, public_pem.as_bytes())
            .map_err(|source| KeyStoreError::Io { path: pub_path, source })?;

        info!(alias, dir = %self.dir.display(), "keypair stored");
        Ok(())
    }

    fn read_pem(&self, alias: &str, path: PathBuf) -> Result<String, KeyStoreError> {
        match fs::read_to_string(&path) {
            Ok(s) => Ok(s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(KeyStoreError::NotFound { alias: alias.to_string() })
            }
            Err(source) => Err(KeyStoreError::Io { path, source }),
        }
    }
}

impl KeyStore for PemKeyStore {
    fn public_key(&self, alias: &str) -> Result<RsaPublicKey, KeyStoreError> {
        let path = self.public_key_path(alias);
        if !path.exists() && self.private_key_path(alias).exists() {
            debug!(alias, "public key file missing; deriving from private key");
            return Ok(RsaPublicKey::from(&self.private_key(alias)?));
        }
        let pem = self.read_pem(alias, path)?;
        RsaPublicKey::from_public_key_pem(&pem)
            .map_err(|e| KeyStoreError::Parse { alias: alias.to_string(), reason: e.to_string() })
    }

    fn private_key(&self, alias: &str) -> Result<RsaPrivateKey, KeyStoreError> {
        let pem = self.read_pem(alias, self.private_key_path(alias))?;
        let key = RsaPrivateKey::from_pkcs8_pem(&pem)
            .map_err(|e| KeyStoreError::Parse { alias: alias.to_string(), reason: e.to_string() })?;
        key.validate()
            .map_err(|e| KeyStoreError::Parse { alias: alias.to_string(), reason: e.to_string() })?;
        Ok(key)
    }

    /// Parses and validates the private key; a present but corrupt file
    /// does not count.
    fn contains(&self, alias: &str) -> bool {
        match self.private_key(alias) {
            Ok(_) => true,
            Err(e) => {
                debug!(alias, error = %e, "no usable keypair");
                false
            }
        }
    }
}
