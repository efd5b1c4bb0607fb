use std::collections::HashSet;

use parking_lot::RwLock;
use rand::{RngCore, rngs::OsRng};

use crate::BucketgateError;

const KEY_BYTES: usize = 32;

/// In-memory set of issued API keys.
///
/// Keys are 32 random bytes from the OS, hex-encoded to 64 characters.
#[derive(Debug, Default)]
pub struct ApiKeyStore {
    keys: RwLock<HashSet<String>>,
}

impl ApiKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue and register a new key.
    pub fn create(&self) -> Result<String, BucketgateError> {
        let mut buf = [0u8; KEY_BYTES];
        OsRng.try_fill_bytes(&mut buf)?;

        let key = hex::encode(buf);
        self.keys.write().insert(key.clone());

        Ok(key)
    }

    /// `true` if `key` was issued and not revoked.
    pub fn exists(&self, key: &str) -> bool {
        self.keys.read().contains(key)
    }

    /// Revoke `key`. Returns `false` if it was not registered.
    pub fn revoke(&self, key: &str) -> bool {
        self.keys.write().remove(key)
    }
}
