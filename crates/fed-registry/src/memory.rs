//! In-memory stores.

use std::collections::HashSet;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::RegistryResult;
use crate::store::{RevocationStore, TokenStore};

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: DashMap<String, Vec<u8>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn find(&self, id: &str) -> RegistryResult<Option<Vec<u8>>> {
        Ok(self.tokens.get(id).map(|bytes| bytes.clone()))
    }

    async fn put(&self, id: &str, bytes: Vec<u8>) -> RegistryResult<bool> {
        match self.tokens.entry(id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(bytes);
                Ok(true)
            }
        }
    }

    async fn delete(&self, id: &str) -> RegistryResult<bool> {
        Ok(self.tokens.remove(id).is_some())
    }
}

/// Process-local revocation set. Maps identifier to token type.
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    revoked: DashMap<String, String>,
}

impl MemoryRevocationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn contains(&self, id: &str) -> RegistryResult<bool> {
        Ok(self.revoked.contains_key(id))
    }

    async fn add_revoked(&self, token_type: &str, id: &str) -> RegistryResult<bool> {
        match self.revoked.entry(id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(token_type.to_string());
                Ok(true)
            }
        }
    }

    async fn list_revoked(&self) -> RegistryResult<HashSet<String>> {
        Ok(self.revoked.iter().map(|e| e.key().clone()).collect())
    }
}
