//! Revocation registry.
//!
//! Revocation is keyed by token identifier; the token type is recorded
//! alongside it but does not partition the set. Once revoked, an
//! identifier stays revoked for the lifetime of the backing store.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::RegistryResult;
use crate::memory::MemoryRevocationStore;
use crate::store::RevocationStore;

/// Append-only set of canceled token identifiers.
#[derive(Clone)]
pub struct RevocationRegistry {
    store: Arc<dyn RevocationStore>,
}

impl RevocationRegistry {
    /// Creates a registry over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn RevocationStore>) -> Self {
        Self { store }
    }

    /// Creates a registry backed by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRevocationStore::new()))
    }

    /// Returns whether `id` has been revoked.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn is_revoked(&self, token_type: &str, id: &str) -> RegistryResult<bool> {
        let revoked = self.store.contains(id).await?;
        if revoked {
            tracing::debug!(token_id = %id, token_type = %token_type, "token is revoked");
        }
        Ok(revoked)
    }

    /// Revokes `id`. Revoking twice is a no-op.
    ///
    /// Returns whether this call added the revocation.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn revoke(&self, token_type: &str, id: &str) -> RegistryResult<bool> {
        let added = self.store.add_revoked(token_type, id).await?;
        if added {
            tracing::info!(token_id = %id, token_type = %token_type, "token revoked");
        }
        Ok(added)
    }

    /// Returns every revoked identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn revoked_ids(&self) -> RegistryResult<HashSet<String>> {
        self.store.list_revoked().await
    }
}

impl std::fmt::Debug for RevocationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationRegistry").finish_non_exhaustive()
    }
}
