//! Token registry.

use std::sync::Arc;

use fed_core::{RegistryBackend, RegistryConfig};

use crate::error::{RegistryError, RegistryResult};
use crate::file::{FileRevocationStore, FileTokenStore};
use crate::memory::MemoryTokenStore;
use crate::revocation::RevocationRegistry;
use crate::store::TokenStore;
use crate::token::SecurityToken;

/// Maps token identifiers to issued tokens.
///
/// Cloning is cheap; clones share the underlying store.
#[derive(Clone)]
pub struct TokenRegistry {
    store: Arc<dyn TokenStore>,
}

impl TokenRegistry {
    /// Creates a registry over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Creates a registry backed by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    /// Registers `token` under `id`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Conflict`] if `id` is already registered.
    /// The existing entry is left untouched.
    pub async fn add_token(&self, id: &str, token: &SecurityToken) -> RegistryResult<()> {
        let bytes = serde_json::to_vec(token)?;
        if self.store.put(id, bytes).await? {
            tracing::debug!(token_id = %id, token_type = %token.token_type, "token registered");
            Ok(())
        } else {
            tracing::warn!(token_id = %id, "token id already registered, not overwriting");
            Err(RegistryError::conflict(id))
        }
    }

    /// Removes the token under `id`.
    ///
    /// Removing an unknown id is reported in the log but is not an error.
    /// Returns whether a token was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn remove_token(&self, id: &str) -> RegistryResult<bool> {
        let removed = self.store.delete(id).await?;
        if removed {
            tracing::debug!(token_id = %id, "token removed");
        } else {
            tracing::warn!(token_id = %id, "remove requested for unknown token");
        }
        Ok(removed)
    }

    /// Looks up the token under `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails or holds undecodable data.
    pub async fn get_token(&self, id: &str) -> RegistryResult<Option<SecurityToken>> {
        match self.store.find(id).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for TokenRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRegistry").finish_non_exhaustive()
    }
}

/// The token and revocation registries of one deployment.
#[derive(Debug, Clone)]
pub struct Registries {
    /// Issued tokens.
    pub tokens: TokenRegistry,
    /// Revoked identifiers.
    pub revocations: RevocationRegistry,
}

impl Registries {
    /// Creates in-memory registries.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            tokens: TokenRegistry::in_memory(),
            revocations: RevocationRegistry::in_memory(),
        }
    }

    /// Opens the registries described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a file backend lacks a path or its files cannot
    /// be loaded.
    pub async fn from_config(config: &RegistryConfig) -> RegistryResult<Self> {
        match config.backend {
            RegistryBackend::Memory => Ok(Self::in_memory()),
            RegistryBackend::File => {
                let token_file = config.token_file.as_ref().ok_or_else(|| {
                    RegistryError::Configuration("token_file is required".to_string())
                })?;
                let revocation_file = config.revocation_file.as_ref().ok_or_else(|| {
                    RegistryError::Configuration("revocation_file is required".to_string())
                })?;

                let tokens = FileTokenStore::open(token_file).await?;
                let revocations = FileRevocationStore::open(revocation_file).await?;
                tracing::info!(
                    token_file = %token_file.display(),
                    revocation_file = %revocation_file.display(),
                    "file registries opened"
                );
                Ok(Self {
                    tokens: TokenRegistry::new(Arc::new(tokens)),
                    revocations: RevocationRegistry::new(Arc::new(revocations)),
                })
            }
        }
    }
}
