//! Store interfaces beneath the registries.
//!
//! Stores deal in identifiers and bytes only. Registries layer the token
//! model, logging and conflict reporting on top.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::RegistryResult;

/// Keyed byte storage for tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Looks up the bytes stored under `id`.
    async fn find(&self, id: &str) -> RegistryResult<Option<Vec<u8>>>;

    /// Stores `bytes` under `id` unless the id is taken.
    ///
    /// Must be atomic per id: of two concurrent calls for the same id,
    /// exactly one returns `true`.
    async fn put(&self, id: &str, bytes: Vec<u8>) -> RegistryResult<bool>;

    /// Removes `id`. Returns whether it was present.
    async fn delete(&self, id: &str) -> RegistryResult<bool>;
}

/// Append-only set of revoked identifiers.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Returns whether `id` has been revoked.
    async fn contains(&self, id: &str) -> RegistryResult<bool>;

    /// Records `id` as revoked. Returns whether it was newly added.
    async fn add_revoked(&self, token_type: &str, id: &str) -> RegistryResult<bool>;

    /// Returns every revoked identifier.
    async fn list_revoked(&self) -> RegistryResult<HashSet<String>>;
}
