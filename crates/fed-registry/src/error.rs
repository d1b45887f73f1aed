//! Registry error types.

use thiserror::Error;

/// Errors from token and revocation registries.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A token with this identifier is already registered.
    #[error("token already registered: {id}")]
    Conflict {
        /// The contested identifier.
        id: String,
    },

    /// Backing store failure.
    #[error("registry storage error: {0}")]
    Storage(String),

    /// Stored data could not be encoded or decoded.
    #[error("registry serialization error: {0}")]
    Serialization(String),

    /// File I/O failure.
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid registry configuration.
    #[error("registry configuration error: {0}")]
    Configuration(String),
}

impl RegistryError {
    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(id: impl Into<String>) -> Self {
        Self::Conflict { id: id.into() }
    }

    /// Checks if this is a duplicate-id conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Returns whether retrying the operation may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Io(_))
    }
}

impl From<serde_json::Error> for RegistryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
