//! STS error types.
//!
//! Credentials never appear in error messages.

use std::time::Duration;

use fed_registry::RegistryError;
use thiserror::Error;

/// Errors from STS clients and the client pool.
#[derive(Debug, Error)]
pub enum StsError {
    /// Caller supplied missing or invalid input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The trust authority call failed (transport, protocol or remote fault).
    #[error("trust authority error: {0}")]
    Trust(String),

    /// No client became available within the checkout bound.
    #[error("client pool exhausted for {key} after {waited:?}")]
    PoolExhausted {
        /// Sub-pool key.
        key: String,
        /// How long the caller waited.
        waited: Duration,
    },

    /// The token has been revoked.
    #[error("token revoked: {0}")]
    Revoked(String),

    /// A trust authority call exceeded its timeout.
    #[error("trust authority call timed out after {0:?}")]
    Timeout(Duration),

    /// Token or revocation registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// No sub-pool exists for the key.
    #[error("no client pool for key: {0}")]
    UnknownPool(String),

    /// Invalid client configuration.
    #[error("STS configuration error: {0}")]
    Configuration(String),
}

impl StsError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Creates a trust error.
    #[must_use]
    pub fn trust(msg: impl Into<String>) -> Self {
        Self::Trust(msg.into())
    }

    /// Returns whether retrying at a higher layer may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Trust(_) | Self::Timeout(_) | Self::PoolExhausted { .. } => true,
            Self::Registry(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Returns whether the error is a caller mistake.
    #[must_use]
    pub const fn is_argument_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }
}

/// Result type for STS operations.
pub type StsResult<T> = Result<T, StsError>;
