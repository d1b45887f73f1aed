//! Error handling for the federation core.
//!
//! Error messages are informative for operators but never echo credential
//! material back to callers.

use thiserror::Error;

/// Result type alias using the core error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for configuration and wiring problems.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A configured value failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A configured plugin type tag is not registered.
    #[error("unknown component type: {0}")]
    UnknownComponent(String),

    /// Internal error.
    #[error("internal error")]
    Internal,
}

impl Error {
    /// Returns whether this error is caused by operator-supplied settings.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Validation(_) | Self::UnknownComponent(_)
        )
    }
}
