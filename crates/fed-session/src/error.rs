//! Session error types.

use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Session not found.
    #[error("session not found: {0}")]
    NotFound(String),

    /// A global logout round is running; no new participants are accepted.
    #[error("logout in progress for session: {0}")]
    LogoutInProgress(String),

    /// Participant identifier was empty.
    #[error("participant identifier must not be empty")]
    EmptyParticipant,
}

impl SessionError {
    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
