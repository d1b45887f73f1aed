//! Audit events for federation activity.
//!
//! Security-relevant occurrences (participant registration, logout rounds,
//! rejected signatures, token lifecycle operations) are recorded as
//! structured events. Every event carries:
//! - Timestamp
//! - Event type
//! - Outcome (success/failure)
//! - Session and subject (when available)
//! - Free-form details
//!
//! Events are written through `tracing` by [`Event::emit`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Session events
    /// A participant was registered on a session.
    ParticipantRegistered,
    /// A logout request was dispatched to a participant.
    LogoutDispatched,
    /// A global logout round completed.
    LogoutCompleted,
    /// A session was terminated.
    SessionTerminated,

    // Message validation events
    /// A message signature failed verification.
    SignatureRejected,
    /// A message issuer is not trusted.
    IssuerRejected,

    // Token events
    /// Token issued by the trust authority.
    TokenIssued,
    /// Token renewed.
    TokenRenewed,
    /// Token validated.
    TokenValidated,
    /// Token canceled.
    TokenCanceled,

    // Pool events
    /// No pooled client became available in time.
    PoolExhausted,
}

impl EventType {
    /// Returns the stable name used in log output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ParticipantRegistered => "PARTICIPANT_REGISTERED",
            Self::LogoutDispatched => "LOGOUT_DISPATCHED",
            Self::LogoutCompleted => "LOGOUT_COMPLETED",
            Self::SessionTerminated => "SESSION_TERMINATED",
            Self::SignatureRejected => "SIGNATURE_REJECTED",
            Self::IssuerRejected => "ISSUER_REJECTED",
            Self::TokenIssued => "TOKEN_ISSUED",
            Self::TokenRenewed => "TOKEN_RENEWED",
            Self::TokenValidated => "TOKEN_VALIDATED",
            Self::TokenCanceled => "TOKEN_CANCELED",
            Self::PoolExhausted => "POOL_EXHAUSTED",
        }
    }
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// A federation audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Type of event.
    pub event_type: EventType,

    /// Outcome of the event.
    pub outcome: EventOutcome,

    /// Browser session the event belongs to.
    pub session_id: Option<String>,

    /// Subject of the event: a participant, issuer or token id.
    pub subject: Option<String>,

    /// Error message (for failure events).
    pub error: Option<String>,

    /// Additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl Event {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: EventType) -> EventBuilder {
        EventBuilder::new(event_type)
    }

    /// Writes the event to the log.
    ///
    /// Failures are logged at `warn`, everything else at `info`.
    pub fn emit(&self) {
        let details = self
            .details
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        let session = self.session_id.as_deref().unwrap_or("-");
        let subject = self.subject.as_deref().unwrap_or("-");

        match self.outcome {
            EventOutcome::Success => tracing::info!(
                event_id = %self.id,
                event_type = self.event_type.as_str(),
                session_id = session,
                subject = subject,
                details = %details,
                "audit event"
            ),
            EventOutcome::Failure => tracing::warn!(
                event_id = %self.id,
                event_type = self.event_type.as_str(),
                session_id = session,
                subject = subject,
                error = self.error.as_deref().unwrap_or("-"),
                details = %details,
                "audit event"
            ),
        }
    }
}

/// Builder for creating events.
pub struct EventBuilder {
    event_type: EventType,
    outcome: EventOutcome,
    session_id: Option<String>,
    subject: Option<String>,
    error: Option<String>,
    details: Vec<(String, String)>,
}

impl EventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            outcome: EventOutcome::Success,
            session_id: None,
            subject: None,
            error: None,
            details: Vec::new(),
        }
    }

    /// Sets the outcome to success.
    #[must_use]
    pub const fn success(mut self) -> Self {
        self.outcome = EventOutcome::Success;
        self
    }

    /// Sets the outcome to failure with an error message.
    #[must_use]
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.outcome = EventOutcome::Failure;
        self.error = Some(error.into());
        self
    }

    /// Sets the session ID.
    #[must_use]
    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the subject.
    #[must_use]
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Builds the event.
    #[must_use]
    pub fn build(self) -> Event {
        Event {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            event_type: self.event_type,
            outcome: self.outcome,
            session_id: self.session_id,
            subject: self.subject,
            error: self.error,
            details: self.details,
        }
    }

    /// Builds the event and writes it to the log.
    pub fn emit(self) {
        self.build().emit();
    }
}
