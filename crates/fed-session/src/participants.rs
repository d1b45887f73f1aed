//! Session participant tracking.
//!
//! Each session moves through three states:
//!
//! ```text
//! ACTIVE ──(first transit / begin_logout)──> LOGGING_OUT ──(end_session)──> TERMINATED
//! ```
//!
//! State lives in a sharded concurrent map keyed by session id, so
//! operations on different sessions do not contend and every operation on
//! one session is atomic with respect to the others on that session.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use fed_core::{Event, EventType};
use serde::{Deserialize, Serialize};

use crate::attributes::SessionAttributeCache;
use crate::error::{SessionError, SessionResult};

/// Lifecycle state of a tracked session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// Participants may be registered.
    Active,
    /// A global logout round is in progress.
    LoggingOut,
    /// Session destroyed, or never started.
    Terminated,
}

#[derive(Debug, Default)]
struct SessionParticipants {
    /// Visited participants, oldest first.
    participants: Vec<String>,
    in_transit: HashSet<String>,
    logging_out: bool,
}

impl SessionParticipants {
    fn state(&self) -> SessionState {
        if self.logging_out {
            SessionState::LoggingOut
        } else {
            SessionState::Active
        }
    }
}

/// Tracks visited participants and in-flight logout requests per session.
#[derive(Debug, Default)]
pub struct ParticipantTracker {
    sessions: DashMap<String, SessionParticipants>,
    attributes: Option<Arc<SessionAttributeCache>>,
}

impl ParticipantTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Purges `cache` entries when sessions end.
    #[must_use]
    pub fn with_attribute_cache(mut self, cache: Arc<SessionAttributeCache>) -> Self {
        self.attributes = Some(cache);
        self
    }

    /// Starts tracking a session. Idempotent.
    pub fn start_session(&self, session_id: &str) {
        self.sessions.entry(session_id.to_string()).or_default();
        tracing::debug!(session_id = %session_id, "session tracking started");
    }

    /// Ends a session and purges all of its state.
    ///
    /// Returns whether the session was being tracked.
    pub fn end_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if let Some(cache) = &self.attributes {
            cache.invalidate(session_id);
        }
        if removed {
            Event::builder(EventType::SessionTerminated)
                .session(session_id)
                .emit();
        }
        removed
    }

    /// Returns the state of a session.
    #[must_use]
    pub fn state(&self, session_id: &str) -> SessionState {
        self.sessions
            .get(session_id)
            .map_or(SessionState::Terminated, |s| s.state())
    }

    /// Registers a visited participant.
    ///
    /// Registering a participant already on the session is a no-op.
    /// Returns whether the participant was newly added. The session is
    /// started implicitly if unknown.
    ///
    /// # Errors
    ///
    /// Fails with [`SessionError::LogoutInProgress`] once a logout round
    /// has begun.
    pub fn register(&self, session_id: &str, participant_id: &str) -> SessionResult<bool> {
        if participant_id.is_empty() {
            return Err(SessionError::EmptyParticipant);
        }

        let added = {
            let mut session = self.sessions.entry(session_id.to_string()).or_default();
            if session.logging_out {
                return Err(SessionError::LogoutInProgress(session_id.to_string()));
            }
            if session.participants.iter().any(|p| p == participant_id) {
                false
            } else {
                session.participants.push(participant_id.to_string());
                true
            }
        };

        if added {
            Event::builder(EventType::ParticipantRegistered)
                .session(session_id)
                .subject(participant_id)
                .emit();
        }
        Ok(added)
    }

    /// Returns the most recently registered participant.
    #[must_use]
    pub fn peek(&self, session_id: &str) -> Option<String> {
        self.sessions
            .get(session_id)
            .and_then(|s| s.participants.last().cloned())
    }

    /// Removes and returns the most recently registered participant.
    pub fn pop(&self, session_id: &str) -> Option<String> {
        self.sessions
            .get_mut(session_id)
            .and_then(|mut s| s.participants.pop())
    }

    /// Removes a participant wherever it sits in the stack.
    ///
    /// Returns whether it was registered.
    pub fn remove(&self, session_id: &str, participant_id: &str) -> bool {
        self.sessions.get_mut(session_id).is_some_and(|mut s| {
            let before = s.participants.len();
            s.participants.retain(|p| p != participant_id);
            s.participants.len() != before
        })
    }

    /// Moves an active session into the logging-out state.
    ///
    /// # Errors
    ///
    /// Fails with [`SessionError::NotFound`] for unknown sessions.
    pub fn begin_logout(&self, session_id: &str) -> SessionResult<()> {
        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        session.logging_out = true;
        Ok(())
    }

    /// Marks a participant as having an outstanding logout request.
    ///
    /// Also moves the session into the logging-out state. Returns whether
    /// the participant was newly marked; `false` means a request is
    /// already in flight and must not be sent again.
    ///
    /// # Errors
    ///
    /// Fails with [`SessionError::NotFound`] for unknown sessions.
    pub fn register_transit(&self, session_id: &str, participant_id: &str) -> SessionResult<bool> {
        let mut session = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        session.logging_out = true;
        Ok(session.in_transit.insert(participant_id.to_string()))
    }

    /// Clears a participant's outstanding logout request.
    ///
    /// Returns whether the participant was in transit.
    pub fn deregister_transit(&self, session_id: &str, participant_id: &str) -> bool {
        self.sessions
            .get_mut(session_id)
            .is_some_and(|mut s| s.in_transit.remove(participant_id))
    }

    /// Returns whether a participant has a logout request in flight.
    #[must_use]
    pub fn in_transit(&self, session_id: &str, participant_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .is_some_and(|s| s.in_transit.contains(participant_id))
    }

    /// Returns the number of registered participants.
    #[must_use]
    pub fn participant_count(&self, session_id: &str) -> usize {
        self.sessions
            .get(session_id)
            .map_or(0, |s| s.participants.len())
    }

    /// Returns the number of participants with a logout request in flight.
    #[must_use]
    pub fn in_transit_count(&self, session_id: &str) -> usize {
        self.sessions
            .get(session_id)
            .map_or(0, |s| s.in_transit.len())
    }

    /// Returns whether no participants remain and nothing is in flight.
    #[must_use]
    pub fn is_logout_complete(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .map_or(true, |s| s.participants.is_empty() && s.in_transit.is_empty())
    }

    /// Returns a snapshot of the participants, oldest first.
    #[must_use]
    pub fn participants(&self, session_id: &str) -> Vec<String> {
        self.sessions
            .get(session_id)
            .map(|s| s.participants.clone())
            .unwrap_or_default()
    }

    /// Returns the number of tracked sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
