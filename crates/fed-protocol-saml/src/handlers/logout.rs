//! Login registration and coordinated single logout.

use std::sync::Arc;

use async_trait::async_trait;
use fed_core::{Event, EventType, HandlerRole};
use fed_session::ParticipantTracker;
use tracing::{debug, info, warn};

use super::invocation::HandlerInvocation;
use super::Handler;
use crate::error::{SamlError, SamlResult};
use crate::types::{RequestType, ResponseType};

/// Drives participant bookkeeping for login and global logout.
///
/// Identity provider:
/// - an `AuthnRequest` registers its issuer as a session participant
/// - a `LogoutRequest` starts the logout round and sends the first
///   logout request to the most recently registered participant
/// - each `LogoutResponse` clears that participant's in-transit mark and
///   moves on to the next one; when none remain the session ends. A
///   response from a participant with no request in flight is ignored
///
/// Service provider: a `LogoutRequest` terminates the local session and a
/// `LogoutResponse` completes a logout this side started.
pub struct LogoutHandler {
    tracker: Arc<ParticipantTracker>,
}

impl LogoutHandler {
    /// Configuration type tag.
    pub const TYPE_TAG: &'static str = "logout";

    /// Creates the handler.
    #[must_use]
    pub fn new(tracker: Arc<ParticipantTracker>) -> Self {
        Self { tracker }
    }

    fn required_session(invocation: &HandlerInvocation) -> SamlResult<String> {
        invocation
            .session_id
            .clone()
            .ok_or_else(|| SamlError::MissingOption("session_id".to_string()))
    }

    /// Sends the logout round on to the next participant, or completes it.
    fn dispatch_next(&self, invocation: &mut HandlerInvocation, session_id: &str) -> SamlResult<()> {
        while let Some(participant) = self.tracker.pop(session_id) {
            if !self.tracker.register_transit(session_id, &participant)? {
                debug!(session_id = %session_id, participant = %participant, "logout already in flight");
                continue;
            }

            Event::builder(EventType::LogoutDispatched)
                .success()
                .session(session_id)
                .subject(participant.as_str())
                .emit();
            invocation.response.destination = Some(participant.clone());
            invocation.response.logout_participant = Some(participant);
            return Ok(());
        }

        if self.tracker.in_transit_count(session_id) > 0 {
            debug!(
                session_id = %session_id,
                in_transit = self.tracker.in_transit_count(session_id),
                "waiting for outstanding logout responses"
            );
            return Ok(());
        }

        // Concurrent final responses race here; only the one that ends the
        // session reports completion.
        if !self.tracker.end_session(session_id) {
            debug!(session_id = %session_id, "logout already completed");
            return Ok(());
        }
        invocation.response.logout_complete = true;
        invocation.response.session_terminated = true;
        Event::builder(EventType::LogoutCompleted)
            .success()
            .session(session_id)
            .emit();
        info!(session_id = %session_id, "global logout complete");
        Ok(())
    }

    fn idp_request(&self, invocation: &mut HandlerInvocation) -> SamlResult<()> {
        let Some(request) = invocation.message.as_request() else {
            return Ok(());
        };
        match request.request_type {
            RequestType::AuthnRequest => {
                let Some(session_id) = invocation.session_id.as_deref() else {
                    debug!(message_id = %request.header.id, "no session yet, participant not registered");
                    return Ok(());
                };
                self.tracker.register(session_id, &request.header.issuer)?;
                Ok(())
            }
            RequestType::LogoutRequest => {
                let session_id = Self::required_session(invocation)?;
                let initiator = request.header.issuer.clone();
                self.tracker.begin_logout(&session_id)?;
                // The initiator already logged out locally; it is answered
                // once the round completes.
                self.tracker.remove(&session_id, &initiator);
                info!(session_id = %session_id, initiator = %initiator, "global logout started");
                self.dispatch_next(invocation, &session_id)
            }
            RequestType::Other(_) => Ok(()),
        }
    }

    fn idp_response(&self, invocation: &mut HandlerInvocation) -> SamlResult<()> {
        let Some(response) = invocation.message.as_response() else {
            return Ok(());
        };
        if response.response_type != ResponseType::LogoutResponse {
            return Ok(());
        }

        let session_id = Self::required_session(invocation)?;
        let participant = response.header.issuer.clone();
        if !response.is_success() {
            warn!(
                session_id = %session_id,
                participant = %participant,
                status = %response.status_code,
                "participant reported partial logout"
            );
        }
        // Only an answer to a logout request sent in this round moves it on.
        if !self.tracker.deregister_transit(&session_id, &participant) {
            warn!(
                session_id = %session_id,
                participant = %participant,
                "logout response from participant not in transit, ignored"
            );
            return Ok(());
        }
        self.dispatch_next(invocation, &session_id)
    }

    fn sp_request(&self, invocation: &mut HandlerInvocation) {
        let is_logout = matches!(
            invocation.message.as_request().map(|r| &r.request_type),
            Some(RequestType::LogoutRequest)
        );
        if !is_logout {
            return;
        }
        if let Some(session_id) = invocation.session_id.as_deref() {
            self.tracker.end_session(session_id);
        }
        invocation.response.session_terminated = true;
    }

    fn sp_response(&self, invocation: &mut HandlerInvocation) {
        let Some(response) = invocation.message.as_response() else {
            return;
        };
        if response.response_type != ResponseType::LogoutResponse {
            return;
        }
        let success = response.is_success();
        if !success {
            warn!(status = %response.status_code, "identity provider reported partial logout");
        }
        if let Some(session_id) = invocation.session_id.as_deref() {
            self.tracker.end_session(session_id);
        }
        invocation.response.logout_complete = success;
        invocation.response.session_terminated = true;
    }
}

#[async_trait]
impl Handler for LogoutHandler {
    fn name(&self) -> &str {
        Self::TYPE_TAG
    }

    async fn handle_request(&self, invocation: &mut HandlerInvocation) -> SamlResult<()> {
        if !invocation.is_inbound() {
            return Ok(());
        }
        match invocation.role {
            HandlerRole::IdentityProvider => self.idp_request(invocation),
            HandlerRole::ServiceProvider => {
                self.sp_request(invocation);
                Ok(())
            }
        }
    }

    async fn handle_status_response(&self, invocation: &mut HandlerInvocation) -> SamlResult<()> {
        if !invocation.is_inbound() {
            return Ok(());
        }
        match invocation.role {
            HandlerRole::IdentityProvider => self.idp_response(invocation),
            HandlerRole::ServiceProvider => {
                self.sp_response(invocation);
                Ok(())
            }
        }
    }
}
