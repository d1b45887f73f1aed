//! Inbound signature validation.

use async_trait::async_trait;
use fed_core::{Event, EventType};
use tracing::debug;

use super::invocation::{HandlerInvocation, InvocationOptions};
use super::Handler;
use crate::error::{SamlError, SamlResult};
use crate::signature::XmlSignatureValidator;
use crate::types::Binding;

/// Verifies the sender's signature on every inbound message.
///
/// POST messages carry an enveloped signature in the document; Redirect
/// messages carry a detached signature over the query string. Either way
/// the signed document must be the message being processed. The sender
/// key comes from [`InvocationOptions::SENDER_PUBLIC_KEY`]. Setting
/// [`InvocationOptions::IGNORE_SIGNATURES`] skips validation.
#[derive(Debug, Default)]
pub struct SignatureValidationHandler {
    validator: XmlSignatureValidator,
}

impl SignatureValidationHandler {
    /// Configuration type tag.
    pub const TYPE_TAG: &'static str = "signature-validation";

    /// Creates the handler.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            validator: XmlSignatureValidator::new(),
        }
    }

    fn validate(&self, invocation: &HandlerInvocation) -> SamlResult<()> {
        if !invocation.is_inbound() {
            return Ok(());
        }
        if invocation.options.flag(InvocationOptions::IGNORE_SIGNATURES) {
            debug!(message_id = %invocation.message.id(), "signature validation disabled for invocation");
            return Ok(());
        }

        let result = self.verify(invocation).map_err(|err| match err {
            SamlError::SignatureInvalid(_) => err,
            other => SamlError::SignatureInvalid(other.to_string()),
        });

        if let Err(err) = &result {
            let mut event = Event::builder(EventType::SignatureRejected)
                .failure(err.to_string())
                .subject(invocation.message.issuer())
                .detail("message_id", invocation.message.id())
                .detail("binding", invocation.binding.uri());
            if let Some(session) = &invocation.session_id {
                event = event.session(session.as_str());
            }
            event.emit();
        }
        result
    }

    fn verify(&self, invocation: &HandlerInvocation) -> SamlResult<()> {
        let key = invocation
            .options
            .public_key(InvocationOptions::SENDER_PUBLIC_KEY)
            .ok_or_else(|| SamlError::SignatureInvalid("no sender public key available".to_string()))?;
        let raw = invocation
            .raw_message
            .as_deref()
            .ok_or_else(|| SamlError::SignatureInvalid("no raw message to verify".to_string()))?;

        let verified = match invocation.binding {
            Binding::Post => self
                .validator
                .verify_embedded(raw, key, Some(invocation.message.id()))?,
            Binding::Redirect => self
                .validator
                .verify_detached(raw, key, Some(invocation.message.id()))?,
        };
        debug!(
            message_id = %invocation.message.id(),
            algorithm = verified.algorithm.uri(),
            "message signature valid"
        );
        Ok(())
    }
}

#[async_trait]
impl Handler for SignatureValidationHandler {
    fn name(&self) -> &str {
        Self::TYPE_TAG
    }

    async fn handle_request(&self, invocation: &mut HandlerInvocation) -> SamlResult<()> {
        self.validate(invocation)
    }

    async fn handle_status_response(&self, invocation: &mut HandlerInvocation) -> SamlResult<()> {
        self.validate(invocation)
    }
}
