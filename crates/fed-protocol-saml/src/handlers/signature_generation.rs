//! Outbound signature generation.

use async_trait::async_trait;
use tracing::debug;

use super::invocation::{HandlerInvocation, InvocationOptions};
use super::Handler;
use crate::bindings::{HttpRedirectBinding, SamlMessageType};
use crate::error::{SamlError, SamlResult};
use crate::signature::XmlSigner;
use crate::types::{Binding, MessageKind};

/// Signs outbound messages with the key in
/// [`InvocationOptions::SIGNING_KEY`].
///
/// POST messages get an enveloped signature in
/// [`signed_document`](super::HandlerResponse::signed_document); Redirect
/// messages get a signed query string in
/// [`signed_query`](super::HandlerResponse::signed_query).
#[derive(Debug, Default)]
pub struct SignatureGenerationHandler;

impl SignatureGenerationHandler {
    /// Configuration type tag.
    pub const TYPE_TAG: &'static str = "signature-generation";

    /// Creates the handler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn sign(invocation: &mut HandlerInvocation) -> SamlResult<()> {
        if invocation.is_inbound() {
            return Ok(());
        }

        let key = invocation
            .options
            .signing_key(InvocationOptions::SIGNING_KEY)
            .ok_or_else(|| SamlError::MissingOption(InvocationOptions::SIGNING_KEY.to_string()))?;
        let document = invocation
            .raw_message
            .as_deref()
            .ok_or_else(|| SamlError::MissingElement("outbound document".to_string()))?;
        let signer = XmlSigner::new(key);

        match invocation.binding {
            Binding::Post => {
                let signed = signer.sign_document(document, invocation.message.id())?;
                invocation.response.signed_document = Some(signed);
            }
            Binding::Redirect => {
                let message_type = match invocation.message.kind() {
                    MessageKind::Request => SamlMessageType::Request,
                    MessageKind::StatusResponse => SamlMessageType::Response,
                };
                let query = HttpRedirectBinding::encode_query(
                    document,
                    invocation.relay_state.as_deref(),
                    message_type,
                )?;
                invocation.response.signed_query = Some(signer.sign_query(&query)?);
            }
        }

        if invocation.response.destination.is_none() {
            invocation.response.destination = invocation.message.header().destination.clone();
        }
        debug!(
            message_id = %invocation.message.id(),
            binding = invocation.binding.uri(),
            algorithm = signer.algorithm().uri(),
            "outbound message signed"
        );
        Ok(())
    }
}

#[async_trait]
impl Handler for SignatureGenerationHandler {
    fn name(&self) -> &str {
        Self::TYPE_TAG
    }

    async fn handle_request(&self, invocation: &mut HandlerInvocation) -> SamlResult<()> {
        Self::sign(invocation)
    }

    async fn handle_status_response(&self, invocation: &mut HandlerInvocation) -> SamlResult<()> {
        Self::sign(invocation)
    }
}
