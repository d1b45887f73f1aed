//! Message handler pipeline.
//!
//! A [`Pipeline`] runs a configured, ordered list of [`Handler`]s over one
//! [`HandlerInvocation`]. Each handler sees the message kind and the
//! pipeline's role and may pass, update the invocation, or fail the whole
//! chain. Handlers are created from configuration type tags through the
//! [`HandlerRegistry`].

mod attribute;
mod invocation;
mod issuer_trust;
mod logout;
mod pipeline;
mod registry;
mod signature_generation;
mod signature_validation;

use async_trait::async_trait;

pub use attribute::{AttributeHandler, AttributeManager, MapAttributeManager};
pub use invocation::{HandlerError, HandlerInvocation, HandlerResponse, InvocationOptions, OptionValue};
pub use issuer_trust::IssuerTrustHandler;
pub use logout::LogoutHandler;
pub use pipeline::{ChainError, Pipeline};
pub use registry::{HandlerDeps, HandlerFactory, HandlerRegistry};
pub use signature_generation::SignatureGenerationHandler;
pub use signature_validation::SignatureValidationHandler;

use crate::error::SamlResult;
use crate::types::MessageKind;
use fed_core::HandlerRole;

/// Error codes reported by a failed handler chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Signature missing or not valid.
    SignatureInvalid,
    /// Issuer outside the trusted domains.
    IssuerNotTrusted,
    /// Malformed request.
    InvalidRequest,
    /// Malformed response.
    InvalidResponse,
    /// Session tracking refused the operation.
    SessionError,
    /// Attributes could not be resolved.
    AttributeResolution,
    /// Handler misconfigured or required option missing.
    Configuration,
    /// Any other processing failure.
    Processing,
}

impl ErrorCode {
    /// Returns the wire name of this code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SignatureInvalid => "SIGNATURE_INVALID",
            Self::IssuerNotTrusted => "ISSUER_NOT_TRUSTED",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::SessionError => "SESSION_ERROR",
            Self::AttributeResolution => "ATTRIBUTE_RESOLUTION",
            Self::Configuration => "CONFIGURATION",
            Self::Processing => "PROCESSING",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage of the handler pipeline.
///
/// Both handling methods default to passing the message through, so a
/// handler implements only the kinds it cares about.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Returns the handler name used in logs and chain errors.
    fn name(&self) -> &str;

    /// Returns whether this handler takes part for the given role and
    /// message kind. Non-applicable handlers are skipped silently.
    fn applies_to(&self, role: HandlerRole, kind: MessageKind) -> bool {
        let _ = (role, kind);
        true
    }

    /// Handles a request message.
    ///
    /// # Errors
    ///
    /// Any error halts the chain.
    async fn handle_request(&self, invocation: &mut HandlerInvocation) -> SamlResult<()> {
        let _ = invocation;
        Ok(())
    }

    /// Handles a status response message.
    ///
    /// # Errors
    ///
    /// Any error halts the chain.
    async fn handle_status_response(&self, invocation: &mut HandlerInvocation) -> SamlResult<()> {
        let _ = invocation;
        Ok(())
    }
}
