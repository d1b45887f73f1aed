//! Ordered handler chain.

use std::sync::Arc;

use fed_core::{HandlerRole, PipelineConfig};
use thiserror::Error;
use tracing::{debug, warn};

use super::invocation::{HandlerError, HandlerInvocation, HandlerResponse};
use super::registry::{HandlerDeps, HandlerRegistry};
use super::{ErrorCode, Handler};
use crate::error::{SamlError, SamlResult};
use crate::types::MessageKind;

/// Terminal error of a handler chain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{code} in handler '{handler}': {message}")]
pub struct ChainError {
    /// Error code.
    pub code: ErrorCode,
    /// Message of the failing handler's error.
    pub message: String,
    /// Name of the failing handler.
    pub handler: String,
}

/// A fixed, ordered list of handlers run in one role.
#[derive(Clone)]
pub struct Pipeline {
    role: HandlerRole,
    handlers: Vec<Arc<dyn Handler>>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new(role: HandlerRole) -> Self {
        Self {
            role,
            handlers: Vec::new(),
        }
    }

    /// Appends a handler.
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Builds the configured chain, resolving each type tag through the
    /// registry.
    ///
    /// # Errors
    ///
    /// Fails on an empty chain or an unknown type tag, or if a factory
    /// rejects its options.
    pub fn from_config(
        config: &PipelineConfig,
        registry: &HandlerRegistry,
        deps: &HandlerDeps,
    ) -> SamlResult<Self> {
        if config.handlers.is_empty() {
            return Err(SamlError::Configuration("handler chain is empty".to_string()));
        }

        let handlers = config
            .handlers
            .iter()
            .map(|handler| registry.create(handler, deps))
            .collect::<SamlResult<Vec<_>>>()?;

        debug!(
            role = config.role.as_str(),
            handlers = handlers.len(),
            "handler pipeline built"
        );
        Ok(Self {
            role: config.role,
            handlers,
        })
    }

    /// Returns the role the chain runs in.
    #[must_use]
    pub const fn role(&self) -> HandlerRole {
        self.role
    }

    /// Returns the handler names in order.
    #[must_use]
    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Runs the chain over one exchange.
    ///
    /// Handlers run in order; the first failure stops the chain and
    /// becomes the outcome. Handlers not applicable to the role and
    /// message kind are skipped.
    ///
    /// # Errors
    ///
    /// Returns the failing handler's error as a [`ChainError`].
    pub async fn process(&self, mut invocation: HandlerInvocation) -> Result<HandlerResponse, ChainError> {
        invocation.role = self.role;
        let kind = invocation.message.kind();

        for handler in &self.handlers {
            if !handler.applies_to(self.role, kind) {
                debug!(
                    handler = handler.name(),
                    role = self.role.as_str(),
                    kind = ?kind,
                    "handler not applicable, skipping"
                );
                continue;
            }

            let result = match kind {
                MessageKind::Request => handler.handle_request(&mut invocation).await,
                MessageKind::StatusResponse => handler.handle_status_response(&mut invocation).await,
            };

            if let Err(err) = result {
                let error = HandlerError {
                    code: err.error_code(),
                    message: err.to_string(),
                };
                warn!(
                    handler = handler.name(),
                    message_id = %invocation.message.id(),
                    issuer = %invocation.message.issuer(),
                    code = error.code.as_str(),
                    error = %error.message,
                    "handler chain aborted"
                );
                invocation.response.error = Some(error.clone());
                return Err(ChainError {
                    code: error.code,
                    message: error.message,
                    handler: handler.name().to_string(),
                });
            }
        }

        Ok(invocation.response)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("role", &self.role)
            .field("handlers", &self.handler_names())
            .finish()
    }
}
