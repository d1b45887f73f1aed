//! Identity-provider attribute resolution.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use fed_core::{HandlerConfig, HandlerRole};
use fed_session::{AttributeSet, SessionAttributeCache};
use tracing::debug;

use super::invocation::HandlerInvocation;
use super::registry::HandlerDeps;
use super::Handler;
use crate::error::SamlResult;
use crate::types::MessageKind;

/// Source of principal attributes.
#[async_trait]
pub trait AttributeManager: Send + Sync {
    /// Resolves the named attributes of a principal. An empty `names`
    /// slice asks for every attribute.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::AttributeResolution`](crate::SamlError::AttributeResolution)
    /// if the source cannot be reached.
    async fn resolve(&self, principal: &str, names: &[String]) -> SamlResult<AttributeSet>;
}

/// Attribute source backed by a fixed map, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MapAttributeManager {
    principals: HashMap<String, AttributeSet>,
}

impl MapAttributeManager {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a principal's attributes.
    #[must_use]
    pub fn with_principal(mut self, principal: impl Into<String>, attributes: AttributeSet) -> Self {
        self.principals.insert(principal.into(), attributes);
        self
    }
}

#[async_trait]
impl AttributeManager for MapAttributeManager {
    async fn resolve(&self, principal: &str, names: &[String]) -> SamlResult<AttributeSet> {
        let Some(attributes) = self.principals.get(principal) else {
            return Ok(AttributeSet::new());
        };
        Ok(attributes
            .iter()
            .filter(|(name, _)| names.is_empty() || names.contains(name))
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect())
    }
}

/// Resolves the authenticated principal's attributes once per session.
///
/// Runs only on the identity provider and only for requests; logout
/// requests bypass it. Results are cached against the session, so
/// concurrent requests in one session share a single resolution.
pub struct AttributeHandler {
    manager: Arc<dyn AttributeManager>,
    cache: Arc<SessionAttributeCache>,
    names: Vec<String>,
}

impl AttributeHandler {
    /// Configuration type tag.
    pub const TYPE_TAG: &'static str = "attribute";

    /// Creates the handler.
    #[must_use]
    pub fn new(manager: Arc<dyn AttributeManager>, cache: Arc<SessionAttributeCache>) -> Self {
        Self {
            manager,
            cache,
            names: Vec::new(),
        }
    }

    /// Restricts resolution to the given attribute names.
    #[must_use]
    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }

    /// Builds the handler from configuration; the `attributes` option is a
    /// comma-separated list of names to resolve.
    #[must_use]
    pub fn from_config(config: &HandlerConfig, deps: &HandlerDeps) -> Self {
        let names = config
            .option("attributes")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        Self::new(Arc::clone(&deps.attribute_manager), Arc::clone(&deps.attribute_cache)).with_names(names)
    }
}

#[async_trait]
impl Handler for AttributeHandler {
    fn name(&self) -> &str {
        Self::TYPE_TAG
    }

    fn applies_to(&self, role: HandlerRole, kind: MessageKind) -> bool {
        role == HandlerRole::IdentityProvider && kind == MessageKind::Request
    }

    async fn handle_request(&self, invocation: &mut HandlerInvocation) -> SamlResult<()> {
        if invocation.message.is_logout() {
            debug!(message_id = %invocation.message.id(), "logout message, attribute resolution bypassed");
            return Ok(());
        }
        let (Some(session_id), Some(principal)) = (&invocation.session_id, &invocation.principal) else {
            debug!(message_id = %invocation.message.id(), "no authenticated session, attributes not resolved");
            return Ok(());
        };

        let attributes = self
            .cache
            .get_or_resolve(session_id, || self.manager.resolve(principal, &self.names))
            .await?;
        invocation.response.attributes = Some(attributes);
        Ok(())
    }
}
