//! Type tag to handler factory registry.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use fed_core::HandlerConfig;
use fed_session::{ParticipantTracker, SessionAttributeCache};

use super::attribute::{AttributeHandler, AttributeManager, MapAttributeManager};
use super::issuer_trust::IssuerTrustHandler;
use super::logout::LogoutHandler;
use super::signature_generation::SignatureGenerationHandler;
use super::signature_validation::SignatureValidationHandler;
use super::Handler;
use crate::error::{SamlError, SamlResult};

/// Builds a handler from its configuration entry.
pub type HandlerFactory =
    Arc<dyn Fn(&HandlerConfig, &HandlerDeps) -> SamlResult<Arc<dyn Handler>> + Send + Sync>;

/// Shared services handed to handler factories.
#[derive(Clone)]
pub struct HandlerDeps {
    /// Session participant tracker.
    pub tracker: Arc<ParticipantTracker>,
    /// Per-session attribute cache.
    pub attribute_cache: Arc<SessionAttributeCache>,
    /// Attribute source.
    pub attribute_manager: Arc<dyn AttributeManager>,
}

impl HandlerDeps {
    /// Creates dependencies around an attribute source. The tracker purges
    /// the attribute cache when a session ends.
    #[must_use]
    pub fn new(attribute_manager: Arc<dyn AttributeManager>) -> Self {
        let attribute_cache = Arc::new(SessionAttributeCache::new());
        let tracker = Arc::new(ParticipantTracker::new().with_attribute_cache(Arc::clone(&attribute_cache)));
        Self {
            tracker,
            attribute_cache,
            attribute_manager,
        }
    }
}

impl Default for HandlerDeps {
    fn default() -> Self {
        Self::new(Arc::new(MapAttributeManager::new()))
    }
}

impl fmt::Debug for HandlerDeps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDeps")
            .field("sessions", &self.tracker.session_count())
            .field("cached_attribute_sets", &self.attribute_cache.len())
            .finish_non_exhaustive()
    }
}

/// Maps configuration type tags to handler factories.
pub struct HandlerRegistry {
    factories: DashMap<String, HandlerFactory>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
        }
    }

    /// Creates a registry with the built-in handlers:
    /// `signature-validation`, `signature-generation`, `attribute`,
    /// `issuer-trust` and `logout`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(SignatureValidationHandler::TYPE_TAG, |_, _| {
            Ok(Arc::new(SignatureValidationHandler::new()))
        });
        registry.register(SignatureGenerationHandler::TYPE_TAG, |_, _| {
            Ok(Arc::new(SignatureGenerationHandler::new()))
        });
        registry.register(AttributeHandler::TYPE_TAG, |config, deps| {
            Ok(Arc::new(AttributeHandler::from_config(config, deps)))
        });
        registry.register(IssuerTrustHandler::TYPE_TAG, |config, _| {
            Ok(Arc::new(IssuerTrustHandler::from_config(config)))
        });
        registry.register(LogoutHandler::TYPE_TAG, |_, deps| {
            Ok(Arc::new(LogoutHandler::new(Arc::clone(&deps.tracker))))
        });
        registry
    }

    /// Registers a factory, replacing any previous one for the tag.
    pub fn register<F>(&self, type_tag: impl Into<String>, factory: F)
    where
        F: Fn(&HandlerConfig, &HandlerDeps) -> SamlResult<Arc<dyn Handler>> + Send + Sync + 'static,
    {
        self.factories.insert(type_tag.into(), Arc::new(factory));
    }

    /// Returns whether a tag is registered.
    #[must_use]
    pub fn contains(&self, type_tag: &str) -> bool {
        self.factories.contains_key(type_tag)
    }

    /// Returns the registered tags, sorted.
    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        tags.sort();
        tags
    }

    /// Creates the handler for a configuration entry.
    ///
    /// # Errors
    ///
    /// Fails with [`SamlError::Configuration`] for an unknown tag, or with
    /// the factory's error.
    pub fn create(&self, config: &HandlerConfig, deps: &HandlerDeps) -> SamlResult<Arc<dyn Handler>> {
        // Clone the factory out so the shard lock is not held while it runs.
        let factory = self
            .factories
            .get(&config.type_tag)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                SamlError::Configuration(format!("unknown handler type: {}", config.type_tag))
            })?;
        factory(config, deps)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
