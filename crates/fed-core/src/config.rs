//! Federation configuration.
//!
//! Configuration structs are serde-ready so an external loader can feed
//! them; [`FederationConfig::from_env`] applies `FED_*` environment
//! overrides on top of the defaults.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which side of the federation this deployment plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerRole {
    /// Identity provider: authenticates principals, tracks participants.
    #[serde(rename = "idp")]
    IdentityProvider,
    /// Service provider: consumes assertions from an identity provider.
    #[serde(rename = "sp")]
    ServiceProvider,
}

impl HandlerRole {
    /// Returns the short configuration name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IdentityProvider => "idp",
            Self::ServiceProvider => "sp",
        }
    }
}

impl FromStr for HandlerRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "idp" | "identity-provider" => Ok(Self::IdentityProvider),
            "sp" | "service-provider" => Ok(Self::ServiceProvider),
            other => Err(Error::Config(format!("unknown handler role: {other}"))),
        }
    }
}

/// One configured handler in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerConfig {
    /// Registered type tag, e.g. `signature-validation`.
    pub type_tag: String,

    /// Handler-specific options.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl HandlerConfig {
    /// Creates a handler entry with no options.
    #[must_use]
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            options: BTreeMap::new(),
        }
    }

    /// Adds an option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Returns an option value.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// Handler chain configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Role the chain runs in.
    pub role: HandlerRole,

    /// Handlers in execution order.
    pub handlers: Vec<HandlerConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            role: HandlerRole::IdentityProvider,
            handlers: vec![
                HandlerConfig::new("signature-validation"),
                HandlerConfig::new("logout"),
                HandlerConfig::new("attribute"),
            ],
        }
    }
}

/// Trust client pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StsPoolConfig {
    /// Maximum live clients per configuration key. Zero disables pooling.
    pub max_clients_per_key: usize,

    /// Clients created when a sub-pool is first initialized.
    pub initial_clients: usize,

    /// How long a checkout waits for a free client, in milliseconds.
    pub checkout_timeout_ms: u64,

    /// Default bound on a single remote call, in milliseconds.
    pub call_timeout_ms: u64,
}

impl StsPoolConfig {
    /// Returns whether pooling is enabled.
    #[must_use]
    pub const fn pooling_enabled(&self) -> bool {
        self.max_clients_per_key > 0
    }

    /// Returns the checkout wait bound.
    #[must_use]
    pub const fn checkout_timeout(&self) -> Duration {
        Duration::from_millis(self.checkout_timeout_ms)
    }

    /// Returns the default remote call bound.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl Default for StsPoolConfig {
    fn default() -> Self {
        Self {
            max_clients_per_key: 10,
            initial_clients: 1,
            checkout_timeout_ms: 5_000,
            call_timeout_ms: 30_000,
        }
    }
}

/// Registry storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryBackend {
    /// Process-local maps.
    Memory,
    /// Flat files.
    File,
}

impl FromStr for RegistryBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            other => Err(Error::Config(format!("unknown registry backend: {other}"))),
        }
    }
}

/// Token and revocation registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Storage backend.
    pub backend: RegistryBackend,

    /// Token snapshot file (file backend).
    pub token_file: Option<PathBuf>,

    /// Revocation log file (file backend).
    pub revocation_file: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: RegistryBackend::Memory,
            token_file: None,
            revocation_file: None,
        }
    }
}

/// Complete federation configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederationConfig {
    /// Handler chain.
    pub pipeline: PipelineConfig,

    /// Trust client pool.
    pub sts_pool: StsPoolConfig,

    /// Registries.
    pub registry: RegistryConfig,
}

impl FederationConfig {
    /// Loads configuration from environment variables.
    ///
    /// A `.env` file is read first if present. Unset variables keep their
    /// defaults.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(role) = lookup("FED_ROLE") {
            config.pipeline.role = role.parse()?;
        }

        if let Some(handlers) = lookup("FED_HANDLERS") {
            config.pipeline.handlers = handlers
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(HandlerConfig::new)
                .collect();
        }

        config.sts_pool.max_clients_per_key = lookup("FED_STS_POOL_MAX")
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.sts_pool.max_clients_per_key);

        config.sts_pool.initial_clients = lookup("FED_STS_POOL_INITIAL")
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.sts_pool.initial_clients);

        config.sts_pool.checkout_timeout_ms = lookup("FED_STS_CHECKOUT_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.sts_pool.checkout_timeout_ms);

        config.sts_pool.call_timeout_ms = lookup("FED_STS_CALL_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.sts_pool.call_timeout_ms);

        if let Some(backend) = lookup("FED_REGISTRY_BACKEND") {
            config.registry.backend = backend.parse()?;
        }
        config.registry.token_file = lookup("FED_TOKEN_FILE").map(PathBuf::from);
        config.registry.revocation_file = lookup("FED_REVOCATION_FILE").map(PathBuf::from);

        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for inconsistent settings.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.handlers.is_empty() {
            return Err(Error::Validation("handler chain is empty".to_string()));
        }

        if let Some(blank) = self
            .pipeline
            .handlers
            .iter()
            .find(|h| h.type_tag.trim().is_empty())
        {
            return Err(Error::Validation(format!(
                "handler entry has a blank type tag: {blank:?}"
            )));
        }

        let pool = &self.sts_pool;
        if pool.pooling_enabled() && pool.initial_clients > pool.max_clients_per_key {
            return Err(Error::Validation(format!(
                "initial_clients ({}) exceeds max_clients_per_key ({})",
                pool.initial_clients, pool.max_clients_per_key
            )));
        }
        if pool.pooling_enabled() && pool.checkout_timeout_ms == 0 {
            return Err(Error::Validation(
                "checkout_timeout_ms must be positive when pooling is enabled".to_string(),
            ));
        }

        if self.registry.backend == RegistryBackend::File
            && (self.registry.token_file.is_none() || self.registry.revocation_file.is_none())
        {
            return Err(Error::Validation(
                "file registry backend requires token_file and revocation_file".to_string(),
            ));
        }

        Ok(())
    }
}
