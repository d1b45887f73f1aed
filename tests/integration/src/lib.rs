//! Shared fixtures for the cross-crate scenario tests.
//!
//! A [`TestEnv`] wires one identity provider deployment together: the
//! handler chain from configuration, file-backed registries in a
//! temporary directory, and a trust client pool over a process-local
//! trust authority.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use fed_core::FederationConfig;
use fed_crypto::{EcdsaSigningKey, RsaSigningKey, SignatureAlgorithm};
use fed_protocol_saml::handlers::{HandlerDeps, HandlerRegistry, MapAttributeManager, Pipeline};
use fed_registry::Registries;
use fed_session::ParticipantTracker;
use fed_sts::{LocalConnector, LocalTrustAuthority, StsClientConfig, StsClientPool, TrustAuthorityConnector};
use tempfile::TempDir;

/// Identity provider entity id used by the fixtures.
pub const IDP_ENTITY_ID: &str = "https://idp.example.com";

/// Principal known to the attribute source.
pub const PRINCIPAL: &str = "alice";

/// Service providers known to the fixtures, in login order.
pub const SERVICE_PROVIDERS: [&str; 3] = [
    "https://sp-a.example.com",
    "https://sp-b.example.com",
    "https://sp-c.example.com",
];

/// Initializes test logging once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("fed_protocol_saml=debug,fed_sts=debug,fed_session=debug,fed_registry=debug")
        .with_test_writer()
        .try_init();
}

/// A wired-up deployment for one test.
pub struct TestEnv {
    /// Loaded configuration.
    pub config: FederationConfig,
    /// Handler dependencies shared with the pipeline.
    pub deps: HandlerDeps,
    /// Identity provider handler chain.
    pub pipeline: Pipeline,
    /// File-backed token and revocation registries.
    pub registries: Registries,
    /// Local trust authority behind the pool.
    pub authority: Arc<LocalTrustAuthority>,
    /// Connector counting established connections.
    pub connector: Arc<LocalConnector>,
    /// Trust client pool.
    pub pool: StsClientPool,
    /// Signing key of the service providers.
    pub sp_key: Arc<RsaSigningKey>,
    /// Signing key of the identity provider.
    pub idp_key: Arc<EcdsaSigningKey>,
    dir: TempDir,
}

impl TestEnv {
    /// Creates an environment with default settings.
    pub async fn new() -> anyhow::Result<Self> {
        Self::with_vars(&[]).await
    }

    /// Creates an environment with configuration variables applied on top
    /// of the file registry settings.
    pub async fn with_vars(vars: &[(&str, &str)]) -> anyhow::Result<Self> {
        init_tracing();

        let dir = tempfile::tempdir()?;
        let mut lookup: HashMap<String, String> = HashMap::new();
        lookup.insert("FED_REGISTRY_BACKEND".into(), "file".into());
        lookup.insert(
            "FED_TOKEN_FILE".into(),
            dir.path().join("tokens.json").display().to_string(),
        );
        lookup.insert(
            "FED_REVOCATION_FILE".into(),
            dir.path().join("revoked.log").display().to_string(),
        );
        for (key, value) in vars {
            lookup.insert((*key).to_string(), (*value).to_string());
        }
        let config = FederationConfig::from_lookup(|key| lookup.get(key).cloned())?;

        let mut attributes = BTreeMap::new();
        attributes.insert("mail".to_string(), vec!["alice@example.com".to_string()]);
        attributes.insert("role".to_string(), vec!["admin".to_string(), "user".to_string()]);
        let manager = MapAttributeManager::new().with_principal(PRINCIPAL, attributes);
        let deps = HandlerDeps::new(Arc::new(manager));

        let pipeline = Pipeline::from_config(&config.pipeline, &HandlerRegistry::with_defaults(), &deps)?;
        let registries = Registries::from_config(&config.registry).await?;

        let authority = Arc::new(LocalTrustAuthority::new(IDP_ENTITY_ID));
        let connector = Arc::new(LocalConnector::new(Arc::clone(&authority)));
        let pool = StsClientPool::new(
            config.sts_pool.clone(),
            Arc::clone(&connector) as Arc<dyn TrustAuthorityConnector>,
            registries.clone(),
        );

        Ok(Self {
            config,
            deps,
            pipeline,
            registries,
            authority,
            connector,
            pool,
            sp_key: Arc::new(RsaSigningKey::generate(SignatureAlgorithm::RsaSha256)?),
            idp_key: Arc::new(EcdsaSigningKey::generate(SignatureAlgorithm::EcdsaSha256)?),
            dir,
        })
    }

    /// Returns the participant tracker.
    #[must_use]
    pub fn tracker(&self) -> &Arc<ParticipantTracker> {
        &self.deps.tracker
    }

    /// Returns the trust client configuration used by the scenarios.
    pub fn client_config(&self) -> anyhow::Result<StsClientConfig> {
        Ok(StsClientConfig::builder()
            .endpoint_address(format!("{IDP_ENTITY_ID}/sts"))
            .service_name("FederationSTS")
            .port_name("FederationSTSPort")
            .credentials("svc-federation", "changeit")
            .build()?)
    }

    /// Reopens the registries from their files, as another instance would.
    pub async fn reopen_registries(&self) -> anyhow::Result<Registries> {
        Ok(Registries::from_config(&self.config.registry).await?)
    }

    /// Returns the directory holding the registry files.
    #[must_use]
    pub fn data_dir(&self) -> &std::path::Path {
        self.dir.path()
    }
}
