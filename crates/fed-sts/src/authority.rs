//! Trust authority contract and a process-local authority.
//!
//! The transport to a remote security token service is external; clients
//! only depend on [`TrustAuthority`] and obtain one through a
//! [`TrustAuthorityConnector`].

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use fed_registry::SecurityToken;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::StsClientConfig;
use crate::error::{StsError, StsResult};

/// Token type URI of a SAML 2.0 assertion.
pub const SAML2_TOKEN_TYPE: &str =
    "http://docs.oasis-open.org/wss/oasis-wss-saml-token-profile-1.1#SAMLV2.0";

/// WS-Trust request type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestType {
    /// Issue a new token.
    Issue,
    /// Renew an existing token.
    Renew,
    /// Validate a token.
    Validate,
    /// Cancel a token.
    Cancel,
}

impl RequestType {
    /// Returns the WS-Trust request type URI.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Issue => "http://docs.oasis-open.org/ws-sx/ws-trust/200512/Issue",
            Self::Renew => "http://docs.oasis-open.org/ws-sx/ws-trust/200512/Renew",
            Self::Validate => "http://docs.oasis-open.org/ws-sx/ws-trust/200512/Validate",
            Self::Cancel => "http://docs.oasis-open.org/ws-sx/ws-trust/200512/Cancel",
        }
    }

    /// Returns the short name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::Renew => "renew",
            Self::Validate => "validate",
            Self::Cancel => "cancel",
        }
    }
}

/// A request to the trust authority.
#[derive(Debug, Clone)]
pub struct RequestSecurityToken {
    /// What is being asked for.
    pub request_type: RequestType,
    /// Requested token type URI.
    pub token_type: Option<String>,
    /// Service endpoint the token is for.
    pub applies_to: Option<String>,
    /// Token being renewed, validated or canceled.
    pub existing_token: Option<SecurityToken>,
    /// Correlates the request with its response.
    pub context: String,
}

impl RequestSecurityToken {
    fn with_type(request_type: RequestType) -> Self {
        Self {
            request_type,
            token_type: None,
            applies_to: None,
            existing_token: None,
            context: Uuid::new_v4().to_string(),
        }
    }

    /// Creates an issue request.
    #[must_use]
    pub fn issue(token_type: Option<String>, applies_to: Option<String>) -> Self {
        Self {
            token_type,
            applies_to,
            ..Self::with_type(RequestType::Issue)
        }
    }

    /// Creates a renew request.
    #[must_use]
    pub fn renew(token_type: impl Into<String>, token: SecurityToken) -> Self {
        Self {
            token_type: Some(token_type.into()),
            existing_token: Some(token),
            ..Self::with_type(RequestType::Renew)
        }
    }

    /// Creates a validate request.
    #[must_use]
    pub fn validate(token: SecurityToken) -> Self {
        Self {
            token_type: Some(token.token_type.clone()),
            existing_token: Some(token),
            ..Self::with_type(RequestType::Validate)
        }
    }

    /// Creates a cancel request.
    #[must_use]
    pub fn cancel(token: SecurityToken) -> Self {
        Self {
            token_type: Some(token.token_type.clone()),
            existing_token: Some(token),
            ..Self::with_type(RequestType::Cancel)
        }
    }
}

/// Outcome of validating a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    /// The token is trusted.
    Valid,
    /// The token id is in the revocation registry.
    Revoked,
    /// The token is past its expiry.
    Expired,
    /// The trust authority refused the token.
    Rejected,
}

impl ValidationStatus {
    /// Returns whether the token may be trusted.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// A remote security token service.
#[async_trait]
pub trait TrustAuthority: Send + Sync {
    /// Issues a token.
    async fn issue(&self, request: &RequestSecurityToken) -> StsResult<SecurityToken>;

    /// Issues a replacement for `request.existing_token`.
    async fn renew(&self, request: &RequestSecurityToken) -> StsResult<SecurityToken>;

    /// Returns whether the authority accepts the token.
    async fn validate(&self, request: &RequestSecurityToken) -> StsResult<bool>;

    /// Cancels the token on the authority side.
    async fn cancel(&self, request: &RequestSecurityToken) -> StsResult<()>;
}

/// Establishes connections to a trust authority.
#[async_trait]
pub trait TrustAuthorityConnector: Send + Sync {
    /// Connects using `config`.
    async fn connect(&self, config: &StsClientConfig) -> StsResult<Arc<dyn TrustAuthority>>;
}

/// A trust authority living in the current process.
///
/// Issues opaque SAML 2.0 style tokens and remembers what it issued.
/// Latency and outages can be simulated.
#[derive(Debug)]
pub struct LocalTrustAuthority {
    issuer: String,
    lifetime: chrono::Duration,
    issued: DashMap<String, SecurityToken>,
    latency: parking_lot::RwLock<Option<Duration>>,
    available: AtomicBool,
}

impl LocalTrustAuthority {
    /// Creates an authority that issues tokens valid for one hour.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            lifetime: chrono::Duration::hours(1),
            issued: DashMap::new(),
            latency: parking_lot::RwLock::new(None),
            available: AtomicBool::new(true),
        }
    }

    /// Sets the lifetime of issued tokens.
    #[must_use]
    pub const fn with_lifetime(mut self, lifetime: chrono::Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Delays every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write() = latency;
    }

    /// Makes every call fail with a trust error while `false`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Returns the number of live issued tokens.
    #[must_use]
    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    async fn enter(&self, request: &RequestSecurityToken) -> StsResult<()> {
        let latency = *self.latency.read();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(StsError::trust(format!(
                "{} unavailable for {} request",
                self.issuer,
                request.request_type.as_str()
            )));
        }
        Ok(())
    }

    fn mint(&self, token_type: &str, applies_to: Option<&str>) -> SecurityToken {
        let id = format!("ID_{}", Uuid::new_v4());
        let audience = applies_to.unwrap_or("-");
        let payload = format!(
            "<saml:Assertion xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\" ID=\"{id}\" \
             IssueInstant=\"{}\"><saml:Issuer>{}</saml:Issuer>\
             <saml:Conditions><saml:AudienceRestriction><saml:Audience>{audience}</saml:Audience>\
             </saml:AudienceRestriction></saml:Conditions></saml:Assertion>",
            Utc::now().to_rfc3339(),
            self.issuer
        );
        let token = SecurityToken::new(id.clone(), token_type, payload.into_bytes())
            .with_lifetime(self.lifetime);
        self.issued.insert(id, token.clone());
        token
    }

    fn existing<'a>(request: &'a RequestSecurityToken) -> StsResult<&'a SecurityToken> {
        request.existing_token.as_ref().ok_or_else(|| {
            StsError::invalid_argument(format!(
                "{} request requires a token",
                request.request_type.as_str()
            ))
        })
    }
}

#[async_trait]
impl TrustAuthority for LocalTrustAuthority {
    async fn issue(&self, request: &RequestSecurityToken) -> StsResult<SecurityToken> {
        self.enter(request).await?;
        let token_type = request.token_type.as_deref().unwrap_or(SAML2_TOKEN_TYPE);
        Ok(self.mint(token_type, request.applies_to.as_deref()))
    }

    async fn renew(&self, request: &RequestSecurityToken) -> StsResult<SecurityToken> {
        self.enter(request).await?;
        let token = Self::existing(request)?;
        if self.issued.remove(&token.id).is_none() {
            return Err(StsError::trust(format!("unknown token: {}", token.id)));
        }
        let token_type = request.token_type.as_deref().unwrap_or(&token.token_type);
        Ok(self.mint(token_type, request.applies_to.as_deref()))
    }

    async fn validate(&self, request: &RequestSecurityToken) -> StsResult<bool> {
        self.enter(request).await?;
        let token = Self::existing(request)?;
        Ok(self
            .issued
            .get(&token.id)
            .is_some_and(|issued| issued.payload == token.payload && !issued.is_expired()))
    }

    async fn cancel(&self, request: &RequestSecurityToken) -> StsResult<()> {
        self.enter(request).await?;
        let token = Self::existing(request)?;
        self.issued.remove(&token.id);
        Ok(())
    }
}

/// Connector handing out a shared [`LocalTrustAuthority`].
#[derive(Debug)]
pub struct LocalConnector {
    authority: Arc<LocalTrustAuthority>,
    connections: AtomicUsize,
}

impl LocalConnector {
    /// Creates a connector for `authority`.
    #[must_use]
    pub const fn new(authority: Arc<LocalTrustAuthority>) -> Self {
        Self {
            authority,
            connections: AtomicUsize::new(0),
        }
    }

    /// Returns the authority.
    #[must_use]
    pub fn authority(&self) -> &Arc<LocalTrustAuthority> {
        &self.authority
    }

    /// Returns how many connections have been established.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TrustAuthorityConnector for LocalConnector {
    async fn connect(&self, config: &StsClientConfig) -> StsResult<Arc<dyn TrustAuthority>> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(endpoint = config.endpoint_address(), "trust authority connected");
        Ok(Arc::clone(&self.authority) as Arc<dyn TrustAuthority>)
    }
}
