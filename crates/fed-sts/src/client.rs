//! Security token service client.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fed_core::{Event, EventType};
use fed_registry::{Registries, SecurityToken};
use uuid::Uuid;

use crate::authority::{
    RequestSecurityToken, TrustAuthority, TrustAuthorityConnector, ValidationStatus,
};
use crate::config::StsClientConfig;
use crate::error::{StsError, StsResult};

/// A client bound to one trust authority endpoint.
///
/// Issued tokens are recorded in the token registry. Validation consults
/// the revocation registry before the authority is asked.
pub struct StsClient {
    id: Uuid,
    config: StsClientConfig,
    authority: Arc<dyn TrustAuthority>,
    registries: Registries,
    call_timeout: Option<Duration>,
    poisoned: AtomicBool,
}

impl StsClient {
    /// Creates a client over an established authority connection.
    #[must_use]
    pub fn new(
        config: StsClientConfig,
        authority: Arc<dyn TrustAuthority>,
        registries: Registries,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            authority,
            registries,
            call_timeout: None,
            poisoned: AtomicBool::new(false),
        }
    }

    /// Connects a new client.
    ///
    /// # Errors
    ///
    /// Returns the connector's error if the authority cannot be reached.
    pub async fn connect(
        config: StsClientConfig,
        connector: &dyn TrustAuthorityConnector,
        registries: Registries,
    ) -> StsResult<Self> {
        let authority = connector.connect(&config).await?;
        Ok(Self::new(config, authority, registries))
    }

    /// Returns the client's instance id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the configuration the client was built from.
    #[must_use]
    pub const fn config(&self) -> &StsClientConfig {
        &self.config
    }

    /// Bounds each remote call. `None` waits indefinitely.
    pub fn set_call_timeout(&mut self, timeout: Option<Duration>) {
        self.call_timeout = timeout;
    }

    /// Returns the current call bound.
    #[must_use]
    pub const fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    /// Returns whether a timed-out call left the client in an unknown state.
    #[must_use]
    pub fn is_poisoned(&self) -> bool {
        self.poisoned.load(Ordering::SeqCst)
    }

    /// Issues a token of `token_type`.
    ///
    /// # Errors
    ///
    /// See [`issue_token_for`](Self::issue_token_for).
    pub async fn issue_token(&self, token_type: &str) -> StsResult<SecurityToken> {
        self.issue_token_for(None, Some(token_type)).await
    }

    /// Issues a token for the service at `endpoint`.
    ///
    /// # Errors
    ///
    /// See [`issue_token_for`](Self::issue_token_for).
    pub async fn issue_token_for_endpoint(&self, endpoint: &str) -> StsResult<SecurityToken> {
        self.issue_token_for(Some(endpoint), None).await
    }

    /// Issues a token and records it in the token registry.
    ///
    /// # Errors
    ///
    /// - [`StsError::InvalidArgument`] if neither `endpoint` nor
    ///   `token_type` is given.
    /// - [`StsError::Trust`] or [`StsError::Timeout`] if the call fails.
    /// - [`StsError::Registry`] if the token id is already registered.
    pub async fn issue_token_for(
        &self,
        endpoint: Option<&str>,
        token_type: Option<&str>,
    ) -> StsResult<SecurityToken> {
        let endpoint = endpoint.filter(|e| !e.trim().is_empty());
        let token_type = token_type.filter(|t| !t.trim().is_empty());
        if endpoint.is_none() && token_type.is_none() {
            return Err(StsError::invalid_argument(
                "either a token type or an endpoint is required",
            ));
        }

        let request =
            RequestSecurityToken::issue(token_type.map(str::to_string), endpoint.map(str::to_string));
        let token = match self.call(self.authority.issue(&request)).await {
            Ok(token) => token,
            Err(e) => {
                Event::builder(EventType::TokenIssued)
                    .failure(e.to_string())
                    .detail("endpoint", self.config.endpoint_address())
                    .emit();
                return Err(e);
            }
        };

        self.registries.tokens.add_token(&token.id, &token).await?;
        Event::builder(EventType::TokenIssued)
            .success()
            .subject(token.id.as_str())
            .detail("token_type", token.token_type.as_str())
            .detail("applies_to", endpoint.unwrap_or("-"))
            .emit();
        Ok(token)
    }

    /// Renews `token`, replacing its registry entry with the new token.
    ///
    /// # Errors
    ///
    /// - [`StsError::Revoked`] if the token has been canceled.
    /// - [`StsError::Trust`] or [`StsError::Timeout`] if the call fails.
    pub async fn renew_token(
        &self,
        token_type: &str,
        token: &SecurityToken,
    ) -> StsResult<SecurityToken> {
        if self.registries.revocations.is_revoked(&token.token_type, &token.id).await? {
            Event::builder(EventType::TokenRenewed)
                .failure("token revoked")
                .subject(token.id.as_str())
                .emit();
            return Err(StsError::Revoked(token.id.clone()));
        }

        let request = RequestSecurityToken::renew(token_type, token.clone());
        let renewed = self.call(self.authority.renew(&request)).await?;

        // Add before remove: a failed add leaves the old token registered.
        self.registries.tokens.add_token(&renewed.id, &renewed).await?;
        self.registries.tokens.remove_token(&token.id).await?;
        Event::builder(EventType::TokenRenewed)
            .success()
            .subject(renewed.id.as_str())
            .detail("previous", token.id.as_str())
            .emit();
        Ok(renewed)
    }

    /// Returns whether `token` can be trusted.
    ///
    /// # Errors
    ///
    /// See [`validate_token_status`](Self::validate_token_status).
    pub async fn validate_token(&self, token: &SecurityToken) -> StsResult<bool> {
        Ok(self.validate_token_status(token).await?.is_valid())
    }

    /// Validates `token`.
    ///
    /// A revoked id is never valid, whatever the authority says. Expired
    /// tokens are refused without a remote call.
    ///
    /// # Errors
    ///
    /// Returns a registry error, or a trust error if the authority call
    /// fails.
    pub async fn validate_token_status(&self, token: &SecurityToken) -> StsResult<ValidationStatus> {
        let status = if self
            .registries
            .revocations
            .is_revoked(&token.token_type, &token.id)
            .await?
        {
            ValidationStatus::Revoked
        } else if token.is_expired() {
            ValidationStatus::Expired
        } else {
            let request = RequestSecurityToken::validate(token.clone());
            if self.call(self.authority.validate(&request)).await? {
                ValidationStatus::Valid
            } else {
                ValidationStatus::Rejected
            }
        };

        let event = Event::builder(EventType::TokenValidated).subject(token.id.as_str());
        if status.is_valid() {
            event.success().emit();
        } else {
            event.failure(format!("{status:?}").to_lowercase()).emit();
        }
        Ok(status)
    }

    /// Cancels `token`.
    ///
    /// The id is revoked locally before the authority is told, so the
    /// cancellation holds even if the remote call fails.
    ///
    /// # Errors
    ///
    /// Returns a registry error, or a trust error from the remote cancel.
    pub async fn cancel_token(&self, token: &SecurityToken) -> StsResult<()> {
        self.registries.revocations.revoke(&token.token_type, &token.id).await?;
        self.registries.tokens.remove_token(&token.id).await?;

        let request = RequestSecurityToken::cancel(token.clone());
        if let Err(e) = self.call(self.authority.cancel(&request)).await {
            Event::builder(EventType::TokenCanceled)
                .failure(e.to_string())
                .subject(token.id.as_str())
                .detail("revoked", "true")
                .emit();
            return Err(e);
        }

        Event::builder(EventType::TokenCanceled)
            .success()
            .subject(token.id.as_str())
            .emit();
        Ok(())
    }

    /// Takes the client back from a lease ending in `PooledClient::drop`.
    pub(crate) fn reclaim(&self, call_timeout: Option<Duration>) -> Self {
        Self {
            id: self.id,
            config: self.config.clone(),
            authority: Arc::clone(&self.authority),
            registries: self.registries.clone(),
            call_timeout,
            poisoned: AtomicBool::new(self.is_poisoned()),
        }
    }

    async fn call<T>(&self, fut: impl Future<Output = StsResult<T>> + Send) -> StsResult<T> {
        let Some(limit) = self.call_timeout else {
            return fut.await;
        };
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                self.poisoned.store(true, Ordering::SeqCst);
                tracing::warn!(
                    client_id = %self.id,
                    endpoint = self.config.endpoint_address(),
                    timeout_ms = limit.as_millis(),
                    "trust authority call timed out, client poisoned"
                );
                Err(StsError::Timeout(limit))
            }
        }
    }
}

impl std::fmt::Debug for StsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StsClient")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("call_timeout", &self.call_timeout)
            .field("poisoned", &self.is_poisoned())
            .finish_non_exhaustive()
    }
}
