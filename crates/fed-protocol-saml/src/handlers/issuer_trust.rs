//! Issuer trust check.

use async_trait::async_trait;
use fed_core::{Event, EventType, HandlerConfig};

use super::invocation::{HandlerInvocation, InvocationOptions};
use super::Handler;
use crate::error::{SamlError, SamlResult};

/// Rejects inbound messages whose issuer host lies outside the trusted
/// domains.
///
/// A host is trusted if it equals a trusted domain or is a subdomain of
/// one. Domains come from the `trusted-domains` configuration option
/// (comma-separated) plus [`InvocationOptions::TRUSTED_DOMAINS`].
#[derive(Debug, Clone, Default)]
pub struct IssuerTrustHandler {
    trusted_domains: Vec<String>,
}

impl IssuerTrustHandler {
    /// Configuration type tag.
    pub const TYPE_TAG: &'static str = "issuer-trust";

    /// Creates the handler with a fixed set of trusted domains.
    #[must_use]
    pub fn new(trusted_domains: Vec<String>) -> Self {
        Self {
            trusted_domains: trusted_domains
                .into_iter()
                .map(|d| d.trim().to_ascii_lowercase())
                .filter(|d| !d.is_empty())
                .collect(),
        }
    }

    /// Builds the handler from configuration.
    #[must_use]
    pub fn from_config(config: &HandlerConfig) -> Self {
        let domains = config
            .option("trusted-domains")
            .map(|list| list.split(',').map(String::from).collect())
            .unwrap_or_default();
        Self::new(domains)
    }

    fn check(&self, invocation: &HandlerInvocation) -> SamlResult<()> {
        if !invocation.is_inbound() {
            return Ok(());
        }

        let extra = invocation.options.list(InvocationOptions::TRUSTED_DOMAINS);
        if self.trusted_domains.is_empty() && extra.is_empty() {
            return Err(SamlError::Configuration("no trusted domains configured".to_string()));
        }

        let issuer = invocation.message.issuer();
        let host = issuer_host(issuer);
        let trusted = host.as_deref().is_some_and(|host| {
            self.trusted_domains
                .iter()
                .map(String::as_str)
                .chain(extra.iter().map(|d| d.trim()))
                .any(|domain| domain_matches(host, domain))
        });

        if trusted {
            return Ok(());
        }

        let mut event = Event::builder(EventType::IssuerRejected)
            .failure("issuer not trusted")
            .subject(issuer)
            .detail("message_id", invocation.message.id());
        if let Some(session) = &invocation.session_id {
            event = event.session(session.as_str());
        }
        event.emit();
        Err(SamlError::IssuerNotTrusted(issuer.to_string()))
    }
}

/// Host of a URL-shaped issuer. Issuers that are not URLs have no host.
fn issuer_host(issuer: &str) -> Option<String> {
    url::Url::parse(issuer)
        .ok()
        .and_then(|url| url.host_str().map(str::to_ascii_lowercase))
}

fn domain_matches(host: &str, domain: &str) -> bool {
    let domain = domain.trim_start_matches('.');
    if domain.is_empty() {
        return false;
    }
    host.eq_ignore_ascii_case(domain)
        || host
            .len()
            .checked_sub(domain.len() + 1)
            .is_some_and(|dot| host.as_bytes()[dot] == b'.' && host[dot + 1..].eq_ignore_ascii_case(domain))
}

#[async_trait]
impl Handler for IssuerTrustHandler {
    fn name(&self) -> &str {
        Self::TYPE_TAG
    }

    async fn handle_request(&self, invocation: &mut HandlerInvocation) -> SamlResult<()> {
        self.check(invocation)
    }

    async fn handle_status_response(&self, invocation: &mut HandlerInvocation) -> SamlResult<()> {
        self.check(invocation)
    }
}
