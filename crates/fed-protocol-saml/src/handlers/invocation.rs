//! Per-exchange handler context.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use fed_core::HandlerRole;
use fed_crypto::{SigningKey, VerifyingKey};
use fed_session::AttributeSet;

use super::ErrorCode;
use crate::types::{Binding, Direction, ProtocolMessage};

/// A value in the invocation options map.
#[derive(Clone)]
pub enum OptionValue {
    /// Boolean switch.
    Flag(bool),
    /// Single string.
    Text(String),
    /// List of strings.
    List(Vec<String>),
    /// Public key of the message sender.
    PublicKey(VerifyingKey),
    /// Private key used for outbound signatures.
    SigningKey(Arc<dyn SigningKey>),
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag(v) => f.debug_tuple("Flag").field(v).finish(),
            Self::Text(v) => f.debug_tuple("Text").field(v).finish(),
            Self::List(v) => f.debug_tuple("List").field(v).finish(),
            Self::PublicKey(k) => f.debug_tuple("PublicKey").field(k).finish(),
            Self::SigningKey(k) => f.debug_tuple("SigningKey").field(&k.key_id()).finish(),
        }
    }
}

/// Mutable key/value options shared by the handlers of one invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationOptions {
    values: BTreeMap<String, OptionValue>,
}

impl InvocationOptions {
    /// Public key of the sender ([`OptionValue::PublicKey`]).
    pub const SENDER_PUBLIC_KEY: &'static str = "sender-public-key";
    /// Skip signature validation ([`OptionValue::Flag`]).
    pub const IGNORE_SIGNATURES: &'static str = "ignore-signatures";
    /// Key for outbound signatures ([`OptionValue::SigningKey`]).
    pub const SIGNING_KEY: &'static str = "signing-key";
    /// Additional trusted issuer domains ([`OptionValue::List`]).
    pub const TRUSTED_DOMAINS: &'static str = "trusted-domains";

    /// Creates an empty options map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: OptionValue) -> Option<OptionValue> {
        self.values.insert(key.into(), value)
    }

    /// Removes an option.
    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.values.remove(key)
    }

    /// Returns an option.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.values.get(key)
    }

    /// Returns a flag; absent or non-flag options read as `false`.
    #[must_use]
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.values.get(key), Some(OptionValue::Flag(true)))
    }

    /// Returns a text option.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(OptionValue::Text(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns a list option; absent options read as empty.
    #[must_use]
    pub fn list(&self, key: &str) -> &[String] {
        match self.values.get(key) {
            Some(OptionValue::List(v)) => v,
            _ => &[],
        }
    }

    /// Returns a public key option.
    #[must_use]
    pub fn public_key(&self, key: &str) -> Option<&VerifyingKey> {
        match self.values.get(key) {
            Some(OptionValue::PublicKey(k)) => Some(k),
            _ => None,
        }
    }

    /// Returns a signing key option.
    #[must_use]
    pub fn signing_key(&self, key: &str) -> Option<Arc<dyn SigningKey>> {
        match self.values.get(key) {
            Some(OptionValue::SigningKey(k)) => Some(Arc::clone(k)),
            _ => None,
        }
    }
}

/// Error recorded on a failed handler response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    /// Error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Output populated by the handler chain.
#[derive(Debug, Clone, Default)]
pub struct HandlerResponse {
    /// Set when a handler failed.
    pub error: Option<HandlerError>,
    /// Where the next message should be sent.
    pub destination: Option<String>,
    /// Signed POST document (outbound).
    pub signed_document: Option<String>,
    /// Signed redirect query string (outbound).
    pub signed_query: Option<String>,
    /// Attributes resolved for the principal.
    pub attributes: Option<Arc<AttributeSet>>,
    /// Participant the next logout request goes to.
    pub logout_participant: Option<String>,
    /// Global logout finished for the session.
    pub logout_complete: bool,
    /// The local session was terminated.
    pub session_terminated: bool,
}

impl HandlerResponse {
    /// Returns whether no handler reported an error.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Context for one inbound or outbound protocol exchange.
#[derive(Debug, Clone)]
pub struct HandlerInvocation {
    /// The parsed message.
    pub message: ProtocolMessage,
    /// Transport binding.
    pub binding: Binding,
    /// Inbound or outbound.
    pub direction: Direction,
    /// Role of the pipeline processing this invocation.
    pub role: HandlerRole,
    /// Browser session the exchange belongs to.
    pub session_id: Option<String>,
    /// Authenticated principal, if any.
    pub principal: Option<String>,
    /// Raw bytes needed for signatures: the document for POST, the exact
    /// query string for Redirect.
    pub raw_message: Option<String>,
    /// Relay state travelling with the message.
    pub relay_state: Option<String>,
    /// Shared options.
    pub options: InvocationOptions,
    /// Output.
    pub response: HandlerResponse,
}

impl HandlerInvocation {
    /// Creates an invocation for a received message.
    #[must_use]
    pub fn inbound(message: impl Into<ProtocolMessage>, binding: Binding) -> Self {
        Self::new(message.into(), binding, Direction::Inbound)
    }

    /// Creates an invocation for a message about to be sent.
    #[must_use]
    pub fn outbound(message: impl Into<ProtocolMessage>, binding: Binding) -> Self {
        Self::new(message.into(), binding, Direction::Outbound)
    }

    fn new(message: ProtocolMessage, binding: Binding, direction: Direction) -> Self {
        Self {
            message,
            binding,
            direction,
            role: HandlerRole::IdentityProvider,
            session_id: None,
            principal: None,
            raw_message: None,
            relay_state: None,
            options: InvocationOptions::new(),
            response: HandlerResponse::default(),
        }
    }

    /// Sets the session.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the authenticated principal.
    #[must_use]
    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    /// Sets the raw document or query string.
    #[must_use]
    pub fn with_raw_message(mut self, raw: impl Into<String>) -> Self {
        self.raw_message = Some(raw.into());
        self
    }

    /// Sets the relay state.
    #[must_use]
    pub fn with_relay_state(mut self, relay_state: impl Into<String>) -> Self {
        self.relay_state = Some(relay_state.into());
        self
    }

    /// Sets an option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: OptionValue) -> Self {
        self.options.insert(key, value);
        self
    }

    /// Returns whether the message was received.
    #[must_use]
    pub fn is_inbound(&self) -> bool {
        self.direction == Direction::Inbound
    }
}
