//! Security token model.

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A token issued by a trust authority.
///
/// The identifier is assigned by the authority and is the registry's
/// primary key. The payload is opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityToken {
    /// Globally unique token identifier.
    pub id: String,

    /// Token type URI, e.g. a SAML 2.0 assertion.
    pub token_type: String,

    /// Serialized token.
    #[serde(with = "payload_base64")]
    pub payload: Vec<u8>,

    /// Issue time.
    pub issued_at: DateTime<Utc>,

    /// Expiry, if the token has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl SecurityToken {
    /// Creates a token issued now with no expiry.
    #[must_use]
    pub fn new(id: impl Into<String>, token_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            token_type: token_type.into(),
            payload,
            issued_at: Utc::now(),
            expires_at: None,
        }
    }

    /// Sets the issue time.
    #[must_use]
    pub const fn with_issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issued_at = issued_at;
        self
    }

    /// Sets an absolute expiry.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Sets the expiry relative to the issue time.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.expires_at = Some(self.issued_at + lifetime);
        self
    }

    /// Returns whether the token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Returns whether the token is expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

mod payload_base64 {
    use super::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(text)
            .map_err(serde::de::Error::custom)
    }
}
