//! SAML bindings.
//!
//! - **HTTP-POST** - the document is base64-encoded into a form field and
//!   any signature is embedded in the document
//! - **HTTP-Redirect** - the document is deflated, base64-encoded and
//!   URL-encoded into the query string, with a detached signature over the
//!   query parameters
//!
//! Rendering the auto-submitting form or the redirect response is left to
//! the transport layer.

mod post;
mod redirect;

pub use post::*;
pub use redirect::*;

use crate::types::params;

/// SAML message type for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// A request (`SAMLRequest`).
    Request,
    /// A response (`SAMLResponse`).
    Response,
}

impl SamlMessageType {
    /// Returns the form or query parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => params::SAML_REQUEST,
            Self::Response => params::SAML_RESPONSE,
        }
    }
}

/// Decoded SAML binding message.
#[derive(Debug, Clone)]
pub struct DecodedMessage {
    /// The decoded XML message.
    pub xml: String,
    /// The message type (request or response).
    pub message_type: SamlMessageType,
    /// The RelayState if present.
    pub relay_state: Option<String>,
    /// The signature, base64 (Redirect binding only).
    pub signature: Option<String>,
    /// The signature algorithm URI (Redirect binding only).
    pub sig_alg: Option<String>,
}
