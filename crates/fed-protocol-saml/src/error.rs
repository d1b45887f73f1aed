//! SAML error types.
//!
//! Provides error types for message decoding, signature handling and the
//! handler chain, with mappings to SAML status codes, HTTP status codes
//! and the chain's error codes.

use fed_crypto::SignatureError;
use fed_session::SessionError;
use thiserror::Error;

use crate::handlers::ErrorCode;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML protocol errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// Invalid SAML request format or content.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid SAML response format or content.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// XML structure could not be located or was malformed.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// XML or detached signature validation failed.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// XML signature creation failed.
    #[error("signature creation failed: {0}")]
    SignatureCreation(String),

    /// Missing required element or attribute.
    #[error("missing required element: {0}")]
    MissingElement(String),

    /// A handler option required for this message was not supplied.
    #[error("missing handler option: {0}")]
    MissingOption(String),

    /// The message issuer is not trusted.
    #[error("issuer not trusted: {0}")]
    IssuerNotTrusted(String),

    /// Unknown or unsupported binding.
    #[error("unsupported binding: {0}")]
    UnsupportedBinding(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Deflate decompression error.
    #[error("deflate error: {0}")]
    Deflate(String),

    /// Session tracking error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Attribute resolution failed.
    #[error("attribute resolution failed: {0}")]
    AttributeResolution(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Handler configuration error.
    #[error("handler configuration error: {0}")]
    Configuration(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SamlError {
    /// Returns the SAML status code for this error.
    #[must_use]
    pub fn status_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidResponse(_)
            | Self::MissingElement(_)
            | Self::XmlParse(_)
            | Self::Base64Decode(_)
            | Self::Deflate(_)
            | Self::SignatureInvalid(_) => crate::types::status_codes::REQUESTER,
            Self::IssuerNotTrusted(_) => crate::types::status_codes::REQUEST_DENIED,
            Self::UnsupportedBinding(_) => crate::types::status_codes::REQUEST_UNSUPPORTED,
            _ => crate::types::status_codes::RESPONDER,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidResponse(_)
            | Self::MissingElement(_)
            | Self::Base64Decode(_)
            | Self::Deflate(_)
            | Self::XmlParse(_)
            | Self::UnsupportedBinding(_) => 400,
            Self::SignatureInvalid(_) => 401,
            Self::IssuerNotTrusted(_) => 403,
            Self::Session(SessionError::LogoutInProgress(_)) => 409,
            _ => 500,
        }
    }

    /// Returns the handler chain error code for this error.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::SignatureInvalid(_) => ErrorCode::SignatureInvalid,
            Self::IssuerNotTrusted(_) => ErrorCode::IssuerNotTrusted,
            Self::InvalidRequest(_)
            | Self::MissingElement(_)
            | Self::XmlParse(_)
            | Self::Base64Decode(_)
            | Self::Deflate(_)
            | Self::UnsupportedBinding(_) => ErrorCode::InvalidRequest,
            Self::InvalidResponse(_) => ErrorCode::InvalidResponse,
            Self::Session(_) => ErrorCode::SessionError,
            Self::AttributeResolution(_) => ErrorCode::AttributeResolution,
            Self::MissingOption(_) | Self::Configuration(_) => ErrorCode::Configuration,
            Self::SignatureCreation(_) | Self::Crypto(_) | Self::Internal(_) => {
                ErrorCode::Processing
            }
        }
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<SignatureError> for SamlError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::Verification => {
                Self::SignatureInvalid("signature value does not verify".to_string())
            }
            SignatureError::KeyMismatch { .. } | SignatureError::UnsupportedAlgorithm(_) => {
                Self::SignatureInvalid(err.to_string())
            }
            other => Self::Crypto(other.to_string()),
        }
    }
}
