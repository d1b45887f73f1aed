//! Algorithm identifiers for XML and query-string signatures.
//!
//! Algorithms are named by their XML-DSig URIs, which is how both the
//! `SignatureMethod`/`DigestMethod` elements and the redirect binding's
//! `SigAlg` parameter refer to them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for algorithm lookups.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AlgorithmError {
    /// Algorithm is known but too weak to accept.
    #[error("algorithm '{0}' is deprecated and not accepted")]
    Deprecated(String),

    /// Unknown algorithm.
    #[error("unknown algorithm: {0}")]
    Unknown(String),
}

/// Digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-256.
    #[serde(rename = "SHA256")]
    Sha256,

    /// SHA-384.
    #[serde(rename = "SHA384")]
    Sha384,

    /// SHA-512.
    #[serde(rename = "SHA512")]
    Sha512,
}

impl HashAlgorithm {
    /// Returns the output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Returns the XML-DSig `DigestMethod` URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::Sha256 => "http://www.w3.org/2001/04/xmlenc#sha256",
            Self::Sha384 => "http://www.w3.org/2001/04/xmldsig-more#sha384",
            Self::Sha512 => "http://www.w3.org/2001/04/xmlenc#sha512",
        }
    }

    /// Parses a `DigestMethod` URI.
    ///
    /// # Errors
    ///
    /// Returns an error for SHA-1 and for unknown URIs.
    pub fn from_uri(uri: &str) -> Result<Self, AlgorithmError> {
        match uri {
            "http://www.w3.org/2001/04/xmlenc#sha256" => Ok(Self::Sha256),
            "http://www.w3.org/2001/04/xmldsig-more#sha384" => Ok(Self::Sha384),
            "http://www.w3.org/2001/04/xmlenc#sha512" => Ok(Self::Sha512),
            "http://www.w3.org/2000/09/xmldsig#sha1" => {
                Err(AlgorithmError::Deprecated(uri.to_string()))
            }
            _ => Err(AlgorithmError::Unknown(uri.to_string())),
        }
    }
}

/// Signature algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-256.
    #[default]
    #[serde(rename = "RSA-SHA256")]
    RsaSha256,

    /// RSA PKCS#1 v1.5 with SHA-384.
    #[serde(rename = "RSA-SHA384")]
    RsaSha384,

    /// RSA PKCS#1 v1.5 with SHA-512.
    #[serde(rename = "RSA-SHA512")]
    RsaSha512,

    /// ECDSA on P-256 with SHA-256.
    #[serde(rename = "ECDSA-SHA256")]
    EcdsaSha256,

    /// ECDSA on P-384 with SHA-384.
    #[serde(rename = "ECDSA-SHA384")]
    EcdsaSha384,
}

impl SignatureAlgorithm {
    /// Returns the XML-DSig `SignatureMethod` URI.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::RsaSha256 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
            Self::RsaSha384 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384",
            Self::RsaSha512 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512",
            Self::EcdsaSha256 => "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256",
            Self::EcdsaSha384 => "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384",
        }
    }

    /// Parses a `SignatureMethod` or `SigAlg` URI.
    ///
    /// # Errors
    ///
    /// Returns an error for SHA-1/DSA variants and for unknown URIs.
    pub fn from_uri(uri: &str) -> Result<Self, AlgorithmError> {
        match uri {
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256" => Ok(Self::RsaSha256),
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384" => Ok(Self::RsaSha384),
            "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512" => Ok(Self::RsaSha512),
            "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256" => Ok(Self::EcdsaSha256),
            "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384" => Ok(Self::EcdsaSha384),
            "http://www.w3.org/2000/09/xmldsig#rsa-sha1"
            | "http://www.w3.org/2000/09/xmldsig#dsa-sha1"
            | "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha1" => {
                Err(AlgorithmError::Deprecated(uri.to_string()))
            }
            _ => Err(AlgorithmError::Unknown(uri.to_string())),
        }
    }

    /// Returns the digest algorithm paired with this signature algorithm.
    #[must_use]
    pub const fn hash_algorithm(self) -> HashAlgorithm {
        match self {
            Self::RsaSha256 | Self::EcdsaSha256 => HashAlgorithm::Sha256,
            Self::RsaSha384 | Self::EcdsaSha384 => HashAlgorithm::Sha384,
            Self::RsaSha512 => HashAlgorithm::Sha512,
        }
    }

    /// Returns whether this is an ECDSA algorithm.
    #[must_use]
    pub const fn is_ecdsa(self) -> bool {
        matches!(self, Self::EcdsaSha256 | Self::EcdsaSha384)
    }

    /// Returns whether this is an RSA algorithm.
    #[must_use]
    pub const fn is_rsa(self) -> bool {
        matches!(self, Self::RsaSha256 | Self::RsaSha384 | Self::RsaSha512)
    }
}
