//! Digital signature operations.

use thiserror::Error;

use crate::algorithm::{AlgorithmError, SignatureAlgorithm};
use crate::keys::VerifyingKey;

/// Error type for signature operations.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Key generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Verification failed.
    #[error("signature verification failed")]
    Verification,

    /// Invalid key format.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Key type does not match the requested algorithm.
    #[error("key type {key} cannot be used with {algorithm:?}")]
    KeyMismatch {
        /// Key kind.
        key: &'static str,
        /// Requested algorithm.
        algorithm: SignatureAlgorithm,
    },

    /// Algorithm not supported.
    #[error("algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),
}

impl From<AlgorithmError> for SignatureError {
    fn from(err: AlgorithmError) -> Self {
        Self::UnsupportedAlgorithm(err.to_string())
    }
}

/// A private key able to produce signatures for one algorithm.
pub trait SigningKey: Send + Sync {
    /// Returns the signature algorithm.
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Returns the key ID.
    fn key_id(&self) -> &str;

    /// Signs the given data.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignatureError>;

    /// Returns the matching public key.
    fn verifying_key(&self) -> VerifyingKey;
}

/// Verifies `signature` over `data`.
///
/// Convenience wrapper over [`VerifyingKey::verify`] that takes the
/// algorithm as a URI, the way it arrives in `SigAlg` or
/// `SignatureMethod`.
///
/// # Errors
///
/// Returns [`SignatureError::UnsupportedAlgorithm`] for unknown or
/// deprecated URIs and [`SignatureError::Verification`] on mismatch.
pub fn verify_with_uri(
    key: &VerifyingKey,
    algorithm_uri: &str,
    data: &[u8],
    signature: &[u8],
) -> Result<(), SignatureError> {
    let algorithm = SignatureAlgorithm::from_uri(algorithm_uri)?;
    key.verify(algorithm, data, signature)
}
