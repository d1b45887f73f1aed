//! Key handling for signing and verification.
//!
//! Private keys are RSA or ECDSA key pairs held by aws-lc-rs. Public keys
//! are accepted in the forms federation partners publish them:
//! `SubjectPublicKeyInfo` DER, PKCS#1 `RSAPublicKey` DER, PEM, or an X.509
//! certificate (DER, PEM or the bare base64 found in metadata).

use std::fmt;

use aws_lc_rs::{
    rand::SystemRandom,
    rsa::KeySize,
    signature::{
        self, EcdsaKeyPair, KeyPair, RsaKeyPair, UnparsedPublicKey,
        ECDSA_P256_SHA256_FIXED_SIGNING, ECDSA_P384_SHA384_FIXED_SIGNING,
    },
};
use base64::Engine;
use x509_parser::prelude::FromDer;
use x509_parser::public_key::PublicKey;
use x509_parser::x509::SubjectPublicKeyInfo;

use crate::algorithm::SignatureAlgorithm;
use crate::signature::{SignatureError, SigningKey};

const MIN_RSA_BITS: usize = 2048;
const P256_POINT_LEN: usize = 65;
const P384_POINT_LEN: usize = 97;

/// Public key family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// RSA key.
    Rsa,
    /// ECDSA key on P-256.
    EcP256,
    /// ECDSA key on P-384.
    EcP384,
}

impl KeyKind {
    const fn name(self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::EcP256 => "EC P-256",
            Self::EcP384 => "EC P-384",
        }
    }
}

/// A public key used to verify signatures.
///
/// Holds the raw key material aws-lc-rs verifies against: a PKCS#1
/// `RSAPublicKey` for RSA, an uncompressed point for EC.
#[derive(Clone, PartialEq, Eq)]
pub struct VerifyingKey {
    kind: KeyKind,
    bytes: Vec<u8>,
    key_id: String,
}

impl VerifyingKey {
    fn new(kind: KeyKind, bytes: Vec<u8>) -> Self {
        let key_id = generate_key_id(&bytes);
        Self { kind, bytes, key_id }
    }

    /// Parses a DER public key (`SubjectPublicKeyInfo` or PKCS#1 RSA).
    ///
    /// # Errors
    ///
    /// Returns an error if the key type is unsupported or the bytes are
    /// not a DER sequence.
    pub fn from_der(der: &[u8]) -> Result<Self, SignatureError> {
        if let Ok((_, spki)) = SubjectPublicKeyInfo::from_der(der) {
            return Self::from_spki(&spki);
        }

        // Not an SPKI: a bare RSAPublicKey is a SEQUENCE of two INTEGERs.
        if der.first() == Some(&0x30) && der.len() > 16 {
            return Ok(Self::new(KeyKind::Rsa, der.to_vec()));
        }

        Err(SignatureError::InvalidKey(
            "expected SubjectPublicKeyInfo or RSAPublicKey DER".to_string(),
        ))
    }

    /// Extracts the public key from a DER X.509 certificate.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be parsed.
    pub fn from_certificate_der(der: &[u8]) -> Result<Self, SignatureError> {
        let (_, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| SignatureError::InvalidKey(format!("invalid certificate: {e}")))?;
        Self::from_spki(cert.public_key())
    }

    /// Extracts the public key from a base64 certificate body, as carried in
    /// `<ds:X509Certificate>` elements.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not base64 or not a certificate.
    pub fn from_certificate_base64(text: &str) -> Result<Self, SignatureError> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let der = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| SignatureError::InvalidKey(format!("invalid base64: {e}")))?;
        Self::from_certificate_der(&der)
    }

    /// Parses a PEM `CERTIFICATE`, `PUBLIC KEY` or `RSA PUBLIC KEY` block.
    ///
    /// # Errors
    ///
    /// Returns an error if no supported block is found.
    pub fn from_pem(pem: &str) -> Result<Self, SignatureError> {
        if let Some(der) = pem_to_der(pem, "CERTIFICATE") {
            return Self::from_certificate_der(&der);
        }
        if let Some(der) = pem_to_der(pem, "PUBLIC KEY") {
            return Self::from_der(&der);
        }
        if let Some(der) = pem_to_der(pem, "RSA PUBLIC KEY") {
            return Ok(Self::new(KeyKind::Rsa, der));
        }
        Err(SignatureError::InvalidKey(
            "no CERTIFICATE or PUBLIC KEY block found".to_string(),
        ))
    }

    fn from_spki(spki: &SubjectPublicKeyInfo<'_>) -> Result<Self, SignatureError> {
        let raw = spki.subject_public_key.data.to_vec();
        match spki.parsed() {
            Ok(PublicKey::RSA(_)) => Ok(Self::new(KeyKind::Rsa, raw)),
            Ok(PublicKey::EC(_)) => match raw.len() {
                P256_POINT_LEN => Ok(Self::new(KeyKind::EcP256, raw)),
                P384_POINT_LEN => Ok(Self::new(KeyKind::EcP384, raw)),
                other => Err(SignatureError::InvalidKey(format!(
                    "unsupported EC point length {other}"
                ))),
            },
            Ok(_) => Err(SignatureError::InvalidKey(
                "unsupported public key type".to_string(),
            )),
            Err(e) => Err(SignatureError::InvalidKey(format!(
                "invalid public key: {e}"
            ))),
        }
    }

    /// Returns the key family.
    #[must_use]
    pub const fn kind(&self) -> KeyKind {
        self.kind
    }

    /// Returns the key ID.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Verifies `signature` over `data`.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::KeyMismatch`] if the algorithm does not fit
    /// the key and [`SignatureError::Verification`] if the signature is
    /// wrong.
    pub fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        data: &[u8],
        sig: &[u8],
    ) -> Result<(), SignatureError> {
        let verification_alg: &'static dyn signature::VerificationAlgorithm =
            match (self.kind, algorithm) {
                (KeyKind::Rsa, SignatureAlgorithm::RsaSha256) => {
                    &signature::RSA_PKCS1_2048_8192_SHA256
                }
                (KeyKind::Rsa, SignatureAlgorithm::RsaSha384) => {
                    &signature::RSA_PKCS1_2048_8192_SHA384
                }
                (KeyKind::Rsa, SignatureAlgorithm::RsaSha512) => {
                    &signature::RSA_PKCS1_2048_8192_SHA512
                }
                (KeyKind::EcP256, SignatureAlgorithm::EcdsaSha256) => {
                    &signature::ECDSA_P256_SHA256_FIXED
                }
                (KeyKind::EcP384, SignatureAlgorithm::EcdsaSha384) => {
                    &signature::ECDSA_P384_SHA384_FIXED
                }
                (kind, algorithm) => {
                    return Err(SignatureError::KeyMismatch {
                        key: kind.name(),
                        algorithm,
                    })
                }
            };

        UnparsedPublicKey::new(verification_alg, &self.bytes)
            .verify(data, sig)
            .map_err(|_| SignatureError::Verification)
    }
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyingKey")
            .field("kind", &self.kind)
            .field("key_id", &self.key_id)
            .finish()
    }
}

/// RSA key pair for PKCS#1 v1.5 signing.
pub struct RsaSigningKey {
    key_pair: RsaKeyPair,
    key_id: String,
    algorithm: SignatureAlgorithm,
}

impl RsaSigningKey {
    /// Generates a fresh 2048-bit key.
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm is not RSA-based or generation
    /// fails.
    pub fn generate(algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        ensure_rsa(algorithm)?;
        let key_pair = RsaKeyPair::generate(KeySize::Rsa2048)
            .map_err(|e| SignatureError::KeyGeneration(format!("RSA: {e}")))?;
        Self::from_key_pair(key_pair, algorithm)
    }

    /// Creates a signing key from a PKCS#8 DER-encoded private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid, too short, or the algorithm
    /// is not RSA-based.
    pub fn from_pkcs8(pkcs8_der: &[u8], algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        ensure_rsa(algorithm)?;
        let key_pair = RsaKeyPair::from_pkcs8(pkcs8_der)
            .map_err(|e| SignatureError::InvalidKey(format!("invalid RSA PKCS#8 key: {e}")))?;
        Self::from_key_pair(key_pair, algorithm)
    }

    /// Creates a signing key from a DER `RSAPrivateKey`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid, too short, or the algorithm
    /// is not RSA-based.
    pub fn from_der(der: &[u8], algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        ensure_rsa(algorithm)?;
        let key_pair = RsaKeyPair::from_der(der)
            .map_err(|e| SignatureError::InvalidKey(format!("invalid RSA DER key: {e}")))?;
        Self::from_key_pair(key_pair, algorithm)
    }

    fn from_key_pair(key_pair: RsaKeyPair, algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        let key_bits = key_pair.public_modulus_len() * 8;
        if key_bits < MIN_RSA_BITS {
            return Err(SignatureError::InvalidKey(format!(
                "RSA key of {key_bits} bits is below the {MIN_RSA_BITS}-bit minimum"
            )));
        }

        let key_id = generate_key_id(key_pair.public_key().as_ref());
        Ok(Self {
            key_pair,
            key_id,
            algorithm,
        })
    }
}

impl SigningKey for RsaSigningKey {
    fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let rng = SystemRandom::new();
        let mut sig = vec![0u8; self.key_pair.public_modulus_len()];

        let padding: &'static dyn signature::RsaEncoding = match self.algorithm {
            SignatureAlgorithm::RsaSha256 => &signature::RSA_PKCS1_SHA256,
            SignatureAlgorithm::RsaSha384 => &signature::RSA_PKCS1_SHA384,
            SignatureAlgorithm::RsaSha512 => &signature::RSA_PKCS1_SHA512,
            other => {
                return Err(SignatureError::UnsupportedAlgorithm(format!(
                    "{other:?} not supported for RSA signing"
                )))
            }
        };

        self.key_pair
            .sign(padding, &rng, data, &mut sig)
            .map_err(|e| SignatureError::Signing(format!("RSA signing failed: {e}")))?;

        Ok(sig)
    }

    fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey::new(KeyKind::Rsa, self.key_pair.public_key().as_ref().to_vec())
    }
}

impl fmt::Debug for RsaSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaSigningKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// ECDSA key pair producing fixed-length (`r || s`) signatures, the form
/// XML-DSig uses.
pub struct EcdsaSigningKey {
    key_pair: EcdsaKeyPair,
    key_id: String,
    algorithm: SignatureAlgorithm,
}

impl EcdsaSigningKey {
    /// Generates a fresh key on the curve matching `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm is not ECDSA-based or generation
    /// fails.
    pub fn generate(algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        let signing_alg = ecdsa_signing_alg(algorithm)?;
        let key_pair = EcdsaKeyPair::generate(signing_alg)
            .map_err(|e| SignatureError::KeyGeneration(format!("ECDSA: {e}")))?;
        Ok(Self::from_key_pair(key_pair, algorithm))
    }

    /// Creates a signing key from a PKCS#8 DER-encoded private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the algorithm is not
    /// ECDSA-based.
    pub fn from_pkcs8(pkcs8_der: &[u8], algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        let signing_alg = ecdsa_signing_alg(algorithm)?;
        let key_pair = EcdsaKeyPair::from_pkcs8(signing_alg, pkcs8_der)
            .map_err(|e| SignatureError::InvalidKey(format!("invalid ECDSA PKCS#8 key: {e}")))?;
        Ok(Self::from_key_pair(key_pair, algorithm))
    }

    fn from_key_pair(key_pair: EcdsaKeyPair, algorithm: SignatureAlgorithm) -> Self {
        let key_id = generate_key_id(key_pair.public_key().as_ref());
        Self {
            key_pair,
            key_id,
            algorithm,
        }
    }
}

impl SigningKey for EcdsaSigningKey {
    fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let rng = SystemRandom::new();
        let sig = self
            .key_pair
            .sign(&rng, data)
            .map_err(|e| SignatureError::Signing(format!("ECDSA signing failed: {e}")))?;
        Ok(sig.as_ref().to_vec())
    }

    fn verifying_key(&self) -> VerifyingKey {
        let kind = if self.algorithm == SignatureAlgorithm::EcdsaSha384 {
            KeyKind::EcP384
        } else {
            KeyKind::EcP256
        };
        VerifyingKey::new(kind, self.key_pair.public_key().as_ref().to_vec())
    }
}

impl fmt::Debug for EcdsaSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcdsaSigningKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

fn ensure_rsa(algorithm: SignatureAlgorithm) -> Result<(), SignatureError> {
    if algorithm.is_rsa() {
        Ok(())
    } else {
        Err(SignatureError::UnsupportedAlgorithm(format!(
            "{algorithm:?} is not an RSA algorithm"
        )))
    }
}

fn ecdsa_signing_alg(
    algorithm: SignatureAlgorithm,
) -> Result<&'static signature::EcdsaSigningAlgorithm, SignatureError> {
    match algorithm {
        SignatureAlgorithm::EcdsaSha256 => Ok(&ECDSA_P256_SHA256_FIXED_SIGNING),
        SignatureAlgorithm::EcdsaSha384 => Ok(&ECDSA_P384_SHA384_FIXED_SIGNING),
        other => Err(SignatureError::UnsupportedAlgorithm(format!(
            "{other:?} is not an ECDSA algorithm"
        ))),
    }
}

/// Generates a key ID from the public key bytes.
fn generate_key_id(public_key: &[u8]) -> String {
    let hash = crate::sha256(public_key);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&hash[..8])
}

fn pem_to_der(pem: &str, label: &str) -> Option<Vec<u8>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = pem.find(&begin)? + begin.len();
    let end_pos = start + pem[start..].find(&end)?;

    let b64_data: String = pem[start..end_pos]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD.decode(b64_data).ok()
}
