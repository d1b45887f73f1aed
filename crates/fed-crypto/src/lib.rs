//! # fed-crypto
//!
//! Signing, verification and hashing primitives for federation messages,
//! built on aws-lc-rs.
//!
//! ## Supported algorithms
//!
//! - RSA PKCS#1 v1.5 with SHA-256, SHA-384, SHA-512 (sign and verify)
//! - ECDSA P-256/SHA-256 and P-384/SHA-384 (sign and verify)
//!
//! RSA-SHA1 and DSA are recognised by URI but always rejected.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod hash;
pub mod keys;
pub mod signature;

pub use algorithm::{AlgorithmError, HashAlgorithm, SignatureAlgorithm};
pub use hash::{hash, sha256, sha384, sha512};
pub use keys::{EcdsaSigningKey, KeyKind, RsaSigningKey, VerifyingKey};
pub use signature::{SignatureError, SigningKey};
