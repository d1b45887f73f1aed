//! XML signatures for SAML messages.
//!
//! Two binding-specific forms are handled:
//!
//! - **Embedded** (HTTP-POST): an enveloped `<ds:Signature>` inside the
//!   message root, whose single `Reference` must point at the root `ID`
//! - **Detached** (HTTP-Redirect): a signature over the transmitted query
//!   parameters, carried in the `Signature` parameter
//!
//! Canonicalization is whitespace normalization over the exact substrings
//! the signer produced. Both sides use [`canonicalize`], so a document
//! re-serialized by an intermediary will not verify.
//!
//! Verification is pure computation over bytes and keys already in hand.

mod signer;
mod validator;
mod xml;

pub use signer::XmlSigner;
pub use validator::{VerifiedSignature, XmlSignatureValidator};
pub use xml::canonicalize;
