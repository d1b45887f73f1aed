//! # fed-registry
//!
//! Keyed storage for security tokens and revoked token identifiers.
//!
//! The [`TokenRegistry`] maps a token identifier to its token and refuses
//! to overwrite an existing entry. The [`RevocationRegistry`] is an
//! append-only set of canceled identifiers. Both sit on top of a narrow
//! store interface ([`TokenStore`], [`RevocationStore`]) with in-memory and
//! file-backed implementations.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod file;
pub mod memory;
pub mod registry;
pub mod revocation;
pub mod store;
pub mod token;

pub use error::{RegistryError, RegistryResult};
pub use file::{FileRevocationStore, FileTokenStore};
pub use memory::{MemoryRevocationStore, MemoryTokenStore};
pub use registry::{Registries, TokenRegistry};
pub use revocation::RevocationRegistry;
pub use store::{RevocationStore, TokenStore};
pub use token::SecurityToken;
