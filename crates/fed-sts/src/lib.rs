//! # fed-sts
//!
//! Client side of a WS-Trust security token service.
//!
//! An [`StsClient`] issues, renews, validates and cancels tokens against a
//! remote [`TrustAuthority`], registering issued tokens in the token
//! registry and consulting the revocation registry before trusting one.
//! The [`StsClientPool`] reuses clients per [`StsClientConfig`] key.
//!
//! ## Pool policy
//!
//! A sub-pool grows on demand up to `max_clients_per_key` live clients.
//! Once all are checked out, further check-outs wait up to
//! `checkout_timeout` and then fail with [`StsError::PoolExhausted`].
//! A `max_clients_per_key` of zero disables pooling.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod authority;
pub mod client;
pub mod config;
pub mod error;
pub mod pool;

pub use authority::{
    LocalConnector, LocalTrustAuthority, RequestSecurityToken, RequestType, TrustAuthority,
    TrustAuthorityConnector, ValidationStatus, SAML2_TOKEN_TYPE,
};
pub use client::StsClient;
pub use config::{StsClientConfig, StsClientConfigBuilder};
pub use error::{StsError, StsResult};
pub use pool::{PooledClient, StsClientPool};
