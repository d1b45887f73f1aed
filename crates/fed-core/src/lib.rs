//! # fed-core
//!
//! Core configuration, error handling and audit events shared by the
//! federation crates.
//!
//! This crate provides foundational types used by the handler pipeline,
//! the session participant tracker, the token registries and the trust
//! client pool.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod event;

pub use config::{
    FederationConfig, HandlerConfig, HandlerRole, PipelineConfig, RegistryBackend,
    RegistryConfig, StsPoolConfig,
};
pub use error::{Error, Result};
pub use event::{Event, EventBuilder, EventOutcome, EventType};
