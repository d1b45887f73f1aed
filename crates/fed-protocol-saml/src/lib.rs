//! # fed-protocol-saml
//!
//! SAML 2.0 message processing for federated single sign-on and single
//! logout.
//!
//! - [`types`] - the parsed message envelope handed in by upstream parsing
//! - [`bindings`] - HTTP-POST and HTTP-Redirect codecs
//! - [`signature`] - embedded (POST) and detached (Redirect) signatures
//! - [`handlers`] - the ordered handler pipeline and its built-in handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use fed_protocol_saml::handlers::{HandlerDeps, HandlerInvocation, HandlerRegistry, Pipeline};
//!
//! let registry = HandlerRegistry::with_defaults();
//! let pipeline = Pipeline::from_config(&config.pipeline, &registry, &deps)?;
//!
//! let invocation = HandlerInvocation::inbound(message, Binding::Redirect)
//!     .with_session("S1")
//!     .with_raw_message(raw_query);
//! let response = pipeline.process(invocation).await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bindings;
pub mod error;
pub mod handlers;
pub mod signature;
pub mod types;

pub use error::{SamlError, SamlResult};
pub use fed_core::HandlerRole;
pub use types::*;
