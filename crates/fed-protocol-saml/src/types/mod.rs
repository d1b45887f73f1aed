//! Core SAML message types.
//!
//! Messages arrive already parsed: this crate only needs the envelope
//! fields (id, issuer, timestamps, logout subject) plus an opaque handle on
//! the parsed object.

mod constants;
mod message;

pub use constants::*;
pub use message::*;
