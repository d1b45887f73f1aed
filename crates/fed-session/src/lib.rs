//! # fed-session
//!
//! Per-browser-session bookkeeping for federated single logout.
//!
//! The [`ParticipantTracker`] records which services were visited during a
//! session, in visitation order, and which of them currently have a logout
//! request in flight. Global logout pops participants most-recent-first so
//! the session unwinds symmetrically to how it was built up.
//!
//! The [`SessionAttributeCache`] holds principal attributes resolved once
//! per session.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod attributes;
pub mod error;
pub mod participants;

pub use attributes::{AttributeSet, SessionAttributeCache};
pub use error::{SessionError, SessionResult};
pub use participants::{ParticipantTracker, SessionState};
