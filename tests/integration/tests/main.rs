//! Cross-crate scenario tests.
//!
//! Each test builds its own [`fed_integration_tests::TestEnv`]: a handler
//! chain, file-backed registries in a temporary directory and a trust
//! client pool over a process-local authority.

mod common;
mod client_pool;
mod registries;
mod signatures;
mod single_logout;
mod sso_flows;
mod token_lifecycle;
