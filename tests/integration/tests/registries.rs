//! Token and revocation registries shared between tasks and instances.

use std::sync::Arc;

use fed_integration_tests::TestEnv;
use fed_registry::{Registries, SecurityToken};
use fed_sts::SAML2_TOKEN_TYPE;

fn token(id: &str, payload: &str) -> SecurityToken {
    SecurityToken::new(id, SAML2_TOKEN_TYPE, payload.as_bytes().to_vec())
        .with_lifetime(chrono::Duration::minutes(5))
}

async fn racing_adds(registries: Registries) -> anyhow::Result<()> {
    let registries = Arc::new(registries);
    let mut tasks = Vec::new();
    for i in 0..16 {
        let registries = Arc::clone(&registries);
        tasks.push(tokio::spawn(async move {
            registries
                .tokens
                .add_token("ID_contested", &token("ID_contested", &format!("writer-{i}")))
                .await
        }));
    }

    let mut won = 0;
    let mut conflicts = 0;
    for result in futures::future::join_all(tasks).await {
        match result? {
            Ok(()) => won += 1,
            Err(e) if e.is_conflict() => conflicts += 1,
            Err(e) => return Err(e.into()),
        }
    }
    assert_eq!(won, 1, "exactly one writer registers the id");
    assert_eq!(conflicts, 15);

    let stored = registries
        .tokens
        .get_token("ID_contested")
        .await?
        .ok_or_else(|| anyhow::anyhow!("contested token missing"))?;
    assert!(String::from_utf8(stored.payload)?.starts_with("writer-"));
    Ok(())
}

/// Tests that concurrent issuances colliding on an id never overwrite
/// each other, in memory.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_add_token_conflict_in_memory() -> anyhow::Result<()> {
    racing_adds(Registries::in_memory()).await
}

/// Tests the same collision against the file backend.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_add_token_conflict_on_file() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    racing_adds(env.registries.clone()).await
}

/// Tests that concurrent revocations from two instances are idempotent
/// and visible to both.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_revocation_across_instances() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let first = env.registries.clone();
    let second = env.reopen_registries().await?;

    let mut tasks = Vec::new();
    for i in 0..10 {
        for registries in [first.clone(), second.clone()] {
            tasks.push(tokio::spawn(async move {
                registries
                    .revocations
                    .revoke(SAML2_TOKEN_TYPE, &format!("ID_{i}"))
                    .await
            }));
        }
    }
    for result in futures::future::join_all(tasks).await {
        result??;
    }

    for i in 0..10 {
        let id = format!("ID_{i}");
        assert!(first.revocations.is_revoked(SAML2_TOKEN_TYPE, &id).await?);
        assert!(second.revocations.is_revoked(SAML2_TOKEN_TYPE, &id).await?);
    }
    // Revoking again changes nothing.
    assert!(!first.revocations.revoke(SAML2_TOKEN_TYPE, "ID_3").await?);

    let log = tokio::fs::read_to_string(env.data_dir().join("revoked.log")).await?;
    tracing::debug!(lines = log.lines().count(), "revocation log written");
    assert!(log.lines().count() >= 10);

    Ok(())
}

/// Tests that removing an unknown token is reported, not fatal.
#[tokio::test]
async fn test_remove_unknown_token() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    assert!(!env.registries.tokens.remove_token("ID_never_issued").await?);

    env.registries.tokens.add_token("ID_1", &token("ID_1", "one")).await?;
    assert!(env.registries.tokens.remove_token("ID_1").await?);
    assert!(env.registries.tokens.get_token("ID_1").await?.is_none());

    Ok(())
}
