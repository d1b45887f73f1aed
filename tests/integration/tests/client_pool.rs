//! Trust client pool behaviour under load and failure.

use std::sync::Arc;
use std::time::Duration;

use fed_integration_tests::TestEnv;
use fed_sts::{StsError, SAML2_TOKEN_TYPE};

/// Tests that the pool never holds more live clients than configured,
/// however many tasks compete for them.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_pool_bound_under_contention() -> anyhow::Result<()> {
    let env = Arc::new(
        TestEnv::with_vars(&[
            ("FED_STS_POOL_MAX", "3"),
            ("FED_STS_POOL_INITIAL", "1"),
            ("FED_STS_CHECKOUT_TIMEOUT_MS", "10000"),
        ])
        .await?,
    );
    let config = env.client_config()?;
    env.authority.set_latency(Some(Duration::from_millis(10)));

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let env = Arc::clone(&env);
        let config = config.clone();
        tasks.push(tokio::spawn(async move {
            let client = env.pool.create(&config).await?;
            let token = client.issue_token(SAML2_TOKEN_TYPE).await?;
            client.cancel_token(&token).await?;
            Ok::<_, StsError>(())
        }));
    }
    for task in futures::future::join_all(tasks).await {
        task??;
    }

    let key = config.key();
    assert!(env.pool.live_clients(&key) <= 3);
    assert!(env.connector.connections() <= 3);
    assert_eq!(env.pool.free_clients(&key), env.pool.live_clients(&key));
    assert_eq!(env.registries.revocations.revoked_ids().await?.len(), 20);

    Ok(())
}

/// Tests that exhaustion is reported distinctly and clears once a client
/// comes back from another task.
#[tokio::test]
async fn test_exhaustion_then_recovery() -> anyhow::Result<()> {
    let env = TestEnv::with_vars(&[
        ("FED_STS_POOL_MAX", "1"),
        ("FED_STS_POOL_INITIAL", "1"),
        ("FED_STS_CHECKOUT_TIMEOUT_MS", "50"),
    ])
    .await?;
    let config = env.client_config()?;
    let held = env.pool.create(&config).await?;

    let err = env.pool.create(&config).await.expect_err("pool of one is busy");
    assert!(matches!(err, StsError::PoolExhausted { .. }));
    assert!(!matches!(err, StsError::Trust(_)));

    // Returned from a different task.
    let returner = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(held);
    });
    returner.await?;

    let client = env.pool.create(&config).await?;
    assert!(client.issue_token(SAML2_TOKEN_TYPE).await.is_ok());
    assert_eq!(env.connector.connections(), 1);

    Ok(())
}

/// Tests that a client whose call timed out is replaced, not reused.
#[tokio::test]
async fn test_timed_out_client_is_replaced() -> anyhow::Result<()> {
    let env = TestEnv::with_vars(&[
        ("FED_STS_POOL_MAX", "2"),
        ("FED_STS_POOL_INITIAL", "1"),
        ("FED_STS_CALL_TIMEOUT_MS", "1000"),
    ])
    .await?;
    let config = env.client_config()?;
    let key = config.key();

    let mut client = env.pool.create(&config).await?;
    let first_id = client.id();
    client.set_call_timeout(Some(Duration::from_millis(10)));
    env.authority.set_latency(Some(Duration::from_millis(200)));

    let err = client.issue_token(SAML2_TOKEN_TYPE).await.expect_err("call must time out");
    assert!(matches!(err, StsError::Timeout(_)));
    env.pool.check_in(client);
    assert_eq!(env.pool.live_clients(&key), 0);

    env.authority.set_latency(None);
    let client = env.pool.create(&config).await?;
    assert_ne!(client.id(), first_id);
    assert_eq!(client.call_timeout(), Some(Duration::from_secs(1)));
    assert!(client.issue_token(SAML2_TOKEN_TYPE).await.is_ok());

    Ok(())
}

/// Tests that each configuration key gets its own sub-pool.
#[tokio::test]
async fn test_sub_pools_per_configuration() -> anyhow::Result<()> {
    let env = TestEnv::with_vars(&[("FED_STS_POOL_MAX", "2"), ("FED_STS_POOL_INITIAL", "0")]).await?;
    let first = env.client_config()?;
    let second = fed_sts::StsClientConfig::builder()
        .endpoint_address("https://sts.partner.example.net/trust")
        .credentials("svc-partner", "changeit")
        .build()?;

    let a = env.pool.create(&first).await?;
    let b = env.pool.create(&second).await?;
    assert_ne!(a.key(), b.key());
    assert_eq!(env.pool.live_clients(&first.key()), 1);
    assert_eq!(env.pool.live_clients(&second.key()), 1);

    drop(a);
    assert!(env.pool.destroy(&first));
    assert_eq!(env.pool.live_clients(&first.key()), 0);
    assert_eq!(env.pool.live_clients(&second.key()), 1);

    Ok(())
}

/// Tests the unpooled mode.
#[tokio::test]
async fn test_pooling_disabled() -> anyhow::Result<()> {
    let env = TestEnv::with_vars(&[("FED_STS_POOL_MAX", "0")]).await?;
    let config = env.client_config()?;

    let a = env.pool.create(&config).await?;
    let b = env.pool.create(&config).await?;
    assert!(!a.is_pooled() && !b.is_pooled());
    assert_eq!(env.connector.connections(), 2);
    assert!(a.issue_token(SAML2_TOKEN_TYPE).await.is_ok());

    Ok(())
}
