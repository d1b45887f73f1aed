//! Coordinated single logout across visited service providers.

use std::sync::Arc;

use fed_integration_tests::{TestEnv, IDP_ENTITY_ID, SERVICE_PROVIDERS};
use fed_protocol_saml::handlers::ErrorCode;
use fed_session::SessionState;

use crate::common::{signed_authn, signed_logout_request, signed_logout_response};

async fn login_all(env: &TestEnv, session: &str) -> anyhow::Result<()> {
    for sp in SERVICE_PROVIDERS {
        env.pipeline.process(signed_authn(env, sp, session)?).await?;
    }
    Ok(())
}

/// Tests that logout started by the oldest participant visits the others
/// most recent first and then terminates the session.
#[tokio::test]
async fn test_global_logout_unwinds_in_reverse_login_order() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    login_all(&env, "S1").await?;
    assert!(env.deps.attribute_cache.get("S1").is_some());

    let response = env
        .pipeline
        .process(signed_logout_request(&env, SERVICE_PROVIDERS[0], "S1")?)
        .await?;
    assert_eq!(response.logout_participant.as_deref(), Some(SERVICE_PROVIDERS[2]));
    assert_eq!(response.destination.as_deref(), Some(SERVICE_PROVIDERS[2]));
    assert_eq!(env.tracker().state("S1"), SessionState::LoggingOut);
    assert!(env.tracker().in_transit("S1", SERVICE_PROVIDERS[2]));
    assert_eq!(env.tracker().participants("S1"), vec![SERVICE_PROVIDERS[1]]);

    let response = env
        .pipeline
        .process(signed_logout_response(&env, SERVICE_PROVIDERS[2], "S1")?)
        .await?;
    assert_eq!(response.logout_participant.as_deref(), Some(SERVICE_PROVIDERS[1]));
    assert!(!response.logout_complete);
    assert!(!env.tracker().in_transit("S1", SERVICE_PROVIDERS[2]));

    let response = env
        .pipeline
        .process(signed_logout_response(&env, SERVICE_PROVIDERS[1], "S1")?)
        .await?;
    assert!(response.logout_participant.is_none());
    assert!(response.logout_complete);
    assert!(response.session_terminated);

    assert_eq!(env.tracker().state("S1"), SessionState::Terminated);
    assert_eq!(env.tracker().participant_count("S1"), 0);
    assert_eq!(env.tracker().in_transit_count("S1"), 0);
    assert!(env.deps.attribute_cache.get("S1").is_none());

    Ok(())
}

/// Tests that a logout response nobody asked for does not start a logout.
#[tokio::test]
async fn test_stray_logout_response_leaves_session_active() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    login_all(&env, "S1").await?;

    let response = env
        .pipeline
        .process(signed_logout_response(&env, SERVICE_PROVIDERS[0], "S1")?)
        .await?;
    assert!(response.logout_participant.is_none());
    assert!(!response.logout_complete);
    assert_eq!(env.tracker().state("S1"), SessionState::Active);
    assert_eq!(env.tracker().participant_count("S1"), 3);
    assert_eq!(env.tracker().in_transit_count("S1"), 0);

    Ok(())
}

/// Tests that no new participant can join while logout is in progress.
#[tokio::test]
async fn test_login_during_logout_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    login_all(&env, "S1").await?;
    env.pipeline
        .process(signed_logout_request(&env, SERVICE_PROVIDERS[1], "S1")?)
        .await?;

    let err = env
        .pipeline
        .process(signed_authn(&env, "https://sp-late.example.com", "S1")?)
        .await
        .expect_err("registration during logout must fail");
    assert_eq!(err.code, ErrorCode::SessionError);
    assert!(!env
        .tracker()
        .participants("S1")
        .contains(&"https://sp-late.example.com".to_string()));

    Ok(())
}

/// Tests that a logout request for an unknown session is a session error
/// and leaves other sessions alone.
#[tokio::test]
async fn test_logout_of_unknown_session() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    login_all(&env, "S1").await?;

    let err = env
        .pipeline
        .process(signed_logout_request(&env, SERVICE_PROVIDERS[0], "S-missing")?)
        .await
        .expect_err("unknown session");
    assert_eq!(err.code, ErrorCode::SessionError);
    assert_eq!(env.tracker().participant_count("S1"), 3);
    assert_eq!(env.tracker().state("S-missing"), SessionState::Terminated);

    Ok(())
}

/// Tests that sessions are independent of each other.
#[tokio::test]
async fn test_sessions_are_isolated() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    login_all(&env, "S1").await?;
    env.pipeline.process(signed_authn(&env, SERVICE_PROVIDERS[0], "S2")?).await?;

    // Logging the only participant out of S2 completes immediately.
    let response = env
        .pipeline
        .process(signed_logout_request(&env, SERVICE_PROVIDERS[0], "S2")?)
        .await?;
    assert!(response.logout_complete);
    assert_eq!(env.tracker().state("S2"), SessionState::Terminated);
    assert_eq!(env.tracker().state("S1"), SessionState::Active);
    assert_eq!(env.tracker().participant_count("S1"), 3);

    Ok(())
}

/// Tests concurrent logins into one session from many request tasks.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_logins_same_session() -> anyhow::Result<()> {
    let env = Arc::new(TestEnv::new().await?);
    let participants: Vec<String> = (0..24)
        .map(|i| format!("https://sp-{i}.example.com"))
        .collect();

    let mut tasks = Vec::new();
    for sp in &participants {
        // Every participant logs in twice, racing itself.
        for _ in 0..2 {
            let env = Arc::clone(&env);
            let invocation = signed_authn(&env, sp, "S1")?;
            tasks.push(tokio::spawn(async move { env.pipeline.process(invocation).await }));
        }
    }
    for result in futures::future::join_all(tasks).await {
        result??;
    }

    let mut registered = env.tracker().participants("S1");
    registered.sort();
    let mut expected = participants.clone();
    expected.sort();
    assert_eq!(registered, expected);

    Ok(())
}

/// Tests the service provider side: a logout request from the identity
/// provider ends the local session.
#[tokio::test]
async fn test_service_provider_chain_terminates_session() -> anyhow::Result<()> {
    let env = TestEnv::with_vars(&[("FED_ROLE", "sp"), ("FED_HANDLERS", "signature-validation,logout")]).await?;
    env.tracker().start_session("local-1");
    assert_eq!(env.tracker().session_count(), 1);

    let response = env
        .pipeline
        .process(signed_logout_request(&env, IDP_ENTITY_ID, "local-1")?)
        .await?;
    assert!(response.session_terminated);
    assert_eq!(env.tracker().session_count(), 0);

    Ok(())
}
