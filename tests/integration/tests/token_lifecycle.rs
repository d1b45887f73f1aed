//! Token issue, renew, validate and cancel through pooled clients.

use fed_integration_tests::{TestEnv, SERVICE_PROVIDERS};
use fed_sts::{StsError, ValidationStatus, SAML2_TOKEN_TYPE};

/// Tests the full lifecycle of one token, persisted in the file registries.
#[tokio::test]
async fn test_issue_renew_cancel() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let client = env.pool.create(&env.client_config()?).await?;

    let token = client.issue_token_for(Some(SERVICE_PROVIDERS[0]), Some(SAML2_TOKEN_TYPE)).await?;
    assert_eq!(token.token_type, SAML2_TOKEN_TYPE);
    assert!(client.validate_token(&token).await?);

    let renewed = client.renew_token(SAML2_TOKEN_TYPE, &token).await?;
    assert_ne!(renewed.id, token.id);
    assert_eq!(
        client.validate_token_status(&token).await?,
        ValidationStatus::Rejected,
        "the authority retired the old token"
    );
    assert!(client.validate_token(&renewed).await?);

    client.cancel_token(&renewed).await?;
    assert_eq!(client.validate_token_status(&renewed).await?, ValidationStatus::Revoked);
    let err = client
        .renew_token(SAML2_TOKEN_TYPE, &renewed)
        .await
        .expect_err("canceled token cannot be renewed");
    assert!(matches!(err, StsError::Revoked(_)));

    // What another instance sees from the files.
    let reopened = env.reopen_registries().await?;
    assert!(reopened.tokens.get_token(&token.id).await?.is_none());
    assert!(reopened.tokens.get_token(&renewed.id).await?.is_none());
    assert!(reopened.revocations.is_revoked(SAML2_TOKEN_TYPE, &renewed.id).await?);
    assert!(!reopened.revocations.is_revoked(SAML2_TOKEN_TYPE, &token.id).await?);

    Ok(())
}

/// Tests that an issued token is visible to a second registry instance.
#[tokio::test]
async fn test_issued_token_is_persisted() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let client = env.pool.create(&env.client_config()?).await?;
    let token = client.issue_token_for_endpoint(SERVICE_PROVIDERS[1]).await?;

    let reopened = env.reopen_registries().await?;
    assert_eq!(reopened.tokens.get_token(&token.id).await?, Some(token));

    Ok(())
}

/// Tests that a revocation written by another instance is honoured.
#[tokio::test]
async fn test_revocation_by_other_instance() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let client = env.pool.create(&env.client_config()?).await?;
    let token = client.issue_token(SAML2_TOKEN_TYPE).await?;
    assert!(client.validate_token(&token).await?);

    let other = env.reopen_registries().await?;
    assert!(other.revocations.revoke(&token.token_type, &token.id).await?);

    // The authority still vouches for it; the revocation wins.
    assert_eq!(client.validate_token_status(&token).await?, ValidationStatus::Revoked);
    assert!(!client.validate_token(&token).await?);

    Ok(())
}

/// Tests that argument, trust and revocation failures stay distinct.
#[tokio::test]
async fn test_failure_kinds_are_distinct() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let client = env.pool.create(&env.client_config()?).await?;

    let err = client.issue_token_for(None, None).await.expect_err("no arguments");
    assert!(err.is_argument_error());
    assert!(!err.is_retryable());

    env.authority.set_available(false);
    let err = client.issue_token(SAML2_TOKEN_TYPE).await.expect_err("authority down");
    assert!(matches!(err, StsError::Trust(_)));
    assert!(err.is_retryable());
    assert!(!client.is_poisoned(), "trust failures leave the client usable");

    env.authority.set_available(true);
    assert!(client.issue_token(SAML2_TOKEN_TYPE).await.is_ok());

    Ok(())
}

/// Tests that cancellation sticks even when the authority cannot be told.
#[tokio::test]
async fn test_cancel_survives_authority_outage() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let client = env.pool.create(&env.client_config()?).await?;
    let token = client.issue_token(SAML2_TOKEN_TYPE).await?;

    env.authority.set_available(false);
    let err = client.cancel_token(&token).await.expect_err("authority down");
    assert!(matches!(err, StsError::Trust(_)));
    env.authority.set_available(true);

    assert_eq!(client.validate_token_status(&token).await?, ValidationStatus::Revoked);
    assert!(env.registries.revocations.revoked_ids().await?.contains(&token.id));

    Ok(())
}
