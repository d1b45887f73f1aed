//! Single sign-on through the configured identity provider chain.

use fed_integration_tests::{TestEnv, PRINCIPAL, SERVICE_PROVIDERS};
use fed_protocol_saml::handlers::ErrorCode;
use fed_session::SessionState;

use crate::common::signed_authn;

/// Tests that a signed login registers the service provider and resolves
/// the principal's attributes.
#[tokio::test]
async fn test_signed_login_registers_participant() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    assert_eq!(
        env.pipeline.handler_names(),
        vec!["signature-validation", "logout", "attribute"]
    );

    let response = env
        .pipeline
        .process(signed_authn(&env, SERVICE_PROVIDERS[0], "S1")?)
        .await?;

    assert!(response.is_success(), "login failed: {:?}", response.error);
    assert_eq!(env.tracker().participants("S1"), vec![SERVICE_PROVIDERS[0]]);
    assert_eq!(env.tracker().state("S1"), SessionState::Active);

    let attributes = response
        .attributes
        .ok_or_else(|| anyhow::anyhow!("no attributes for {PRINCIPAL}"))?;
    assert_eq!(attributes["mail"], vec!["alice@example.com"]);
    assert_eq!(attributes["role"].len(), 2);

    Ok(())
}

/// Tests that visiting the same service provider twice leaves one entry.
#[tokio::test]
async fn test_repeated_login_is_idempotent() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    for sp in [SERVICE_PROVIDERS[0], SERVICE_PROVIDERS[1], SERVICE_PROVIDERS[0]] {
        env.pipeline.process(signed_authn(&env, sp, "S1")?).await?;
    }

    assert_eq!(
        env.tracker().participants("S1"),
        vec![SERVICE_PROVIDERS[0], SERVICE_PROVIDERS[1]]
    );
    assert_eq!(env.tracker().peek("S1").as_deref(), Some(SERVICE_PROVIDERS[1]));

    Ok(())
}

/// Tests that attributes are resolved once and shared across logins in
/// the same session.
#[tokio::test]
async fn test_attributes_cached_per_session() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let first = env.pipeline.process(signed_authn(&env, SERVICE_PROVIDERS[0], "S1")?).await?;
    let second = env.pipeline.process(signed_authn(&env, SERVICE_PROVIDERS[1], "S1")?).await?;

    let (Some(first), Some(second)) = (first.attributes, second.attributes) else {
        anyhow::bail!("attributes missing from login response");
    };
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(env.deps.attribute_cache.len(), 1);

    Ok(())
}

/// Tests that an unsigned login is refused before any participant is
/// registered.
#[tokio::test]
async fn test_unsigned_login_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let mut invocation = signed_authn(&env, SERVICE_PROVIDERS[0], "S1")?;
    invocation.raw_message = Some(crate::common::authn_request_xml(
        invocation.message.id(),
        SERVICE_PROVIDERS[0],
    ));

    let err = env
        .pipeline
        .process(invocation)
        .await
        .expect_err("unsigned request must not pass");
    assert_eq!(err.code, ErrorCode::SignatureInvalid);
    assert_eq!(err.handler, "signature-validation");
    assert_eq!(env.tracker().participant_count("S1"), 0);

    Ok(())
}

/// Tests that a request signed by a different key is refused.
#[tokio::test]
async fn test_login_signed_by_unknown_key_is_refused() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let other = TestEnv::new().await?;

    // Signed with `other`'s key, verified against `env`'s.
    let mut invocation = signed_authn(&other, SERVICE_PROVIDERS[2], "S1")?;
    invocation.options = signed_authn(&env, SERVICE_PROVIDERS[2], "S1")?.options;

    let err = env.pipeline.process(invocation).await.expect_err("foreign key must fail");
    assert_eq!(err.code.as_str(), "SIGNATURE_INVALID");

    Ok(())
}

/// Tests an identity provider chain with issuer trust loaded from
/// configuration.
#[tokio::test]
async fn test_issuer_trust_from_configuration() -> anyhow::Result<()> {
    let env = TestEnv::with_vars(&[("FED_HANDLERS", "issuer-trust,signature-validation,logout")]).await?;
    assert_eq!(
        env.pipeline.handler_names(),
        vec!["issuer-trust", "signature-validation", "logout"]
    );

    // No trusted domains configured and none supplied by the invocation.
    let err = env
        .pipeline
        .process(signed_authn(&env, SERVICE_PROVIDERS[0], "S1")?)
        .await
        .expect_err("issuer trust without domains is a configuration error");
    assert_eq!(err.code, ErrorCode::Configuration);

    let trusted = signed_authn(&env, SERVICE_PROVIDERS[0], "S1")?.with_option(
        fed_protocol_saml::handlers::InvocationOptions::TRUSTED_DOMAINS,
        fed_protocol_saml::handlers::OptionValue::List(vec!["example.com".to_string()]),
    );
    let response = env.pipeline.process(trusted).await?;
    assert!(response.is_success());

    let untrusted = signed_authn(&env, "https://evil.example.org", "S1")?.with_option(
        fed_protocol_saml::handlers::InvocationOptions::TRUSTED_DOMAINS,
        fed_protocol_saml::handlers::OptionValue::List(vec!["example.com".to_string()]),
    );
    let err = env.pipeline.process(untrusted).await.expect_err("foreign issuer");
    assert_eq!(err.code, ErrorCode::IssuerNotTrusted);
    assert_eq!(env.tracker().participants("S1"), vec![SERVICE_PROVIDERS[0]]);

    Ok(())
}
