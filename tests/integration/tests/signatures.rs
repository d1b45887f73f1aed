//! Outbound signing by one side, inbound verification by the other.

use std::sync::Arc;

use fed_crypto::SigningKey;
use fed_integration_tests::{TestEnv, IDP_ENTITY_ID, SERVICE_PROVIDERS};
use fed_protocol_saml::bindings::HttpRedirectBinding;
use fed_protocol_saml::handlers::{
    ErrorCode, HandlerInvocation, InvocationOptions, OptionValue, Pipeline,
    SignatureGenerationHandler, SignatureValidationHandler,
};
use fed_protocol_saml::{
    Binding, HandlerRole, MessageHeader, RequestMessage, RequestType, ResponseType,
    StatusResponseMessage,
};

use crate::common::{logout_request_xml, logout_response_xml};

fn signing_chain() -> Pipeline {
    Pipeline::new(HandlerRole::IdentityProvider).with_handler(Arc::new(SignatureGenerationHandler::new()))
}

fn verifying_chain() -> Pipeline {
    Pipeline::new(HandlerRole::ServiceProvider).with_handler(Arc::new(SignatureValidationHandler::new()))
}

fn idp_key(env: &TestEnv) -> OptionValue {
    OptionValue::PublicKey(env.idp_key.verifying_key())
}

/// Tests a Redirect logout request signed by the identity provider and
/// verified by the service provider.
#[tokio::test]
async fn test_redirect_request_round_trip() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let sp_slo = format!("{}/slo", SERVICE_PROVIDERS[0]);
    let header = MessageHeader::new("_idp-lr-1", IDP_ENTITY_ID).with_destination(sp_slo.clone());
    let message = RequestMessage::new(header, RequestType::LogoutRequest);

    let outbound = HandlerInvocation::outbound(message.clone(), Binding::Redirect)
        .with_raw_message(logout_request_xml("_idp-lr-1", IDP_ENTITY_ID))
        .with_relay_state("rs-42")
        .with_option(InvocationOptions::SIGNING_KEY, OptionValue::SigningKey(env.idp_key.clone()));
    let signed = signing_chain().process(outbound).await?;

    assert_eq!(signed.destination.as_deref(), Some(sp_slo.as_str()));
    let query = signed
        .signed_query
        .ok_or_else(|| anyhow::anyhow!("no signed query produced"))?;
    let decoded = HttpRedirectBinding::decode(&query)?;
    assert_eq!(decoded.relay_state.as_deref(), Some("rs-42"));
    assert!(decoded.xml.contains("_idp-lr-1"));

    let inbound = HandlerInvocation::inbound(message.clone(), Binding::Redirect)
        .with_raw_message(query.clone())
        .with_option(InvocationOptions::SENDER_PUBLIC_KEY, idp_key(&env));
    verifying_chain().process(inbound).await?;

    // Relay state is covered by the signature.
    let tampered = query.replace("RelayState=rs-42", "RelayState=rs-43");
    let inbound = HandlerInvocation::inbound(message, Binding::Redirect)
        .with_raw_message(tampered)
        .with_option(InvocationOptions::SENDER_PUBLIC_KEY, idp_key(&env));
    let err = verifying_chain().process(inbound).await.expect_err("tampered relay state");
    assert_eq!(err.code, ErrorCode::SignatureInvalid);

    Ok(())
}

/// Tests an enveloped signature on a POST logout response, and that any
/// change to the signed document is detected.
#[tokio::test]
async fn test_post_response_round_trip_and_tamper() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let message = StatusResponseMessage::new(
        MessageHeader::new("_idp-resp-1", IDP_ENTITY_ID),
        ResponseType::LogoutResponse,
    )
    .with_in_response_to("_sp-lr-9");

    let outbound = HandlerInvocation::outbound(message.clone(), Binding::Post)
        .with_raw_message(logout_response_xml("_idp-resp-1", IDP_ENTITY_ID, "_sp-lr-9"))
        .with_option(InvocationOptions::SIGNING_KEY, OptionValue::SigningKey(env.idp_key.clone()));
    let document = signing_chain()
        .process(outbound)
        .await?
        .signed_document
        .ok_or_else(|| anyhow::anyhow!("no signed document produced"))?;
    assert!(document.contains("SignatureValue"));

    let inbound = HandlerInvocation::inbound(message.clone(), Binding::Post)
        .with_raw_message(document.clone())
        .with_option(InvocationOptions::SENDER_PUBLIC_KEY, idp_key(&env));
    verifying_chain().process(inbound).await?;

    let tampered = document.replace("_sp-lr-9", "_sp-lr-0");
    let inbound = HandlerInvocation::inbound(message.clone(), Binding::Post)
        .with_raw_message(tampered)
        .with_option(InvocationOptions::SENDER_PUBLIC_KEY, idp_key(&env));
    let err = verifying_chain().process(inbound).await.expect_err("tampered document");
    assert_eq!(err.code, ErrorCode::SignatureInvalid);

    // The service provider's key did not sign this document.
    let inbound = HandlerInvocation::inbound(message, Binding::Post)
        .with_raw_message(document)
        .with_option(
            InvocationOptions::SENDER_PUBLIC_KEY,
            OptionValue::PublicKey(env.sp_key.verifying_key()),
        );
    let err = verifying_chain().process(inbound).await.expect_err("wrong key");
    assert_eq!(err.code, ErrorCode::SignatureInvalid);

    Ok(())
}

/// Tests that a signed document wrapped around a second element with the
/// same ID is rejected.
#[tokio::test]
async fn test_wrapped_document_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let message = StatusResponseMessage::new(
        MessageHeader::new("_idp-resp-2", IDP_ENTITY_ID),
        ResponseType::LogoutResponse,
    );

    let outbound = HandlerInvocation::outbound(message.clone(), Binding::Post)
        .with_raw_message(logout_response_xml("_idp-resp-2", IDP_ENTITY_ID, "_x"))
        .with_option(InvocationOptions::SIGNING_KEY, OptionValue::SigningKey(env.idp_key.clone()));
    let document = signing_chain()
        .process(outbound)
        .await?
        .signed_document
        .ok_or_else(|| anyhow::anyhow!("no signed document produced"))?;

    let close = "</samlp:LogoutResponse>";
    let injected = r#"<samlp:Extensions><samlp:LogoutResponse ID="_idp-resp-2"><saml:Issuer>https://evil.example.org</saml:Issuer></samlp:LogoutResponse></samlp:Extensions>"#;
    let wrapped = document.replacen(close, &format!("{injected}{close}"), 1);
    assert_ne!(wrapped, document);

    let inbound = HandlerInvocation::inbound(message, Binding::Post)
        .with_raw_message(wrapped)
        .with_option(InvocationOptions::SENDER_PUBLIC_KEY, idp_key(&env));
    let err = verifying_chain().process(inbound).await.expect_err("wrapped document");
    assert_eq!(err.code, ErrorCode::SignatureInvalid);

    Ok(())
}

/// Tests that outbound signing without a key is a configuration error.
#[tokio::test]
async fn test_signing_without_key_fails() -> anyhow::Result<()> {
    let message = RequestMessage::new(
        MessageHeader::new("_idp-lr-3", IDP_ENTITY_ID),
        RequestType::LogoutRequest,
    );
    let outbound = HandlerInvocation::outbound(message, Binding::Post)
        .with_raw_message(logout_request_xml("_idp-lr-3", IDP_ENTITY_ID));

    let err = signing_chain().process(outbound).await.expect_err("no signing key");
    assert_eq!(err.code, ErrorCode::Configuration);
    assert_eq!(err.handler, SignatureGenerationHandler::TYPE_TAG);

    Ok(())
}
