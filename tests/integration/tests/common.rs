//! Message builders shared by the scenarios.

use fed_crypto::SigningKey;
use fed_integration_tests::{TestEnv, IDP_ENTITY_ID};
use fed_protocol_saml::bindings::{HttpPostBinding, HttpRedirectBinding, SamlMessageType};
use fed_protocol_saml::handlers::{HandlerInvocation, InvocationOptions, OptionValue};
use fed_protocol_saml::signature::XmlSigner;
use fed_protocol_saml::{
    Binding, MessageHeader, RequestMessage, RequestType, ResponseType, StatusResponseMessage,
    SAMLP_NS, SAML_NS,
};

/// Builds an `AuthnRequest` document.
pub fn authn_request_xml(id: &str, issuer: &str) -> String {
    format!(
        r#"<samlp:AuthnRequest xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" ID="{id}" Version="2.0" Destination="{IDP_ENTITY_ID}/sso"><saml:Issuer>{issuer}</saml:Issuer><samlp:NameIDPolicy AllowCreate="true"/></samlp:AuthnRequest>"#
    )
}

/// Builds a `LogoutRequest` document.
pub fn logout_request_xml(id: &str, issuer: &str) -> String {
    format!(
        r#"<samlp:LogoutRequest xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" ID="{id}" Version="2.0"><saml:Issuer>{issuer}</saml:Issuer><saml:NameID>alice</saml:NameID></samlp:LogoutRequest>"#
    )
}

/// Builds a `LogoutResponse` document.
pub fn logout_response_xml(id: &str, issuer: &str, in_response_to: &str) -> String {
    format!(
        r#"<samlp:LogoutResponse xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}" ID="{id}" Version="2.0" InResponseTo="{in_response_to}"><saml:Issuer>{issuer}</saml:Issuer><samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status></samlp:LogoutResponse>"#
    )
}

fn with_sender_key(invocation: HandlerInvocation, env: &TestEnv) -> HandlerInvocation {
    invocation.with_option(
        InvocationOptions::SENDER_PUBLIC_KEY,
        OptionValue::PublicKey(env.sp_key.verifying_key()),
    )
}

/// A signed POST `AuthnRequest` from `sp`, as received by the identity
/// provider.
pub fn signed_authn(env: &TestEnv, sp: &str, session: &str) -> anyhow::Result<HandlerInvocation> {
    let id = MessageHeader::generate_id();
    let signed = XmlSigner::new(env.sp_key.clone()).sign_document(&authn_request_xml(&id, sp), &id)?;

    // Through the form encoding and back, as the browser would carry it.
    let form_value = HttpPostBinding::encode(&signed);
    let decoded = HttpPostBinding::decode(Some(form_value.as_str()), None, Some("state-1"))?;

    let message = RequestMessage::new(MessageHeader::new(id, sp), RequestType::AuthnRequest);
    let invocation = HandlerInvocation::inbound(message, Binding::Post)
        .with_session(session)
        .with_principal(fed_integration_tests::PRINCIPAL)
        .with_raw_message(decoded.xml)
        .with_relay_state("state-1");
    Ok(with_sender_key(invocation, env))
}

/// A signed Redirect `LogoutRequest` from `sp`.
pub fn signed_logout_request(
    env: &TestEnv,
    sp: &str,
    session: &str,
) -> anyhow::Result<HandlerInvocation> {
    let id = MessageHeader::generate_id();
    let url = HttpRedirectBinding::encode_signed(
        &logout_request_xml(&id, sp),
        &format!("{IDP_ENTITY_ID}/slo"),
        None,
        SamlMessageType::Request,
        &XmlSigner::new(env.sp_key.clone()),
    )?;

    let message = RequestMessage::new(MessageHeader::new(id, sp), RequestType::LogoutRequest);
    let invocation = HandlerInvocation::inbound(message, Binding::Redirect)
        .with_session(session)
        .with_raw_message(url);
    Ok(with_sender_key(invocation, env))
}

/// A signed Redirect `LogoutResponse` from `sp`.
pub fn signed_logout_response(
    env: &TestEnv,
    sp: &str,
    session: &str,
) -> anyhow::Result<HandlerInvocation> {
    let id = MessageHeader::generate_id();
    let url = HttpRedirectBinding::encode_signed(
        &logout_response_xml(&id, sp, "_idp-logout"),
        &format!("{IDP_ENTITY_ID}/slo"),
        Some("logout-relay"),
        SamlMessageType::Response,
        &XmlSigner::new(env.sp_key.clone()),
    )?;

    let message = StatusResponseMessage::new(MessageHeader::new(id, sp), ResponseType::LogoutResponse)
        .with_in_response_to("_idp-logout");
    let invocation = HandlerInvocation::inbound(message, Binding::Redirect)
        .with_session(session)
        .with_raw_message(url);
    Ok(with_sender_key(invocation, env))
}
