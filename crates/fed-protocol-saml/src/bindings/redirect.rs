//! HTTP-Redirect binding.
//!
//! Messages travel DEFLATE-compressed, base64-encoded and URL-encoded in
//! the query string. A signature is detached: it covers the query
//! parameters `SAMLRequest`/`SAMLResponse`, `RelayState` and `SigAlg`
//! exactly as they were transmitted, and travels in a `Signature`
//! parameter of its own.

use std::io::{Read, Write};

use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::{SamlError, SamlResult};
use crate::signature::XmlSigner;
use crate::types::params;

use super::{DecodedMessage, SamlMessageType};

/// HTTP-Redirect binding encoder/decoder.
pub struct HttpRedirectBinding;

impl HttpRedirectBinding {
    /// Encodes a message into an unsigned query string
    /// (`SAMLRequest=...[&RelayState=...]`).
    ///
    /// # Errors
    ///
    /// Fails if compression fails.
    pub fn encode_query(
        xml: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> SamlResult<String> {
        let compressed = deflate_compress(xml.as_bytes())?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(compressed);

        let mut query = format!(
            "{}={}",
            message_type.form_param(),
            urlencoding::encode(&encoded)
        );
        if let Some(rs) = relay_state {
            query.push_str(&format!("&{}={}", params::RELAY_STATE, urlencoding::encode(rs)));
        }
        Ok(query)
    }

    /// Encodes a message into a redirect URL for `destination`.
    ///
    /// # Errors
    ///
    /// Fails if compression fails.
    pub fn encode(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
    ) -> SamlResult<String> {
        let query = Self::encode_query(xml, relay_state, message_type)?;
        Ok(join_url(destination, &query))
    }

    /// Encodes a message into a redirect URL carrying a detached signature.
    ///
    /// # Errors
    ///
    /// Fails if compression or signing fails.
    pub fn encode_signed(
        xml: &str,
        destination: &str,
        relay_state: Option<&str>,
        message_type: SamlMessageType,
        signer: &XmlSigner,
    ) -> SamlResult<String> {
        let query = Self::encode_query(xml, relay_state, message_type)?;
        let signed = signer.sign_query(&query)?;
        Ok(join_url(destination, &signed))
    }

    /// Decodes a message from a raw query string or full redirect URL.
    ///
    /// # Errors
    ///
    /// Fails if no message parameter is present or the value cannot be
    /// decoded.
    pub fn decode(raw_query: &str) -> SamlResult<DecodedMessage> {
        let mut saml_request = None;
        let mut saml_response = None;
        let mut relay_state = None;
        let mut signature = None;
        let mut sig_alg = None;

        for (key, value) in url::form_urlencoded::parse(query_part(raw_query).as_bytes()) {
            match key.as_ref() {
                params::SAML_REQUEST => saml_request = Some(value.into_owned()),
                params::SAML_RESPONSE => saml_response = Some(value.into_owned()),
                params::RELAY_STATE => relay_state = Some(value.into_owned()),
                params::SIGNATURE => signature = Some(value.into_owned()),
                params::SIG_ALG => sig_alg = Some(value.into_owned()),
                _ => {}
            }
        }

        let (encoded, message_type) = match (saml_request, saml_response) {
            (Some(req), _) => (req, SamlMessageType::Request),
            (None, Some(resp)) => (resp, SamlMessageType::Response),
            (None, None) => {
                return Err(SamlError::InvalidRequest(
                    "no SAMLRequest or SAMLResponse parameter".to_string(),
                ))
            }
        };

        let compressed = base64::engine::general_purpose::STANDARD.decode(encoded.as_bytes())?;
        let xml_bytes = deflate_decompress(&compressed)?;
        let xml = String::from_utf8(xml_bytes)
            .map_err(|e| SamlError::InvalidRequest(format!("invalid UTF-8 in message: {e}")))?;

        Ok(DecodedMessage {
            xml,
            message_type,
            relay_state,
            signature,
            sig_alg,
        })
    }

    /// Reconstructs the exact byte sequence a detached signature covers.
    ///
    /// Keeps the message parameter, `RelayState` and `SigAlg` in the order
    /// they were received, with their values still URL-encoded as
    /// transmitted. `Signature` and unrelated parameters are dropped.
    /// Re-encoding decoded values would not be safe: senders differ in
    /// how they percent-encode.
    ///
    /// # Errors
    ///
    /// Fails if the message parameter or `SigAlg` is missing.
    pub fn signed_query_string(raw_query: &str) -> SamlResult<String> {
        let mut parts = Vec::new();
        let mut has_message = false;
        let mut has_sig_alg = false;

        for pair in query_part(raw_query).split('&') {
            let key = pair.split_once('=').map_or(pair, |(k, _)| k);
            match key {
                params::SAML_REQUEST | params::SAML_RESPONSE => has_message = true,
                params::SIG_ALG => has_sig_alg = true,
                params::RELAY_STATE => {}
                _ => continue,
            }
            parts.push(pair);
        }

        if !has_message {
            return Err(SamlError::InvalidRequest(
                "no SAMLRequest or SAMLResponse parameter".to_string(),
            ));
        }
        if !has_sig_alg {
            return Err(SamlError::SignatureInvalid("missing SigAlg parameter".to_string()));
        }

        Ok(parts.join("&"))
    }

    /// Extracts the detached signature bytes and the `SigAlg` URI.
    ///
    /// # Errors
    ///
    /// Fails with [`SamlError::SignatureInvalid`] if either parameter is
    /// missing or malformed.
    pub fn detached_signature(raw_query: &str) -> SamlResult<(Vec<u8>, String)> {
        let mut signature = None;
        let mut sig_alg = None;

        for (key, value) in raw_pairs(raw_query) {
            match key {
                params::SIGNATURE => signature = Some(form_decode(value)?),
                params::SIG_ALG => sig_alg = Some(form_decode(value)?),
                _ => {}
            }
        }

        let signature = signature
            .ok_or_else(|| SamlError::SignatureInvalid("missing Signature parameter".to_string()))?;
        let sig_alg =
            sig_alg.ok_or_else(|| SamlError::SignatureInvalid("missing SigAlg parameter".to_string()))?;

        let compact: String = signature.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| SamlError::SignatureInvalid(format!("invalid signature encoding: {e}")))?;

        Ok((bytes, sig_alg))
    }
}

/// Appends a query string to a destination URL.
fn join_url(destination: &str, query: &str) -> String {
    let separator = if destination.contains('?') { '&' } else { '?' };
    format!("{destination}{separator}{query}")
}

/// Returns the query part of a full URL, or the input if it is a bare query.
fn query_part(raw: &str) -> &str {
    let query = raw.split_once('?').map_or(raw, |(_, q)| q);
    query.split_once('#').map_or(query, |(q, _)| q)
}

/// Splits a query into raw (still encoded) key/value pairs.
fn raw_pairs(raw: &str) -> impl Iterator<Item = (&str, &str)> {
    query_part(raw)
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
}

/// Decodes one form-encoded value.
fn form_decode(value: &str) -> SamlResult<String> {
    urlencoding::decode(&value.replace('+', " "))
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| SamlError::InvalidRequest(format!("URL decode error: {e}")))
}

/// Compresses data using DEFLATE (raw, no zlib header).
fn deflate_compress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| SamlError::Deflate(format!("compression error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| SamlError::Deflate(format!("compression finish error: {e}")))
}

/// Decompresses raw DEFLATE data.
fn deflate_decompress(data: &[u8]) -> SamlResult<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| SamlError::Deflate(format!("decompression error: {e}")))?;
    Ok(decompressed)
}
