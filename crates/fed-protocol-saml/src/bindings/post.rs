//! HTTP-POST binding.

use base64::Engine;

use crate::error::{SamlError, SamlResult};

use super::{DecodedMessage, SamlMessageType};

/// HTTP-POST binding encoder/decoder.
pub struct HttpPostBinding;

impl HttpPostBinding {
    /// Encodes a document for a `SAMLRequest` or `SAMLResponse` form field.
    #[must_use]
    pub fn encode(xml: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(xml)
    }

    /// Decodes a SAML message from HTTP-POST form data.
    ///
    /// # Errors
    ///
    /// Fails if neither parameter is present or the value is not base64
    /// encoded UTF-8.
    pub fn decode(
        saml_request: Option<&str>,
        saml_response: Option<&str>,
        relay_state: Option<&str>,
    ) -> SamlResult<DecodedMessage> {
        let (encoded, message_type) = if let Some(req) = saml_request {
            (req, SamlMessageType::Request)
        } else if let Some(resp) = saml_response {
            (resp, SamlMessageType::Response)
        } else {
            return Err(SamlError::InvalidRequest(
                "no SAMLRequest or SAMLResponse parameter".to_string(),
            ));
        };

        Ok(DecodedMessage {
            xml: Self::decode_document(encoded)?,
            message_type,
            relay_state: relay_state.map(String::from),
            signature: None,
            sig_alg: None,
        })
    }

    /// Decodes a single base64 form value into the document text.
    ///
    /// Line breaks inserted by some senders are tolerated.
    ///
    /// # Errors
    ///
    /// Fails if the value is not base64 encoded UTF-8.
    pub fn decode_document(encoded: &str) -> SamlResult<String> {
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = base64::engine::general_purpose::STANDARD.decode(compact)?;

        String::from_utf8(decoded)
            .map_err(|e| SamlError::InvalidRequest(format!("invalid UTF-8 in message: {e}")))
    }
}
