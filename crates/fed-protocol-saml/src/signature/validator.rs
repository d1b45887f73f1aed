//! XML signature validation.

use base64::Engine;
use fed_crypto::{HashAlgorithm, SignatureAlgorithm, SignatureError, VerifyingKey};
use tracing::debug;

use crate::bindings::HttpRedirectBinding;
use crate::error::{SamlError, SamlResult};

use super::xml::{
    attribute, canonicalize, count_elements, element_at, element_text, find_element, opening_tag,
    root_element_start,
};

/// Details of a signature that verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSignature {
    /// Algorithm the signature was made with.
    pub algorithm: SignatureAlgorithm,
    /// `ID` of the signed element (embedded signatures only).
    pub reference_id: Option<String>,
}

/// Verifies embedded and detached signatures against a known sender key.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlSignatureValidator;

impl XmlSignatureValidator {
    /// Creates a validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Verifies the enveloped signature of a POST-binding document.
    ///
    /// The document must contain exactly one `Signature` element and its
    /// single `Reference` must point at the root element, whose `ID` must
    /// be unique in the document. When `expected_reference` is given the
    /// root `ID` must equal it.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureInvalid`] on any structural problem,
    /// digest mismatch or bad signature value.
    pub fn verify_embedded(
        &self,
        document: &str,
        key: &VerifyingKey,
        expected_reference: Option<&str>,
    ) -> SamlResult<VerifiedSignature> {
        let root_start = root_element_start(document)?;
        let root = element_at(document, root_start)?;
        let root_id = attribute(opening_tag(root)?, "ID")
            .ok_or_else(|| invalid("document root has no ID"))?;

        if let Some(expected) = expected_reference {
            if expected != root_id {
                return Err(invalid(format!(
                    "document root ID '{root_id}' does not match message ID '{expected}'"
                )));
            }
        }
        if document.matches(&format!("ID=\"{root_id}\"")).count() != 1 {
            return Err(invalid("document root ID is not unique"));
        }

        match count_elements(root, "Signature") {
            0 => return Err(invalid("no Signature element found")),
            1 => {}
            _ => return Err(invalid("multiple Signature elements found")),
        }
        let signature_start = find_element(root, "Signature", 0)
            .ok_or_else(|| invalid("no Signature element found"))?;
        let signature = element_at(root, signature_start)?;

        let signed_info_start = find_element(signature, "SignedInfo", 0)
            .ok_or_else(|| invalid("no SignedInfo element found"))?;
        let signed_info = element_at(signature, signed_info_start)?;

        if count_elements(signed_info, "Reference") != 1 {
            return Err(invalid("SignedInfo must contain exactly one Reference"));
        }
        let reference = tag_attribute(signed_info, "Reference", "URI")?;
        if reference.strip_prefix('#') != Some(root_id) {
            return Err(invalid(format!(
                "Reference '{reference}' does not point at the document root"
            )));
        }

        let algorithm = SignatureAlgorithm::from_uri(tag_attribute(signed_info, "SignatureMethod", "Algorithm")?)
            .map_err(SignatureError::from)?;
        let digest_algorithm =
            HashAlgorithm::from_uri(tag_attribute(signed_info, "DigestMethod", "Algorithm")?)
                .map_err(SignatureError::from)?;

        let expected_digest = compact(
            element_text(signed_info, "DigestValue")?.ok_or_else(|| invalid("no DigestValue found"))?,
        );
        let unsigned = root.replacen(signature, "", 1);
        let digest = fed_crypto::hash(digest_algorithm, canonicalize(&unsigned).as_bytes());
        if base64::engine::general_purpose::STANDARD.encode(digest) != expected_digest {
            return Err(invalid("digest value mismatch"));
        }

        let signature_value = compact(
            element_text(&signature.replacen(signed_info, "", 1), "SignatureValue")?
                .ok_or_else(|| invalid("no SignatureValue found"))?,
        );
        let signature_bytes = base64::engine::general_purpose::STANDARD
            .decode(signature_value)
            .map_err(|e| invalid(format!("invalid signature encoding: {e}")))?;

        key.verify(algorithm, canonicalize(signed_info).as_bytes(), &signature_bytes)?;

        debug!(reference_id = %root_id, algorithm = ?algorithm, "embedded signature verified");
        Ok(VerifiedSignature {
            algorithm,
            reference_id: Some(root_id.to_string()),
        })
    }

    /// Verifies the detached signature of a Redirect-binding query string.
    ///
    /// `raw_query` must be the query exactly as received, before any URL
    /// decoding. When `expected_reference` is given the signed message
    /// parameter is decoded and its root `ID` must equal it.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SignatureInvalid`] if the signature or
    /// `SigAlg` is missing, the algorithm is not accepted, the signature
    /// does not verify, or the signed message is not the expected one.
    pub fn verify_detached(
        &self,
        raw_query: &str,
        key: &VerifyingKey,
        expected_reference: Option<&str>,
    ) -> SamlResult<VerifiedSignature> {
        let (signature, sig_alg) = HttpRedirectBinding::detached_signature(raw_query)?;
        let signed = HttpRedirectBinding::signed_query_string(raw_query)?;

        let algorithm = SignatureAlgorithm::from_uri(&sig_alg).map_err(SignatureError::from)?;
        key.verify(algorithm, signed.as_bytes(), &signature)?;

        let reference_id = match expected_reference {
            Some(expected) => {
                let decoded = HttpRedirectBinding::decode(raw_query)
                    .map_err(|e| invalid(format!("signed message cannot be decoded: {e}")))?;
                let root = element_at(&decoded.xml, root_element_start(&decoded.xml)?)?;
                let root_id = attribute(opening_tag(root)?, "ID")
                    .ok_or_else(|| invalid("signed message root has no ID"))?;
                if root_id != expected {
                    return Err(invalid(format!(
                        "signed message ID '{root_id}' does not match message ID '{expected}'"
                    )));
                }
                Some(root_id.to_string())
            }
            None => None,
        };

        debug!(algorithm = ?algorithm, reference_id = ?reference_id, "detached signature verified");
        Ok(VerifiedSignature {
            algorithm,
            reference_id,
        })
    }
}

fn invalid(message: impl Into<String>) -> SamlError {
    SamlError::SignatureInvalid(message.into())
}

fn compact(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Reads an attribute of the first `local_name` element inside `xml`.
fn tag_attribute<'a>(xml: &'a str, local_name: &str, attr: &str) -> SamlResult<&'a str> {
    let start = find_element(xml, local_name, 0)
        .ok_or_else(|| invalid(format!("no {local_name} element found")))?;
    let tag = opening_tag(&xml[start..])?;
    attribute(tag, attr).ok_or_else(|| invalid(format!("{local_name} has no {attr} attribute")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fed_crypto::{EcdsaSigningKey, RsaSigningKey, SigningKey};

    use super::*;
    use crate::bindings::SamlMessageType;
    use crate::signature::XmlSigner;

    const LOGOUT: &str = r#"<samlp:LogoutRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_l1" Version="2.0">
    <saml:Issuer>https://sp.example.com</saml:Issuer>
    <saml:NameID>alice</saml:NameID>
</samlp:LogoutRequest>"#;

    fn rsa() -> Arc<RsaSigningKey> {
        Arc::new(RsaSigningKey::generate(SignatureAlgorithm::RsaSha256).unwrap())
    }

    #[test]
    fn embedded_signature_verifies() {
        let key = rsa();
        let signed = XmlSigner::new(key.clone()).sign_document(LOGOUT, "_l1").unwrap();

        let verified = XmlSignatureValidator::new()
            .verify_embedded(&signed, &key.verifying_key(), Some("_l1"))
            .unwrap();
        assert_eq!(verified.algorithm, SignatureAlgorithm::RsaSha256);
        assert_eq!(verified.reference_id.as_deref(), Some("_l1"));
    }

    #[test]
    fn ecdsa_embedded_signature_verifies() {
        let key = Arc::new(EcdsaSigningKey::generate(SignatureAlgorithm::EcdsaSha256).unwrap());
        let signed = XmlSigner::new(key.clone()).sign_document(LOGOUT, "_l1").unwrap();

        XmlSignatureValidator::new()
            .verify_embedded(&signed, &key.verifying_key(), None)
            .unwrap();
    }

    #[test]
    fn tampered_content_fails_digest() {
        let key = rsa();
        let signed = XmlSigner::new(key.clone()).sign_document(LOGOUT, "_l1").unwrap();
        let tampered = signed.replace("alice", "mallory");

        let err = XmlSignatureValidator::new()
            .verify_embedded(&tampered, &key.verifying_key(), None)
            .unwrap_err();
        assert!(matches!(err, SamlError::SignatureInvalid(msg) if msg.contains("digest")));
    }

    #[test]
    fn wrong_key_fails() {
        let signed = XmlSigner::new(rsa()).sign_document(LOGOUT, "_l1").unwrap();
        let other = rsa();

        let err = XmlSignatureValidator::new()
            .verify_embedded(&signed, &other.verifying_key(), None)
            .unwrap_err();
        assert!(matches!(err, SamlError::SignatureInvalid(_)));
    }

    #[test]
    fn unsigned_document_fails() {
        let err = XmlSignatureValidator::new()
            .verify_embedded(LOGOUT, &rsa().verifying_key(), None)
            .unwrap_err();
        assert!(matches!(err, SamlError::SignatureInvalid(_)));
    }

    #[test]
    fn message_id_mismatch_fails() {
        let key = rsa();
        let signed = XmlSigner::new(key.clone()).sign_document(LOGOUT, "_l1").unwrap();

        let err = XmlSignatureValidator::new()
            .verify_embedded(&signed, &key.verifying_key(), Some("_other"))
            .unwrap_err();
        assert!(matches!(err, SamlError::SignatureInvalid(_)));
    }

    #[test]
    fn wrapped_duplicate_id_fails() {
        let key = rsa();
        let signed = XmlSigner::new(key.clone()).sign_document(LOGOUT, "_l1").unwrap();
        let wrapped = signed.replace(
            "<saml:NameID>alice</saml:NameID>",
            r#"<saml:NameID>alice</saml:NameID><Extensions><samlp:LogoutRequest ID="_l1"/></Extensions>"#,
        );

        let err = XmlSignatureValidator::new()
            .verify_embedded(&wrapped, &key.verifying_key(), None)
            .unwrap_err();
        assert!(matches!(err, SamlError::SignatureInvalid(_)));
    }

    #[test]
    fn sha1_digest_is_rejected() {
        let key = rsa();
        let signed = XmlSigner::new(key.clone()).sign_document(LOGOUT, "_l1").unwrap();
        let downgraded = signed.replace(
            HashAlgorithm::Sha256.uri(),
            "http://www.w3.org/2000/09/xmldsig#sha1",
        );

        let err = XmlSignatureValidator::new()
            .verify_embedded(&downgraded, &key.verifying_key(), None)
            .unwrap_err();
        assert!(matches!(err, SamlError::SignatureInvalid(_)));
    }

    #[test]
    fn detached_signature_verifies() {
        let key = rsa();
        let url = HttpRedirectBinding::encode_signed(
            LOGOUT,
            "https://idp.example.com/slo",
            Some("relay"),
            SamlMessageType::Request,
            &XmlSigner::new(key.clone()),
        )
        .unwrap();

        let verified = XmlSignatureValidator::new()
            .verify_detached(&url, &key.verifying_key(), Some("_l1"))
            .unwrap();
        assert_eq!(verified.algorithm, SignatureAlgorithm::RsaSha256);
        assert_eq!(verified.reference_id.as_deref(), Some("_l1"));
    }

    #[test]
    fn detached_signature_is_bound_to_its_message() {
        let key = rsa();
        let url = HttpRedirectBinding::encode_signed(
            LOGOUT,
            "https://idp.example.com/slo",
            None,
            SamlMessageType::Request,
            &XmlSigner::new(key.clone()),
        )
        .unwrap();

        let err = XmlSignatureValidator::new()
            .verify_detached(&url, &key.verifying_key(), Some("_other"))
            .unwrap_err();
        assert!(matches!(err, SamlError::SignatureInvalid(_)));
    }

    #[test]
    fn detached_signature_detects_altered_relay_state() {
        let key = rsa();
        let url = HttpRedirectBinding::encode_signed(
            LOGOUT,
            "https://idp.example.com/slo",
            Some("relay"),
            SamlMessageType::Request,
            &XmlSigner::new(key.clone()),
        )
        .unwrap();
        let altered = url.replace("RelayState=relay", "RelayState=other");

        let err = XmlSignatureValidator::new()
            .verify_detached(&altered, &key.verifying_key(), None)
            .unwrap_err();
        assert!(matches!(err, SamlError::SignatureInvalid(_)));
    }

    #[test]
    fn verification_paths_do_not_cross() {
        let key = rsa();
        let signer = XmlSigner::new(key.clone());
        let validator = XmlSignatureValidator::new();

        let document = signer.sign_document(LOGOUT, "_l1").unwrap();
        let query = HttpRedirectBinding::encode_signed(
            LOGOUT,
            "https://idp.example.com/slo",
            None,
            SamlMessageType::Request,
            &signer,
        )
        .unwrap();

        assert!(validator.verify_detached(&document, &key.verifying_key(), None).is_err());
        assert!(validator.verify_embedded(&query, &key.verifying_key(), None).is_err());
    }
}
