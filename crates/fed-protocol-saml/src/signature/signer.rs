//! XML signature creation.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use fed_crypto::{SignatureAlgorithm, SigningKey};

use crate::error::{SamlError, SamlResult};
use crate::types::{params, transforms, XMLDSIG_NS};

use super::xml::{attribute, canonicalize, element_at, find_element, opening_tag, root_element_start};

/// Signs SAML documents and redirect query strings with one private key.
#[derive(Clone)]
pub struct XmlSigner {
    key: Arc<dyn SigningKey>,
}

impl XmlSigner {
    /// Creates a signer for the given key.
    #[must_use]
    pub fn new(key: Arc<dyn SigningKey>) -> Self {
        Self { key }
    }

    /// Returns the signature algorithm of the key.
    #[must_use]
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.key.algorithm()
    }

    /// Signs a document with an enveloped signature over its root element.
    ///
    /// `reference_id` must be the `ID` of the document root. The
    /// `<ds:Signature>` element is inserted after the root's `Issuer`, or
    /// directly after the root start tag when there is none.
    ///
    /// # Errors
    ///
    /// Fails if the root does not carry `reference_id`, the document is
    /// already signed, or signing fails.
    pub fn sign_document(&self, xml: &str, reference_id: &str) -> SamlResult<String> {
        let root_start = root_element_start(xml)?;
        let root = element_at(xml, root_start)?;
        let root_open = opening_tag(root)?;

        if attribute(root_open, "ID") != Some(reference_id) {
            return Err(SamlError::SignatureCreation(format!(
                "document root does not carry ID '{reference_id}'"
            )));
        }
        if root_open.ends_with("/>") {
            return Err(SamlError::SignatureCreation(
                "cannot sign an empty root element".to_string(),
            ));
        }
        if find_element(root, "Signature", 0).is_some() {
            return Err(SamlError::SignatureCreation("document is already signed".to_string()));
        }

        let algorithm = self.key.algorithm();
        let digest = fed_crypto::hash(algorithm.hash_algorithm(), canonicalize(root).as_bytes());
        let digest_b64 = base64::engine::general_purpose::STANDARD.encode(digest);

        let signed_info = build_signed_info(reference_id, &digest_b64, algorithm);
        let signature_value = self
            .key
            .sign(canonicalize(&signed_info).as_bytes())
            .map_err(|e| SamlError::SignatureCreation(e.to_string()))?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature_value);

        let element = format!(
            "<ds:Signature xmlns:ds=\"{XMLDSIG_NS}\">{signed_info}\
             <ds:SignatureValue>{signature_b64}</ds:SignatureValue>\
             <ds:KeyInfo><ds:KeyName>{}</ds:KeyName></ds:KeyInfo></ds:Signature>",
            self.key.key_id()
        );

        let insert_at = root_start + insert_position(root, root_open.len())?;
        let mut signed = String::with_capacity(xml.len() + element.len());
        signed.push_str(&xml[..insert_at]);
        signed.push_str(&element);
        signed.push_str(&xml[insert_at..]);
        Ok(signed)
    }

    /// Adds `SigAlg` and a detached `Signature` to an unsigned redirect
    /// query string.
    ///
    /// The signed bytes are the query exactly as it will be transmitted,
    /// up to and including `SigAlg`.
    ///
    /// # Errors
    ///
    /// Fails if signing fails.
    pub fn sign_query(&self, unsigned_query: &str) -> SamlResult<String> {
        let mut query = format!(
            "{unsigned_query}&{}={}",
            params::SIG_ALG,
            urlencoding::encode(self.key.algorithm().uri())
        );
        let signature = self
            .key
            .sign(query.as_bytes())
            .map_err(|e| SamlError::SignatureCreation(e.to_string()))?;
        let signature_b64 = base64::engine::general_purpose::STANDARD.encode(signature);

        query.push_str(&format!(
            "&{}={}",
            params::SIGNATURE,
            urlencoding::encode(&signature_b64)
        ));
        Ok(query)
    }
}

impl fmt::Debug for XmlSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlSigner")
            .field("key_id", &self.key.key_id())
            .field("algorithm", &self.key.algorithm())
            .finish()
    }
}

/// Offset within `root` right after its direct `Issuer` child, or after
/// the start tag.
fn insert_position(root: &str, open_len: usize) -> SamlResult<usize> {
    let after_open = root[open_len..].trim_start();
    let first_child = root.len() - after_open.len();

    match find_element(root, "Issuer", open_len) {
        Some(pos) if pos == first_child => Ok(pos + element_at(root, pos)?.len()),
        _ => Ok(open_len),
    }
}

fn build_signed_info(reference_id: &str, digest_b64: &str, algorithm: SignatureAlgorithm) -> String {
    format!(
        "<ds:SignedInfo>\
         <ds:CanonicalizationMethod Algorithm=\"{c14n}\"/>\
         <ds:SignatureMethod Algorithm=\"{method}\"/>\
         <ds:Reference URI=\"#{reference_id}\">\
         <ds:Transforms>\
         <ds:Transform Algorithm=\"{enveloped}\"/>\
         <ds:Transform Algorithm=\"{c14n}\"/>\
         </ds:Transforms>\
         <ds:DigestMethod Algorithm=\"{digest}\"/>\
         <ds:DigestValue>{digest_b64}</ds:DigestValue>\
         </ds:Reference>\
         </ds:SignedInfo>",
        c14n = transforms::EXCLUSIVE_C14N,
        method = algorithm.uri(),
        enveloped = transforms::ENVELOPED_SIGNATURE,
        digest = algorithm.hash_algorithm().uri(),
    )
}
