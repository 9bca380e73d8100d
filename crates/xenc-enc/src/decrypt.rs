#![forbid(unsafe_code)]

//! XML-Enc decryption.
//!
//! Processing order:
//! 1. Locate the first `<EncryptedData>`, build the trust context and executor
//! 2. Read `<EncryptionMethod>` and the `Type` attribute
//! 3. Resolve the data key from `<KeyInfo>` (`EncryptedKey`, `RetrievalMethod`, `KeyName`)
//! 4. Decrypt `<CipherData>/<CipherValue>`
//! 5. For `#Element` / `#Content`, splice the plaintext over `<EncryptedData>`

use std::collections::HashMap;

use base64::Engine;
use xenc_core::{algorithm, ns, Error};
use xenc_crypto::{BlockCipher, EncryptionMethod, KeyTransport, KeyWrap, MethodClass, OaepParams};
use xenc_keys::{KeyMaterial, KeyRequirement, ResolvedKey, TrustContext};
use xenc_xml::{find_child_element, ElementRef, XmlDocument};
use zeroize::Zeroizing;

use crate::context::{DecryptOptions, EncContext};
use crate::diagnostics::Diagnostics;
use crate::error::{DecryptError, ErrorKind};

type IdMap = HashMap<String, roxmltree::NodeId>;

/// Decrypt the first `EncryptedData` in `document` with a single named key.
///
/// On success the element has been replaced by its plaintext. On failure the
/// document is unchanged.
pub fn decrypt_with_key(
    document: &mut XmlDocument,
    key_name: &str,
    key: &[u8],
) -> Result<(), DecryptError> {
    decrypt_with_options(document, key_name, key, &DecryptOptions::default())
}

/// [`decrypt_with_key`] with explicit options.
pub fn decrypt_with_options(
    document: &mut XmlDocument,
    key_name: &str,
    key: &[u8],
    options: &DecryptOptions,
) -> Result<(), DecryptError> {
    let mut diagnostics = Diagnostics::new();
    match run(document, KeyMaterial::new(key_name, key), options, &mut diagnostics) {
        Ok(()) => Ok(()),
        Err(kind) => {
            let err = DecryptError::new(kind, diagnostics.take());
            tracing::warn!(kind = kind.tag(), error = %err, "decrypt failed");
            Err(err)
        }
    }
}

fn run(
    document: &mut XmlDocument,
    material: KeyMaterial<'_>,
    options: &DecryptOptions,
    diagnostics: &mut Diagnostics,
) -> Result<(), ErrorKind> {
    let target = match document.find_element(ns::ENC, ns::node::ENCRYPTED_DATA) {
        Ok(Some(target)) => target,
        Ok(None) => return Err(ErrorKind::NodeNotFound),
        Err(e) => {
            diagnostics.record(e);
            return Err(ErrorKind::NodeNotFound);
        }
    };
    tracing::debug!(offset = target.range().start, "located EncryptedData");

    let trust = TrustContext::build(material, options.key_name_policy).map_err(|e| {
        diagnostics.record(e);
        ErrorKind::KeyContextCreationFailed
    })?;

    // Declared after `trust`, so it is dropped first.
    let mut ctx = EncContext::new(&trust, options).map_err(|e| {
        diagnostics.record(e);
        ErrorKind::EncryptionContextCreationFailed
    })?;

    if let Err(e) = ctx.decrypt(document, &target, diagnostics) {
        diagnostics.record(e);
        return Err(ErrorKind::DecryptionFailed);
    }
    if ctx.result().is_none() {
        return Err(ErrorKind::DecryptionFailed);
    }
    if !ctx.result_replaced() {
        return Err(ErrorKind::UnsupportedResultType);
    }
    Ok(())
}

impl EncContext<'_> {
    /// Decrypt `target` and, for XML results, splice the plaintext over it.
    ///
    /// Failures while trying individual `EncryptedKey` recipients are
    /// recorded in `diagnostics`; the returned error is the one that ended
    /// the attempt. Raw-octet results are kept in [`EncContext::result`]
    /// and leave the document alone.
    ///
    /// `diagnostics` is reset first, so a latch reused across calls only
    /// ever reports the current one.
    pub fn decrypt(
        &mut self,
        doc: &mut XmlDocument,
        target: &ElementRef,
        diagnostics: &mut Diagnostics,
    ) -> Result<(), Error> {
        diagnostics.reset();
        self.result = None;
        self.result_replaced = false;

        let (plaintext, replacement) = {
            let parsed = doc.parse_doc()?;
            let node = XmlDocument::resolve(&parsed, target).ok_or_else(|| {
                Error::XmlStructure("EncryptedData is no longer in the document".into())
            })?;
            let id_map = XmlDocument::build_id_map(&parsed, &self.id_attrs);

            let plaintext = self.decrypt_node(node, &parsed, &id_map, diagnostics)?;

            let replacement = match node.attribute(ns::attr::TYPE) {
                Some(ns::ENC_TYPE_ELEMENT) | Some(ns::ENC_TYPE_CONTENT) => Some(
                    prepare_replacement(&plaintext, target.range().start == 0)?,
                ),
                other => {
                    tracing::debug!(enc_type = ?other, "plaintext is not XML, leaving document alone");
                    None
                }
            };
            (plaintext, replacement)
        };

        if let Some(replacement) = &replacement {
            doc.splice(target, replacement)?;
        }
        self.result = Some(plaintext);
        self.result_replaced = replacement.is_some();
        Ok(())
    }

    fn decrypt_node<'a, 'input>(
        &self,
        node: roxmltree::Node<'a, 'input>,
        doc: &'a roxmltree::Document<'input>,
        id_map: &IdMap,
        diagnostics: &mut Diagnostics,
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        let (_, method) = read_encryption_method(node, "EncryptedData")?;
        if method.class() != MethodClass::BlockCipher {
            return Err(Error::UnsupportedAlgorithm(format!(
                "{method} cannot be used for EncryptedData"
            )));
        }
        let cipher = BlockCipher::from_method(method)?;
        tracing::debug!(algorithm = %method, "data cipher selected");

        let key = self.resolve_data_key(node, doc, id_map, cipher.key_size(), diagnostics)?;
        let cipher_bytes = read_cipher_data(node)?;
        Ok(Zeroizing::new(cipher.decrypt(&key, &cipher_bytes)?))
    }

    /// Resolve the data key from `KeyInfo`.
    ///
    /// Every `EncryptedKey` (inline or via `RetrievalMethod`) is tried in
    /// order and the first that unwraps wins. Without any, the held key is
    /// used directly, subject to the `KeyName` check.
    fn resolve_data_key<'a, 'input>(
        &self,
        node: roxmltree::Node<'a, 'input>,
        doc: &'a roxmltree::Document<'input>,
        id_map: &IdMap,
        key_size: usize,
        diagnostics: &mut Diagnostics,
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        let Some(key_info) = find_child_element(node, ns::DSIG, ns::node::KEY_INFO) else {
            return self.symmetric_key(None, key_size);
        };

        let mut last_err = None;
        for child in key_info.children().filter(|n| n.is_element()) {
            let tag = child.tag_name();
            let encrypted_key = match (tag.namespace().unwrap_or(""), tag.name()) {
                (ns::ENC, ns::node::ENCRYPTED_KEY) => Ok(child),
                (ns::DSIG, ns::node::RETRIEVAL_METHOD)
                    if child.attribute(ns::attr::TYPE) == Some(algorithm::ENCRYPTED_KEY) =>
                {
                    resolve_retrieval_method(child, doc, id_map)
                }
                (ns::ENC, ns::node::AGREEMENT_METHOD) | (ns::ENC11, ns::node::DERIVED_KEY) => {
                    Err(Error::UnsupportedAlgorithm(format!(
                        "{} is not supported",
                        tag.name()
                    )))
                }
                _ => continue,
            };

            match encrypted_key.and_then(|ek| self.decrypt_encrypted_key(ek, key_size)) {
                Ok(key) => return Ok(key),
                Err(e) => {
                    tracing::debug!(error = %e, "key reference failed");
                    diagnostics.record(&e);
                    last_err = Some(e);
                }
            }
        }
        if let Some(e) = last_err {
            return Err(e);
        }

        self.symmetric_key(declared_key_name(key_info), key_size)
    }

    fn decrypt_encrypted_key(
        &self,
        enc_key: roxmltree::Node<'_, '_>,
        key_size: usize,
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        let (method_node, method) = read_encryption_method(enc_key, "EncryptedKey")?;
        let declared = find_child_element(enc_key, ns::DSIG, ns::node::KEY_INFO)
            .and_then(declared_key_name);
        let cipher_bytes = read_cipher_data(enc_key)?;
        tracing::debug!(algorithm = %method, "decrypting EncryptedKey");

        let session_key = match method.class() {
            MethodClass::KeyTransport => {
                let transport = KeyTransport::from_method(method, read_oaep_params(method_node)?)?;
                match self.trust.resolve(declared, KeyRequirement::RsaPrivate)? {
                    ResolvedKey::Rsa(private_key) => transport.decrypt(private_key, &cipher_bytes)?,
                    ResolvedKey::Symmetric(_) => {
                        return Err(Error::Key("key transport needs an RSA private key".into()))
                    }
                }
            }
            MethodClass::KeyWrap => {
                let kw = KeyWrap::from_method(method)?;
                let kek = self.symmetric_key(declared, kw.kek_size())?;
                kw.unwrap(&kek, &cipher_bytes)?
            }
            MethodClass::BlockCipher => {
                let cipher = BlockCipher::from_method(method)?;
                let kek = self.symmetric_key(declared, cipher.key_size())?;
                cipher.decrypt(&kek, &cipher_bytes)?
            }
        };
        let session_key = Zeroizing::new(session_key);

        if session_key.len() != key_size {
            return Err(Error::Key(format!(
                "session key is {} bytes, data cipher needs {key_size}",
                session_key.len()
            )));
        }
        Ok(session_key)
    }

    fn symmetric_key(
        &self,
        declared: Option<&str>,
        size: usize,
    ) -> Result<Zeroizing<Vec<u8>>, Error> {
        match self.trust.resolve(declared, KeyRequirement::Symmetric { size })? {
            ResolvedKey::Symmetric(bytes) => Ok(Zeroizing::new(bytes.to_vec())),
            ResolvedKey::Rsa(_) => Err(Error::Key("RSA key cannot be used as a symmetric key".into())),
        }
    }
}

/// Read `EncryptionMethod/@Algorithm` under `owner` and look it up in the
/// allow-list.
fn read_encryption_method<'a, 'input>(
    owner: roxmltree::Node<'a, 'input>,
    owner_name: &str,
) -> Result<(roxmltree::Node<'a, 'input>, EncryptionMethod), Error> {
    let method_node = find_child_element(owner, ns::ENC, ns::node::ENCRYPTION_METHOD)
        .ok_or_else(|| Error::MissingElement(format!("EncryptionMethod on {owner_name}")))?;
    let uri = method_node.attribute(ns::attr::ALGORITHM).ok_or_else(|| {
        Error::MissingAttribute(format!("Algorithm on {owner_name} EncryptionMethod"))
    })?;
    Ok((method_node, EncryptionMethod::from_uri(uri)?))
}

/// Follow a same-document `RetrievalMethod` to its `EncryptedKey`.
fn resolve_retrieval_method<'a, 'input>(
    retrieval: roxmltree::Node<'a, 'input>,
    doc: &'a roxmltree::Document<'input>,
    id_map: &IdMap,
) -> Result<roxmltree::Node<'a, 'input>, Error> {
    let uri = retrieval
        .attribute(ns::attr::URI)
        .ok_or_else(|| Error::MissingAttribute("URI on RetrievalMethod".into()))?;
    let id = uri
        .strip_prefix('#')
        .ok_or_else(|| Error::InvalidUri(format!("RetrievalMethod must be same-document: {uri}")))?;
    let target = id_map
        .get(id)
        .and_then(|&node_id| doc.get_node(node_id))
        .ok_or_else(|| Error::InvalidUri(format!("cannot resolve #{id}")))?;

    let tag = target.tag_name();
    if tag.namespace() != Some(ns::ENC) || tag.name() != ns::node::ENCRYPTED_KEY {
        return Err(Error::XmlStructure(format!("#{id} is not an EncryptedKey")));
    }
    Ok(target)
}

fn declared_key_name<'a>(key_info: roxmltree::Node<'a, '_>) -> Option<&'a str> {
    find_child_element(key_info, ns::DSIG, ns::node::KEY_NAME)
        .and_then(|n| n.text())
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Read RSA-OAEP parameters from EncryptionMethod child elements.
fn read_oaep_params(method_node: roxmltree::Node<'_, '_>) -> Result<OaepParams, Error> {
    let mut params = OaepParams::default();

    for child in method_node.children().filter(|n| n.is_element()) {
        let local = child.tag_name().name();
        let child_ns = child.tag_name().namespace().unwrap_or("");

        if local == ns::node::DIGEST_METHOD && child_ns == ns::DSIG {
            params.digest_uri = child.attribute(ns::attr::ALGORITHM).map(str::to_owned);
        } else if local == ns::node::RSA_MGF && child_ns == ns::ENC11 {
            params.mgf_uri = child.attribute(ns::attr::ALGORITHM).map(str::to_owned);
        } else if local == ns::node::RSA_OAEP_PARAMS && child_ns == ns::ENC {
            params.oaep_params = Some(decode_base64(&element_text(child), "OAEPparams")?);
        }
    }

    Ok(params)
}

/// Read `CipherData/CipherValue` under `owner`.
///
/// `CipherReference` would require fetching external data and is refused.
fn read_cipher_data(owner: roxmltree::Node<'_, '_>) -> Result<Vec<u8>, Error> {
    let cipher_data = find_child_element(owner, ns::ENC, ns::node::CIPHER_DATA)
        .ok_or_else(|| Error::MissingElement("CipherData".into()))?;

    if let Some(cipher_value) = find_child_element(cipher_data, ns::ENC, ns::node::CIPHER_VALUE) {
        return decode_base64(&element_text(cipher_value), "CipherValue");
    }
    if find_child_element(cipher_data, ns::ENC, ns::node::CIPHER_REFERENCE).is_some() {
        return Err(Error::Other("CipherReference is not supported".into()));
    }
    Err(Error::MissingElement("CipherValue".into()))
}

fn element_text(node: roxmltree::Node<'_, '_>) -> String {
    node.children()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn decode_base64(text: &str, what: &str) -> Result<Vec<u8>, Error> {
    let clean: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(clean)
        .map_err(|e| Error::Base64(format!("{what}: {e}")))
}

/// Turn decrypted octets into replacement markup.
///
/// An XML declaration is only legal at the very start of a document, so it
/// is dropped unless the target starts there too.
fn prepare_replacement(
    plaintext: &[u8],
    at_document_start: bool,
) -> Result<Zeroizing<String>, Error> {
    let text = std::str::from_utf8(plaintext)
        .map_err(|e| Error::Decryption(format!("plaintext is not valid UTF-8: {e}")))?;
    let text = if at_document_start {
        text
    } else {
        strip_xml_declaration(text)
    };
    Ok(Zeroizing::new(text.to_owned()))
}

fn strip_xml_declaration(text: &str) -> &str {
    let is_declaration = text
        .strip_prefix("<?xml")
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_whitespace()));
    if !is_declaration {
        return text;
    }
    match text.find("?>") {
        Some(end) => text[end + 2..].trim_start(),
        None => text,
    }
}
