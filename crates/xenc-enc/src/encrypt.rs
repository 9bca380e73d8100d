#![forbid(unsafe_code)]

//! XML-Enc encryption.
//!
//! Replaces an element (or its content) with an `<EncryptedData>` whose
//! `KeyInfo` names the caller's key, either directly or through an
//! `<EncryptedKey>` carrying a fresh session key.

use std::ops::Range;

use base64::Engine;
use rand::RngCore;
use xenc_core::{ns, Error};
use xenc_crypto::{BlockCipher, EncryptionMethod, KeyTransport, KeyWrap, MethodClass, OaepParams};
use xenc_keys::{Key, KeyMaterial};
use xenc_xml::{escape_attr, escape_text, ElementRef, XmlDocument};
use zeroize::Zeroizing;

/// What part of the target is encrypted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncryptionType {
    /// The whole element, start and end tags included.
    #[default]
    Element,
    /// Only the element's children.
    Content,
}

impl EncryptionType {
    pub fn uri(self) -> &'static str {
        match self {
            EncryptionType::Element => ns::ENC_TYPE_ELEMENT,
            EncryptionType::Content => ns::ENC_TYPE_CONTENT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EncryptOptions {
    /// Data cipher.
    pub method: EncryptionMethod,
    pub enc_type: EncryptionType,
    /// When set, a random session key encrypts the data and is itself
    /// encrypted under the caller's key with this method.
    pub key_encryption: Option<EncryptionMethod>,
    /// Emit `ds:KeyName` with the caller's key name.
    pub emit_key_name: bool,
}

impl Default for EncryptOptions {
    fn default() -> Self {
        Self {
            method: EncryptionMethod::Aes256Gcm,
            enc_type: EncryptionType::Element,
            key_encryption: None,
            emit_key_name: true,
        }
    }
}

/// Encrypt `target` in place with a single named key.
///
/// The document is left unchanged if anything fails.
pub fn encrypt_with_key(
    doc: &mut XmlDocument,
    target: &ElementRef,
    key_name: &str,
    key: &[u8],
    options: &EncryptOptions,
) -> Result<(), Error> {
    if options.method.class() != MethodClass::BlockCipher {
        return Err(Error::UnsupportedAlgorithm(format!(
            "{} cannot be used for EncryptedData",
            options.method
        )));
    }
    let cipher = BlockCipher::from_method(options.method)?;
    let key = xenc_keys::loader::load_key(KeyMaterial::new(key_name, key))?;

    let range = {
        let parsed = doc.parse_doc()?;
        let node = XmlDocument::resolve(&parsed, target)
            .ok_or_else(|| Error::XmlStructure("target element is not in the document".into()))?;
        match options.enc_type {
            EncryptionType::Element => node.range(),
            EncryptionType::Content => content_range(doc.text(), node.range())?,
        }
    };
    let plaintext = Zeroizing::new(doc.text()[range.clone()].as_bytes().to_vec());

    let (data_key, key_info) = match options.key_encryption {
        None => {
            let data_key = Zeroizing::new(symmetric_bytes(&key, cipher.key_size())?.to_vec());
            let key_info = if options.emit_key_name {
                key_info_markup(&key_name_markup(key_name))
            } else {
                String::new()
            };
            (data_key, key_info)
        }
        Some(key_method) => {
            let mut session_key = Zeroizing::new(vec![0u8; cipher.key_size()]);
            rand::thread_rng().fill_bytes(&mut session_key);
            let encrypted = encrypt_session_key(key_method, &key, &session_key)?;
            let encrypted_key = encrypted_key_markup(
                key_method,
                options.emit_key_name.then_some(key_name),
                &encrypted,
            );
            (session_key, key_info_markup(&encrypted_key))
        }
    };

    let ciphertext = cipher.encrypt(&data_key, &plaintext)?;
    let markup = format!(
        r#"<xenc:EncryptedData xmlns:xenc="{enc}" Type="{ty}"><xenc:EncryptionMethod Algorithm="{alg}"/>{key_info}<xenc:CipherData><xenc:CipherValue>{cv}</xenc:CipherValue></xenc:CipherData></xenc:EncryptedData>"#,
        enc = ns::ENC,
        ty = options.enc_type.uri(),
        alg = options.method.uri(),
        cv = b64(&ciphertext),
    );

    doc.replace_range(range, &markup)?;
    tracing::debug!(
        algorithm = %options.method,
        enc_type = ?options.enc_type,
        key_encryption = ?options.key_encryption,
        "encrypted element"
    );
    Ok(())
}

fn encrypt_session_key(
    method: EncryptionMethod,
    key: &Key,
    session_key: &[u8],
) -> Result<Vec<u8>, Error> {
    match method.class() {
        MethodClass::KeyWrap => {
            let kw = KeyWrap::from_method(method)?;
            kw.wrap(symmetric_bytes(key, kw.kek_size())?, session_key)
        }
        MethodClass::KeyTransport => {
            let public_key = key
                .rsa_public_key()
                .ok_or_else(|| Error::Key("key transport needs an RSA key".into()))?;
            KeyTransport::from_method(method, OaepParams::default())?.encrypt(public_key, session_key)
        }
        MethodClass::BlockCipher => {
            let cipher = BlockCipher::from_method(method)?;
            cipher.encrypt(symmetric_bytes(key, cipher.key_size())?, session_key)
        }
    }
}

fn symmetric_bytes(key: &Key, size: usize) -> Result<&[u8], Error> {
    let bytes = key
        .symmetric_key_bytes()
        .ok_or_else(|| Error::Key("a symmetric key is required".into()))?;
    if bytes.len() != size {
        return Err(Error::Key(format!(
            "expected {size} byte symmetric key, got {}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

/// Byte range between the end of the start tag and the start of the end tag.
fn content_range(text: &str, element: Range<usize>) -> Result<Range<usize>, Error> {
    let source = &text[element.clone()];

    let mut quote = None;
    let mut start_tag_end = None;
    for (i, c) in source.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => {
                start_tag_end = Some(i + 1);
                break;
            }
            _ => {}
        }
    }
    let start = start_tag_end
        .ok_or_else(|| Error::XmlStructure("unterminated start tag".into()))?;
    let end = source
        .rfind("</")
        .filter(|&end| end >= start)
        .ok_or_else(|| Error::XmlStructure("element has no content to encrypt".into()))?;
    if start == end {
        return Err(Error::XmlStructure("element has no content to encrypt".into()));
    }
    Ok(element.start + start..element.start + end)
}

fn key_name_markup(key_name: &str) -> String {
    format!("<ds:KeyName>{}</ds:KeyName>", escape_text(key_name))
}

fn key_info_markup(inner: &str) -> String {
    if inner.is_empty() {
        return String::new();
    }
    format!(r#"<ds:KeyInfo xmlns:ds="{}">{inner}</ds:KeyInfo>"#, ns::DSIG)
}

fn encrypted_key_markup(method: EncryptionMethod, key_name: Option<&str>, encrypted: &[u8]) -> String {
    let key_info = key_name.map(|name| key_info_markup(&key_name_markup(name))).unwrap_or_default();
    format!(
        r#"<xenc:EncryptedKey><xenc:EncryptionMethod Algorithm="{alg}"/>{key_info}<xenc:CipherData><xenc:CipherValue>{cv}</xenc:CipherValue></xenc:CipherData></xenc:EncryptedKey>"#,
        alg = escape_attr(method.uri()),
        cv = b64(encrypted),
    )
}

fn b64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}
