#![forbid(unsafe_code)]

//! Key construction from in-memory bytes (PEM, DER, raw binary).

use crate::key::{Key, KeyData, KeyMaterial};
use xenc_core::Error;
use zeroize::Zeroizing;

/// Build a named key from caller material.
///
/// PEM input must be an RSA key. DER input is tried as an RSA key and
/// otherwise treated as raw symmetric bytes, like any other binary input.
pub fn load_key(material: KeyMaterial<'_>) -> Result<Key, Error> {
    let data = load_key_data(material.bytes)?;
    Ok(Key::new(material.name, data))
}

/// Auto-detect the key format of `bytes`.
pub fn load_key_data(bytes: &[u8]) -> Result<KeyData, Error> {
    if bytes.is_empty() {
        return Err(Error::Key("key material is empty".into()));
    }

    if bytes.starts_with(b"-----BEGIN") {
        return load_pem_auto(bytes);
    }

    if let Some(data) = load_rsa_der(bytes) {
        return Ok(data);
    }

    Ok(KeyData::Symmetric(Zeroizing::new(bytes.to_vec())))
}

/// Load an RSA key from PEM data.
///
/// Tries PKCS#8 private, PKCS#1 private, SPKI public, PKCS#1 public.
pub fn load_pem_auto(pem_data: &[u8]) -> Result<KeyData, Error> {
    use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
    use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};

    let pem_str = std::str::from_utf8(pem_data)
        .map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))?;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_pem(pem_str) {
        return Ok(rsa_private(pk));
    }
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs1_pem(pem_str) {
        return Ok(rsa_private(pk));
    }
    if let Ok(public) = rsa::RsaPublicKey::from_public_key_pem(pem_str) {
        return Ok(KeyData::Rsa { private: None, public });
    }
    if let Ok(public) = rsa::RsaPublicKey::from_pkcs1_pem(pem_str) {
        return Ok(KeyData::Rsa { private: None, public });
    }
    Err(Error::Key(
        "unable to parse PEM data as an RSA key".into(),
    ))
}

fn load_rsa_der(der: &[u8]) -> Option<KeyData> {
    use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
    use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};

    // Every DER key starts with a SEQUENCE
    if der.first() != Some(&0x30) {
        return None;
    }
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        return Some(rsa_private(pk));
    }
    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs1_der(der) {
        return Some(rsa_private(pk));
    }
    if let Ok(public) = rsa::RsaPublicKey::from_public_key_der(der) {
        return Some(KeyData::Rsa { private: None, public });
    }
    if let Ok(public) = rsa::RsaPublicKey::from_pkcs1_der(der) {
        return Some(KeyData::Rsa { private: None, public });
    }
    None
}

fn rsa_private(pk: rsa::RsaPrivateKey) -> KeyData {
    let public = pk.to_public_key();
    KeyData::Rsa {
        private: Some(pk),
        public,
    }
}
