#![forbid(unsafe_code)]

//! Closed allow-list mapping `Algorithm` URIs to encryption methods.
//!
//! The URI comes from the untrusted document, so lookup is a table match
//! against known identifiers and nothing else.

use xenc_core::{algorithm, Error};

/// Every encryption method the engine will execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionMethod {
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
    Aes128Gcm,
    Aes192Gcm,
    Aes256Gcm,
    TripleDesCbc,
    KwAes128,
    KwAes192,
    KwAes256,
    KwTripleDes,
    RsaPkcs1,
    RsaOaep,
    RsaOaep11,
}

/// Where a method may legally appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodClass {
    /// Data encryption under `EncryptedData` (also accepted for `EncryptedKey`).
    BlockCipher,
    /// Symmetric key wrap, `EncryptedKey` only.
    KeyWrap,
    /// RSA key transport, `EncryptedKey` only.
    KeyTransport,
}

const ALLOW_LIST: &[(&str, EncryptionMethod)] = &[
    (algorithm::AES128_CBC, EncryptionMethod::Aes128Cbc),
    (algorithm::AES192_CBC, EncryptionMethod::Aes192Cbc),
    (algorithm::AES256_CBC, EncryptionMethod::Aes256Cbc),
    (algorithm::AES128_GCM, EncryptionMethod::Aes128Gcm),
    (algorithm::AES192_GCM, EncryptionMethod::Aes192Gcm),
    (algorithm::AES256_GCM, EncryptionMethod::Aes256Gcm),
    (algorithm::TRIPLEDES_CBC, EncryptionMethod::TripleDesCbc),
    (algorithm::KW_AES128, EncryptionMethod::KwAes128),
    (algorithm::KW_AES192, EncryptionMethod::KwAes192),
    (algorithm::KW_AES256, EncryptionMethod::KwAes256),
    (algorithm::KW_TRIPLEDES, EncryptionMethod::KwTripleDes),
    (algorithm::RSA_PKCS1, EncryptionMethod::RsaPkcs1),
    (algorithm::RSA_OAEP, EncryptionMethod::RsaOaep),
    (algorithm::RSA_OAEP_ENC11, EncryptionMethod::RsaOaep11),
];

impl EncryptionMethod {
    /// Look up a method by its `Algorithm` URI.
    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        ALLOW_LIST
            .iter()
            .find(|(u, _)| *u == uri)
            .map(|(_, m)| *m)
            .ok_or_else(|| Error::UnsupportedAlgorithm(uri.to_owned()))
    }

    /// The canonical URI for this method.
    pub fn uri(self) -> &'static str {
        ALLOW_LIST
            .iter()
            .find(|(_, m)| *m == self)
            .map(|(u, _)| *u)
            .unwrap_or_default()
    }

    pub fn class(self) -> MethodClass {
        use EncryptionMethod::*;
        match self {
            Aes128Cbc | Aes192Cbc | Aes256Cbc | Aes128Gcm | Aes192Gcm | Aes256Gcm
            | TripleDesCbc => MethodClass::BlockCipher,
            KwAes128 | KwAes192 | KwAes256 | KwTripleDes => MethodClass::KeyWrap,
            RsaPkcs1 | RsaOaep | RsaOaep11 => MethodClass::KeyTransport,
        }
    }

    /// Required symmetric key length in bytes; `None` for RSA transport.
    pub fn key_size(self) -> Option<usize> {
        use EncryptionMethod::*;
        match self {
            Aes128Cbc | Aes128Gcm | KwAes128 => Some(16),
            Aes192Cbc | Aes192Gcm | KwAes192 => Some(24),
            Aes256Cbc | Aes256Gcm | KwAes256 => Some(32),
            TripleDesCbc | KwTripleDes => Some(24),
            RsaPkcs1 | RsaOaep | RsaOaep11 => None,
        }
    }

    /// All allow-listed methods, in table order.
    pub fn all() -> impl Iterator<Item = EncryptionMethod> {
        ALLOW_LIST.iter().map(|(_, m)| *m)
    }
}

impl std::fmt::Display for EncryptionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_method_roundtrips_through_its_uri() {
        for method in EncryptionMethod::all() {
            assert_eq!(EncryptionMethod::from_uri(method.uri()).unwrap(), method);
        }
    }

    #[test]
    fn test_unknown_uri_rejected() {
        assert!(EncryptionMethod::from_uri("http://example.com/fake-cipher").is_err());
        // Near-miss of a listed identifier
        assert!(EncryptionMethod::from_uri("http://www.w3.org/2001/04/xmlenc#aes128-cbc ").is_err());
        assert!(EncryptionMethod::from_uri("").is_err());
    }

    #[test]
    fn test_classes_and_sizes() {
        assert_eq!(EncryptionMethod::Aes192Gcm.class(), MethodClass::BlockCipher);
        assert_eq!(EncryptionMethod::KwTripleDes.class(), MethodClass::KeyWrap);
        assert_eq!(EncryptionMethod::RsaOaep11.class(), MethodClass::KeyTransport);
        assert_eq!(EncryptionMethod::Aes192Gcm.key_size(), Some(24));
        assert_eq!(EncryptionMethod::RsaPkcs1.key_size(), None);
    }

    #[test]
    fn test_w3c_algorithm_uri_correctness() {
        assert_eq!(
            EncryptionMethod::Aes128Gcm.uri(),
            "http://www.w3.org/2009/xmlenc11#aes128-gcm"
        );
        assert_eq!(
            EncryptionMethod::Aes256Cbc.uri(),
            "http://www.w3.org/2001/04/xmlenc#aes256-cbc"
        );
        assert_eq!(
            EncryptionMethod::KwAes192.uri(),
            "http://www.w3.org/2001/04/xmlenc#kw-aes192"
        );
    }
}
