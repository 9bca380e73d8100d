#![forbid(unsafe_code)]

//! Key transport algorithms (RSA PKCS#1 v1.5, RSA-OAEP).

use crate::registry::EncryptionMethod;
use xenc_core::{algorithm, Error};

/// RSA-OAEP configuration parameters read from `EncryptionMethod` children.
#[derive(Debug, Clone, Default)]
pub struct OaepParams {
    /// Digest algorithm URI (default: SHA-1)
    pub digest_uri: Option<String>,
    /// MGF algorithm URI (default depends on the transport URI)
    pub mgf_uri: Option<String>,
    /// OAEPparams (optional label, base64-decoded)
    pub oaep_params: Option<Vec<u8>>,
}

/// Hash functions usable for OAEP digest and MGF1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OaepHash {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Padding {
    Pkcs1,
    Oaep { digest: OaepHash, mgf: OaepHash },
}

/// An RSA key transport algorithm with its resolved parameters.
#[derive(Debug, Clone)]
pub struct KeyTransport {
    method: EncryptionMethod,
    padding: Padding,
    /// OAEP label; the RSA backend only carries UTF-8 labels.
    label: Option<String>,
}

impl KeyTransport {
    /// Build a transport for an allow-listed method.
    ///
    /// Digest and MGF identifiers are resolved here, so an unknown digest
    /// fails before the private key is used.
    pub fn from_method(method: EncryptionMethod, params: OaepParams) -> Result<Self, Error> {
        let padding = match method {
            EncryptionMethod::RsaPkcs1 => Padding::Pkcs1,
            EncryptionMethod::RsaOaep | EncryptionMethod::RsaOaep11 => {
                let digest = resolve_digest(params.digest_uri.as_deref())?;
                let mgf = match resolve_mgf(params.mgf_uri.as_deref())? {
                    Some(mgf) => mgf,
                    // rsa-oaep-mgf1p: MGF1 is always SHA-1
                    None if method == EncryptionMethod::RsaOaep => OaepHash::Sha1,
                    // rsa-oaep (enc11): MGF follows the digest
                    None => digest,
                };
                Padding::Oaep { digest, mgf }
            }
            other => {
                return Err(Error::UnsupportedAlgorithm(format!(
                    "not a key transport: {other}"
                )))
            }
        };
        let label = params
            .oaep_params
            .map(|bytes| {
                String::from_utf8(bytes).map_err(|_| {
                    Error::UnsupportedAlgorithm("OAEPparams label is not valid UTF-8".into())
                })
            })
            .transpose()?;
        Ok(Self {
            method,
            padding,
            label,
        })
    }

    pub fn method(&self) -> EncryptionMethod {
        self.method
    }

    pub fn encrypt(&self, public_key: &rsa::RsaPublicKey, key_data: &[u8]) -> Result<Vec<u8>, Error> {
        let mut rng = rand::thread_rng();
        match self.padding {
            Padding::Pkcs1 => public_key
                .encrypt(&mut rng, rsa::Pkcs1v15Encrypt, key_data)
                .map_err(|e| Error::Crypto(format!("RSA PKCS#1 encrypt: {e}"))),
            Padding::Oaep { digest, mgf } => {
                let padding = oaep_padding(digest, mgf, self.label.as_deref());
                public_key
                    .encrypt(&mut rng, padding, key_data)
                    .map_err(|e| Error::Crypto(format!("RSA-OAEP encrypt: {e}")))
            }
        }
    }

    pub fn decrypt(&self, private_key: &rsa::RsaPrivateKey, encrypted: &[u8]) -> Result<Vec<u8>, Error> {
        match self.padding {
            Padding::Pkcs1 => private_key
                .decrypt(rsa::Pkcs1v15Encrypt, encrypted)
                .map_err(|e| Error::Crypto(format!("RSA PKCS#1 decrypt: {e}"))),
            Padding::Oaep { digest, mgf } => {
                let padding = oaep_padding(digest, mgf, self.label.as_deref());
                private_key
                    .decrypt(padding, encrypted)
                    .map_err(|e| Error::Crypto(format!("RSA-OAEP decrypt: {e}")))
            }
        }
    }
}

/// Build the OAEP padding scheme for a (digest, MGF) pair.
fn oaep_padding(digest: OaepHash, mgf: OaepHash, label: Option<&str>) -> rsa::Oaep {
    macro_rules! with_mgf {
        ($d:ty) => {
            match mgf {
                OaepHash::Sha1 => rsa::Oaep::new_with_mgf_hash::<$d, sha1::Sha1>(),
                OaepHash::Sha224 => rsa::Oaep::new_with_mgf_hash::<$d, sha2::Sha224>(),
                OaepHash::Sha256 => rsa::Oaep::new_with_mgf_hash::<$d, sha2::Sha256>(),
                OaepHash::Sha384 => rsa::Oaep::new_with_mgf_hash::<$d, sha2::Sha384>(),
                OaepHash::Sha512 => rsa::Oaep::new_with_mgf_hash::<$d, sha2::Sha512>(),
            }
        };
    }
    let mut padding = match digest {
        OaepHash::Sha1 => with_mgf!(sha1::Sha1),
        OaepHash::Sha224 => with_mgf!(sha2::Sha224),
        OaepHash::Sha256 => with_mgf!(sha2::Sha256),
        OaepHash::Sha384 => with_mgf!(sha2::Sha384),
        OaepHash::Sha512 => with_mgf!(sha2::Sha512),
    };
    padding.label = label.map(str::to_owned);
    padding
}

/// Resolve the OAEP DigestMethod URI; absent means SHA-1.
fn resolve_digest(uri: Option<&str>) -> Result<OaepHash, Error> {
    match uri {
        None | Some(algorithm::SHA1) => Ok(OaepHash::Sha1),
        Some(algorithm::SHA224) => Ok(OaepHash::Sha224),
        Some(algorithm::SHA256) => Ok(OaepHash::Sha256),
        Some(algorithm::SHA384) => Ok(OaepHash::Sha384),
        Some(algorithm::SHA512) => Ok(OaepHash::Sha512),
        Some(other) => Err(Error::UnsupportedAlgorithm(format!("OAEP digest: {other}"))),
    }
}

/// Resolve an explicit MGF URI; `None` when the element is absent.
fn resolve_mgf(uri: Option<&str>) -> Result<Option<OaepHash>, Error> {
    match uri {
        None => Ok(None),
        Some(algorithm::MGF1_SHA1) => Ok(Some(OaepHash::Sha1)),
        Some(algorithm::MGF1_SHA224) => Ok(Some(OaepHash::Sha224)),
        Some(algorithm::MGF1_SHA256) => Ok(Some(OaepHash::Sha256)),
        Some(algorithm::MGF1_SHA384) => Ok(Some(OaepHash::Sha384)),
        Some(algorithm::MGF1_SHA512) => Ok(Some(OaepHash::Sha512)),
        Some(other) => Err(Error::UnsupportedAlgorithm(format!("OAEP MGF: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> rsa::RsaPrivateKey {
        let mut rng = rand::thread_rng();
        rsa::RsaPrivateKey::new(&mut rng, 1024).expect("generate RSA key")
    }

    #[test]
    fn test_transport_roundtrip_all_methods() {
        let sk = test_key();
        let pk = sk.to_public_key();
        let session = [0x5au8; 16];
        for method in [
            EncryptionMethod::RsaPkcs1,
            EncryptionMethod::RsaOaep,
            EncryptionMethod::RsaOaep11,
        ] {
            let kt = KeyTransport::from_method(method, OaepParams::default()).unwrap();
            let ct = kt.encrypt(&pk, &session).unwrap();
            assert_eq!(kt.decrypt(&sk, &ct).unwrap(), session, "failed for {method}");
        }
    }

    #[test]
    fn test_oaep_parameters_must_match() {
        let sk = test_key();
        let pk = sk.to_public_key();
        let sha256 = OaepParams {
            digest_uri: Some(algorithm::SHA256.into()),
            ..OaepParams::default()
        };
        let sender = KeyTransport::from_method(EncryptionMethod::RsaOaep11, sha256).unwrap();
        let receiver =
            KeyTransport::from_method(EncryptionMethod::RsaOaep11, OaepParams::default()).unwrap();
        let ct = sender.encrypt(&pk, b"0123456789abcdef").unwrap();
        assert!(receiver.decrypt(&sk, &ct).is_err());
        assert!(sender.decrypt(&sk, &ct).is_ok());
    }

    #[test]
    fn test_unknown_digest_rejected() {
        let params = OaepParams {
            digest_uri: Some("http://www.w3.org/2001/04/xmldsig-more#md5".into()),
            ..OaepParams::default()
        };
        assert!(KeyTransport::from_method(EncryptionMethod::RsaOaep, params).is_err());

        let params = OaepParams {
            mgf_uri: Some("http://example.com/mgf".into()),
            ..OaepParams::default()
        };
        assert!(KeyTransport::from_method(EncryptionMethod::RsaOaep11, params).is_err());
    }

    #[test]
    fn test_mgf_defaults() {
        let sha512 = OaepParams {
            digest_uri: Some(algorithm::SHA512.into()),
            ..OaepParams::default()
        };
        let v10 = KeyTransport::from_method(EncryptionMethod::RsaOaep, sha512.clone()).unwrap();
        let v11 = KeyTransport::from_method(EncryptionMethod::RsaOaep11, sha512).unwrap();
        assert_eq!(
            v10.padding,
            Padding::Oaep { digest: OaepHash::Sha512, mgf: OaepHash::Sha1 }
        );
        assert_eq!(
            v11.padding,
            Padding::Oaep { digest: OaepHash::Sha512, mgf: OaepHash::Sha512 }
        );
    }

    #[test]
    fn test_oaep_label() {
        let sk = test_key();
        let pk = sk.to_public_key();
        let labelled = |label: &[u8]| OaepParams {
            oaep_params: Some(label.to_vec()),
            ..OaepParams::default()
        };
        let kt = KeyTransport::from_method(EncryptionMethod::RsaOaep, labelled(b"context")).unwrap();
        let ct = kt.encrypt(&pk, &[7u8; 16]).unwrap();
        assert_eq!(kt.decrypt(&sk, &ct).unwrap(), [7u8; 16]);

        let err = KeyTransport::from_method(EncryptionMethod::RsaOaep, labelled(&[0xff, 0x00, 0x9c]))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedAlgorithm(_)));
    }

    #[test]
    fn test_cipher_is_not_a_transport() {
        assert!(KeyTransport::from_method(EncryptionMethod::Aes128Gcm, OaepParams::default()).is_err());
    }
}
