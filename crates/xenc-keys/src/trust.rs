#![forbid(unsafe_code)]

//! Single-key trust context.
//!
//! Holds exactly one named key and answers key lookups made while
//! processing a document. A lookup either yields that key or fails; there
//! is no other key source to fall back to.

use crate::key::{Key, KeyData, KeyMaterial};
use xenc_core::Error;

/// How a name declared in the document (`ds:KeyName`) is matched against
/// the held key's name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyNamePolicy {
    /// A declared name must equal the held name.
    #[default]
    Strict,
    /// Declared names are ignored; the held key answers every lookup.
    TrustAny,
}

/// What the transform needs from the resolved key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRequirement {
    /// An RSA private key, for key transport.
    RsaPrivate,
    /// Symmetric key bytes of exactly this length.
    Symmetric { size: usize },
}

/// A key handed out by [`TrustContext::resolve`].
#[derive(Clone, Copy)]
pub enum ResolvedKey<'a> {
    Rsa(&'a rsa::RsaPrivateKey),
    Symmetric(&'a [u8]),
}

/// Key-resolution context pre-loaded with a single binding.
#[derive(Debug)]
pub struct TrustContext {
    key: Key,
    policy: KeyNamePolicy,
}

impl TrustContext {
    /// Build a context from caller key material.
    ///
    /// Fails if the bytes cannot be turned into a key at all (empty input,
    /// malformed PEM). Whether a symmetric key fits a given algorithm is
    /// only known at resolution time.
    pub fn build(material: KeyMaterial<'_>, policy: KeyNamePolicy) -> Result<Self, Error> {
        let key = crate::loader::load_key(material)?;
        tracing::debug!(key_name = %key.name, key_type = ?key.data, ?policy, "trust context built");
        Ok(Self { key, policy })
    }

    /// Name of the held key.
    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn policy(&self) -> KeyNamePolicy {
        self.policy
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Resolve a key reference found in the document.
    ///
    /// `declared_name` is the `KeyName` attached to the reference, if any.
    pub fn resolve(
        &self,
        declared_name: Option<&str>,
        requirement: KeyRequirement,
    ) -> Result<ResolvedKey<'_>, Error> {
        if let (KeyNamePolicy::Strict, Some(declared)) = (self.policy, declared_name) {
            if declared != self.key.name {
                return Err(Error::KeyNotFound(format!(
                    "no key named '{declared}'"
                )));
            }
        }

        match (requirement, &self.key.data) {
            (KeyRequirement::RsaPrivate, KeyData::Rsa { private: Some(pk), .. }) => {
                Ok(ResolvedKey::Rsa(pk))
            }
            (KeyRequirement::RsaPrivate, KeyData::Rsa { private: None, .. }) => Err(Error::Key(
                "RSA private key required for key transport".into(),
            )),
            (KeyRequirement::Symmetric { size }, KeyData::Symmetric(bytes)) => {
                if bytes.len() == size {
                    Ok(ResolvedKey::Symmetric(bytes.as_slice()))
                } else {
                    Err(Error::Key(format!(
                        "expected {size} byte symmetric key, got {}",
                        bytes.len()
                    )))
                }
            }
            (requirement, data) => Err(Error::Key(format!(
                "{data:?} cannot satisfy {requirement:?}"
            ))),
        }
    }
}

impl Drop for TrustContext {
    fn drop(&mut self) {
        tracing::trace!(key_name = %self.key.name, "trust context released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symmetric(name: &str, bytes: &[u8], policy: KeyNamePolicy) -> TrustContext {
        TrustContext::build(KeyMaterial::new(name, bytes), policy).unwrap()
    }

    #[test]
    fn test_build_fails_on_empty_key() {
        let err = TrustContext::build(KeyMaterial::new("k", &[]), KeyNamePolicy::Strict);
        assert!(err.is_err());
    }

    #[test]
    fn test_strict_matches_declared_name() {
        let ctx = symmetric("test-key", &[1u8; 16], KeyNamePolicy::Strict);
        let req = KeyRequirement::Symmetric { size: 16 };
        assert!(matches!(
            ctx.resolve(Some("test-key"), req),
            Ok(ResolvedKey::Symmetric(k)) if k == [1u8; 16]
        ));
        assert!(matches!(
            ctx.resolve(Some("other"), req),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_undeclared_name_resolves_single_key() {
        let ctx = symmetric("test-key", &[1u8; 16], KeyNamePolicy::Strict);
        assert!(ctx
            .resolve(None, KeyRequirement::Symmetric { size: 16 })
            .is_ok());
    }

    #[test]
    fn test_trust_any_ignores_names() {
        let ctx = symmetric("test-key", &[1u8; 24], KeyNamePolicy::TrustAny);
        assert!(ctx
            .resolve(Some("someone-else"), KeyRequirement::Symmetric { size: 24 })
            .is_ok());
    }

    #[test]
    fn test_wrong_size_or_type_declined() {
        let ctx = symmetric("k", &[1u8; 16], KeyNamePolicy::Strict);
        assert!(ctx
            .resolve(Some("k"), KeyRequirement::Symmetric { size: 32 })
            .is_err());
        assert!(ctx.resolve(Some("k"), KeyRequirement::RsaPrivate).is_err());
    }

    #[test]
    fn test_rsa_key_resolution() {
        use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
        let sk = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let pem = sk.to_pkcs1_pem(LineEnding::LF).unwrap();
        let ctx = TrustContext::build(KeyMaterial::new("rsa", pem.as_bytes()), KeyNamePolicy::Strict)
            .unwrap();
        assert!(matches!(
            ctx.resolve(None, KeyRequirement::RsaPrivate),
            Ok(ResolvedKey::Rsa(_))
        ));
        assert!(ctx
            .resolve(None, KeyRequirement::Symmetric { size: 16 })
            .is_err());
    }
}
