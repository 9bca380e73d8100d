#![forbid(unsafe_code)]

//! Key types and data structures.

use zeroize::Zeroizing;

/// Caller-owned key material, borrowed for the duration of one call.
///
/// `Debug` prints the name and length only.
#[derive(Clone, Copy)]
pub struct KeyMaterial<'a> {
    pub name: &'a str,
    pub bytes: &'a [u8],
}

impl<'a> KeyMaterial<'a> {
    pub fn new(name: &'a str, bytes: &'a [u8]) -> Self {
        Self { name, bytes }
    }
}

impl std::fmt::Debug for KeyMaterial<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// The underlying key data.
pub enum KeyData {
    Rsa {
        private: Option<rsa::RsaPrivateKey>,
        public: rsa::RsaPublicKey,
    },
    /// Raw secret bytes. The algorithm is unknown until a document names
    /// one, so no length is enforced here.
    Symmetric(Zeroizing<Vec<u8>>),
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa { private, .. } => {
                if private.is_some() {
                    write!(f, "RSA private+public key")
                } else {
                    write!(f, "RSA public key")
                }
            }
            Self::Symmetric(k) => write!(f, "symmetric key ({} bytes)", k.len()),
        }
    }
}

/// A named key.
#[derive(Debug)]
pub struct Key {
    pub name: String,
    pub data: KeyData,
}

impl Key {
    pub fn new(name: impl Into<String>, data: KeyData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Get the raw symmetric key bytes.
    pub fn symmetric_key_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            KeyData::Symmetric(k) => Some(k.as_slice()),
            KeyData::Rsa { .. } => None,
        }
    }

    /// Get the RSA public key if available.
    pub fn rsa_public_key(&self) -> Option<&rsa::RsaPublicKey> {
        match &self.data {
            KeyData::Rsa { public, .. } => Some(public),
            KeyData::Symmetric(_) => None,
        }
    }

    /// Get the RSA private key if available.
    pub fn rsa_private_key(&self) -> Option<&rsa::RsaPrivateKey> {
        match &self.data {
            KeyData::Rsa { private: Some(pk), .. } => Some(pk),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_prints_key_bytes() {
        let secret = b"\x13\x37supersecretbytes";
        let material = KeyMaterial::new("k", secret);
        let rendered = format!("{material:?}");
        assert!(rendered.contains("len: 19"));
        assert!(!rendered.contains("supersecret"));

        let key = Key::new("k", KeyData::Symmetric(Zeroizing::new(secret.to_vec())));
        let rendered = format!("{key:?}");
        assert!(rendered.contains("symmetric key (19 bytes)"));
        assert!(!rendered.contains("supersecret"));
    }

    #[test]
    fn test_accessors() {
        let key = Key::new("k", KeyData::Symmetric(Zeroizing::new(vec![1, 2, 3])));
        assert_eq!(key.symmetric_key_bytes(), Some(&[1u8, 2, 3][..]));
        assert!(key.rsa_private_key().is_none());
        assert!(key.rsa_public_key().is_none());
    }
}
