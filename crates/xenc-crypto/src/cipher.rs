#![forbid(unsafe_code)]

//! Block cipher implementations (AES-CBC, AES-GCM, 3DES-CBC).
//!
//! Ciphertext layout follows XML Encryption: the IV (or GCM nonce) is
//! prepended to the encrypted octets, and the GCM tag is appended.

use crate::registry::{EncryptionMethod, MethodClass};
use xenc_core::Error;

/// A block cipher selected from the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockCipher {
    AesCbc { key_size: usize },
    AesGcm { key_size: usize },
    TripleDesCbc,
}

impl BlockCipher {
    /// Select the cipher for an allow-listed method.
    pub fn from_method(method: EncryptionMethod) -> Result<Self, Error> {
        use EncryptionMethod::*;
        match method {
            Aes128Cbc => Ok(Self::AesCbc { key_size: 16 }),
            Aes192Cbc => Ok(Self::AesCbc { key_size: 24 }),
            Aes256Cbc => Ok(Self::AesCbc { key_size: 32 }),
            Aes128Gcm => Ok(Self::AesGcm { key_size: 16 }),
            Aes192Gcm => Ok(Self::AesGcm { key_size: 24 }),
            Aes256Gcm => Ok(Self::AesGcm { key_size: 32 }),
            TripleDesCbc => Ok(Self::TripleDesCbc),
            other => {
                debug_assert_ne!(other.class(), MethodClass::BlockCipher);
                Err(Error::UnsupportedAlgorithm(format!(
                    "not a block cipher: {other}"
                )))
            }
        }
    }

    /// Look up a cipher by its `Algorithm` URI.
    pub fn from_uri(uri: &str) -> Result<Self, Error> {
        Self::from_method(EncryptionMethod::from_uri(uri)?)
    }

    pub fn key_size(&self) -> usize {
        match self {
            Self::AesCbc { key_size } | Self::AesGcm { key_size } => *key_size,
            Self::TripleDesCbc => 24,
        }
    }

    pub fn encrypt(&self, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        self.check_key(key)?;
        match self {
            Self::AesCbc { key_size } => aes_cbc_encrypt(*key_size, key, plaintext),
            Self::AesGcm { key_size } => aes_gcm_encrypt(*key_size, key, plaintext),
            Self::TripleDesCbc => tdes_cbc_encrypt(key, plaintext),
        }
    }

    pub fn decrypt(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
        self.check_key(key)?;
        match self {
            Self::AesCbc { key_size } => aes_cbc_decrypt(*key_size, key, data),
            Self::AesGcm { key_size } => aes_gcm_decrypt(*key_size, key, data),
            Self::TripleDesCbc => tdes_cbc_decrypt(key, data),
        }
    }

    fn check_key(&self, key: &[u8]) -> Result<(), Error> {
        if key.len() != self.key_size() {
            return Err(Error::Crypto(format!(
                "expected {} byte key, got {}",
                self.key_size(),
                key.len()
            )));
        }
        Ok(())
    }
}

// ── AES-CBC with XML Encryption padding ──────────────────────────────

fn aes_cbc_encrypt(key_size: usize, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    use cbc::cipher::{BlockEncryptMut, KeyIvInit};
    use rand::RngCore;

    let mut iv = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut iv);

    // Already padded, use NoPadding in cipher
    let mut buf = pkcs7_pad(plaintext, 16);
    let buf_len = buf.len();

    macro_rules! do_encrypt {
        ($aes:ty) => {{
            let enc = cbc::Encryptor::<$aes>::new_from_slices(key, &iv)
                .map_err(|e| Error::Crypto(format!("AES-CBC init: {e}")))?;
            enc.encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf, buf_len)
                .map_err(|e| Error::Crypto(format!("AES-CBC encrypt: {e}")))?;
        }};
    }

    match key_size {
        16 => do_encrypt!(aes::Aes128),
        24 => do_encrypt!(aes::Aes192),
        32 => do_encrypt!(aes::Aes256),
        _ => return Err(Error::Crypto("unsupported AES key size".into())),
    }

    let mut result = Vec::with_capacity(16 + buf.len());
    result.extend_from_slice(&iv);
    result.extend_from_slice(&buf);
    Ok(result)
}

fn aes_cbc_decrypt(key_size: usize, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    use cbc::cipher::{BlockDecryptMut, KeyIvInit};

    // IV plus at least one block
    if data.len() < 32 || data.len() % 16 != 0 {
        return Err(Error::Crypto("AES-CBC data invalid length".into()));
    }

    let (iv, ciphertext) = data.split_at(16);
    let mut buf = ciphertext.to_vec();

    macro_rules! do_decrypt {
        ($aes:ty) => {{
            let dec = cbc::Decryptor::<$aes>::new_from_slices(key, iv)
                .map_err(|e| Error::Crypto(format!("AES-CBC init: {e}")))?;
            dec.decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf)
                .map_err(|e| Error::Crypto(format!("AES-CBC decrypt: {e}")))?;
        }};
    }

    match key_size {
        16 => do_decrypt!(aes::Aes128),
        24 => do_decrypt!(aes::Aes192),
        32 => do_decrypt!(aes::Aes256),
        _ => return Err(Error::Crypto("unsupported AES key size".into())),
    }

    xmlenc_unpad(&buf, 16)
}

// ── AES-GCM ──────────────────────────────────────────────────────────

const GCM_NONCE_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;

fn aes_gcm_encrypt(key_size: usize, key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    use aes_gcm::aead::consts::U12;
    use aes_gcm::{aead::Aead, KeyInit, Nonce};
    use rand::RngCore;

    let mut nonce_bytes = [0u8; GCM_NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    macro_rules! seal {
        ($gcm:ty) => {{
            let cipher = <$gcm>::new_from_slice(key)
                .map_err(|e| Error::Crypto(format!("AES-GCM init: {e}")))?;
            cipher
                .encrypt(nonce, plaintext)
                .map_err(|e| Error::Crypto(format!("AES-GCM encrypt: {e}")))?
        }};
    }

    let ct = match key_size {
        16 => seal!(aes_gcm::Aes128Gcm),
        24 => seal!(aes_gcm::AesGcm<aes::Aes192, U12>),
        32 => seal!(aes_gcm::Aes256Gcm),
        _ => {
            return Err(Error::Crypto(
                "AES-GCM only supports 128, 192, and 256 bit keys".into(),
            ))
        }
    };

    let mut result = Vec::with_capacity(GCM_NONCE_LEN + ct.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ct);
    Ok(result)
}

fn aes_gcm_decrypt(key_size: usize, key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    use aes_gcm::aead::consts::U12;
    use aes_gcm::{aead::Aead, KeyInit, Nonce};

    if data.len() < GCM_NONCE_LEN + GCM_TAG_LEN {
        return Err(Error::Crypto("AES-GCM data too short".into()));
    }

    let (nonce, ct_and_tag) = data.split_at(GCM_NONCE_LEN);
    let nonce = Nonce::from_slice(nonce);

    macro_rules! open {
        ($gcm:ty) => {{
            let cipher = <$gcm>::new_from_slice(key)
                .map_err(|e| Error::Crypto(format!("AES-GCM init: {e}")))?;
            cipher
                .decrypt(nonce, ct_and_tag)
                .map_err(|e| Error::Crypto(format!("AES-GCM decrypt: {e}")))
        }};
    }

    match key_size {
        16 => open!(aes_gcm::Aes128Gcm),
        24 => open!(aes_gcm::AesGcm<aes::Aes192, U12>),
        32 => open!(aes_gcm::Aes256Gcm),
        _ => Err(Error::Crypto(
            "AES-GCM only supports 128, 192, and 256 bit keys".into(),
        )),
    }
}

// ── 3DES-CBC ─────────────────────────────────────────────────────────

fn tdes_cbc_encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
    use cbc::cipher::{BlockEncryptMut, KeyIvInit};
    use rand::RngCore;

    let mut iv = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut iv);

    let mut buf = pkcs7_pad(plaintext, 8);
    let buf_len = buf.len();

    let enc = cbc::Encryptor::<des::TdesEde3>::new_from_slices(key, &iv)
        .map_err(|e| Error::Crypto(format!("3DES init: {e}")))?;
    enc.encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf, buf_len)
        .map_err(|e| Error::Crypto(format!("3DES encrypt: {e}")))?;

    let mut result = Vec::with_capacity(8 + buf.len());
    result.extend_from_slice(&iv);
    result.extend_from_slice(&buf);
    Ok(result)
}

fn tdes_cbc_decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>, Error> {
    use cbc::cipher::{BlockDecryptMut, KeyIvInit};

    if data.len() < 16 || data.len() % 8 != 0 {
        return Err(Error::Crypto("3DES data invalid length".into()));
    }

    let (iv, ciphertext) = data.split_at(8);
    let mut buf = ciphertext.to_vec();

    let dec = cbc::Decryptor::<des::TdesEde3>::new_from_slices(key, iv)
        .map_err(|e| Error::Crypto(format!("3DES init: {e}")))?;
    dec.decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf)
        .map_err(|e| Error::Crypto(format!("3DES decrypt: {e}")))?;

    xmlenc_unpad(&buf, 8)
}

// ── Padding ──────────────────────────────────────────────────────────

fn pkcs7_pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let pad_len = block_size - (data.len() % block_size);
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.extend(std::iter::repeat(pad_len as u8).take(pad_len));
    padded
}

/// Remove W3C XML Encryption padding.
///
/// XML Encryption 1.0 (PKCS#7 style) and 1.1 (ISO 10126 style) both store
/// the padding length in the last byte; the filler bytes are not checked.
fn xmlenc_unpad(data: &[u8], block_size: usize) -> Result<Vec<u8>, Error> {
    let Some(&pad_byte) = data.last() else {
        return Err(Error::Crypto("empty plaintext block".into()));
    };
    let pad_len = pad_byte as usize;
    if pad_len == 0 || pad_len > block_size || pad_len > data.len() {
        return Err(Error::Crypto("invalid padding".into()));
    }
    Ok(data[..data.len() - pad_len].to_vec())
}
