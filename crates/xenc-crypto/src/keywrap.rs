#![forbid(unsafe_code)]

//! Key wrap algorithms (AES-KW per RFC 3394, 3DES-KW per RFC 3217).

use crate::registry::EncryptionMethod;
use aes_kw::Kek;
use xenc_core::Error;

/// A key wrap algorithm selected from the allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyWrap {
    Aes { kek_size: usize },
    TripleDes,
}

impl KeyWrap {
    pub fn from_method(method: EncryptionMethod) -> Result<Self, Error> {
        match method {
            EncryptionMethod::KwAes128 => Ok(Self::Aes { kek_size: 16 }),
            EncryptionMethod::KwAes192 => Ok(Self::Aes { kek_size: 24 }),
            EncryptionMethod::KwAes256 => Ok(Self::Aes { kek_size: 32 }),
            EncryptionMethod::KwTripleDes => Ok(Self::TripleDes),
            other => Err(Error::UnsupportedAlgorithm(format!(
                "not a key wrap: {other}"
            ))),
        }
    }

    pub fn kek_size(&self) -> usize {
        match self {
            Self::Aes { kek_size } => *kek_size,
            Self::TripleDes => 24,
        }
    }

    pub fn wrap(&self, kek: &[u8], key_data: &[u8]) -> Result<Vec<u8>, Error> {
        self.check_kek(kek)?;
        match self {
            Self::Aes { kek_size } => aes_wrap(*kek_size, kek, key_data),
            Self::TripleDes => tdes_wrap(kek, key_data),
        }
    }

    pub fn unwrap(&self, kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>, Error> {
        self.check_kek(kek)?;
        match self {
            Self::Aes { kek_size } => aes_unwrap(*kek_size, kek, wrapped),
            Self::TripleDes => tdes_unwrap(kek, wrapped),
        }
    }

    fn check_kek(&self, kek: &[u8]) -> Result<(), Error> {
        if kek.len() != self.kek_size() {
            return Err(Error::Crypto(format!(
                "expected {} byte KEK, got {}",
                self.kek_size(),
                kek.len()
            )));
        }
        Ok(())
    }
}

// ── AES-KW ───────────────────────────────────────────────────────────

fn aes_wrap(kek_size: usize, kek_bytes: &[u8], key_data: &[u8]) -> Result<Vec<u8>, Error> {
    if key_data.len() < 16 || key_data.len() % 8 != 0 {
        return Err(Error::Crypto("AES-KW input must be a multiple of 8 bytes".into()));
    }
    let mut out = vec![0u8; key_data.len() + 8];
    macro_rules! do_wrap {
        ($aes:ty) => {{
            let kek = Kek::<$aes>::new(kek_bytes.into());
            kek.wrap(key_data, &mut out)
                .map_err(|e| Error::Crypto(format!("AES-KW wrap: {e}")))?;
        }};
    }
    match kek_size {
        16 => do_wrap!(aes::Aes128),
        24 => do_wrap!(aes::Aes192),
        32 => do_wrap!(aes::Aes256),
        _ => return Err(Error::Crypto("unsupported KEK size".into())),
    }
    Ok(out)
}

fn aes_unwrap(kek_size: usize, kek_bytes: &[u8], wrapped: &[u8]) -> Result<Vec<u8>, Error> {
    if wrapped.len() < 24 || wrapped.len() % 8 != 0 {
        return Err(Error::Crypto("wrapped key has invalid length".into()));
    }
    let mut out = vec![0u8; wrapped.len() - 8];
    macro_rules! do_unwrap {
        ($aes:ty) => {{
            let kek = Kek::<$aes>::new(kek_bytes.into());
            kek.unwrap(wrapped, &mut out)
                .map_err(|e| Error::Crypto(format!("AES-KW unwrap: {e}")))?;
        }};
    }
    match kek_size {
        16 => do_unwrap!(aes::Aes128),
        24 => do_unwrap!(aes::Aes192),
        32 => do_unwrap!(aes::Aes256),
        _ => return Err(Error::Crypto("unsupported KEK size".into())),
    }
    Ok(out)
}

// ── CMS Triple-DES Key Wrap (RFC 3217) ───────────────────────────────

/// Fixed IV for the second 3DES-CBC pass (RFC 3217 section 3.2).
const TDES_KW_IV: [u8; 8] = [0x4a, 0xdd, 0xa2, 0x2c, 0x79, 0xe8, 0x21, 0x05];

fn cms_key_checksum(key_data: &[u8]) -> [u8; 8] {
    use sha1::Digest;
    let hash = sha1::Sha1::digest(key_data);
    let mut checksum = [0u8; 8];
    checksum.copy_from_slice(&hash[..8]);
    checksum
}

fn tdes_wrap(kek: &[u8], key_data: &[u8]) -> Result<Vec<u8>, Error> {
    use rand::RngCore;

    // WKCKS = key_data || checksum
    let mut wkcks = Vec::with_capacity(key_data.len() + 8);
    wkcks.extend_from_slice(key_data);
    wkcks.extend_from_slice(&cms_key_checksum(key_data));

    let mut iv = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut iv);
    let temp1 = tdes_cbc_raw_encrypt(kek, &iv, &wkcks)?;

    // TEMP2 = IV || TEMP1, reversed
    let mut temp2 = Vec::with_capacity(8 + temp1.len());
    temp2.extend_from_slice(&iv);
    temp2.extend_from_slice(&temp1);
    temp2.reverse();

    tdes_cbc_raw_encrypt(kek, &TDES_KW_IV, &temp2)
}

fn tdes_unwrap(kek: &[u8], wrapped: &[u8]) -> Result<Vec<u8>, Error> {
    if wrapped.len() < 24 || wrapped.len() % 8 != 0 {
        return Err(Error::Crypto("3DES-KW wrapped data has invalid length".into()));
    }

    let mut temp2 = tdes_cbc_raw_decrypt(kek, &TDES_KW_IV, wrapped)?;
    temp2.reverse();

    let (iv, enc_data) = temp2.split_at(8);
    let iv: [u8; 8] = iv
        .try_into()
        .map_err(|_| Error::Crypto("invalid IV length".into()))?;

    let wkcks = tdes_cbc_raw_decrypt(kek, &iv, enc_data)?;
    if wkcks.len() < 16 {
        return Err(Error::Crypto(
            "3DES-KW: decrypted data too short for checksum".into(),
        ));
    }
    let (key_data, checksum) = wkcks.split_at(wkcks.len() - 8);

    if checksum != cms_key_checksum(key_data) {
        return Err(Error::Crypto(
            "3DES-KW: key checksum verification failed".into(),
        ));
    }
    Ok(key_data.to_vec())
}

/// 3DES-CBC encrypt without padding; input must be block-aligned.
fn tdes_cbc_raw_encrypt(key: &[u8], iv: &[u8; 8], data: &[u8]) -> Result<Vec<u8>, Error> {
    use cbc::cipher::{BlockEncryptMut, KeyIvInit};

    if data.len() % 8 != 0 {
        return Err(Error::Crypto("3DES-KW: data not block-aligned".into()));
    }
    let encryptor = cbc::Encryptor::<des::TdesEde3>::new_from_slices(key, iv)
        .map_err(|e| Error::Crypto(format!("3DES init: {e}")))?;
    let mut buf = data.to_vec();
    encryptor
        .encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf, data.len())
        .map_err(|e| Error::Crypto(format!("3DES-CBC encrypt: {e}")))?;
    Ok(buf)
}

/// 3DES-CBC decrypt without padding; input must be block-aligned.
fn tdes_cbc_raw_decrypt(key: &[u8], iv: &[u8; 8], data: &[u8]) -> Result<Vec<u8>, Error> {
    use cbc::cipher::{BlockDecryptMut, KeyIvInit};

    let decryptor = cbc::Decryptor::<des::TdesEde3>::new_from_slices(key, iv)
        .map_err(|e| Error::Crypto(format!("3DES init: {e}")))?;
    let mut buf = data.to_vec();
    let result = decryptor
        .decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf)
        .map_err(|e| Error::Crypto(format!("3DES-CBC decrypt: {e}")))?;
    Ok(result.to_vec())
}
