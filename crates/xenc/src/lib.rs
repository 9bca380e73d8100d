#![forbid(unsafe_code)]

//! Single-key XML Encryption.
//!
//! Facade over the workspace crates. Most callers only need
//! [`decrypt_with_key`]:
//!
//! ```no_run
//! use xenc::xml::XmlDocument;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = XmlDocument::parse(std::fs::read_to_string("order.xml")?)?;
//! xenc::decrypt_with_key(&mut doc, "test-key", b"0123456789abcdef")?;
//! println!("{}", doc.text());
//! # Ok(())
//! # }
//! ```

pub use xenc_core as core;
pub use xenc_crypto as crypto;
pub use xenc_enc as enc;
pub use xenc_keys as keys;
pub use xenc_xml as xml;

pub use xenc_enc::{
    decrypt_with_key, decrypt_with_options, encrypt_with_key, DecryptError, DecryptOptions,
    EncryptOptions, EncryptionType, ErrorKind,
};
pub use xenc_keys::KeyNamePolicy;
