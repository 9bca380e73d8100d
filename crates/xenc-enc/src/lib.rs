#![forbid(unsafe_code)]

//! XML Encryption (XML-Enc) with a single caller-supplied key.
//!
//! [`decrypt_with_key`] locates the first `EncryptedData` in a document,
//! decrypts it with the one key it is given and splices the plaintext back
//! in place. [`encrypt_with_key`] does the reverse for one element.

pub mod context;
pub mod decrypt;
pub mod diagnostics;
pub mod encrypt;
pub mod error;

pub use context::{DecryptOptions, EncContext};
pub use decrypt::{decrypt_with_key, decrypt_with_options};
pub use diagnostics::Diagnostics;
pub use encrypt::{encrypt_with_key, EncryptOptions, EncryptionType};
pub use error::{DecryptError, ErrorKind};
