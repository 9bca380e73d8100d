#![forbid(unsafe_code)]

//! Cryptographic transforms for XML Encryption decryption.
//!
//! Every algorithm is reached through the closed allow-list in
//! [`registry`]; URIs that are not listed there are rejected before any
//! key material is touched.

pub mod cipher;
pub mod keytransport;
pub mod keywrap;
pub mod registry;

pub use cipher::BlockCipher;
pub use keytransport::{KeyTransport, OaepParams};
pub use keywrap::KeyWrap;
pub use registry::{EncryptionMethod, MethodClass};
