#![forbid(unsafe_code)]

//! Key handling for xenc.
//!
//! Turns caller-supplied key bytes into a typed key and wraps it in a
//! [`TrustContext`] that resolves at most that one key.

pub mod key;
pub mod loader;
pub mod trust;

pub use key::{Key, KeyData, KeyMaterial};
pub use trust::{KeyNamePolicy, KeyRequirement, ResolvedKey, TrustContext};
