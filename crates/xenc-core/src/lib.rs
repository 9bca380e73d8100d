#![forbid(unsafe_code)]

//! Shared definitions for the xenc workspace: algorithm URIs, XML
//! namespaces and the low-level error type.

pub mod algorithm;
pub mod error;
pub mod ns;

pub use error::{Error, Result};
