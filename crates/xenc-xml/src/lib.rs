#![forbid(unsafe_code)]

//! XML document abstraction for xenc.
//!
//! Provides an owned document over `roxmltree` with element lookup by
//! namespace and local name, and a transactional subtree splice.

pub mod document;
pub mod escape;

pub use document::{find_child_element, ElementRef, XmlDocument};
pub use escape::{escape_attr, escape_text};

/// Return roxmltree parsing options that allow DTD.
///
/// roxmltree does not expand external entities or perform entity
/// substitution beyond internal general entities, so allowing a DTD is
/// safe. Real-world encrypted documents (SAML responses among them)
/// occasionally carry one.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}
