#![forbid(unsafe_code)]

//! Encryption context: options and per-call executor state.

use xenc_core::Error;
use xenc_keys::{KeyNamePolicy, TrustContext};
use zeroize::Zeroizing;

/// Caller-tunable decrypt behaviour.
#[derive(Debug, Clone, Default)]
pub struct DecryptOptions {
    /// How a `ds:KeyName` in the document is matched against the key name.
    pub key_name_policy: KeyNamePolicy,
    /// Additional ID attribute names for `RetrievalMethod` lookups.
    /// `Id`, `ID` and `id` are always recognised.
    pub id_attrs: Vec<String>,
}

impl DecryptOptions {
    pub fn with_key_name_policy(mut self, policy: KeyNamePolicy) -> Self {
        self.key_name_policy = policy;
        self
    }

    pub fn add_id_attr(&mut self, name: &str) {
        self.id_attrs.push(name.to_owned());
    }
}

/// Transform executor for one decrypt, bound to one trust context.
///
/// Holds the recovered plaintext until the context is dropped; the buffer
/// is zeroized on drop.
pub struct EncContext<'t> {
    pub(crate) trust: &'t TrustContext,
    pub(crate) id_attrs: Vec<String>,
    pub(crate) result: Option<Zeroizing<Vec<u8>>>,
    pub(crate) result_replaced: bool,
}

impl<'t> EncContext<'t> {
    /// Bind a new executor to `trust`.
    ///
    /// Fails if an ID attribute name is not a usable XML name.
    pub fn new(trust: &'t TrustContext, options: &DecryptOptions) -> Result<Self, Error> {
        for name in &options.id_attrs {
            if !is_xml_name(name) {
                return Err(Error::Other(format!("invalid ID attribute name '{name}'")));
            }
        }
        Ok(Self {
            trust,
            id_attrs: options.id_attrs.clone(),
            result: None,
            result_replaced: false,
        })
    }

    /// The trust context this executor resolves keys through.
    pub fn trust(&self) -> &TrustContext {
        self.trust
    }

    /// Recovered plaintext of the last successful decrypt.
    pub fn result(&self) -> Option<&[u8]> {
        self.result.as_ref().map(|r| r.as_slice())
    }

    /// Whether the plaintext was spliced into the document.
    pub fn result_replaced(&self) -> bool {
        self.result_replaced
    }
}

impl std::fmt::Debug for EncContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncContext")
            .field("key_name", &self.trust.name())
            .field("id_attrs", &self.id_attrs)
            .field("result_len", &self.result.as_ref().map(|r| r.len()))
            .field("result_replaced", &self.result_replaced)
            .finish()
    }
}

impl Drop for EncContext<'_> {
    fn drop(&mut self) {
        tracing::trace!(result_replaced = self.result_replaced, "encryption context released");
    }
}

fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}
