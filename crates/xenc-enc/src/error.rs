#![forbid(unsafe_code)]

//! Top-level outcome of a decrypt call.

use std::fmt;

/// The stage at which a decrypt call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No `EncryptedData` element in the document.
    NodeNotFound,
    /// The caller's key material could not be turned into a trust context.
    KeyContextCreationFailed,
    /// The transform executor could not be constructed.
    EncryptionContextCreationFailed,
    /// Key resolution, unwrap, decryption or splicing failed.
    DecryptionFailed,
    /// The plaintext is raw octets rather than XML.
    UnsupportedResultType,
}

impl ErrorKind {
    /// Human-readable stage description, used as the message prefix.
    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::NodeNotFound => "start node not found",
            ErrorKind::KeyContextCreationFailed => "failed to load key",
            ErrorKind::EncryptionContextCreationFailed => "failed to create encryption context",
            ErrorKind::DecryptionFailed => "decryption failed",
            ErrorKind::UnsupportedResultType => {
                "Not implemented: don't know how to handle decrypted, non-XML data yet"
            }
        }
    }

    /// Stable tag for host bindings.
    pub fn tag(self) -> &'static str {
        match self {
            ErrorKind::NodeNotFound => "node_not_found",
            ErrorKind::KeyContextCreationFailed => "key_context_creation_failed",
            ErrorKind::EncryptionContextCreationFailed => "encryption_context_creation_failed",
            ErrorKind::DecryptionFailed => "decryption_failed",
            ErrorKind::UnsupportedResultType => "unsupported_result_type",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A failed decrypt: the failing stage plus the last low-level diagnostic
/// captured during the call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.message())]
pub struct DecryptError {
    kind: ErrorKind,
    detail: Option<String>,
}

impl DecryptError {
    pub fn new(kind: ErrorKind, detail: Option<String>) -> Self {
        Self { kind, detail }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The low-level diagnostic, if one was recorded.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// `"<stage>: <detail>"`, or just the stage when there is no detail.
    pub fn message(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{}: {detail}", self.kind.description()),
            None => self.kind.description().to_owned(),
        }
    }
}

impl From<ErrorKind> for DecryptError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_without_detail() {
        let err = DecryptError::from(ErrorKind::NodeNotFound);
        assert_eq!(err.to_string(), "start node not found");
        assert_eq!(err.detail(), None);
    }

    #[test]
    fn test_message_with_detail() {
        let err = DecryptError::new(
            ErrorKind::DecryptionFailed,
            Some("cryptographic error: AES-GCM decrypt".into()),
        );
        assert_eq!(
            err.to_string(),
            "decryption failed: cryptographic error: AES-GCM decrypt"
        );
        assert_eq!(err.kind(), ErrorKind::DecryptionFailed);
    }

    #[test]
    fn test_tags_are_distinct() {
        let kinds = [
            ErrorKind::NodeNotFound,
            ErrorKind::KeyContextCreationFailed,
            ErrorKind::EncryptionContextCreationFailed,
            ErrorKind::DecryptionFailed,
            ErrorKind::UnsupportedResultType,
        ];
        let tags: std::collections::HashSet<_> = kinds.iter().map(|k| k.tag()).collect();
        assert_eq!(tags.len(), kinds.len());
    }
}
