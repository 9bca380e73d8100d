#![forbid(unsafe_code)]

//! XML namespace constants used across the library.

/// XML Digital Signature namespace (hosts `KeyInfo`, `KeyName`, `DigestMethod`)
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// XML Encryption namespace
pub const ENC: &str = "http://www.w3.org/2001/04/xmlenc#";

/// XML Encryption 1.1 namespace
pub const ENC11: &str = "http://www.w3.org/2009/xmlenc11#";

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    // KeyInfo elements
    pub const KEY_INFO: &str = "KeyInfo";
    pub const KEY_NAME: &str = "KeyName";
    pub const RETRIEVAL_METHOD: &str = "RetrievalMethod";
    pub const DIGEST_METHOD: &str = "DigestMethod";

    // RSA-OAEP parameters
    pub const RSA_OAEP_PARAMS: &str = "OAEPparams";
    pub const RSA_MGF: &str = "MGF";

    // Encryption elements
    pub const ENCRYPTED_DATA: &str = "EncryptedData";
    pub const ENCRYPTED_KEY: &str = "EncryptedKey";
    pub const ENCRYPTION_METHOD: &str = "EncryptionMethod";
    pub const CIPHER_DATA: &str = "CipherData";
    pub const CIPHER_VALUE: &str = "CipherValue";
    pub const CIPHER_REFERENCE: &str = "CipherReference";
    pub const CARRIED_KEY_NAME: &str = "CarriedKeyName";

    // Key agreement, recognised only to be refused
    pub const AGREEMENT_METHOD: &str = "AgreementMethod";
    pub const DERIVED_KEY: &str = "DerivedKey";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ID: &str = "Id";
    pub const URI: &str = "URI";
    pub const TYPE: &str = "Type";
    pub const MIME_TYPE: &str = "MimeType";
    pub const ALGORITHM: &str = "Algorithm";
}

// ── Encryption type URIs ─────────────────────────────────────────────

pub const ENC_TYPE_CONTENT: &str = "http://www.w3.org/2001/04/xmlenc#Content";
pub const ENC_TYPE_ELEMENT: &str = "http://www.w3.org/2001/04/xmlenc#Element";
