#![forbid(unsafe_code)]

//! xenc CLI: decrypt and encrypt XML documents with a single named key.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;
use xenc_core::Error;
use xenc_crypto::{EncryptionMethod, MethodClass};
use xenc_enc::{DecryptOptions, EncryptOptions, EncryptionType};
use xenc_keys::KeyNamePolicy;
use xenc_xml::XmlDocument;

#[derive(Parser)]
#[command(
    name = "xenc",
    about = "Single-key XML Encryption: decrypt and encrypt XML documents",
    version
)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decrypt the first EncryptedData in a document
    Decrypt {
        /// Input encrypted XML file
        file: PathBuf,

        /// Key file: PEM/DER RSA key or raw symmetric key bytes
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Name the key is known by (matched against ds:KeyName)
        #[arg(short = 'n', long = "key-name")]
        key_name: String,

        /// Ignore ds:KeyName in the document
        #[arg(long = "trust-any")]
        trust_any: bool,

        /// Register additional ID attribute names
        #[arg(long = "id-attr")]
        id_attr: Vec<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encrypt the first matching element in place
    Encrypt {
        /// Input XML file
        file: PathBuf,

        /// Key file: PEM/DER RSA key or raw symmetric key bytes
        #[arg(short = 'k', long)]
        key: PathBuf,

        /// Name written to ds:KeyName
        #[arg(short = 'n', long = "key-name")]
        key_name: String,

        /// Local name of the element to encrypt
        #[arg(short = 'e', long)]
        element: String,

        /// Namespace URI of the element to encrypt
        #[arg(long = "ns", default_value = "")]
        namespace: String,

        /// Encrypt the element's content instead of the whole element
        #[arg(long)]
        content: bool,

        /// Data cipher (URI or short name, e.g. aes256-gcm)
        #[arg(short = 'm', long, default_value = "aes256-gcm", value_parser = parse_method)]
        method: EncryptionMethod,

        /// Carry a session key in an EncryptedKey using this method (e.g. kw-aes128, rsa-oaep-mgf1p)
        #[arg(long = "key-encryption", value_parser = parse_method)]
        key_encryption: Option<EncryptionMethod>,

        /// Do not emit ds:KeyName
        #[arg(long = "no-key-name")]
        no_key_name: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List supported algorithms and key types
    Info,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Decrypt {
            file,
            key,
            key_name,
            trust_any,
            id_attr,
            output,
        } => cmd_decrypt(&file, &key, &key_name, trust_any, id_attr, output),

        Commands::Encrypt {
            file,
            key,
            key_name,
            element,
            namespace,
            content,
            method,
            key_encryption,
            no_key_name,
            output,
        } => {
            let options = EncryptOptions {
                method,
                enc_type: if content {
                    EncryptionType::Content
                } else {
                    EncryptionType::Element
                },
                key_encryption,
                emit_key_name: !no_key_name,
            };
            cmd_encrypt(&file, &key, &key_name, &namespace, &element, &options, output)
        }

        Commands::Info => cmd_info(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_decrypt(
    file: &Path,
    key: &Path,
    key_name: &str,
    trust_any: bool,
    id_attr: Vec<String>,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let mut doc = read_document(file)?;
    let key_bytes = read_bytes(key)?;

    let options = DecryptOptions {
        key_name_policy: if trust_any {
            KeyNamePolicy::TrustAny
        } else {
            KeyNamePolicy::Strict
        },
        id_attrs: id_attr,
    };

    tracing::info!(file = %file.display(), "decrypting");
    xenc_enc::decrypt_with_options(&mut doc, key_name, &key_bytes, &options)
        .map_err(|e| Error::Other(format!("{e} [{}]", e.kind().tag())))?;
    write_output(output, doc.text().as_bytes())
}

fn cmd_encrypt(
    file: &Path,
    key: &Path,
    key_name: &str,
    namespace: &str,
    element: &str,
    options: &EncryptOptions,
    output: Option<PathBuf>,
) -> Result<(), Error> {
    let mut doc = read_document(file)?;
    let key_bytes = read_bytes(key)?;

    let target = doc
        .find_element(namespace, element)?
        .ok_or_else(|| Error::MissingElement(format!("{{{namespace}}}{element}")))?;

    tracing::info!(file = %file.display(), element, "encrypting");
    xenc_enc::encrypt_with_key(&mut doc, &target, key_name, &key_bytes, options)?;
    write_output(output, doc.text().as_bytes())
}

fn cmd_info() -> Result<(), Error> {
    println!("xenc: single-key XML Encryption");
    for (class, title) in [
        (MethodClass::BlockCipher, "Data encryption algorithms"),
        (MethodClass::KeyWrap, "Key wrap algorithms"),
        (MethodClass::KeyTransport, "Key transport algorithms"),
    ] {
        println!();
        println!("{title}:");
        for method in EncryptionMethod::all().filter(|m| m.class() == class) {
            println!("  {:<16} {}", short_name(method), method.uri());
        }
    }
    println!();
    println!("Supported key formats:");
    println!("  PEM, DER (RSA PKCS#8 / PKCS#1 / SPKI), raw binary (AES, 3DES)");
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

/// Fragment of the algorithm URI, e.g. `aes128-cbc`.
fn short_name(method: EncryptionMethod) -> &'static str {
    let uri = method.uri();
    uri.rsplit_once('#').map_or(uri, |(_, fragment)| fragment)
}

fn parse_method(s: &str) -> Result<EncryptionMethod, String> {
    EncryptionMethod::from_uri(s)
        .ok()
        .or_else(|| EncryptionMethod::all().find(|m| short_name(*m) == s))
        .ok_or_else(|| format!("unknown algorithm '{s}' (see `xenc info`)"))
}

/// Attach the path to an I/O error so the message names the file.
fn with_path(path: &Path, e: std::io::Error) -> Error {
    Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
}

fn read_document(path: &Path) -> Result<XmlDocument, Error> {
    let xml = std::fs::read_to_string(path).map_err(|e| with_path(path, e))?;
    XmlDocument::parse(xml)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, Error> {
    std::fs::read(path).map_err(|e| with_path(path, e))
}

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => std::fs::write(&p, data).map_err(|e| with_path(&p, e)),
        None => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(data)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_method_short_and_uri() {
        assert_eq!(parse_method("aes128-cbc").unwrap(), EncryptionMethod::Aes128Cbc);
        assert_eq!(parse_method("kw-aes256").unwrap(), EncryptionMethod::KwAes256);
        assert_eq!(
            parse_method(EncryptionMethod::RsaOaep.uri()).unwrap(),
            EncryptionMethod::RsaOaep
        );
        assert!(parse_method("rot13").is_err());
    }

    #[test]
    fn test_io_errors_name_the_file() {
        let missing = Path::new("/nonexistent/xenc-input.xml");
        let err = read_bytes(missing).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("xenc-input.xml"));
        assert!(matches!(read_document(missing), Err(Error::Io(_))));
    }

    #[test]
    fn test_short_names_are_unique() {
        let names: std::collections::HashSet<_> = EncryptionMethod::all().map(short_name).collect();
        assert_eq!(names.len(), EncryptionMethod::all().count());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "xenc", "-v", "encrypt", "in.xml", "-k", "key.bin", "-n", "k1", "-e", "Card",
            "--content", "--key-encryption", "kw-aes128",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Encrypt {
                content,
                key_encryption,
                method,
                ..
            } => {
                assert!(content);
                assert_eq!(key_encryption, Some(EncryptionMethod::KwAes128));
                assert_eq!(method, EncryptionMethod::Aes256Gcm);
            }
            _ => panic!("expected encrypt"),
        }
    }
}
