//! Private key loading for key-pair authentication.
//!
//! Keys are read as PEM (inline text or a file), parsed as RSA, and handed to
//! the SDK as unencrypted PKCS#8 DER. PKCS#1 `RSA PRIVATE KEY` blocks are
//! re-encoded as PKCS#8.

use std::path::Path;

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::RsaPrivateKey;

use crate::error::ConnectionError;

const TAG_PKCS8: &str = "PRIVATE KEY";
const TAG_PKCS1_RSA: &str = "RSA PRIVATE KEY";
const TAG_ENCRYPTED: &str = "ENCRYPTED PRIVATE KEY";

/// Load a private key and return it as PKCS#8 DER.
///
/// `pem` wins over `path` when both are set. Any failure, including key
/// material that does not parse as an RSA private key, is reported as
/// [`ConnectionError::Authentication`].
pub fn load_private_key(pem: Option<&str>, path: Option<&Path>) -> Result<Vec<u8>, ConnectionError> {
    read_key(pem, path)
        .map_err(|e| ConnectionError::Authentication(format!("Error loading private key: {}", e)))
}

fn read_key(pem: Option<&str>, path: Option<&Path>) -> Result<Vec<u8>, String> {
    let material = match (pem, path) {
        (Some(pem), _) => pem.as_bytes().to_vec(),
        (None, Some(path)) => std::fs::read(path)
            .map_err(|e| format!("cannot read {}: {}", path.display(), e))?,
        (None, None) => return Err("No private key source available".into()),
    };

    let parsed = pem::parse(&material).map_err(|e| e.to_string())?;
    let key = match parsed.tag() {
        TAG_PKCS8 => RsaPrivateKey::from_pkcs8_der(parsed.contents())
            .map_err(|e| format!("invalid PKCS#8 RSA key: {}", e))?,
        TAG_PKCS1_RSA => RsaPrivateKey::from_pkcs1_der(parsed.contents())
            .map_err(|e| format!("invalid PKCS#1 RSA key: {}", e))?,
        TAG_ENCRYPTED => return Err("encrypted private keys are not supported".into()),
        other => return Err(format!("unsupported PEM block `{}`", other)),
    };

    let der = key.to_pkcs8_der().map_err(|e| e.to_string())?;
    Ok(der.as_bytes().to_vec())
}
