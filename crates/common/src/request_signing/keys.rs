//! RSA key material and its PEM armor.
//!
//! Private keys travel as PKCS#1 (`RSA PRIVATE KEY`), public keys as
//! `SubjectPublicKeyInfo` (`PUBLIC KEY`); this is what the installation
//! endpoint accepts and what it hands back for the server key.

use base64::{engine::general_purpose, Engine};
use error_stack::Report;
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::constants::{PRIVATE_KEY_LABEL, PUBLIC_KEY_LABEL, RSA_KEY_BITS};
use crate::error::BunqError;

const ARMOR_LINE_WIDTH: usize = 64;

fn key_format_error(message: impl Into<String>) -> Report<BunqError> {
    Report::new(BunqError::KeyFormat {
        message: message.into(),
    })
}

/// Wrap raw key bytes in a labeled, 64-column base64 block.
#[must_use]
pub fn encode_armored(bytes: &[u8], label: &str) -> String {
    let encoded = general_purpose::STANDARD.encode(bytes);

    let mut armored = format!("-----BEGIN {label}-----\n");
    // base64 output is ASCII, so byte chunks are valid str slices.
    for line in encoded.as_bytes().chunks(ARMOR_LINE_WIDTH) {
        armored.push_str(&String::from_utf8_lossy(line));
        armored.push('\n');
    }
    armored.push_str(&format!("-----END {label}-----\n"));
    armored
}

/// Extract and decode the bytes between the `label` markers.
///
/// # Errors
///
/// Returns [`BunqError::KeyFormat`] if either marker is missing, the block is
/// empty, or the interior is not valid base64.
pub fn decode_armored(text: &str, label: &str) -> Result<Vec<u8>, Report<BunqError>> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let body_start = text
        .find(&begin)
        .map(|idx| idx + begin.len())
        .ok_or_else(|| key_format_error(format!("missing '{begin}' marker")))?;
    let body_len = text[body_start..]
        .find(&end)
        .ok_or_else(|| key_format_error(format!("missing '{end}' marker")))?;

    let body: String = text[body_start..body_start + body_len]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if body.is_empty() {
        return Err(key_format_error(format!("empty '{label}' block")));
    }

    general_purpose::STANDARD
        .decode(body.as_bytes())
        .map_err(|e| key_format_error(format!("invalid base64 in '{label}' block: {e}")))
}

/// Parse a PEM-armored `SubjectPublicKeyInfo` RSA public key.
///
/// # Errors
///
/// Returns [`BunqError::KeyFormat`] if the armor or the DER payload is invalid.
pub fn parse_public_key_pem(pem: &str) -> Result<RsaPublicKey, Report<BunqError>> {
    let der = decode_armored(pem, PUBLIC_KEY_LABEL)?;
    RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| key_format_error(format!("invalid public key: {e}")))
}

/// Our own signing key pair.
#[derive(Clone)]
pub struct KeyPair {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl KeyPair {
    /// Generate a fresh RSA-2048 key pair.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::KeyFormat`] if the RSA backend fails to produce a key.
    pub fn generate() -> Result<Self, Report<BunqError>> {
        let private_key = RsaPrivateKey::new(&mut OsRng, RSA_KEY_BITS)
            .map_err(|e| key_format_error(format!("key generation failed: {e}")))?;
        Ok(Self::from_private_key(private_key))
    }

    /// Load a key pair from a PKCS#1 `RSA PRIVATE KEY` block.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::KeyFormat`] if the armor or the DER payload is invalid.
    pub fn from_private_pem(pem: &str) -> Result<Self, Report<BunqError>> {
        let der = decode_armored(pem, PRIVATE_KEY_LABEL)?;
        let private_key = RsaPrivateKey::from_pkcs1_der(&der)
            .map_err(|e| key_format_error(format!("invalid private key: {e}")))?;
        Ok(Self::from_private_key(private_key))
    }

    fn from_private_key(private_key: RsaPrivateKey) -> Self {
        let public_key = private_key.to_public_key();
        Self {
            private_key,
            public_key,
        }
    }

    /// # Errors
    ///
    /// Returns [`BunqError::KeyFormat`] if the key cannot be DER-encoded.
    pub fn private_key_pem(&self) -> Result<String, Report<BunqError>> {
        let der = self
            .private_key
            .to_pkcs1_der()
            .map_err(|e| key_format_error(format!("private key encoding failed: {e}")))?;
        Ok(encode_armored(der.as_bytes(), PRIVATE_KEY_LABEL))
    }

    /// # Errors
    ///
    /// Returns [`BunqError::KeyFormat`] if the key cannot be DER-encoded.
    pub fn public_key_pem(&self) -> Result<String, Report<BunqError>> {
        let der = self
            .public_key
            .to_public_key_der()
            .map_err(|e| key_format_error(format!("public key encoding failed: {e}")))?;
        Ok(encode_armored(der.as_bytes(), PUBLIC_KEY_LABEL))
    }

    #[must_use]
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    #[must_use]
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair").finish_non_exhaustive()
    }
}
