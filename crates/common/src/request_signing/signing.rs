//! Request signing and response verification.
//!
//! Outgoing bodies are signed with our private key; incoming bodies are
//! checked against the server's public key. Both directions use
//! RSASSA-PKCS1-v1_5 over SHA-256 with standard base64 signature text.

use base64::{engine::general_purpose, Engine};
use error_stack::Report;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::RsaPublicKey;
use sha2::Sha256;

use crate::error::BunqError;

use super::keys::{parse_public_key_pem, KeyPair};

pub struct RequestSigner {
    key: SigningKey<Sha256>,
    server_key: VerifyingKey<Sha256>,
}

impl RequestSigner {
    #[must_use]
    pub fn new(keypair: &KeyPair, server_public_key: RsaPublicKey) -> Self {
        Self {
            key: SigningKey::<Sha256>::new(keypair.private_key().clone()),
            server_key: VerifyingKey::<Sha256>::new(server_public_key),
        }
    }

    /// Build a signer from our PKCS#1 private key and the server's public key.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::KeyFormat`] if either PEM block is malformed.
    pub fn from_pem(private_pem: &str, server_public_pem: &str) -> Result<Self, Report<BunqError>> {
        let keypair = KeyPair::from_private_pem(private_pem)?;
        let server_public_key = parse_public_key_pem(server_public_pem)?;
        Ok(Self::new(&keypair, server_public_key))
    }

    /// Sign the exact byte sequence that will be transmitted.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::KeyFormat`] if the private key cannot produce a
    /// signature (for example a key too small for the digest).
    pub fn sign(&self, payload: &[u8]) -> Result<String, Report<BunqError>> {
        let signature = self.key.try_sign(payload).map_err(|e| {
            Report::new(BunqError::KeyFormat {
                message: format!("Failed to sign payload: {e}"),
            })
        })?;

        Ok(general_purpose::STANDARD.encode(signature.to_bytes()))
    }

    /// Check a server signature against the exact bytes received.
    ///
    /// Returns `Ok(false)` when the signature is well-formed but does not
    /// match; that is the caller's cue that the response cannot be trusted.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::InvalidSignatureEncoding`] when `signature_b64` is
    /// empty or not base64.
    pub fn verify(&self, payload: &[u8], signature_b64: &str) -> Result<bool, Report<BunqError>> {
        let signature_b64 = signature_b64.trim();
        if signature_b64.is_empty() {
            return Err(Report::new(BunqError::InvalidSignatureEncoding {
                message: "Signature is empty".into(),
            }));
        }

        let signature_bytes = general_purpose::STANDARD
            .decode(signature_b64)
            .map_err(|e| {
                Report::new(BunqError::InvalidSignatureEncoding {
                    message: format!("Failed to decode signature: {e}"),
                })
            })?;

        let Ok(signature) = Signature::try_from(signature_bytes.as_slice()) else {
            return Ok(false);
        };

        Ok(self.server_key.verify(payload, &signature).is_ok())
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::tests::{
        client_signer, server_signer, CLIENT_PRIVATE_PEM, SERVER_PUBLIC_PEM, SIGNED_BODY,
        SIGNED_BODY_SIGNATURE,
    };

    #[test]
    fn test_request_signer_sign() {
        let signer = client_signer();
        let signature = signer
            .sign(b"these pretzels are making me thirsty")
            .expect("should sign");

        // 2048-bit signature -> 256 bytes -> 344 base64 chars
        assert_eq!(signature.len(), 344);
    }

    #[test]
    fn test_signature_is_deterministic() {
        let signer = client_signer();
        let first = signer.sign(b"payload").expect("should sign");
        let second = signer.sign(b"payload").expect("should sign");
        assert_eq!(first, second);
    }

    #[test]
    fn test_sign_and_verify() {
        // Each side verifies what the other signed.
        let client = client_signer();
        let server = server_signer();

        for payload in [&b""[..], b"{}", b"test payload for verification"] {
            let from_server = server.sign(payload).expect("should sign");
            assert!(client.verify(payload, &from_server).expect("should verify"));

            let from_client = client.sign(payload).expect("should sign");
            assert!(server.verify(payload, &from_client).expect("should verify"));
        }
    }

    #[test]
    fn test_verify_wrong_payload() {
        let signature = server_signer().sign(b"signed payload").expect("should sign");

        let result = client_signer()
            .verify(b"wrong payload", &signature)
            .expect("should not error");
        assert!(!result, "Signature should not verify with wrong payload");
    }

    #[test]
    fn test_verify_rejects_own_signature() {
        // Our own key is not the counterparty key.
        let client = client_signer();
        let signature = client.sign(b"payload").expect("should sign");

        assert!(!client.verify(b"payload", &signature).expect("should not error"));
    }

    #[test]
    fn test_verify_malformed_signature() {
        let err = client_signer()
            .verify(b"test payload", "not-valid-base64!!!")
            .expect_err("should error for malformed signature");
        assert!(matches!(
            err.current_context(),
            BunqError::InvalidSignatureEncoding { .. }
        ));
    }

    #[test]
    fn test_verify_empty_signature() {
        let err = client_signer()
            .verify(b"test payload", "  ")
            .expect_err("should error for empty signature");
        assert!(matches!(
            err.current_context(),
            BunqError::InvalidSignatureEncoding { .. }
        ));
    }

    #[test]
    fn test_verify_truncated_signature_is_mismatch() {
        let signature = server_signer().sign(b"payload").expect("should sign");
        let truncated = general_purpose::STANDARD.encode(b"short");

        let signer = client_signer();
        assert!(signer.verify(b"payload", &signature).expect("valid"));
        assert!(!signer.verify(b"payload", &truncated).expect("mismatch"));
    }

    #[test]
    fn test_debug_hides_key_material() {
        let rendered = format!("{:?}", client_signer());
        assert_eq!(rendered, "RequestSigner { .. }");
    }

    #[test]
    fn test_verify_openssl_signature() {
        // Produced with: openssl dgst -sha256 -sign server.pem body.json | base64
        let signer =
            RequestSigner::from_pem(CLIENT_PRIVATE_PEM, SERVER_PUBLIC_PEM).expect("should load");

        assert!(signer
            .verify(SIGNED_BODY, SIGNED_BODY_SIGNATURE)
            .expect("should verify"));

        let mut tampered = SIGNED_BODY.to_vec();
        tampered.push(b' ');
        assert!(!signer
            .verify(&tampered, SIGNED_BODY_SIGNATURE)
            .expect("should not error"));
    }
}
