//! Webhook body signatures.
//!
//! When a verification key is configured, the `Plaid-Verification` header
//! must hold the hex-encoded ed25519 signature of the raw request body.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

pub const SIGNATURE_HEADER: &str = "plaid-verification";

/// Parse a hex-encoded 32-byte public key.
pub fn parse_key(hex_key: &str) -> Result<VerifyingKey, String> {
    let bytes = hex::decode(hex_key.trim()).map_err(|e| format!("webhook key is not hex: {e}"))?;
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| "webhook key must be 32 bytes".to_string())?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| format!("invalid webhook key: {e}"))
}

/// `true` when `signature_hex` is a valid signature of `body` under `key`.
pub fn verify(key: &VerifyingKey, body: &[u8], signature_hex: Option<&str>) -> bool {
    let Some(bytes) = signature_hex.and_then(|s| hex::decode(s.trim()).ok()) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&bytes) else {
        return false;
    };
    key.verify(body, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn keypair() -> (SigningKey, VerifyingKey) {
        let signing = SigningKey::from_bytes(&[7u8; 32]);
        let verifying = signing.verifying_key();
        (signing, verifying)
    }

    #[test]
    fn good_signature_verifies() {
        let (signing, verifying) = keypair();
        let body = br#"{"webhook_type":"TRANSACTIONS"}"#;
        let sig = hex::encode(signing.sign(body).to_bytes());
        assert!(verify(&verifying, body, Some(&sig)));
    }

    #[test]
    fn bad_or_missing_signature_fails() {
        let (signing, verifying) = keypair();
        let sig = hex::encode(signing.sign(b"original").to_bytes());
        assert!(!verify(&verifying, b"tampered", Some(&sig)));
        assert!(!verify(&verifying, b"original", None));
        assert!(!verify(&verifying, b"original", Some("zz")));
        assert!(!verify(&verifying, b"original", Some("abcd")));
    }

    #[test]
    fn key_parsing() {
        let (_, verifying) = keypair();
        let parsed = parse_key(&hex::encode(verifying.to_bytes())).unwrap();
        assert_eq!(parsed, verifying);
        assert!(parse_key("abcd").is_err());
        assert!(parse_key("not hex").is_err());
    }
}
