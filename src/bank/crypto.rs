//! ChaCha20-Poly1305 sealing of aggregator access tokens.
//!
//! The 256-bit key is the SHA-256 digest of the configured secret, so any
//! passphrase length works. Sealed form: `hex(nonce):hex(ciphertext || tag)`.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

use super::BankError;

const NONCE_LEN: usize = 12;
const AAD: &[u8] = b"subsaver-access-token";

#[derive(Clone)]
pub struct TokenSealer {
    cipher: ChaCha20Poly1305,
}

impl std::fmt::Debug for TokenSealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenSealer(<key>)")
    }
}

impl TokenSealer {
    pub fn new(secret: &str) -> Result<Self, BankError> {
        if secret.is_empty() {
            return Err(BankError::Crypto("encryption key must not be empty".into()));
        }
        let digest = Sha256::digest(secret.as_bytes());
        let key = Key::from_slice(&digest);
        Ok(Self { cipher: ChaCha20Poly1305::new(key) })
    }

    pub fn seal(&self, plaintext: &str) -> Result<String, BankError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext.as_bytes(), aad: AAD })
            .map_err(|_| BankError::Crypto("encryption failed".into()))?;
        Ok(format!("{}:{}", hex::encode(nonce), hex::encode(ciphertext)))
    }

    pub fn open(&self, sealed: &str) -> Result<String, BankError> {
        let (nonce_hex, body_hex) = sealed
            .split_once(':')
            .ok_or_else(|| BankError::Crypto("sealed token is malformed".into()))?;
        let nonce = hex::decode(nonce_hex)
            .map_err(|e| BankError::Crypto(format!("bad nonce encoding: {e}")))?;
        if nonce.len() != NONCE_LEN {
            return Err(BankError::Crypto(format!("nonce must be {NONCE_LEN} bytes")));
        }
        let body = hex::decode(body_hex)
            .map_err(|e| BankError::Crypto(format!("bad ciphertext encoding: {e}")))?;
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), Payload { msg: &body, aad: AAD })
            .map_err(|_| BankError::Crypto("authentication failed".into()))?;
        String::from_utf8(plaintext).map_err(|e| BankError::Crypto(format!("token is not UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sealed_token_opens_with_same_key() {
        let sealer = TokenSealer::new("correct horse battery staple").unwrap();
        let sealed = sealer.seal("access-sandbox-123").unwrap();
        assert!(!sealed.contains("access-sandbox"));
        assert_eq!(sealer.open(&sealed).unwrap(), "access-sandbox-123");
    }

    #[test]
    fn nonces_differ_between_seals() {
        let sealer = TokenSealer::new("k").unwrap();
        assert_ne!(sealer.seal("same").unwrap(), sealer.seal("same").unwrap());
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = TokenSealer::new("key-a").unwrap().seal("secret").unwrap();
        let err = TokenSealer::new("key-b").unwrap().open(&sealed).unwrap_err();
        assert!(matches!(err, BankError::Crypto(_)));
    }

    #[test]
    fn tampering_and_garbage_rejected() {
        let sealer = TokenSealer::new("k").unwrap();
        let sealed = sealer.seal("secret").unwrap();
        let mut tampered = sealed.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });
        assert!(sealer.open(&tampered).is_err());
        assert!(sealer.open("not-sealed").is_err());
        assert!(sealer.open("abcd:00").is_err());
        assert!(TokenSealer::new("").is_err());
    }
}
