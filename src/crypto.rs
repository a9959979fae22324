//! Encryption at rest for the platform revoke credential.
//!
//! XChaCha20-Poly1305 with a key derived from the site's signing secret,
//! a random 24-byte nonce per encryption, and a `nonce.ciphertext`
//! base64url encoding. Rotating the signing secret orphans stored
//! ciphertexts, which matches the token story: a rotated secret severs
//! everything.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{Key, KeyInit, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::CryptoError;

const NONCE_LEN: usize = 24;

fn cipher_for(secret: &[u8]) -> XChaCha20Poly1305 {
    // The signing secret is arbitrary-length; hash it down to the
    // 32-byte key the cipher wants.
    let digest = Sha256::digest(secret);
    XChaCha20Poly1305::new(Key::from_slice(digest.as_slice()))
}

/// Encrypt `plaintext` under a key derived from `secret`.
pub(crate) fn encrypt_value(secret: &[u8], plaintext: &str) -> Result<String, CryptoError> {
    let cipher = cipher_for(secret);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|_| CryptoError::Encrypt)?;

    Ok(format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(nonce_bytes),
        URL_SAFE_NO_PAD.encode(ciphertext)
    ))
}

/// Decrypt a value produced by [`encrypt_value`] with the same secret.
pub(crate) fn decrypt_value(secret: &[u8], encoded: &str) -> Result<String, CryptoError> {
    let (nonce_b64, ciphertext_b64) = encoded
        .split_once('.')
        .ok_or(CryptoError::MalformedCiphertext)?;

    let nonce_bytes = URL_SAFE_NO_PAD
        .decode(nonce_b64)
        .map_err(|_| CryptoError::MalformedCiphertext)?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(CryptoError::MalformedCiphertext);
    }
    let ciphertext = URL_SAFE_NO_PAD
        .decode(ciphertext_b64)
        .map_err(|_| CryptoError::MalformedCiphertext)?;

    let cipher = cipher_for(secret);
    let plaintext = cipher
        .decrypt(XNonce::from_slice(&nonce_bytes), ciphertext.as_slice())
        .map_err(|_| CryptoError::Decrypt)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::Decrypt)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-secret-key-32bytes-long!!!!";

    #[test]
    fn round_trips() {
        let encrypted = encrypt_value(SECRET, "revoke-credential-abc").unwrap();
        assert_ne!(encrypted, "revoke-credential-abc");
        assert_eq!(
            decrypt_value(SECRET, &encrypted).unwrap(),
            "revoke-credential-abc"
        );
    }

    #[test]
    fn nonces_differ_between_encryptions() {
        let a = encrypt_value(SECRET, "same").unwrap();
        let b = encrypt_value(SECRET, "same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_secret_fails_to_decrypt() {
        let encrypted = encrypt_value(SECRET, "revoke-credential-abc").unwrap();
        assert!(matches!(
            decrypt_value(b"another-secret-entirely-32-bytes", &encrypted),
            Err(CryptoError::Decrypt)
        ));
    }

    #[test]
    fn malformed_ciphertext_is_rejected() {
        for junk in ["", "no-dot", "a.b", "!!.??"] {
            assert!(matches!(
                decrypt_value(SECRET, junk),
                Err(CryptoError::MalformedCiphertext) | Err(CryptoError::Decrypt)
            ));
        }
    }
}
