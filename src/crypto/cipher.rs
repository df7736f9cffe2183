//! # Note Content Encryption
//!
//! Provides AES-256-GCM encryption for note content confidentiality and
//! integrity.
//!
//! ## Encryption Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      NOTE ENCRYPTION FLOW                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Step 1: Resolve the Note Key                                          │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  Owned note   → master key (derived from login password)    │       │
//! │  │  Shared note  → unwrapped per-note key from the envelope    │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Step 2: Generate Nonce (unique per save)                              │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  Random 12 bytes from CSPRNG                                 │       │
//! │  │  (Never reuse a nonce with the same key!)                   │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Step 3: Encrypt                                                       │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  AES-256-GCM(key, nonce, plaintext)                          │       │
//! │  │           ↓                                                  │       │
//! │  │  Ciphertext + 16-byte Auth Tag                              │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  Step 4: Transport-encode                                              │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  ciphertext → base64,  nonce → hex                           │       │
//! │  │  The nonce travels alongside the ciphertext in the note's   │       │
//! │  │  encryption metadata. It is public, never secret.           │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Properties
//!
//! | Property | Guarantee |
//! |----------|-----------|
//! | Confidentiality | Only holders of the note key can read the content |
//! | Integrity | Any modification is detected by the GCM tag |
//! | Nonce hygiene | Fresh random nonce per encryption operation |
//!
//! The GCM authentication tag replaces the informal decrypt-then-check-UTF-8
//! integrity test: a wrong key and a tampered ciphertext both fail the tag
//! check before any plaintext is produced, so garbage is never surfaced.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce as AesNonce,
};
use rand::RngCore;
use zeroize::ZeroizeOnDrop;

use crate::error::{Error, Result};

/// Size of the AES-GCM nonce in bytes (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Size of a note key in bytes (256 bits)
pub const KEY_SIZE: usize = 32;

/// Identifier stored in a note's encryption metadata
pub const ALGORITHM: &str = "AES-256-GCM";

/// The symmetric key protecting one note's content
///
/// For owned notes this is the session master key; for shared notes it is the
/// per-note key unwrapped from a share envelope. The transport form is lowercase
/// hex (64 characters), which is also the payload handed to RSA-OAEP when the
/// key is wrapped for a recipient.
///
/// Zeroized when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct NoteKey([u8; KEY_SIZE]);

impl NoteKey {
    /// Generate a fresh random note key
    pub fn random() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse from the hex transport form
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| Error::KeyFormatError(format!("Invalid note key hex: {}", e)))?;
        let bytes: [u8; KEY_SIZE] = bytes
            .try_into()
            .map_err(|_| Error::KeyFormatError("Note key must be 32 bytes".into()))?;
        Ok(Self(bytes))
    }

    /// Encode as the hex transport form
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get the raw key bytes
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for NoteKey {
    // Key bytes must never reach logs
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NoteKey(..)")
    }
}

/// Ciphertext plus the nonce it was produced with, in transport encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedContent {
    /// Base64-encoded ciphertext including the GCM auth tag
    pub ciphertext: String,
    /// Hex-encoded 12-byte nonce
    pub iv: String,
}

/// Encrypt note content under a note key
///
/// Generates a fresh random nonce per call. Returns the transport-encoded
/// ciphertext and nonce; the nonce must be stored alongside the ciphertext in
/// the note's encryption metadata.
pub fn encrypt(plaintext: &str, key: &NoteKey) -> Result<EncryptedContent> {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| Error::EncryptionFailed(format!("Invalid key: {}", e)))?;

    let ciphertext = cipher
        .encrypt(AesNonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|e| Error::EncryptionFailed(format!("Encryption failed: {}", e)))?;

    Ok(EncryptedContent {
        ciphertext: crate::crypto::b64_encode(&ciphertext),
        iv: hex::encode(nonce),
    })
}

/// Decrypt note content with a note key
///
/// ## Errors
///
/// - [`Error::CiphertextCorrupted`] when the transport encoding is unreadable
///   (bad base64, bad hex, wrong nonce length) — detected before any
///   cryptographic work
/// - [`Error::DecryptionFailed`] when the GCM tag check fails: the key is
///   wrong or the ciphertext was tampered with (indistinguishable by design)
pub fn decrypt(ciphertext: &str, key: &NoteKey, iv: &str) -> Result<String> {
    let raw = crate::crypto::b64_decode(ciphertext)
        .map_err(|e| Error::CiphertextCorrupted(format!("Bad ciphertext encoding: {}", e)))?;
    let nonce = hex::decode(iv.trim())
        .map_err(|e| Error::CiphertextCorrupted(format!("Bad nonce encoding: {}", e)))?;
    if nonce.len() != NONCE_SIZE {
        return Err(Error::CiphertextCorrupted(format!(
            "Nonce must be {} bytes, got {}",
            NONCE_SIZE,
            nonce.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| Error::DecryptionFailed(format!("Invalid key: {}", e)))?;

    let plaintext = cipher
        .decrypt(AesNonce::from_slice(&nonce), raw.as_ref())
        .map_err(|_| {
            Error::DecryptionFailed(
                "authentication tag mismatch (wrong key or tampered data)".into(),
            )
        })?;

    String::from_utf8(plaintext)
        .map_err(|_| Error::DecryptionFailed("Decrypted content is not valid UTF-8".into()))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_round_trip() {
        let key = NoteKey::random();
        let plaintext = "Hello, World!";

        let encrypted = encrypt(plaintext, &key).unwrap();
        let decrypted = decrypt(&encrypted.ciphertext, &key, &encrypted.iv).unwrap();

        assert_eq!(decrypted, plaintext);
        assert_ne!(encrypted.ciphertext, plaintext);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let key = NoteKey::random();

        let encrypted = encrypt("", &key).unwrap();
        let decrypted = decrypt(&encrypted.ciphertext, &key, &encrypted.iv).unwrap();

        assert_eq!(decrypted, "");
    }

    #[test]
    fn test_fresh_nonce_per_call() {
        let key = NoteKey::random();
        let plaintext = "same content twice";

        let a = encrypt(plaintext, &key).unwrap();
        let b = encrypt(plaintext, &key).unwrap();

        assert_ne!(a.iv, b.iv);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key = NoteKey::random();
        let other = NoteKey::random();

        let encrypted = encrypt("secret", &key).unwrap();
        let result = decrypt(&encrypted.ciphertext, &other, &encrypted.iv);

        assert!(matches!(result, Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let key = NoteKey::random();
        let encrypted = encrypt("secret", &key).unwrap();

        let mut raw = crate::crypto::b64_decode(&encrypted.ciphertext).unwrap();
        raw[0] ^= 0xFF;
        let tampered = crate::crypto::b64_encode(&raw);

        let result = decrypt(&tampered, &key, &encrypted.iv);
        assert!(matches!(result, Err(Error::DecryptionFailed(_))));
    }

    #[test]
    fn test_corrupted_transport_detected_before_crypto() {
        let key = NoteKey::random();

        // Not base64 at all
        let result = decrypt("%%%not-base64%%%", &key, &hex::encode([0u8; NONCE_SIZE]));
        assert!(matches!(result, Err(Error::CiphertextCorrupted(_))));

        // Nonce of the wrong length
        let encrypted = encrypt("x", &key).unwrap();
        let result = decrypt(&encrypted.ciphertext, &key, "0011");
        assert!(matches!(result, Err(Error::CiphertextCorrupted(_))));
    }

    #[test]
    fn test_note_key_hex_round_trip() {
        let key = NoteKey::random();
        let hex_form = key.to_hex();

        assert_eq!(hex_form.len(), 64);
        let restored = NoteKey::from_hex(&hex_form).unwrap();
        assert_eq!(restored.to_hex(), hex_form);
    }

    #[test]
    fn test_note_key_bad_hex_rejected() {
        assert!(matches!(
            NoteKey::from_hex("zz"),
            Err(Error::KeyFormatError(_))
        ));
        assert!(matches!(
            NoteKey::from_hex("00ff"),
            Err(Error::KeyFormatError(_))
        ));
    }

    #[test]
    fn test_note_key_debug_redacted() {
        let key = NoteKey::random();
        assert_eq!(format!("{:?}", key), "NoteKey(..)");
    }
}
