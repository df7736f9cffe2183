//! # Identity Key Material
//!
//! Generates the key material a user record carries from registration
//! onward: an RSA keypair serialized to PEM, with the private half protected
//! under the login password.
//!
//! ## Registration Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       REGISTRATION KEY SETUP                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. Generate RSA-2048 keypair (client side, once, ever)                │
//! │                                                                         │
//! │  2. Public key  → SPKI PEM  ──────────────► user record (plaintext)    │
//! │                                                                         │
//! │  3. Private key → PKCS#8 PEM                                           │
//! │         │                                                               │
//! │         └─► encrypt_blob(pem, login password) ─► user record           │
//! │             (fresh salt + nonce, AES-256-GCM)    (opaque blob)         │
//! │                                                                         │
//! │  The server stores both fields but can open neither: the private key   │
//! │  only becomes usable again inside SessionKeys::unlock() at login.      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The keypair is generated exactly once. Regenerating it would orphan every
//! share envelope ever wrapped under the old public key, so there is no
//! "rotate keys" operation here by design.

use crate::crypto::{self, ProtectedBlob, RsaKeyPair};
use crate::error::Result;

/// Key material produced at registration, ready for the user record
#[derive(Debug, Clone)]
pub struct RegistrationKeys {
    /// SPKI PEM public key, stored in plaintext on the user record
    pub public_key: String,
    /// PKCS#8 PEM private key, protected under the login password
    pub encrypted_private_key: ProtectedBlob,
}

impl RegistrationKeys {
    /// Generate a fresh keypair and protect the private half
    ///
    /// The password here is the login password — the same one that will
    /// unlock the session later. RSA generation is the expensive step;
    /// callers should keep it off any latency-sensitive path.
    pub fn generate(password: &str) -> Result<Self> {
        let pair = RsaKeyPair::generate()?;

        let public_key = crypto::export_public_key(&pair.public)?;
        let private_pem = crypto::export_private_key(&pair.private)?;
        let encrypted_private_key = crypto::encrypt_blob(&private_pem, password)?;

        tracing::info!("Generated registration keypair");
        Ok(Self {
            public_key,
            encrypted_private_key,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
