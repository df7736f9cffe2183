//! # Cryptography Module
//!
//! This module provides all cryptographic primitives used by Velum Core.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    KEY HIERARCHY                                │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  Login Password                                                │   │
//! │  │       │                                                        │   │
//! │  │       ├── PBKDF2("master-salt") ──► Master Key (32 bytes)     │   │
//! │  │       │                             encrypts owned notes      │   │
//! │  │       │                                                        │   │
//! │  │       └── PBKDF2(random salt) ───► Key-at-rest key            │   │
//! │  │                                     protects the RSA private  │   │
//! │  │                                     key in the user record    │   │
//! │  │                                                                 │   │
//! │  │  RSA-2048 Keypair (generated once at registration)            │   │
//! │  │       │                                                        │   │
//! │  │       ├── Public key (SPKI PEM)  ─► on the user record        │   │
//! │  │       └── Private key (PKCS#8)   ─► protected blob, unlocked  │   │
//! │  │                                     into session memory only  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 ENCRYPTION SCHEME                               │   │
//! │  ├─────────────────────────────────────────────────────────────────┤   │
//! │  │                                                                 │   │
//! │  │  Note Content (AES-256-GCM)                                    │   │
//! │  │  • 256-bit note key (master key, or unwrapped shared key)     │   │
//! │  │  • 96-bit nonce (random per save)                             │   │
//! │  │  • 128-bit authentication tag                                 │   │
//! │  │                                                                 │   │
//! │  │  Key Sharing (RSA-OAEP/SHA-256)                                │   │
//! │  │  • Note key (hex) wrapped under recipient's public key        │   │
//! │  │  • ≤190-byte payload bound at 2048-bit modulus                │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices & Rationale
//!
//! | Algorithm | Purpose | Why Chosen |
//! |-----------|---------|------------|
//! | AES-256-GCM | Note/blob encryption | AEAD: tamper detection built in |
//! | PBKDF2-HMAC-SHA256 | Password-based KDF | Slow by design, 100k iterations |
//! | RSA-2048 OAEP/SHA-256 | Key wrapping | Portable PEM keys, one-shot wrap |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: note keys and session material are zeroized on drop
//! 2. **Secure Random**: `rand::rngs::OsRng` for keys, salts, and nonces
//! 3. **No Nonce Reuse**: a fresh nonce for every encryption operation
//! 4. **Format-before-crypto**: malformed PEM/base64 is rejected before any
//!    primitive runs, so parser errors never surface as crypto errors

pub mod asymmetric;
pub mod cipher;
pub mod kdf;

pub use asymmetric::{
    export_private_key, export_public_key, import_private_key, import_public_key, unwrap, wrap,
    RsaKeyPair, MAX_WRAP_PAYLOAD, RSA_MODULUS_BITS,
};
pub use cipher::{decrypt, encrypt, EncryptedContent, NoteKey, ALGORITHM, KEY_SIZE, NONCE_SIZE};
pub use kdf::{
    decrypt_blob, derive_key, derive_master_key, encrypt_blob, ProtectedBlob, KDF_ITERATIONS,
    MASTER_KEY_SALT,
};

use base64::{engine::general_purpose::STANDARD, Engine as _};

/// Base64-encode bytes in the standard alphabet with padding
pub(crate) fn b64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Base64-decode a standard-alphabet string
pub(crate) fn b64_decode(s: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(s.trim())
}

// ============================================================================
// TESTS
// ============================================================================
