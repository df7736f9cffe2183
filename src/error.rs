//! # Error Handling
//!
//! This module provides comprehensive error types for Velum Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Session Errors                                                    │
//! │  │   ├── KeysLocked            - Session key material unavailable      │
//! │  │   └── SessionExpired        - Session no longer valid               │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── EncryptionFailed      - Encryption operation failed           │
//! │  │   ├── DecryptionFailed      - Wrong key or tampered ciphertext      │
//! │  │   ├── CiphertextCorrupted   - Transport encoding unreadable         │
//! │  │   ├── KeyDerivationFailed   - PBKDF2 derivation failed              │
//! │  │   ├── KeyFormatError        - Malformed PEM/base64 key material     │
//! │  │   ├── KeyUnwrapError        - Wrapped key does not unwrap           │
//! │  │   └── PayloadTooLarge       - Exceeds RSA-OAEP payload bound        │
//! │  │                                                                      │
//! │  ├── Sharing Errors                                                    │
//! │  │   ├── RecipientKeyMissing   - Recipient has no public key on file   │
//! │  │   ├── CannotShareWithSelf   - Self-sharing rejected                 │
//! │  │   └── ShareNotFound         - No envelope for (note, recipient)     │
//! │  │                                                                      │
//! │  ├── Note Errors                                                       │
//! │  │   ├── SafetyRefusal         - Save blocked to protect shared key    │
//! │  │   ├── PermissionDenied      - Caller lacks write permission         │
//! │  │   ├── NoteNotFound          - Note doesn't exist / no access        │
//! │  │   └── VersionNotFound       - Requested history entry missing       │
//! │  │                                                                      │
//! │  └── Storage Errors                                                    │
//! │      ├── UserNotFound          - Unknown user id                       │
//! │      ├── StorageReadError      - Failed to read from the store         │
//! │      └── StorageWriteError     - Failed to write to the store          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Propagation Policy
//!
//! All raw cryptographic library failures (`aes-gcm`, `rsa`, decode errors)
//! are converted into one of these kinds at the crypto-module boundary.
//! Nothing in this crate retries automatically: every failure requires either
//! corrected input (password, key) or an explicit caller retry. A save must
//! never fall back to storing plaintext when key material is unavailable —
//! that is `SafetyRefusal`, a fatal-to-the-operation condition.

use thiserror::Error;

/// Result type alias for Velum Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Velum Core
///
/// All errors are categorized by module/domain to make error handling
/// clearer and to provide meaningful error messages to users.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Session Errors (100-199)
    // ========================================================================

    /// Session key material is not available
    #[error("Encryption keys are locked. Re-enter your password to unlock them.")]
    KeysLocked,

    /// Session is no longer valid
    #[error("Session expired. Please log in again.")]
    SessionExpired,

    // ========================================================================
    // Crypto Errors (200-299)
    // ========================================================================

    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed: the key is wrong or the ciphertext was tampered with
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Ciphertext transport encoding is unreadable (corruption before crypto)
    #[error("Ciphertext is corrupted: {0}")]
    CiphertextCorrupted(String),

    /// Key derivation failed
    #[error("Failed to derive key: {0}")]
    KeyDerivationFailed(String),

    /// Malformed key material (bad PEM envelope, base64, or DER)
    #[error("Invalid key format: {0}")]
    KeyFormatError(String),

    /// Wrapped key present but does not unwrap with the available private key
    #[error("The shared key could not be unwrapped with your private key.")]
    KeyUnwrapError,

    /// Payload exceeds what RSA-OAEP can wrap in one operation
    #[error("Payload of {size} bytes exceeds the {max}-byte RSA-OAEP limit")]
    PayloadTooLarge {
        /// Actual payload size in bytes
        size: usize,
        /// Maximum payload size for the configured modulus
        max: usize,
    },

    // ========================================================================
    // Sharing Errors (300-399)
    // ========================================================================

    /// Sharing target has no public key on file
    #[error("This user has not set up encryption keys. Cannot share.")]
    RecipientKeyMissing,

    /// Cannot share a note with yourself
    #[error("Cannot share a note with yourself.")]
    CannotShareWithSelf,

    /// No share envelope found for this note and recipient
    #[error("No share key found for this note.")]
    ShareNotFound,

    // ========================================================================
    // Note Errors (400-499)
    // ========================================================================

    /// Save blocked because the correct key could not be safely determined
    #[error("Save refused: {0}")]
    SafetyRefusal(String),

    /// Caller lacks the permission required for the operation
    #[error("You do not have permission to modify this note.")]
    PermissionDenied,

    /// Note doesn't exist or the caller has no access to it
    #[error("Note not found.")]
    NoteNotFound,

    /// Requested history entry is missing
    #[error("Version {0} not found in note history.")]
    VersionNotFound(u32),

    // ========================================================================
    // Storage Errors (500-599)
    // ========================================================================

    /// Unknown user id
    #[error("User not found.")]
    UserNotFound,

    /// Failed to read from the store
    #[error("Failed to read from storage: {0}")]
    StorageReadError(String),

    /// Failed to write to the store
    #[error("Failed to write to storage: {0}")]
    StorageWriteError(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Get the stable error code for UI/transport layers
    ///
    /// Error codes are organized by category:
    /// - 100-199: Session
    /// - 200-299: Crypto
    /// - 300-399: Sharing
    /// - 400-499: Notes
    /// - 500-599: Storage
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Session (100-199)
            Error::KeysLocked => 100,
            Error::SessionExpired => 101,

            // Crypto (200-299)
            Error::EncryptionFailed(_) => 200,
            Error::DecryptionFailed(_) => 201,
            Error::CiphertextCorrupted(_) => 202,
            Error::KeyDerivationFailed(_) => 203,
            Error::KeyFormatError(_) => 204,
            Error::KeyUnwrapError => 205,
            Error::PayloadTooLarge { .. } => 206,

            // Sharing (300-399)
            Error::RecipientKeyMissing => 300,
            Error::CannotShareWithSelf => 301,
            Error::ShareNotFound => 302,

            // Notes (400-499)
            Error::SafetyRefusal(_) => 400,
            Error::PermissionDenied => 401,
            Error::NoteNotFound => 402,
            Error::VersionNotFound(_) => 403,

            // Storage (500-599)
            Error::UserNotFound => 500,
            Error::StorageReadError(_) => 501,
            Error::StorageWriteError(_) => 502,

            // Internal (900-999)
            Error::Internal(_) => 900,
            Error::SerializationError(_) => 901,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors can potentially be resolved by user action
    /// without data loss (re-entering a password, retrying a share).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::KeysLocked
                | Error::SessionExpired
                | Error::RecipientKeyMissing
                | Error::ShareNotFound
                | Error::StorageReadError(_)
                | Error::StorageWriteError(_)
        )
    }

    /// Check if this error requires the user to re-authenticate
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Error::KeysLocked | Error::SessionExpired)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
