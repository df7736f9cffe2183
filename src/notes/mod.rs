//! # Notes Module
//!
//! The note data model and the crypto orchestration service built on it.
//!
//! ## Note Record Shape
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           NOTE RECORD                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Note {                                                                │
//! │    id, owner_id,                                                       │
//! │    title: plaintext,                                                   │
//! │    content: base64 ciphertext        ◄── when is_encrypted             │
//! │    encryption_metadata: {                                              │
//! │      algorithm: "AES-256-GCM",                                         │
//! │      iv: hex nonce (fresh per save), ◄── public, travels with content  │
//! │      salt: unused for note content                                     │
//! │    },                                                                  │
//! │    tags: plaintext,                                                    │
//! │    version: u32 ≥ 1,                                                   │
//! │    previous_versions: [snapshot...], ◄── pre-update state, in order    │
//! │    shared_with: [{user_id, permission, shared_at}],                    │
//! │  }                                                                     │
//! │                                                                         │
//! │  Versioning invariant: every content-changing save pushes the          │
//! │  pre-update state onto previous_versions and increments version by     │
//! │  exactly 1. Saving identical content is a no-op for versioning.        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod service;

pub use service::{
    DecryptedVersion, NoteCryptoService, OpenNote, SaveRequest, ViewState,
};

use serde::{Deserialize, Serialize};

/// Access level granted to a share recipient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// Recipient may decrypt and read
    Read,
    /// Recipient may decrypt, read, and save changes
    Write,
}

impl Permission {
    /// Convert to the wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::Read => "read",
            Permission::Write => "write",
        }
    }

    /// Parse from the wire string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Permission::Read),
            "write" => Some(Permission::Write),
            _ => None,
        }
    }
}

/// Parameters needed to decrypt a note's content
///
/// The `iv` is the hex-encoded nonce of the most recent encryption; it is
/// public and must always travel in the same record as the ciphertext. The
/// `salt` field exists for record-shape compatibility and is unused for note
/// content — the note key comes from the session, not from a derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionMetadata {
    /// Cipher identifier, always [`crate::crypto::ALGORITHM`] for new saves
    pub algorithm: String,
    /// Hex-encoded nonce for the current ciphertext
    pub iv: String,
    /// Unused for note content; present for record-shape compatibility
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl EncryptionMetadata {
    /// Metadata for a fresh encryption result
    pub fn new(iv: String) -> Self {
        Self {
            algorithm: crate::crypto::ALGORITHM.to_string(),
            iv,
            salt: None,
        }
    }
}

/// A share grant recorded on the note itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareGrant {
    /// Recipient user id
    pub user_id: String,
    /// Access level
    pub permission: Permission,
    /// When the grant was made (Unix seconds)
    pub shared_at: i64,
}

/// A snapshot of a note's state before a content-changing save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    /// Title at the time of the snapshot
    pub title: String,
    /// Content at the time of the snapshot (ciphertext when encrypted)
    pub content: String,
    /// Whether the snapshot content is encrypted
    pub is_encrypted: bool,
    /// Decryption parameters for the snapshot content
    pub encryption_metadata: Option<EncryptionMetadata>,
    /// The version number this snapshot was current as
    pub version: u32,
    /// When the snapshot was archived (Unix seconds)
    pub saved_at: i64,
}

/// A note record as held by the persistence layer
///
/// The core only ever sees ciphertext in `content` for encrypted notes;
/// plaintext exists in memory on the client after a successful decrypt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique note id
    pub id: String,
    /// Owning user id
    pub owner_id: String,
    /// Title (plaintext by design)
    pub title: String,
    /// Content — ciphertext when `is_encrypted`, plaintext otherwise
    pub content: String,
    /// Plaintext tags
    pub tags: Vec<String>,
    /// Whether `content` is ciphertext
    pub is_encrypted: bool,
    /// Decryption parameters for the current content
    pub encryption_metadata: Option<EncryptionMetadata>,
    /// Users this note has been shared with
    pub shared_with: Vec<ShareGrant>,
    /// Current version, starts at 1
    pub version: u32,
    /// Archived pre-update states, oldest first
    pub previous_versions: Vec<VersionSnapshot>,
    /// Creation time (Unix seconds)
    pub created_at: i64,
    /// Last update time (Unix seconds)
    pub updated_at: i64,
}

impl Note {
    /// Whether `user_id` owns this note
    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// The permission granted to `user_id`, if any
    ///
    /// Owners implicitly hold write permission.
    pub fn permission_for(&self, user_id: &str) -> Option<Permission> {
        if self.is_owner(user_id) {
            return Some(Permission::Write);
        }
        self.shared_with
            .iter()
            .find(|g| g.user_id == user_id)
            .map(|g| g.permission)
    }

    /// Whether `user_id` may save changes to this note
    pub fn can_write(&self, user_id: &str) -> bool {
        matches!(self.permission_for(user_id), Some(Permission::Write))
    }

    /// Find an archived snapshot by version number
    pub fn find_version(&self, version: u32) -> Option<&VersionSnapshot> {
        self.previous_versions.iter().find(|v| v.version == version)
    }
}

// ============================================================================
// TESTS
// ============================================================================
