//! # Storage Module
//!
//! The persistence seam between the crypto core and whatever actually holds
//! the records. The core never talks to a backend directly — everything goes
//! through the [`NoteStore`] trait, with one canonical record shape per
//! operation.
//!
//! ## Transport Contract
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        STORE BOUNDARY                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   NoteCryptoService ──┐                                                 │
//! │                       ├──► NoteStore (trait)                            │
//! │   ShareKeyProtocol ───┘         │                                       │
//! │                                 ├──► MemoryStore (in-process, tests)    │
//! │                                 └──► remote backends (out of crate)     │
//! │                                                                         │
//! │   What crosses this line:                                               │
//! │     • ciphertext + public metadata (iv, algorithm, version)             │
//! │     • wrapped (RSA-OAEP) note keys inside share envelopes               │
//! │     • plaintext titles and tags                                         │
//! │                                                                         │
//! │   What NEVER crosses this line:                                         │
//! │     • raw note keys, the master key, the unlocked private key           │
//! │     • decrypted note content                                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every record has exactly one canonical shape. Implementations must not
//! sniff or guess at alternate formats; a record that does not parse is a
//! [`Error::StorageReadError`](crate::error::Error::StorageReadError), not
//! something to recover from heuristically.

pub mod memory;

pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};

use crate::crypto::ProtectedBlob;
use crate::error::Result;
use crate::notes::{EncryptionMetadata, Note};
use crate::sharing::ShareKeyEnvelope;

/// A user record as held by the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique user id
    pub id: String,
    /// Display name
    pub username: String,
    /// Login email
    pub email: String,
    /// SPKI PEM public key, absent for accounts created before key setup
    pub public_key: Option<String>,
    /// Password-protected PKCS#8 private key
    pub encrypted_private_key: Option<ProtectedBlob>,
}

/// Fields written by a note save
///
/// `content` is `None` when the caller determined the content is unchanged;
/// stores must not archive a version or bump `version` in that case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotePayload {
    /// New title
    pub title: String,
    /// New content (ciphertext when `is_encrypted`), or `None` for unchanged
    pub content: Option<String>,
    /// Whether `content` is ciphertext
    pub is_encrypted: bool,
    /// Decryption parameters accompanying new content
    pub encryption_metadata: Option<EncryptionMetadata>,
    /// New tags
    pub tags: Vec<String>,
}

/// What the store reports back after a successful save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReceipt {
    /// Note id (newly minted on create)
    pub id: String,
    /// Version after the save
    pub version: u32,
    /// Update timestamp after the save (Unix seconds)
    pub updated_at: i64,
}

/// Which sender's envelope to fetch for a shared note
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeSender {
    /// An envelope from this specific user
    User(String),
    /// Any current envelope for the recipient, regardless of sender
    Any,
}

/// Persistence operations the crypto core depends on
///
/// Implementations enforce access control server-side as well: a correct
/// client never sends a disallowed write, but the store is the last line.
/// Writes are last-writer-wins; there is no merge or conflict detection.
pub trait NoteStore {
    /// Fetch a note `user_id` can access (owner or share recipient)
    fn fetch_note(&self, note_id: &str, user_id: &str) -> Result<Note>;

    /// Create (`note_id` = `None`) or update a note
    ///
    /// On update with new content the store archives the pre-update state
    /// onto `previous_versions` and increments `version` by exactly one.
    /// A payload without content updates title/tags only.
    fn save_note(
        &self,
        note_id: Option<&str>,
        user_id: &str,
        payload: NotePayload,
    ) -> Result<SaveReceipt>;

    /// Delete a note; owners only
    fn delete_note(&self, note_id: &str, user_id: &str) -> Result<()>;

    /// Fetch the current share envelope addressed to `to_user_id`
    ///
    /// With [`EnvelopeSender::User`], only an envelope from that sender
    /// matches; callers fall back to [`EnvelopeSender::Any`] when the
    /// expected sender has none. Expired envelopes are treated as absent.
    fn fetch_share_envelope(
        &self,
        note_id: &str,
        to_user_id: &str,
        sender: &EnvelopeSender,
    ) -> Result<ShareKeyEnvelope>;

    /// Insert or replace the envelope for (note, recipient)
    ///
    /// At most one current envelope exists per (note, recipient) pair —
    /// re-sharing replaces it. Also records the grant on the note's
    /// `shared_with` list. `user_id` is the acting user and must hold write
    /// permission on the note.
    fn upsert_share_envelope(&self, envelope: ShareKeyEnvelope, user_id: &str) -> Result<()>;

    /// Remove the envelope and the note's grant for `to_user_id`
    ///
    /// `user_id` is the acting user: the owner, a write-permission holder,
    /// or the recipient removing themself.
    fn delete_share_envelope(&self, note_id: &str, to_user_id: &str, user_id: &str)
        -> Result<()>;

    /// Find users whose username or email contains `query` (case-insensitive)
    fn search_users(&self, query: &str) -> Result<Vec<UserRecord>>;

    /// Fetch a single user record
    fn fetch_user(&self, user_id: &str) -> Result<UserRecord>;
}
