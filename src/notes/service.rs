//! Note encryption orchestration
//!
//! Ties the cipher, the session key material, and the share protocol together
//! into the flows a note UI actually runs: open (decrypt-on-load), save
//! (encrypt-always), restore, and history decryption.
//!
//! ## Decrypt-on-Load State Machine
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         OPENING A NOTE                                  │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │                        ┌──────────┐                                     │
//! │                        │ Loading  │                                     │
//! │                        └────┬─────┘                                     │
//! │              not encrypted? │ encrypted?                                │
//! │           ┌─────────────────┼──────────────────┐                        │
//! │           ▼                 ▼                  ▼                        │
//! │  ┌────────────────┐  ┌───────────────┐  ┌──────────────┐               │
//! │  │ PlaintextReady │  │EncryptedLocked│  │DecryptFailed │               │
//! │  │ (content set)  │  │ (reauth fixes)│  │ (bad key or  │               │
//! │  └────────────────┘  └───────────────┘  │  corruption) │               │
//! │           ▲                              └──────────────┘               │
//! │           │ key resolved + decrypt OK                                   │
//! │           └── owner: master key / sharee: unwrapped share key           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Saving is encrypt-always: a note never goes back to the store in
//! plaintext once the user has keys, and a save with no safe key available
//! is refused outright rather than silently downgraded.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::crypto::{self, NoteKey};
use crate::error::{Error, Result};
use crate::notes::{EncryptionMetadata, Note, VersionSnapshot};
use crate::session::SessionKeys;
use crate::sharing::ShareKeyProtocol;
use crate::storage::{NotePayload, NoteStore, SaveReceipt};

/// Terminal states of the decrypt-on-load flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewState {
    /// Content is readable; `OpenNote::content` is set
    PlaintextReady,
    /// Key material unavailable; re-authentication resolves this
    EncryptedLocked,
    /// Decryption ran and failed; re-auth will not help by itself
    DecryptFailed {
        /// Human-readable failure description
        reason: String,
    },
}

/// The result of opening a note
#[derive(Debug, Clone)]
pub struct OpenNote {
    /// The note record as fetched
    pub note: Note,
    /// Decrypted content, present only in [`ViewState::PlaintextReady`]
    pub content: Option<String>,
    /// Where the decrypt-on-load flow ended up
    pub state: ViewState,
    /// Whether the current user may save changes
    pub can_edit: bool,
}

/// What a caller wants saved
#[derive(Debug, Clone)]
pub struct SaveRequest {
    /// Existing note id, or `None` to create
    pub id: Option<String>,
    /// New title (stored in plaintext)
    pub title: String,
    /// New content, always plaintext here — encryption happens inside
    pub content: String,
    /// New tags (stored in plaintext)
    pub tags: Vec<String>,
}

/// One history entry with its content decrypted where possible
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedVersion {
    /// Version number of the snapshot
    pub version: u32,
    /// Title at the time
    pub title: String,
    /// Decrypted content, `None` when decryption failed
    pub content: Option<String>,
    /// Whether this entry failed to decrypt
    pub decryption_failed: bool,
    /// When the snapshot was archived (Unix seconds)
    pub saved_at: i64,
}

/// Encrypts, decrypts, and versions notes over a [`NoteStore`]
///
/// One instance per (user, session); the embedded [`ShareKeyProtocol`] shares
/// the same session state, so a key unwrapped while opening a note is
/// immediately available for saves and re-shares.
pub struct NoteCryptoService<S> {
    store: Arc<S>,
    session: Arc<SessionKeys>,
    sharing: ShareKeyProtocol<S>,
    user_id: String,
    /// Last plaintext seen per note, for no-op save detection
    open_plaintext: RwLock<HashMap<String, String>>,
}

impl<S: NoteStore> NoteCryptoService<S> {
    /// Create a service acting as `user_id`
    pub fn new(store: Arc<S>, session: Arc<SessionKeys>, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            sharing: ShareKeyProtocol::new(store.clone(), session.clone(), user_id.clone()),
            store,
            session,
            user_id,
            open_plaintext: RwLock::new(HashMap::new()),
        }
    }

    /// The share protocol bound to this service's session
    pub fn sharing(&self) -> &ShareKeyProtocol<S> {
        &self.sharing
    }

    /// Fetch a note and run decrypt-on-load
    ///
    /// Key-unavailable and key-wrong outcomes are states, not errors: the
    /// note itself loaded fine, only its content is (still) unreadable.
    /// Missing notes and store failures are errors.
    pub fn open(&self, note_id: &str) -> Result<OpenNote> {
        let note = self.store.fetch_note(note_id, &self.user_id)?;
        let can_edit = note.can_write(&self.user_id);

        if !note.is_encrypted {
            self.remember_plaintext(note_id, &note.content);
            let content = note.content.clone();
            return Ok(OpenNote {
                note,
                content: Some(content),
                state: ViewState::PlaintextReady,
                can_edit,
            });
        }

        let metadata = match note.encryption_metadata.clone() {
            Some(metadata) => metadata,
            None => {
                tracing::warn!(note_id, "Encrypted note without encryption metadata");
                return Ok(OpenNote {
                    note,
                    content: None,
                    state: ViewState::DecryptFailed {
                        reason: "encryption metadata is missing".to_string(),
                    },
                    can_edit,
                });
            }
        };

        let key = match self.resolve_key(&note) {
            Ok(key) => key,
            Err(Error::KeysLocked) => {
                return Ok(OpenNote {
                    note,
                    content: None,
                    state: ViewState::EncryptedLocked,
                    can_edit,
                });
            }
            Err(e @ (Error::ShareNotFound | Error::KeyUnwrapError | Error::KeyFormatError(_))) => {
                tracing::warn!(note_id, error = %e, "Could not resolve note key");
                return Ok(OpenNote {
                    note,
                    content: None,
                    state: ViewState::DecryptFailed {
                        reason: e.to_string(),
                    },
                    can_edit,
                });
            }
            Err(e) => return Err(e),
        };

        match crypto::decrypt(&note.content, &key, &metadata.iv) {
            Ok(plaintext) => {
                self.session.cache_note_key(note_id, key);
                self.remember_plaintext(note_id, &plaintext);
                tracing::info!(note_id, "Note decrypted");
                Ok(OpenNote {
                    note,
                    content: Some(plaintext),
                    state: ViewState::PlaintextReady,
                    can_edit,
                })
            }
            Err(e) => {
                tracing::warn!(note_id, error = %e, "Note decryption failed");
                Ok(OpenNote {
                    note,
                    content: None,
                    state: ViewState::DecryptFailed {
                        reason: e.to_string(),
                    },
                    can_edit,
                })
            }
        }
    }

    /// Encrypt and persist a note
    ///
    /// Encryption is mandatory: content is always stored as ciphertext and a
    /// save with no usable key fails rather than writing plaintext. Saving
    /// content identical to the last opened/saved plaintext skips the content
    /// write entirely, so no spurious history entry appears.
    pub fn save(&self, request: SaveRequest) -> Result<SaveReceipt> {
        match request.id {
            None => {
                // Fresh note, owned by us: the master key is the note key
                let key = self.session.master_key()?;
                let encrypted = crypto::encrypt(&request.content, &key)?;

                let receipt = self.store.save_note(
                    None,
                    &self.user_id,
                    NotePayload {
                        title: request.title,
                        content: Some(encrypted.ciphertext),
                        is_encrypted: true,
                        encryption_metadata: Some(EncryptionMetadata::new(encrypted.iv)),
                        tags: request.tags,
                    },
                )?;

                self.session.cache_note_key(&receipt.id, key);
                self.remember_plaintext(&receipt.id, &request.content);
                tracing::info!(note_id = %receipt.id, "Created encrypted note");
                Ok(receipt)
            }
            Some(ref note_id) => {
                let note_id = note_id.as_str();
                let note = self.store.fetch_note(note_id, &self.user_id)?;
                if !note.can_write(&self.user_id) {
                    return Err(Error::PermissionDenied);
                }

                let unchanged = self.is_unchanged(note_id, &note, &request.content);
                let (content, metadata) = if unchanged {
                    (None, None)
                } else {
                    let key = self.save_key(&note)?;
                    let encrypted = crypto::encrypt(&request.content, &key)?;
                    self.session.cache_note_key(note_id, key);
                    (
                        Some(encrypted.ciphertext),
                        Some(EncryptionMetadata::new(encrypted.iv)),
                    )
                };

                let receipt = self.store.save_note(
                    Some(note_id),
                    &self.user_id,
                    NotePayload {
                        title: request.title,
                        content,
                        is_encrypted: true,
                        encryption_metadata: metadata,
                        tags: request.tags,
                    },
                )?;

                self.remember_plaintext(note_id, &request.content);
                tracing::info!(
                    note_id,
                    version = receipt.version,
                    unchanged,
                    "Saved note"
                );
                Ok(receipt)
            }
        }
    }

    /// Restore an archived version as the current content
    ///
    /// The snapshot is decrypted, then re-saved as new content: the current
    /// state is archived, the version increments, and the restored content
    /// gets a fresh nonce.
    pub fn restore_version(&self, note_id: &str, version: u32) -> Result<SaveReceipt> {
        let note = self.store.fetch_note(note_id, &self.user_id)?;
        if !note.can_write(&self.user_id) {
            return Err(Error::PermissionDenied);
        }
        let snapshot = note
            .find_version(version)
            .ok_or(Error::VersionNotFound(version))?;

        let plaintext = self.decrypt_snapshot(&note, snapshot)?;
        let title = snapshot.title.clone();
        let tags = note.tags.clone();

        // Restores always archive the current state, even if the restored
        // content happens to match it
        self.open_plaintext.write().remove(note_id);

        tracing::info!(note_id, version, "Restoring version");
        self.save(SaveRequest {
            id: Some(note_id.to_string()),
            title,
            content: plaintext,
            tags,
        })
    }

    /// Decrypt every history entry of a note
    ///
    /// A snapshot that fails to decrypt is marked, not fatal: one corrupted
    /// entry must not hide the rest of the history.
    pub fn decrypt_versions(&self, note_id: &str) -> Result<Vec<DecryptedVersion>> {
        let note = self.store.fetch_note(note_id, &self.user_id)?;

        let key = if note.previous_versions.iter().any(|v| v.is_encrypted) {
            Some(self.resolve_key(&note)?)
        } else {
            None
        };

        let mut versions = Vec::with_capacity(note.previous_versions.len());
        for snapshot in &note.previous_versions {
            let decrypted = if snapshot.is_encrypted {
                let key = key.as_ref().ok_or_else(|| {
                    Error::Internal("key resolved as absent for encrypted snapshot".to_string())
                })?;
                snapshot
                    .encryption_metadata
                    .as_ref()
                    .ok_or_else(|| {
                        Error::CiphertextCorrupted("missing metadata".to_string())
                    })
                    .and_then(|m| crypto::decrypt(&snapshot.content, key, &m.iv))
            } else {
                Ok(snapshot.content.clone())
            };

            match decrypted {
                Ok(content) => versions.push(DecryptedVersion {
                    version: snapshot.version,
                    title: snapshot.title.clone(),
                    content: Some(content),
                    decryption_failed: false,
                    saved_at: snapshot.saved_at,
                }),
                Err(e) => {
                    tracing::warn!(
                        note_id,
                        version = snapshot.version,
                        error = %e,
                        "History entry failed to decrypt"
                    );
                    versions.push(DecryptedVersion {
                        version: snapshot.version,
                        title: snapshot.title.clone(),
                        content: None,
                        decryption_failed: true,
                        saved_at: snapshot.saved_at,
                    });
                }
            }
        }
        Ok(versions)
    }

    /// Delete a note and forget its session state
    pub fn delete(&self, note_id: &str) -> Result<()> {
        self.store.delete_note(note_id, &self.user_id)?;
        self.session.forget_note_key(note_id);
        self.open_plaintext.write().remove(note_id);
        tracing::info!(note_id, "Deleted note");
        Ok(())
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// Resolve the key a note's content is encrypted under
    fn resolve_key(&self, note: &Note) -> Result<NoteKey> {
        if let Some(key) = self.session.note_key(&note.id) {
            return Ok(key);
        }
        if note.is_owner(&self.user_id) {
            return self.session.master_key();
        }
        self.sharing.obtain_note_key(&note.id, &note.owner_id)
    }

    /// Resolve the key to encrypt a save under
    ///
    /// Sharees must have the note's actual key in hand; owners fall back to
    /// their master key. Encrypting a shared note under a guessed key would
    /// make it unreadable for everyone else holding the real one.
    fn save_key(&self, note: &Note) -> Result<NoteKey> {
        if let Some(key) = self.session.note_key(&note.id) {
            return Ok(key);
        }
        if note.is_owner(&self.user_id) {
            return self.session.master_key();
        }
        Err(Error::SafetyRefusal(
            "the key this shared note is encrypted under has not been resolved; \
             open the note before saving"
                .to_string(),
        ))
    }

    fn is_unchanged(&self, note_id: &str, note: &Note, new_content: &str) -> bool {
        if let Some(last) = self.open_plaintext.read().get(note_id) {
            return last == new_content;
        }
        // Never-opened plaintext notes can be compared directly
        !note.is_encrypted && note.content == new_content
    }

    fn remember_plaintext(&self, note_id: &str, plaintext: &str) {
        self.open_plaintext
            .write()
            .insert(note_id.to_string(), plaintext.to_string());
    }

    fn decrypt_snapshot(&self, note: &Note, snapshot: &VersionSnapshot) -> Result<String> {
        if !snapshot.is_encrypted {
            return Ok(snapshot.content.clone());
        }
        let metadata = snapshot
            .encryption_metadata
            .as_ref()
            .ok_or_else(|| Error::CiphertextCorrupted("missing metadata".to_string()))?;
        let key = self.resolve_key(note)?;
        crypto::decrypt(&snapshot.content, &key, &metadata.iv)
    }
}

// ============================================================================
// TESTS
// ============================================================================
