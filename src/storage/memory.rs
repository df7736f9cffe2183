//! In-process [`NoteStore`] backed by hash maps
//!
//! The reference store implementation: exercises every contract the trait
//! promises (access checks, version archiving, envelope replacement, TTL
//! expiry) without any I/O. Production deployments put a remote backend
//! behind the same trait.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::notes::{Note, ShareGrant, VersionSnapshot};
use crate::sharing::ShareKeyEnvelope;
use crate::storage::{EnvelopeSender, NotePayload, NoteStore, SaveReceipt, UserRecord};
use crate::time::now_timestamp;

/// In-memory note, user, and envelope storage
pub struct MemoryStore {
    notes: RwLock<HashMap<String, Note>>,
    users: RwLock<HashMap<String, UserRecord>>,
    /// Keyed by (note id, recipient id) — at most one current envelope per pair
    envelopes: RwLock<HashMap<(String, String), ShareKeyEnvelope>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            notes: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
            envelopes: RwLock::new(HashMap::new()),
        }
    }

    /// Add or replace a user record
    pub fn insert_user(&self, user: UserRecord) {
        self.users.write().insert(user.id.clone(), user);
    }

    /// Swap a note record wholesale, bypassing access checks and archiving
    #[cfg(test)]
    pub(crate) fn replace_note_for_test(&self, note: Note) {
        self.notes.write().insert(note.id.clone(), note);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NoteStore for MemoryStore {
    fn fetch_note(&self, note_id: &str, user_id: &str) -> Result<Note> {
        let notes = self.notes.read();
        let note = notes.get(note_id).ok_or(Error::NoteNotFound)?;
        // No access and no note look the same from outside
        if note.permission_for(user_id).is_none() {
            return Err(Error::NoteNotFound);
        }
        Ok(note.clone())
    }

    fn save_note(
        &self,
        note_id: Option<&str>,
        user_id: &str,
        payload: NotePayload,
    ) -> Result<SaveReceipt> {
        let now = now_timestamp();
        let mut notes = self.notes.write();

        match note_id {
            None => {
                let id = Uuid::new_v4().to_string();
                let note = Note {
                    id: id.clone(),
                    owner_id: user_id.to_string(),
                    title: payload.title,
                    content: payload.content.unwrap_or_default(),
                    tags: payload.tags,
                    is_encrypted: payload.is_encrypted,
                    encryption_metadata: payload.encryption_metadata,
                    shared_with: Vec::new(),
                    version: 1,
                    previous_versions: Vec::new(),
                    created_at: now,
                    updated_at: now,
                };
                notes.insert(id.clone(), note);
                Ok(SaveReceipt {
                    id,
                    version: 1,
                    updated_at: now,
                })
            }
            Some(id) => {
                let note = notes.get_mut(id).ok_or(Error::NoteNotFound)?;
                if note.permission_for(user_id).is_none() {
                    return Err(Error::NoteNotFound);
                }
                if !note.can_write(user_id) {
                    return Err(Error::PermissionDenied);
                }

                if let Some(content) = payload.content {
                    if content != note.content {
                        note.previous_versions.push(VersionSnapshot {
                            title: note.title.clone(),
                            content: note.content.clone(),
                            is_encrypted: note.is_encrypted,
                            encryption_metadata: note.encryption_metadata.clone(),
                            version: note.version,
                            saved_at: note.updated_at,
                        });
                        note.version += 1;
                        note.content = content;
                        note.is_encrypted = payload.is_encrypted;
                        note.encryption_metadata = payload.encryption_metadata;
                    }
                }
                note.title = payload.title;
                note.tags = payload.tags;
                note.updated_at = now;

                Ok(SaveReceipt {
                    id: id.to_string(),
                    version: note.version,
                    updated_at: now,
                })
            }
        }
    }

    fn delete_note(&self, note_id: &str, user_id: &str) -> Result<()> {
        let mut notes = self.notes.write();
        let note = notes.get(note_id).ok_or(Error::NoteNotFound)?;
        if note.permission_for(user_id).is_none() {
            return Err(Error::NoteNotFound);
        }
        if !note.is_owner(user_id) {
            return Err(Error::PermissionDenied);
        }
        notes.remove(note_id);
        self.envelopes
            .write()
            .retain(|(envelope_note, _), _| envelope_note != note_id);
        Ok(())
    }

    fn fetch_share_envelope(
        &self,
        note_id: &str,
        to_user_id: &str,
        sender: &EnvelopeSender,
    ) -> Result<ShareKeyEnvelope> {
        let envelopes = self.envelopes.read();
        let envelope = envelopes
            .get(&(note_id.to_string(), to_user_id.to_string()))
            .ok_or(Error::ShareNotFound)?;

        if envelope.is_expired(now_timestamp()) {
            return Err(Error::ShareNotFound);
        }
        if let EnvelopeSender::User(from) = sender {
            if &envelope.from_user_id != from {
                return Err(Error::ShareNotFound);
            }
        }
        Ok(envelope.clone())
    }

    fn upsert_share_envelope(&self, envelope: ShareKeyEnvelope, user_id: &str) -> Result<()> {
        let mut notes = self.notes.write();
        let note = notes
            .get_mut(&envelope.note_id)
            .ok_or(Error::NoteNotFound)?;
        if note.permission_for(user_id).is_none() {
            return Err(Error::NoteNotFound);
        }
        if !note.can_write(user_id) {
            return Err(Error::PermissionDenied);
        }

        let grant = ShareGrant {
            user_id: envelope.to_user_id.clone(),
            permission: envelope.permission,
            shared_at: envelope.created_at,
        };
        match note
            .shared_with
            .iter_mut()
            .find(|g| g.user_id == envelope.to_user_id)
        {
            Some(existing) => *existing = grant,
            None => note.shared_with.push(grant),
        }

        self.envelopes.write().insert(
            (envelope.note_id.clone(), envelope.to_user_id.clone()),
            envelope,
        );
        Ok(())
    }

    fn delete_share_envelope(
        &self,
        note_id: &str,
        to_user_id: &str,
        user_id: &str,
    ) -> Result<()> {
        let mut notes = self.notes.write();
        let note = notes.get_mut(note_id).ok_or(Error::NoteNotFound)?;
        if note.permission_for(user_id).is_none() {
            return Err(Error::NoteNotFound);
        }
        // Owner, write holder, or the recipient removing themself
        if !note.can_write(user_id) && user_id != to_user_id {
            return Err(Error::PermissionDenied);
        }

        note.shared_with.retain(|g| g.user_id != to_user_id);
        self.envelopes
            .write()
            .remove(&(note_id.to_string(), to_user_id.to_string()));
        Ok(())
    }

    fn search_users(&self, query: &str) -> Result<Vec<UserRecord>> {
        let needle = query.to_lowercase();
        let mut matches: Vec<UserRecord> = self
            .users
            .read()
            .values()
            .filter(|u| {
                u.username.to_lowercase().contains(&needle)
                    || u.email.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(matches)
    }

    fn fetch_user(&self, user_id: &str) -> Result<UserRecord> {
        self.users
            .read()
            .get(user_id)
            .cloned()
            .ok_or(Error::UserNotFound)
    }
}

// ============================================================================
// TESTS
// ============================================================================
