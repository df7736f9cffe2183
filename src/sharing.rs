//! # Share Key Protocol
//!
//! Grants another user access to an encrypted note without the server ever
//! seeing the note key: the key is wrapped under the recipient's RSA public
//! key and parked in a share envelope the recipient unwraps on their side.
//!
//! ## Share Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SHARE KEY PROTOCOL                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SHARING (sender side)                                                  │
//! │                                                                         │
//! │  1. Resolve the note key:                                               │
//! │       session note-key cache ──► exact key the note is under            │
//! │       └─ else, owner only ────► session master key                      │
//! │       └─ else ────────────────► refuse (wrong key would brick the note) │
//! │                                                                         │
//! │  2. note key (hex) ──► RSA-OAEP(recipient public key) ──► base64        │
//! │                                                                         │
//! │  3. Upsert envelope {note, from, to, wrapped key, permission}           │
//! │     (one current envelope per (note, recipient); re-share replaces)     │
//! │                                                                         │
//! │  RECEIVING (recipient side)                                             │
//! │                                                                         │
//! │  1. session note-key cache ──► done                                     │
//! │  2. fetch envelope from the owner, fall back to any sender              │
//! │  3. base64 ──► RSA-OAEP⁻¹(own private key) ──► hex ──► note key         │
//! │  4. cache for the rest of the session (saves and re-shares reuse it)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Envelopes age out after [`SHARE_KEY_TTL_SECS`]; an expired grant simply
//! requires the owner to share again. Revoking removes the envelope and the
//! grant, but cannot claw back keys a recipient already unwrapped — real
//! revocation requires re-encrypting under a new key.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::crypto::{self, NoteKey};
use crate::error::{Error, Result};
use crate::notes::Permission;
use crate::session::SessionKeys;
use crate::storage::{EnvelopeSender, NoteStore};
use crate::time::now_timestamp;

/// How long a share envelope stays valid (30 days, matching store TTLs)
pub const SHARE_KEY_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// A wrapped note key addressed to one recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareKeyEnvelope {
    /// The note this key opens
    pub note_id: String,
    /// Who wrapped the key
    pub from_user_id: String,
    /// Who can unwrap it
    pub to_user_id: String,
    /// Base64 RSA-OAEP wrapping of the hex-encoded note key
    pub encrypted_key: String,
    /// Access level granted alongside the key
    pub permission: Permission,
    /// When the envelope was created (Unix seconds); drives expiry
    pub created_at: i64,
}

impl ShareKeyEnvelope {
    /// Whether this envelope has aged past [`SHARE_KEY_TTL_SECS`]
    pub fn is_expired(&self, now: i64) -> bool {
        now - self.created_at >= SHARE_KEY_TTL_SECS
    }
}

/// Wraps, delivers, and unwraps note keys for sharing
///
/// Holds the store and session by `Arc` so it can live alongside
/// [`NoteCryptoService`](crate::notes::NoteCryptoService) over the same
/// session state.
pub struct ShareKeyProtocol<S> {
    store: Arc<S>,
    session: Arc<SessionKeys>,
    user_id: String,
}

impl<S: NoteStore> ShareKeyProtocol<S> {
    /// Create a protocol instance acting as `user_id`
    pub fn new(store: Arc<S>, session: Arc<SessionKeys>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            session,
            user_id: user_id.into(),
        }
    }

    /// Share a note's key with another user
    ///
    /// The caller must own the note or hold a write grant. The wrapped key is
    /// the session's resolved key for the note when one is cached — that is
    /// the exact key the current ciphertext is under. Without a cached key,
    /// only the owner may proceed (their master key is the note key); a
    /// recipient re-sharing a note they never opened is refused rather than
    /// risking a wrapped key that opens nothing.
    pub fn share_note(
        &self,
        note_id: &str,
        recipient_id: &str,
        permission: Permission,
    ) -> Result<()> {
        if recipient_id == self.user_id {
            return Err(Error::CannotShareWithSelf);
        }

        let note = self.store.fetch_note(note_id, &self.user_id)?;
        if !note.can_write(&self.user_id) {
            return Err(Error::PermissionDenied);
        }

        let recipient = self.store.fetch_user(recipient_id)?;
        let public_pem = recipient.public_key.ok_or(Error::RecipientKeyMissing)?;
        let public_key = crypto::import_public_key(&public_pem)?;

        let note_key = match self.session.note_key(note_id) {
            Some(key) => key,
            None if note.is_owner(&self.user_id) => self.session.master_key()?,
            None => {
                return Err(Error::SafetyRefusal(
                    "the note key for this shared note has not been resolved; \
                     open the note before re-sharing it"
                        .to_string(),
                ))
            }
        };

        let encrypted_key = crypto::wrap(&note_key.to_hex(), &public_key)?;

        self.store.upsert_share_envelope(
            ShareKeyEnvelope {
                note_id: note_id.to_string(),
                from_user_id: self.user_id.clone(),
                to_user_id: recipient_id.to_string(),
                encrypted_key,
                permission,
                created_at: now_timestamp(),
            },
            &self.user_id,
        )?;

        tracing::info!(
            note_id,
            recipient_id,
            permission = permission.as_str(),
            "Shared note key"
        );
        Ok(())
    }

    /// Resolve the key for a note shared with this user
    ///
    /// Checks the session cache first, then fetches the envelope — preferring
    /// one from the note's owner, falling back to any sender — and unwraps it
    /// with the session private key. The resolved key is cached so later
    /// saves and re-shares use the key the note is actually encrypted under.
    pub fn obtain_note_key(&self, note_id: &str, owner_id: &str) -> Result<NoteKey> {
        if let Some(key) = self.session.note_key(note_id) {
            return Ok(key);
        }

        let private_key = self.session.private_key()?;

        let envelope = match self.store.fetch_share_envelope(
            note_id,
            &self.user_id,
            &EnvelopeSender::User(owner_id.to_string()),
        ) {
            Ok(envelope) => envelope,
            Err(Error::ShareNotFound) => {
                tracing::warn!(
                    note_id,
                    owner_id,
                    "No envelope from the owner, falling back to any sender"
                );
                self.store
                    .fetch_share_envelope(note_id, &self.user_id, &EnvelopeSender::Any)?
            }
            Err(e) => return Err(e),
        };

        let key_hex = crypto::unwrap(&envelope.encrypted_key, &private_key)?;
        let key = NoteKey::from_hex(&key_hex)?;

        self.session.cache_note_key(note_id, key.clone());
        tracing::info!(note_id, from = %envelope.from_user_id, "Unwrapped shared note key");
        Ok(key)
    }

    /// Revoke a recipient's share
    ///
    /// Allowed for the owner, any write-permission holder, or the recipient
    /// removing themself. Removes the envelope and the grant; keys the
    /// recipient already unwrapped remain in their session memory until it
    /// ends.
    pub fn revoke_share(&self, note_id: &str, recipient_id: &str) -> Result<()> {
        let note = self.store.fetch_note(note_id, &self.user_id)?;
        if !note.can_write(&self.user_id) && recipient_id != self.user_id {
            return Err(Error::PermissionDenied);
        }

        self.store
            .delete_share_envelope(note_id, recipient_id, &self.user_id)?;
        tracing::info!(note_id, recipient_id, "Revoked share");
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::EncryptedContent;
    use crate::identity::RegistrationKeys;
    use crate::notes::EncryptionMetadata;
    use crate::storage::{MemoryStore, NotePayload, UserRecord};

    fn register(store: &MemoryStore, id: &str, password: &str) -> Arc<SessionKeys> {
        let keys = RegistrationKeys::generate(password).unwrap();
        store.insert_user(UserRecord {
            id: id.to_string(),
            username: id.to_string(),
            email: format!("{id}@example.com"),
            public_key: Some(keys.public_key),
            encrypted_private_key: Some(keys.encrypted_private_key.clone()),
        });

        let session = Arc::new(SessionKeys::new());
        session
            .unlock(password, Some(&keys.encrypted_private_key))
            .unwrap();
        session
    }

    fn save_encrypted_note(
        store: &MemoryStore,
        owner: &str,
        key: &NoteKey,
        plaintext: &str,
    ) -> String {
        let EncryptedContent { ciphertext, iv } = crypto::encrypt(plaintext, key).unwrap();
        let receipt = store
            .save_note(
                None,
                owner,
                NotePayload {
                    title: "Secret".into(),
                    content: Some(ciphertext),
                    is_encrypted: true,
                    encryption_metadata: Some(EncryptionMetadata::new(iv)),
                    tags: vec![],
                },
            )
            .unwrap();
        receipt.id
    }

    #[test]
    fn test_share_and_obtain_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let alice = register(&store, "alice", "alice-pw");
        let bob = register(&store, "bob", "bob-pw");

        let note_id = save_encrypted_note(
            &store,
            "alice",
            &alice.master_key().unwrap(),
            "the plan",
        );

        ShareKeyProtocol::new(store.clone(), alice.clone(), "alice")
            .share_note(&note_id, "bob", Permission::Read)
            .unwrap();

        let key = ShareKeyProtocol::new(store.clone(), bob.clone(), "bob")
            .obtain_note_key(&note_id, "alice")
            .unwrap();

        assert_eq!(key.to_hex(), alice.master_key().unwrap().to_hex());
        // Resolved key lands in Bob's session cache
        assert!(bob.note_key(&note_id).is_some());
    }

    #[test]
    fn test_share_with_self_rejected() {
        let store = Arc::new(MemoryStore::new());
        let alice = register(&store, "alice", "pw");
        let note_id =
            save_encrypted_note(&store, "alice", &alice.master_key().unwrap(), "x");

        let protocol = ShareKeyProtocol::new(store, alice, "alice");
        assert!(matches!(
            protocol.share_note(&note_id, "alice", Permission::Read),
            Err(Error::CannotShareWithSelf)
        ));
    }

    #[test]
    fn test_share_with_keyless_recipient_rejected() {
        let store = Arc::new(MemoryStore::new());
        let alice = register(&store, "alice", "pw");
        store.insert_user(UserRecord {
            id: "carol".into(),
            username: "carol".into(),
            email: "carol@example.com".into(),
            public_key: None,
            encrypted_private_key: None,
        });

        let note_id =
            save_encrypted_note(&store, "alice", &alice.master_key().unwrap(), "x");

        let protocol = ShareKeyProtocol::new(store, alice, "alice");
        assert!(matches!(
            protocol.share_note(&note_id, "carol", Permission::Read),
            Err(Error::RecipientKeyMissing)
        ));
    }

    #[test]
    fn test_read_recipient_cannot_reshare() {
        let store = Arc::new(MemoryStore::new());
        let alice = register(&store, "alice", "alice-pw");
        let bob = register(&store, "bob", "bob-pw");
        register(&store, "carol", "carol-pw");

        let note_id =
            save_encrypted_note(&store, "alice", &alice.master_key().unwrap(), "x");

        ShareKeyProtocol::new(store.clone(), alice, "alice")
            .share_note(&note_id, "bob", Permission::Read)
            .unwrap();

        let bob_protocol = ShareKeyProtocol::new(store, bob, "bob");
        assert!(matches!(
            bob_protocol.share_note(&note_id, "carol", Permission::Read),
            Err(Error::PermissionDenied)
        ));
    }

    #[test]
    fn test_write_recipient_reshares_only_after_opening() {
        let store = Arc::new(MemoryStore::new());
        let alice = register(&store, "alice", "alice-pw");
        let bob = register(&store, "bob", "bob-pw");
        register(&store, "carol", "carol-pw");

        let note_id =
            save_encrypted_note(&store, "alice", &alice.master_key().unwrap(), "x");

        ShareKeyProtocol::new(store.clone(), alice.clone(), "alice")
            .share_note(&note_id, "bob", Permission::Write)
            .unwrap();

        // Bob has write permission but has not resolved the key yet
        let bob_protocol = ShareKeyProtocol::new(store.clone(), bob, "bob");
        assert!(matches!(
            bob_protocol.share_note(&note_id, "carol", Permission::Read),
            Err(Error::SafetyRefusal(_))
        ));

        // After obtaining the key, the re-share wraps the correct key
        bob_protocol.obtain_note_key(&note_id, "alice").unwrap();
        bob_protocol
            .share_note(&note_id, "carol", Permission::Read)
            .unwrap();

        let carol_session = {
            // carol registered above; unlock a fresh session for her
            let record = store.fetch_user("carol").unwrap();
            let session = Arc::new(SessionKeys::new());
            session
                .unlock("carol-pw", record.encrypted_private_key.as_ref())
                .unwrap();
            session
        };
        let key = ShareKeyProtocol::new(store, carol_session, "carol")
            .obtain_note_key(&note_id, "alice")
            .unwrap();
        assert_eq!(key.to_hex(), alice.master_key().unwrap().to_hex());
    }

    #[test]
    fn test_obtain_requires_private_key() {
        let store = Arc::new(MemoryStore::new());
        let alice = register(&store, "alice", "alice-pw");
        register(&store, "bob", "bob-pw");

        let note_id =
            save_encrypted_note(&store, "alice", &alice.master_key().unwrap(), "x");
        ShareKeyProtocol::new(store.clone(), alice, "alice")
            .share_note(&note_id, "bob", Permission::Read)
            .unwrap();

        // A locked session cannot unwrap anything
        let locked = Arc::new(SessionKeys::new());
        let protocol = ShareKeyProtocol::new(store, locked, "bob");
        assert!(matches!(
            protocol.obtain_note_key(&note_id, "alice"),
            Err(Error::KeysLocked)
        ));
    }

    #[test]
    fn test_obtain_without_envelope() {
        let store = Arc::new(MemoryStore::new());
        let alice = register(&store, "alice", "alice-pw");
        let bob = register(&store, "bob", "bob-pw");

        let note_id =
            save_encrypted_note(&store, "alice", &alice.master_key().unwrap(), "x");

        // No share happened; Bob cannot even fetch the note, and there is no
        // envelope either way
        let protocol = ShareKeyProtocol::new(store, bob, "bob");
        assert!(matches!(
            protocol.obtain_note_key(&note_id, "alice"),
            Err(Error::ShareNotFound)
        ));
    }

    #[test]
    fn test_reshare_replaces_envelope() {
        let store = Arc::new(MemoryStore::new());
        let alice = register(&store, "alice", "alice-pw");
        register(&store, "bob", "bob-pw");

        let note_id =
            save_encrypted_note(&store, "alice", &alice.master_key().unwrap(), "x");

        let protocol = ShareKeyProtocol::new(store.clone(), alice, "alice");
        protocol
            .share_note(&note_id, "bob", Permission::Read)
            .unwrap();
        protocol
            .share_note(&note_id, "bob", Permission::Write)
            .unwrap();

        let envelope = store
            .fetch_share_envelope(&note_id, "bob", &EnvelopeSender::Any)
            .unwrap();
        assert_eq!(envelope.permission, Permission::Write);

        // Exactly one grant on the note, with the upgraded permission
        let note = store.fetch_note(&note_id, "alice").unwrap();
        assert_eq!(note.shared_with.len(), 1);
        assert_eq!(note.shared_with[0].permission, Permission::Write);
    }

    #[test]
    fn test_revoke_share() {
        let store = Arc::new(MemoryStore::new());
        let alice = register(&store, "alice", "alice-pw");
        let bob = register(&store, "bob", "bob-pw");

        let note_id =
            save_encrypted_note(&store, "alice", &alice.master_key().unwrap(), "x");

        let alice_protocol = ShareKeyProtocol::new(store.clone(), alice, "alice");
        alice_protocol
            .share_note(&note_id, "bob", Permission::Read)
            .unwrap();
        alice_protocol.revoke_share(&note_id, "bob").unwrap();

        let bob_protocol = ShareKeyProtocol::new(store.clone(), bob, "bob");
        assert!(matches!(
            bob_protocol.obtain_note_key(&note_id, "alice"),
            Err(Error::ShareNotFound)
        ));
        assert!(store.fetch_note(&note_id, "bob").is_err());
    }

    #[test]
    fn test_read_holder_cannot_revoke_others() {
        let store = Arc::new(MemoryStore::new());
        let alice = register(&store, "alice", "alice-pw");
        let bob = register(&store, "bob", "bob-pw");
        register(&store, "carol", "carol-pw");

        let note_id =
            save_encrypted_note(&store, "alice", &alice.master_key().unwrap(), "x");
        let alice_protocol = ShareKeyProtocol::new(store.clone(), alice, "alice");
        alice_protocol
            .share_note(&note_id, "bob", Permission::Read)
            .unwrap();
        alice_protocol
            .share_note(&note_id, "carol", Permission::Read)
            .unwrap();

        let bob_protocol = ShareKeyProtocol::new(store.clone(), bob, "bob");
        assert!(matches!(
            bob_protocol.revoke_share(&note_id, "carol"),
            Err(Error::PermissionDenied)
        ));
        assert_eq!(store.fetch_note(&note_id, "alice").unwrap().shared_with.len(), 2);
    }

    #[test]
    fn test_recipient_can_remove_self() {
        let store = Arc::new(MemoryStore::new());
        let alice = register(&store, "alice", "alice-pw");
        let bob = register(&store, "bob", "bob-pw");

        let note_id =
            save_encrypted_note(&store, "alice", &alice.master_key().unwrap(), "x");
        ShareKeyProtocol::new(store.clone(), alice, "alice")
            .share_note(&note_id, "bob", Permission::Read)
            .unwrap();

        // A read-only recipient may still leave the share
        let bob_protocol = ShareKeyProtocol::new(store.clone(), bob, "bob");
        bob_protocol.revoke_share(&note_id, "bob").unwrap();
        assert!(store.fetch_note(&note_id, "bob").is_err());
    }

    #[test]
    fn test_expired_envelope_treated_as_absent() {
        let envelope = ShareKeyEnvelope {
            note_id: "n".into(),
            from_user_id: "a".into(),
            to_user_id: "b".into(),
            encrypted_key: "x".into(),
            permission: Permission::Read,
            created_at: now_timestamp() - SHARE_KEY_TTL_SECS - 1,
        };
        assert!(envelope.is_expired(now_timestamp()));

        let fresh = ShareKeyEnvelope {
            created_at: now_timestamp(),
            ..envelope
        };
        assert!(!fresh.is_expired(now_timestamp()));
    }
}
