//! # Session Key Material
//!
//! Explicit, lockable container for all volatile key material. This replaces
//! ambient global key state with a context object that services hold by
//! reference, with a `lock()`/`unlock(password)` lifecycle and guaranteed
//! clearing on logout.
//!
//! ## Session Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SESSION KEY LIFECYCLE                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. Login                                                              │
//! │     ┌─────────────┐                                                    │
//! │     │  unlock()   │──► Derive master key from password                 │
//! │     │             │──► Decrypt + import RSA private key (if on file)   │
//! │     └─────────────┘                                                    │
//! │            │                                                           │
//! │            ▼                                                           │
//! │  2. Unlocked                                                           │
//! │     ┌─────────────┐                                                    │
//! │     │  Active     │◄─► master_key() / private_key() for services       │
//! │     │  Session    │◄─► per-note key cache (resolved shared-note keys)  │
//! │     └─────────────┘                                                    │
//! │            │                                                           │
//! │            ▼                                                           │
//! │  3. Logout                                                             │
//! │     ┌─────────────┐                                                    │
//! │     │   lock()    │──► Drop master key, private key, note-key cache    │
//! │     │             │──► Key bytes zeroized on drop                      │
//! │     └─────────────┘                                                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Storage Rules
//!
//! Session keys live only in memory. They are never serialized, never handed
//! to the persistence layer, and never written to durable storage of any
//! kind. Accessors return [`Error::KeysLocked`] instead of substituting a
//! default — a locked session is a recoverable state the UI resolves by
//! re-authenticating, never by continuing with the wrong key.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::crypto::{self, NoteKey, ProtectedBlob};
use crate::error::{Error, Result};
use rsa::RsaPrivateKey;

/// Result of an [`SessionKeys::unlock`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockOutcome {
    /// Whether the RSA private key was successfully decrypted and imported.
    ///
    /// A failed private-key unlock does not abort the session: the master
    /// key still works for owned notes, only shared-note access is degraded
    /// until the user re-authenticates with the right password.
    pub private_key_unlocked: bool,
}

/// Volatile key material for one authenticated session
///
/// Shared across services behind an `Arc`; interior mutability keeps the
/// lock/unlock lifecycle in one place.
pub struct SessionKeys {
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    master_key: Option<NoteKey>,
    private_key: Option<RsaPrivateKey>,
    /// Resolved per-note keys, keyed by note id. Populated when a shared
    /// note's key is unwrapped (or when an owner opens a note), so later
    /// saves and re-shares reuse the exact key the note is encrypted under.
    note_keys: HashMap<String, NoteKey>,
}

impl SessionKeys {
    /// Create a locked session with no key material
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::default()),
        }
    }

    /// Unlock the session from the login password
    ///
    /// Derives the master key and, when an encrypted private key is on file,
    /// decrypts and imports it. Private-key failure is reported in the
    /// outcome rather than failing the unlock: the original login flow keeps
    /// the master key usable even when the private key cannot be recovered.
    pub fn unlock(
        &self,
        password: &str,
        encrypted_private_key: Option<&ProtectedBlob>,
    ) -> Result<UnlockOutcome> {
        let master_key = crypto::derive_master_key(password);

        let mut private_key = None;
        if let Some(blob) = encrypted_private_key {
            match crypto::decrypt_blob::<String>(blob, password)
                .and_then(|pem| crypto::import_private_key(&pem))
            {
                Ok(key) => private_key = Some(key),
                Err(e) => {
                    tracing::warn!("Private key unlock failed: {}", e);
                }
            }
        }

        let private_key_unlocked = private_key.is_some();

        let mut state = self.state.write();
        state.master_key = Some(master_key);
        state.private_key = private_key;
        state.note_keys.clear();

        tracing::info!(
            private_key_unlocked,
            "Session unlocked"
        );
        Ok(UnlockOutcome {
            private_key_unlocked,
        })
    }

    /// Lock the session, dropping all key material
    ///
    /// Note keys zeroize on drop; the RSA private key zeroizes via its own
    /// drop implementation.
    pub fn lock(&self) {
        let mut state = self.state.write();
        state.master_key = None;
        state.private_key = None;
        state.note_keys.clear();
        tracing::info!("Session locked, key material cleared");
    }

    /// Whether the session currently holds a master key
    pub fn is_unlocked(&self) -> bool {
        self.state.read().master_key.is_some()
    }

    /// Whether the session currently holds a usable private key
    pub fn has_private_key(&self) -> bool {
        self.state.read().private_key.is_some()
    }

    /// Get the session master key
    pub fn master_key(&self) -> Result<NoteKey> {
        self.state
            .read()
            .master_key
            .clone()
            .ok_or(Error::KeysLocked)
    }

    /// Get the session RSA private key
    pub fn private_key(&self) -> Result<RsaPrivateKey> {
        self.state
            .read()
            .private_key
            .clone()
            .ok_or(Error::KeysLocked)
    }

    /// Look up the cached key for a note, if this session resolved one
    pub fn note_key(&self, note_id: &str) -> Option<NoteKey> {
        self.state.read().note_keys.get(note_id).cloned()
    }

    /// Cache the resolved key for a note for the rest of this session
    pub fn cache_note_key(&self, note_id: &str, key: NoteKey) {
        self.state
            .write()
            .note_keys
            .insert(note_id.to_string(), key);
    }

    /// Forget the cached key for one note (e.g. after the view closes)
    pub fn forget_note_key(&self, note_id: &str) {
        self.state.write().note_keys.remove(note_id);
    }
}

impl Default for SessionKeys {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
