//! Owner lifecycle: register, unlock, save, lock, reopen, history.

use std::sync::Arc;

use velum_core::notes::{NoteCryptoService, SaveRequest, ViewState};
use velum_core::session::SessionKeys;
use velum_core::storage::{MemoryStore, NoteStore, UserRecord};
use velum_core::{Error, RegistrationKeys};

fn register(store: &MemoryStore, id: &str, password: &str) -> RegistrationKeys {
    let keys = RegistrationKeys::generate(password).unwrap();
    store.insert_user(UserRecord {
        id: id.to_string(),
        username: id.to_string(),
        email: format!("{id}@example.com"),
        public_key: Some(keys.public_key.clone()),
        encrypted_private_key: Some(keys.encrypted_private_key.clone()),
    });
    keys
}

#[test]
fn owner_notes_survive_lock_unlock_cycles() {
    let store = Arc::new(MemoryStore::new());
    let keys = register(&store, "alice", "correct horse");

    let session = Arc::new(SessionKeys::new());
    session
        .unlock("correct horse", Some(&keys.encrypted_private_key))
        .unwrap();

    let notes = NoteCryptoService::new(store.clone(), session.clone(), "alice");
    let id = notes
        .save(SaveRequest {
            id: None,
            title: "Journal".into(),
            content: "day one".into(),
            tags: vec!["private".into()],
        })
        .unwrap()
        .id;

    // At rest the store only ever sees ciphertext
    let raw = store.fetch_note(&id, "alice").unwrap();
    assert!(raw.is_encrypted);
    assert_ne!(raw.content, "day one");

    // Logout: everything locked, content unreadable but not an error
    session.lock();
    let opened = notes.open(&id).unwrap();
    assert_eq!(opened.state, ViewState::EncryptedLocked);
    assert!(opened.content.is_none());

    // Login again: same password, same master key, content comes back
    session
        .unlock("correct horse", Some(&keys.encrypted_private_key))
        .unwrap();
    let opened = notes.open(&id).unwrap();
    assert_eq!(opened.state, ViewState::PlaintextReady);
    assert_eq!(opened.content.as_deref(), Some("day one"));
}

#[test]
fn wrong_password_never_yields_garbage() {
    let store = Arc::new(MemoryStore::new());
    register(&store, "alice", "right");

    let good = Arc::new(SessionKeys::new());
    good.unlock("right", None).unwrap();
    let notes = NoteCryptoService::new(store.clone(), good, "alice");
    let id = notes
        .save(SaveRequest {
            id: None,
            title: "T".into(),
            content: "sensitive".into(),
            tags: vec![],
        })
        .unwrap()
        .id;

    let bad = Arc::new(SessionKeys::new());
    bad.unlock("wrong", None).unwrap();
    let wrong_notes = NoteCryptoService::new(store, bad, "alice");

    let opened = wrong_notes.open(&id).unwrap();
    assert!(matches!(opened.state, ViewState::DecryptFailed { .. }));
    assert!(opened.content.is_none());
}

#[test]
fn version_history_archives_decrypts_and_restores() {
    let store = Arc::new(MemoryStore::new());
    register(&store, "alice", "pw");

    let session = Arc::new(SessionKeys::new());
    session.unlock("pw", None).unwrap();
    let notes = NoteCryptoService::new(store.clone(), session, "alice");

    let id = notes
        .save(SaveRequest {
            id: None,
            title: "Essay".into(),
            content: "draft".into(),
            tags: vec![],
        })
        .unwrap()
        .id;

    // Identical content twice in a row: no version entry appears
    let receipt = notes
        .save(SaveRequest {
            id: Some(id.clone()),
            title: "Essay".into(),
            content: "draft".into(),
            tags: vec![],
        })
        .unwrap();
    assert_eq!(receipt.version, 1);

    // Two real edits: two archived versions, each independently decryptable
    for content in ["second pass", "final"] {
        notes
            .save(SaveRequest {
                id: Some(id.clone()),
                title: "Essay".into(),
                content: content.into(),
                tags: vec![],
            })
            .unwrap();
    }
    let note = store.fetch_note(&id, "alice").unwrap();
    assert_eq!(note.version, 3);

    let history = notes.decrypt_versions(&id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content.as_deref(), Some("draft"));
    assert_eq!(history[1].content.as_deref(), Some("second pass"));
    assert!(history.iter().all(|v| !v.decryption_failed));

    // Restore the original draft; the pre-restore state joins the history
    notes.restore_version(&id, 1).unwrap();
    let opened = notes.open(&id).unwrap();
    assert_eq!(opened.content.as_deref(), Some("draft"));
    let note = store.fetch_note(&id, "alice").unwrap();
    assert_eq!(note.version, 4);
    assert_eq!(note.previous_versions.len(), 3);
}

#[test]
fn locked_session_save_is_refused_not_downgraded() {
    let store = Arc::new(MemoryStore::new());
    register(&store, "alice", "pw");

    let session = Arc::new(SessionKeys::new());
    let notes = NoteCryptoService::new(store.clone(), session, "alice");

    let result = notes.save(SaveRequest {
        id: None,
        title: "T".into(),
        content: "must not hit the store".into(),
        tags: vec![],
    });
    assert!(matches!(result, Err(Error::KeysLocked)));
}
