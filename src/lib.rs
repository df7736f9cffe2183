//! # Velum Core
//!
//! Client-side end-to-end encryption core for a note-taking application:
//! key derivation, note encryption, and asymmetric key sharing. The server
//! behind the [`storage::NoteStore`] seam only ever holds ciphertext, public
//! keys, and wrapped note keys.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          VELUM CORE                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   ┌──────────────────┐         ┌──────────────────┐                    │
//! │   │ NoteCryptoService│◄───────►│ ShareKeyProtocol │                    │
//! │   │ open/save/restore│         │ share/obtain/    │                    │
//! │   │ /history         │         │ revoke           │                    │
//! │   └────────┬─────────┘         └────────┬─────────┘                    │
//! │            │      shared session state  │                              │
//! │            ▼                            ▼                              │
//! │   ┌─────────────────────────────────────────────┐                      │
//! │   │ SessionKeys (volatile, lock/unlock)         │                      │
//! │   │  master key · RSA private key · note keys   │                      │
//! │   └────────┬────────────────────────────────────┘                      │
//! │            │                                                           │
//! │            ▼                                                           │
//! │   ┌─────────────────────────────────────────────┐                      │
//! │   │ crypto: AES-256-GCM · PBKDF2 · RSA-OAEP     │                      │
//! │   └─────────────────────────────────────────────┘                      │
//! │                                                                         │
//! │   ┌─────────────────────────────────────────────┐                      │
//! │   │ storage::NoteStore (ciphertext only)        │                      │
//! │   └─────────────────────────────────────────────┘                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use velum_core::{
//!     notes::{NoteCryptoService, SaveRequest},
//!     session::SessionKeys,
//!     storage::MemoryStore,
//! };
//!
//! # fn main() -> velum_core::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let session = Arc::new(SessionKeys::new());
//! session.unlock("hunter2!", None)?;
//!
//! let notes = NoteCryptoService::new(store, session, "alice");
//! let receipt = notes.save(SaveRequest {
//!     id: None,
//!     title: "Groceries".into(),
//!     content: "eggs, coffee".into(),
//!     tags: vec![],
//! })?;
//!
//! let opened = notes.open(&receipt.id)?;
//! assert_eq!(opened.content.as_deref(), Some("eggs, coffee"));
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod error;
pub mod identity;
pub mod notes;
pub mod session;
pub mod sharing;
pub mod storage;
pub mod time;

pub use error::{Error, Result};
pub use identity::RegistrationKeys;
pub use notes::{NoteCryptoService, OpenNote, Permission, SaveRequest, ViewState};
pub use session::SessionKeys;
pub use sharing::{ShareKeyEnvelope, ShareKeyProtocol};
pub use storage::{MemoryStore, NoteStore};

/// Get the crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
