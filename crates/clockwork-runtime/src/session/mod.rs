//! Session persistence glue.
//!
//! The engine exposes an atomic `{log, snapshot}` pair
//! ([`ReplayableState`]); this module gives it a stored form and a
//! restore path:
//!
//! ```text
//! Engine ──replayable_state()──► ReplayableState ──► SessionAsset (JSON)
//!                                                         │ save/load
//!                                                         ▼
//!                                                   SessionStore
//!                                                 (LocalFileStore)
//!
//! restore: load → validate → replay(genesis, log) → resumed model
//!          any failure → discard with a warning, fresh initial model
//! ```
//!
//! The stored form round-trips through the canonical serialization of
//! `{msg, ts_ms, entropy?}` entries; nothing beyond that shape is
//! imposed on storage backends.

mod asset;
mod error;
mod local;
mod resume;
mod store;

pub use asset::{ReplayableState, SessionAsset, SESSION_VERSION};
pub use error::StorageError;
pub use local::{default_session_path, LocalFileStore};
pub use resume::{resume_or_fresh, Resume};
pub use store::SessionStore;
