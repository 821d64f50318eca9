//! Session registry: structured session keys, sticky channel routing, and
//! the per-channel allowlist (spec §3, §4.8), persisted with the teacher's
//! `rusqlite` + `Mutex<Connection>` pattern.

pub mod db;
pub mod error;
pub mod manager;
pub mod types;

pub use error::{Result, SessionError};
pub use manager::SessionManager;
pub use types::{AllowlistEntry, Session, SessionKey, StickyEntry, StickyKey};
