use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::WhatsAppError;

/// Persists the WhatsApp Cloud API's opaque LID (linked-identity id) to
/// E.164 phone number mapping, so repeat senders resolve to the same
/// allowlist/sticky-routing identity even across LID rotations.
pub struct LidMap {
    conn: Mutex<Connection>,
}

impl LidMap {
    pub fn new(conn: Connection) -> Result<Self, WhatsAppError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS lid_map (
                lid TEXT PRIMARY KEY,
                phone_number TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn resolve(&self, lid: &str) -> Result<Option<String>, WhatsAppError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT phone_number FROM lid_map WHERE lid = ?1", params![lid], |row| row.get(0))
            .optional()
            .map_err(WhatsAppError::from)
    }

    pub fn put(&self, lid: &str, phone_number: &str, now_ms: i64) -> Result<(), WhatsAppError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO lid_map (lid, phone_number, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(lid) DO UPDATE SET phone_number = excluded.phone_number, updated_at = excluded.updated_at",
            params![lid, phone_number, now_ms],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> LidMap {
        LidMap::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn unknown_lid_resolves_to_none() {
        let map = map();
        assert_eq!(map.resolve("lid-1").unwrap(), None);
    }

    #[test]
    fn put_then_resolve_roundtrips() {
        let map = map();
        map.put("lid-1", "+15551234567", 1_000).unwrap();
        assert_eq!(map.resolve("lid-1").unwrap(), Some("+15551234567".to_string()));
    }

    #[test]
    fn put_overwrites_existing_mapping() {
        let map = map();
        map.put("lid-1", "+15551234567", 1_000).unwrap();
        map.put("lid-1", "+15557654321", 2_000).unwrap();
        assert_eq!(map.resolve("lid-1").unwrap(), Some("+15557654321".to_string()));
    }
}
