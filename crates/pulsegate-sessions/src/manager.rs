use std::sync::Mutex;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use pulsegate_core::AgentId;

use crate::db::init_db;
use crate::error::{Result, SessionError};
use crate::types::{AllowlistEntry, Session, SessionKey, StickyEntry, StickyKey};

/// Tracks active sessions and channel-routing state, mirroring the
/// teacher's `skynet-sessions::manager::SessionManager` `Mutex<Connection>`
/// shape but extended with sticky-routing and allowlist bookkeeping
/// (SPEC_FULL.md §3, §4.8).
pub struct SessionManager {
    conn: Mutex<Connection>,
}

impl SessionManager {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn get_or_create(&self, key: &SessionKey) -> Result<Session> {
        let conn = self.conn.lock().expect("session db mutex poisoned");
        if let Some(session) = Self::find_by_key(&conn, key)? {
            return Ok(session);
        }
        let now = Utc::now().to_rfc3339();
        let id = Uuid::now_v7().to_string();
        conn.execute(
            "INSERT INTO sessions (id, session_key, model, title, message_count, total_tokens, created_at, updated_at)
             VALUES (?1, ?2, NULL, NULL, 0, 0, ?3, ?3)",
            params![id, key.format(), now],
        )?;
        Ok(Session {
            id,
            key: key.clone(),
            model: None,
            title: None,
            message_count: 0,
            total_tokens: 0,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    pub fn get(&self, key: &SessionKey) -> Result<Session> {
        let conn = self.conn.lock().expect("session db mutex poisoned");
        Self::find_by_key(&conn, key)?.ok_or_else(|| SessionError::NotFound { key: key.format() })
    }

    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<Session>> {
        let conn = self.conn.lock().expect("session db mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, session_key, model, title, message_count, total_tokens, created_at, updated_at
             FROM sessions WHERE session_key LIKE ?1 ORDER BY updated_at DESC",
        )?;
        let like = format!("%user:{user_id}:%");
        let rows = stmt.query_map(params![like], row_to_session)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row??);
        }
        Ok(out)
    }

    pub fn update_stats(&self, key: &SessionKey, model: Option<&str>, message_count: u32, total_tokens: u64) -> Result<()> {
        let conn = self.conn.lock().expect("session db mutex poisoned");
        let now = Utc::now().to_rfc3339();
        let updated = conn.execute(
            "UPDATE sessions SET model = COALESCE(?1, model), message_count = ?2, total_tokens = ?3, updated_at = ?4
             WHERE session_key = ?5",
            params![model, message_count, total_tokens, now, key.format()],
        )?;
        if updated == 0 {
            return Err(SessionError::NotFound { key: key.format() });
        }
        Ok(())
    }

    pub fn delete(&self, key: &SessionKey) -> Result<()> {
        let conn = self.conn.lock().expect("session db mutex poisoned");
        conn.execute("DELETE FROM sessions WHERE session_key = ?1", params![key.format()])?;
        Ok(())
    }

    fn find_by_key(conn: &Connection, key: &SessionKey) -> Result<Option<Session>> {
        conn.query_row(
            "SELECT id, session_key, model, title, message_count, total_tokens, created_at, updated_at
             FROM sessions WHERE session_key = ?1",
            params![key.format()],
            row_to_session,
        )
        .optional()
        .map_err(SessionError::from)
    }

    /// Sticky-routing lookup (spec §4.8 inbound step 3): most recent
    /// agent a sender on a channel was routed to, if still live.
    pub fn sticky_route(&self, channel: &str, sender_identity: &str, ttl_minutes: u64, now_ms: i64) -> Result<Option<AgentId>> {
        let conn = self.conn.lock().expect("session db mutex poisoned");
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT agent_id, last_activity_ms FROM routing_sticky WHERE channel = ?1 AND sender_identity = ?2",
                params![channel, sender_identity],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        Ok(row.and_then(|(agent_id, last_activity_ms)| {
            let entry = StickyEntry { agent_id: AgentId::new(agent_id), last_activity_ms };
            entry.is_live(now_ms, ttl_minutes).then_some(entry.agent_id)
        }))
    }

    pub fn set_sticky_route(&self, key: StickyKey, agent_id: &AgentId, now_ms: i64) -> Result<()> {
        let conn = self.conn.lock().expect("session db mutex poisoned");
        conn.execute(
            "INSERT INTO routing_sticky (channel, sender_identity, agent_id, last_activity_ms)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(channel, sender_identity) DO UPDATE SET agent_id = excluded.agent_id, last_activity_ms = excluded.last_activity_ms",
            params![key.channel, key.sender_identity, agent_id.as_str(), now_ms],
        )?;
        Ok(())
    }

    pub fn allowlist_entry(&self, channel: &str, sender_identity: &str) -> Result<Option<AllowlistEntry>> {
        let conn = self.conn.lock().expect("session db mutex poisoned");
        conn.query_row(
            "SELECT id, channel, sender_identity, label, default_agent_id FROM allowlist
             WHERE channel = ?1 AND sender_identity = ?2",
            params![channel, sender_identity],
            row_to_allowlist,
        )
        .optional()
        .map_err(SessionError::from)
    }

    pub fn put_allowlist_entry(&self, entry: &AllowlistEntry) -> Result<()> {
        let conn = self.conn.lock().expect("session db mutex poisoned");
        conn.execute(
            "INSERT INTO allowlist (id, channel, sender_identity, label, default_agent_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(channel, sender_identity) DO UPDATE SET
                label = excluded.label, default_agent_id = excluded.default_agent_id",
            params![
                entry.id,
                entry.channel,
                entry.sender_identity,
                entry.label,
                entry.default_agent_id.as_ref().map(AgentId::as_str),
            ],
        )?;
        Ok(())
    }

    pub fn remove_allowlist_entry(&self, channel: &str, sender_identity: &str) -> Result<()> {
        let conn = self.conn.lock().expect("session db mutex poisoned");
        conn.execute(
            "DELETE FROM allowlist WHERE channel = ?1 AND sender_identity = ?2",
            params![channel, sender_identity],
        )?;
        Ok(())
    }
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Result<Session>> {
    let key_str: String = row.get(1)?;
    let id: String = row.get(0)?;
    let model: Option<String> = row.get(2)?;
    let title: Option<String> = row.get(3)?;
    let message_count: u32 = row.get(4)?;
    let total_tokens: i64 = row.get(5)?;
    let created_at: String = row.get(6)?;
    let updated_at: String = row.get(7)?;
    Ok(SessionKey::parse(&key_str).map(|key| Session {
        id,
        key,
        model,
        title,
        message_count,
        total_tokens: total_tokens as u64,
        created_at,
        updated_at,
    }))
}

fn row_to_allowlist(row: &rusqlite::Row<'_>) -> rusqlite::Result<AllowlistEntry> {
    let default_agent_id: Option<String> = row.get(4)?;
    Ok(AllowlistEntry {
        id: row.get(0)?,
        channel: row.get(1)?,
        sender_identity: row.get(2)?,
        label: row.get(3)?,
        default_agent_id: default_agent_id.map(AgentId::new),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mgr() -> SessionManager {
        SessionManager::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    #[test]
    fn get_or_create_is_idempotent() {
        let mgr = mgr();
        let key = SessionKey::new("u-1", AgentId::new("main"), "main");
        let first = mgr.get_or_create(&key).unwrap();
        let second = mgr.get_or_create(&key).unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn list_for_user_filters_by_user_segment() {
        let mgr = mgr();
        mgr.get_or_create(&SessionKey::new("u-1", AgentId::new("main"), "main")).unwrap();
        mgr.get_or_create(&SessionKey::new("u-2", AgentId::new("main"), "main")).unwrap();
        let sessions = mgr.list_for_user("u-1").unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].key.user_id, "u-1");
    }

    #[test]
    fn update_stats_persists() {
        let mgr = mgr();
        let key = SessionKey::new("u-1", AgentId::new("main"), "main");
        mgr.get_or_create(&key).unwrap();
        mgr.update_stats(&key, Some("claude"), 3, 512).unwrap();
        let session = mgr.get(&key).unwrap();
        assert_eq!(session.model.as_deref(), Some("claude"));
        assert_eq!(session.message_count, 3);
        assert_eq!(session.total_tokens, 512);
    }

    #[test]
    fn sticky_route_expires() {
        let mgr = mgr();
        let key = StickyKey { channel: "telegram".into(), sender_identity: "s-1".into() };
        mgr.set_sticky_route(key, &AgentId::new("main"), 0).unwrap();
        assert_eq!(mgr.sticky_route("telegram", "s-1", 30, 60_000).unwrap(), Some(AgentId::new("main")));
        assert_eq!(mgr.sticky_route("telegram", "s-1", 30, 30 * 60_000 + 1).unwrap(), None);
    }

    #[test]
    fn allowlist_roundtrip() {
        let mgr = mgr();
        let entry = AllowlistEntry {
            id: "al-1".into(),
            channel: "telegram".into(),
            sender_identity: "s-1".into(),
            label: Some("Alice".into()),
            default_agent_id: Some(AgentId::new("main")),
        };
        mgr.put_allowlist_entry(&entry).unwrap();
        let fetched = mgr.allowlist_entry("telegram", "s-1").unwrap().unwrap();
        assert_eq!(fetched.label.as_deref(), Some("Alice"));
        mgr.remove_allowlist_entry("telegram", "s-1").unwrap();
        assert!(mgr.allowlist_entry("telegram", "s-1").unwrap().is_none());
    }
}
