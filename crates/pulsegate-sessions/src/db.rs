use rusqlite::Connection;

use crate::error::Result;

/// Idempotent schema setup, following the teacher's `CREATE TABLE IF NOT
/// EXISTS` convention.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sessions (
            id            TEXT PRIMARY KEY,
            session_key   TEXT NOT NULL UNIQUE,
            model         TEXT,
            title         TEXT,
            message_count INTEGER NOT NULL DEFAULT 0,
            total_tokens  INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sessions_key ON sessions(session_key);

        CREATE TABLE IF NOT EXISTS routing_sticky (
            channel          TEXT NOT NULL,
            sender_identity   TEXT NOT NULL,
            agent_id          TEXT NOT NULL,
            last_activity_ms  INTEGER NOT NULL,
            PRIMARY KEY (channel, sender_identity)
        );

        CREATE TABLE IF NOT EXISTS allowlist (
            id               TEXT PRIMARY KEY,
            channel          TEXT NOT NULL,
            sender_identity  TEXT NOT NULL,
            label            TEXT,
            default_agent_id TEXT,
            UNIQUE(channel, sender_identity)
        );
        ",
    )?;
    Ok(())
}
