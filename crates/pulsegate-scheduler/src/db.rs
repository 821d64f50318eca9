use rusqlite::Connection;

use crate::error::Result;

/// Initialise the scheduler schema in `conn` — routine and legacy-schedule
/// state, so `last_run_at`/`total_runs` survive a process restart (spec
/// §4.1 additions), mirroring `skynet_scheduler::db::init_db`'s `jobs`
/// table.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS routines (
            routine_id              TEXT    NOT NULL PRIMARY KEY,
            agent_id                TEXT    NOT NULL,
            name                    TEXT    NOT NULL,
            interval_minutes        INTEGER NOT NULL,
            offset_minutes          INTEGER NOT NULL,
            blackouts               TEXT    NOT NULL DEFAULT '[]',
            one_offs                TEXT    NOT NULL DEFAULT '[]',
            enabled                 INTEGER NOT NULL DEFAULT 1,
            max_consecutive_skips   INTEGER NOT NULL DEFAULT 5,
            instructions            TEXT,
            overrides               TEXT    NOT NULL DEFAULT '{}',
            last_run_at             TEXT,
            total_runs              INTEGER NOT NULL DEFAULT 0,
            color                   TEXT,
            manual_only             INTEGER NOT NULL DEFAULT 0
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_routines_agent ON routines (agent_id);

        CREATE TABLE IF NOT EXISTS legacy_schedules (
            agent_id                TEXT    NOT NULL PRIMARY KEY,
            interval_minutes        INTEGER NOT NULL,
            offset_minutes          INTEGER NOT NULL,
            blackouts               TEXT    NOT NULL DEFAULT '[]',
            one_offs                TEXT    NOT NULL DEFAULT '[]',
            enabled                 INTEGER NOT NULL DEFAULT 1,
            max_consecutive_skips   INTEGER NOT NULL DEFAULT 5,
            last_run_at             TEXT,
            total_runs              INTEGER NOT NULL DEFAULT 0
        ) STRICT;

        -- Agents that ever had a routine never fall back to legacy
        -- scheduling again, even after the last routine is removed
        -- (spec §9 Open Question resolution, SPEC_FULL.md §9).
        CREATE TABLE IF NOT EXISTS routine_managed_agents (
            agent_id TEXT NOT NULL PRIMARY KEY
        ) STRICT;
        ",
    )?;
    Ok(())
}
