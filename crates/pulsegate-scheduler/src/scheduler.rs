//! The Scheduler proper (spec §4.1): owns `agentSchedules` (legacy) and
//! `routineSchedules` (grouped by agent), and answers "what fires next" —
//! it never owns a timer itself (that's [`crate::executor::PulseExecutor`]).

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rusqlite::Connection;

use pulsegate_core::{AgentId, RoutineId};

use crate::db::init_db;
use crate::error::{Result, SchedulerError};
use crate::schedule::next_fire;
use crate::types::{
    Conflict, ConflictSeverity, LegacySchedule, PulseRoutine, PulseSource, ScheduledPulse,
    Timeline,
};

/// Persistence + in-memory index for every routine and legacy schedule
/// known to the process. `DashMap` mirrors the teacher's use of it in
/// `skynet-gateway` for hot in-process state shared across tasks.
pub struct Scheduler {
    conn: Mutex<Connection>,
    routines: DashMap<RoutineId, PulseRoutine>,
    legacy: DashMap<AgentId, LegacySchedule>,
    /// Agents that have ever had a routine — see SPEC_FULL.md §9.
    routine_managed: DashMap<AgentId, ()>,
    conflict_window_minutes: u32,
}

impl Scheduler {
    /// Open (and initialise) the schema, then hydrate the in-memory index
    /// from whatever was persisted by a previous process.
    pub fn new(conn: Connection, conflict_window_minutes: u32) -> Result<Self> {
        init_db(&conn)?;
        let this = Self {
            conn: Mutex::new(conn),
            routines: DashMap::new(),
            legacy: DashMap::new(),
            routine_managed: DashMap::new(),
            conflict_window_minutes,
        };
        this.hydrate()?;
        Ok(this)
    }

    fn hydrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        {
            let mut stmt = conn.prepare(
                "SELECT routine_id, agent_id, name, interval_minutes, offset_minutes,
                        blackouts, one_offs, enabled, max_consecutive_skips, instructions,
                        overrides, last_run_at, total_runs, color
                 FROM routines",
            )?;
            let rows = stmt.query_map([], row_to_routine)?;
            for r in rows {
                let routine = r?;
                self.routine_managed.insert(routine.agent_id.clone(), ());
                self.routines.insert(routine.routine_id.clone(), routine);
            }
        }
        {
            let mut stmt = conn.prepare(
                "SELECT agent_id, interval_minutes, offset_minutes, blackouts, one_offs,
                        enabled, max_consecutive_skips, last_run_at, total_runs
                 FROM legacy_schedules",
            )?;
            let rows = stmt.query_map([], row_to_legacy)?;
            for r in rows {
                let legacy = r?;
                self.legacy.insert(legacy.agent_id.clone(), legacy);
            }
        }
        {
            let mut stmt = conn.prepare("SELECT agent_id FROM routine_managed_agents")?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            for r in rows {
                self.routine_managed.insert(AgentId::new(r?), ());
            }
        }
        Ok(())
    }

    /// Idempotent upsert (spec §4.1 `setRoutineSchedule`).
    pub fn set_routine_schedule(&self, routine: PulseRoutine) -> Result<()> {
        routine.validate()?;
        self.persist_routine(&routine)?;
        {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                "INSERT OR IGNORE INTO routine_managed_agents (agent_id) VALUES (?1)",
                [routine.agent_id.as_str()],
            )?;
        }
        self.routine_managed.insert(routine.agent_id.clone(), ());
        self.routines.insert(routine.routine_id.clone(), routine);
        Ok(())
    }

    fn persist_routine(&self, r: &PulseRoutine) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO routines
             (routine_id, agent_id, name, interval_minutes, offset_minutes, blackouts,
              one_offs, enabled, max_consecutive_skips, instructions, overrides,
              last_run_at, total_runs, color)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)
             ON CONFLICT(routine_id) DO UPDATE SET
                agent_id=excluded.agent_id, name=excluded.name,
                interval_minutes=excluded.interval_minutes,
                offset_minutes=excluded.offset_minutes, blackouts=excluded.blackouts,
                one_offs=excluded.one_offs, enabled=excluded.enabled,
                max_consecutive_skips=excluded.max_consecutive_skips,
                instructions=excluded.instructions, overrides=excluded.overrides,
                last_run_at=excluded.last_run_at, total_runs=excluded.total_runs,
                color=excluded.color",
            rusqlite::params![
                r.routine_id.as_str(),
                r.agent_id.as_str(),
                r.name,
                r.interval_minutes,
                r.offset_minutes,
                serde_json::to_string(&r.blackouts)?,
                serde_json::to_string(&r.one_offs)?,
                r.enabled as i64,
                r.max_consecutive_skips,
                r.instructions,
                serde_json::to_string(&r.overrides)?,
                r.stats.last_run_at.map(|t| t.to_rfc3339()),
                r.stats.total_runs,
                r.color,
            ],
        )?;
        Ok(())
    }

    /// Idempotent upsert for the legacy (pre-routine) schedule path.
    pub fn set_agent_schedule(&self, schedule: LegacySchedule) -> Result<()> {
        schedule.validate()?;
        if self.routine_managed.contains_key(&schedule.agent_id) {
            // SPEC_FULL.md §9: once routine-managed, always routine-managed.
            return Err(SchedulerError::InvalidRoutine(format!(
                "agent {} is routine-managed; legacy schedule rejected",
                schedule.agent_id
            )));
        }
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO legacy_schedules
             (agent_id, interval_minutes, offset_minutes, blackouts, one_offs, enabled,
              max_consecutive_skips, last_run_at, total_runs)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)
             ON CONFLICT(agent_id) DO UPDATE SET
                interval_minutes=excluded.interval_minutes,
                offset_minutes=excluded.offset_minutes, blackouts=excluded.blackouts,
                one_offs=excluded.one_offs, enabled=excluded.enabled,
                max_consecutive_skips=excluded.max_consecutive_skips,
                last_run_at=excluded.last_run_at, total_runs=excluded.total_runs",
            rusqlite::params![
                schedule.agent_id.as_str(),
                schedule.interval_minutes,
                schedule.offset_minutes,
                serde_json::to_string(&schedule.blackouts)?,
                serde_json::to_string(&schedule.one_offs)?,
                schedule.enabled as i64,
                schedule.max_consecutive_skips,
                schedule.stats.last_run_at.map(|t| t.to_rfc3339()),
                schedule.stats.total_runs,
            ],
        )?;
        drop(conn);
        self.legacy.insert(schedule.agent_id.clone(), schedule);
        Ok(())
    }

    /// Remove and notify (spec §4.1 `removeRoutine`). Does **not** revive
    /// legacy scheduling for the agent — see SPEC_FULL.md §9.
    pub fn remove_routine(&self, routine_id: &RoutineId) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "DELETE FROM routines WHERE routine_id = ?1",
            [routine_id.as_str()],
        )?;
        if n == 0 {
            return Err(SchedulerError::RoutineNotFound {
                id: routine_id.to_string(),
            });
        }
        drop(conn);
        self.routines.remove(routine_id);
        Ok(())
    }

    pub fn get_agent_routines(&self, agent_id: &AgentId) -> Vec<PulseRoutine> {
        self.routines
            .iter()
            .filter(|e| &e.value().agent_id == agent_id)
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn get_routine(&self, routine_id: &RoutineId) -> Option<PulseRoutine> {
        self.routines.get(routine_id).map(|e| e.value().clone())
    }

    /// Add an absolute one-off pulse timestamp to an agent's schedule.
    /// Routed to the agent's routines if it has any (attached to the first
    /// enabled routine, matching a manual-pulse's single-target semantics);
    /// otherwise to the legacy schedule.
    pub fn add_one_off_pulse(&self, agent_id: &AgentId, at: DateTime<Utc>) -> Result<()> {
        if let Some(mut entry) = self
            .routines
            .iter_mut()
            .find(|e| &e.value().agent_id == agent_id && e.value().enabled)
            .or_else(|| self.routines.iter_mut().find(|e| &e.value().agent_id == agent_id))
        {
            entry.value_mut().one_offs.push(at);
            let routine = entry.value().clone();
            drop(entry);
            return self.persist_routine(&routine);
        }
        if let Some(mut legacy) = self.legacy.get_mut(agent_id) {
            legacy.one_offs.push(at);
            let snapshot = legacy.clone();
            drop(legacy);
            return self.persist_legacy(&snapshot);
        }
        Err(SchedulerError::AgentNotFound {
            id: agent_id.to_string(),
        })
    }

    pub fn remove_one_off_pulse(&self, agent_id: &AgentId, at: DateTime<Utc>) -> Result<()> {
        if let Some(mut entry) = self
            .routines
            .iter_mut()
            .find(|e| &e.value().agent_id == agent_id && e.value().one_offs.contains(&at))
            .or_else(|| {
                self.routines
                    .iter_mut()
                    .find(|e| &e.value().agent_id == agent_id && e.value().enabled)
            })
            .or_else(|| self.routines.iter_mut().find(|e| &e.value().agent_id == agent_id))
        {
            entry.value_mut().one_offs.retain(|t| *t != at);
            let routine = entry.value().clone();
            drop(entry);
            return self.persist_routine(&routine);
        }
        if let Some(mut legacy) = self.legacy.get_mut(agent_id) {
            legacy.one_offs.retain(|t| *t != at);
            let snapshot = legacy.clone();
            drop(legacy);
            return self.persist_legacy(&snapshot);
        }
        Err(SchedulerError::AgentNotFound {
            id: agent_id.to_string(),
        })
    }

    fn persist_legacy(&self, s: &LegacySchedule) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE legacy_schedules SET one_offs = ?1 WHERE agent_id = ?2",
            rusqlite::params![serde_json::to_string(&s.one_offs)?, s.agent_id.as_str()],
        )?;
        Ok(())
    }

    /// Minimum over all enabled schedules of the next fire time (spec
    /// §4.1 `getNextPulseTime`). Invariant 1 (spec §8): an agent with at
    /// least one enabled routine never surfaces a legacy pulse.
    pub fn get_next_pulse_time(&self, now: DateTime<Utc>) -> Option<ScheduledPulse> {
        let mut candidates: Vec<ScheduledPulse> = Vec::new();

        let mut agents_with_routines: std::collections::HashSet<AgentId> =
            std::collections::HashSet::new();
        for entry in self.routines.iter() {
            let r = entry.value();
            agents_with_routines.insert(r.agent_id.clone());
            if !r.enabled {
                continue;
            }
            let (when, is_one_off, _) = next_fire(
                now,
                r.stats.last_run_at,
                r.interval_minutes,
                r.offset_minutes,
                &r.blackouts,
                &r.one_offs,
            );
            candidates.push(ScheduledPulse {
                agent_id: r.agent_id.clone(),
                routine_id: Some(r.routine_id.clone()),
                routine_name: Some(r.name.clone()),
                scheduled_at: when,
                source: if is_one_off {
                    PulseSource::OneOff
                } else {
                    PulseSource::Recurring
                },
            });
        }

        for entry in self.legacy.iter() {
            let l = entry.value();
            if agents_with_routines.contains(&l.agent_id) || !l.enabled {
                continue;
            }
            let (when, is_one_off, _) = next_fire(
                now,
                l.stats.last_run_at,
                l.interval_minutes,
                l.offset_minutes,
                &l.blackouts,
                &l.one_offs,
            );
            candidates.push(ScheduledPulse {
                agent_id: l.agent_id.clone(),
                routine_id: None,
                routine_name: None,
                scheduled_at: when,
                source: if is_one_off {
                    PulseSource::OneOff
                } else {
                    PulseSource::Recurring
                },
            });
        }

        candidates.into_iter().min_by(|a, b| {
            a.scheduled_at
                .cmp(&b.scheduled_at)
                .then(a.source.cmp(&b.source))
                .then(a.agent_id.cmp(&b.agent_id))
                .then(a.routine_id.cmp(&b.routine_id))
        })
    }

    /// All pulses in `[now, now+horizon]`, sorted by time (spec §4.1
    /// `computeTimeline`). Read-only — never affects firing.
    pub fn compute_timeline(&self, now: DateTime<Utc>, horizon_hours: i64) -> Timeline {
        let window_end = now + Duration::hours(horizon_hours);
        let mut pulses: Vec<ScheduledPulse> = Vec::new();

        // Walk each enabled schedule forward, re-seeding `last_fire` with
        // each computed pulse, until we fall outside the horizon.
        let mut agents_with_routines: std::collections::HashSet<AgentId> =
            std::collections::HashSet::new();
        for entry in self.routines.iter() {
            agents_with_routines.insert(entry.value().agent_id.clone());
        }

        for entry in self.routines.iter() {
            let r = entry.value();
            if !r.enabled {
                continue;
            }
            let mut last_fire = r.stats.last_run_at;
            let mut one_offs_remaining = r.one_offs.clone();
            loop {
                let (when, is_one_off, retained) =
                    next_fire(now, last_fire, r.interval_minutes, r.offset_minutes, &r.blackouts, &one_offs_remaining);
                if when > window_end {
                    break;
                }
                pulses.push(ScheduledPulse {
                    agent_id: r.agent_id.clone(),
                    routine_id: Some(r.routine_id.clone()),
                    routine_name: Some(r.name.clone()),
                    scheduled_at: when,
                    source: if is_one_off {
                        PulseSource::OneOff
                    } else {
                        PulseSource::Recurring
                    },
                });
                last_fire = Some(when);
                one_offs_remaining = retained.into_iter().filter(|t| *t != when).collect();
            }
        }

        for entry in self.legacy.iter() {
            let l = entry.value();
            if agents_with_routines.contains(&l.agent_id) || !l.enabled {
                continue;
            }
            let mut last_fire = l.stats.last_run_at;
            let mut one_offs_remaining = l.one_offs.clone();
            loop {
                let (when, is_one_off, retained) =
                    next_fire(now, last_fire, l.interval_minutes, l.offset_minutes, &l.blackouts, &one_offs_remaining);
                if when > window_end {
                    break;
                }
                pulses.push(ScheduledPulse {
                    agent_id: l.agent_id.clone(),
                    routine_id: None,
                    routine_name: None,
                    scheduled_at: when,
                    source: if is_one_off {
                        PulseSource::OneOff
                    } else {
                        PulseSource::Recurring
                    },
                });
                last_fire = Some(when);
                one_offs_remaining = retained.into_iter().filter(|t| *t != when).collect();
            }
        }

        pulses.sort_by_key(|p| p.scheduled_at);
        let conflicts = detect_conflicts(&pulses, self.conflict_window_minutes);
        let summary = format!(
            "{} pulse(s) across {} hour window, {} conflict(s)",
            pulses.len(),
            horizon_hours,
            conflicts.len()
        );

        Timeline {
            window_start: now,
            window_end,
            pulses,
            conflicts,
            summary,
        }
    }

    /// Assign `floor(60 * k / N)` to every agent sharing an interval whose
    /// offset is unset or collides with another agent's (spec §4.1
    /// `autoAssignOffsets`).
    pub fn auto_assign_offsets(&self) -> Result<()> {
        // Group by interval, in stable (agent_id, routine_id) order.
        let mut by_interval: HashMap<u32, Vec<RoutineId>> = HashMap::new();
        {
            let mut ordered: Vec<(AgentId, RoutineId, u32, Option<u32>)> = self
                .routines
                .iter()
                .map(|e| {
                    (
                        e.value().agent_id.clone(),
                        e.value().routine_id.clone(),
                        e.value().interval_minutes,
                        Some(e.value().offset_minutes),
                    )
                })
                .collect();
            ordered.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

            for (_, routine_id, interval, _) in &ordered {
                by_interval.entry(*interval).or_default().push(routine_id.clone());
            }

            // Detect collisions: offsets that are unset (represented here
            // as already-assigned duplicates) get reassigned.
            for (interval, routine_ids) in &by_interval {
                let n = routine_ids.len() as u32;
                if n == 0 {
                    continue;
                }
                let mut seen_offsets: std::collections::HashSet<u32> = std::collections::HashSet::new();
                let mut needs_reassignment: Vec<RoutineId> = Vec::new();
                for rid in routine_ids {
                    if let Some(r) = self.routines.get(rid) {
                        if !seen_offsets.insert(r.offset_minutes) {
                            needs_reassignment.push(rid.clone());
                        }
                    }
                }
                if needs_reassignment.is_empty() {
                    continue;
                }
                for (k, rid) in routine_ids.iter().enumerate() {
                    if !needs_reassignment.contains(rid) {
                        continue;
                    }
                    let new_offset = (60 * k as u32) / n;
                    if let Some(mut r) = self.routines.get_mut(rid) {
                        r.offset_minutes = new_offset % 60;
                        let snapshot = r.clone();
                        drop(r);
                        self.persist_routine(&snapshot)?;
                    }
                }
                let _ = interval;
            }
        }
        Ok(())
    }
}

fn detect_conflicts(pulses: &[ScheduledPulse], window_minutes: u32) -> Vec<Conflict> {
    let window = Duration::minutes(window_minutes as i64);
    let mut conflicts = Vec::new();
    let mut i = 0;
    while i < pulses.len() {
        let mut group = vec![pulses[i].clone()];
        let mut j = i + 1;
        while j < pulses.len() && pulses[j].scheduled_at - pulses[i].scheduled_at <= window {
            group.push(pulses[j].clone());
            j += 1;
        }
        if group.len() >= 2 {
            let severity = if group.len() >= 4 {
                ConflictSeverity::Critical
            } else {
                ConflictSeverity::Warning
            };
            conflicts.push(Conflict {
                window_start: pulses[i].scheduled_at,
                pulses: group,
                severity,
            });
        }
        i = j.max(i + 1);
    }
    conflicts
}

fn row_to_routine(row: &rusqlite::Row<'_>) -> rusqlite::Result<PulseRoutine> {
    let blackouts_json: String = row.get(5)?;
    let one_offs_json: String = row.get(6)?;
    let overrides_json: String = row.get(10)?;
    let last_run_at: Option<String> = row.get(11)?;
    Ok(PulseRoutine {
        routine_id: RoutineId::from(row.get::<_, String>(0)?),
        agent_id: AgentId::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        interval_minutes: row.get(3)?,
        offset_minutes: row.get(4)?,
        blackouts: serde_json::from_str(&blackouts_json).unwrap_or_default(),
        one_offs: serde_json::from_str(&one_offs_json).unwrap_or_default(),
        enabled: row.get::<_, i64>(7)? != 0,
        max_consecutive_skips: row.get(8)?,
        instructions: row.get(9)?,
        overrides: serde_json::from_str(&overrides_json).unwrap_or_default(),
        stats: crate::types::RoutineStats {
            last_run_at: last_run_at.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
            total_runs: row.get::<_, i64>(12)? as u64,
        },
        color: row.get(13)?,
    })
}

fn row_to_legacy(row: &rusqlite::Row<'_>) -> rusqlite::Result<LegacySchedule> {
    let blackouts_json: String = row.get(3)?;
    let one_offs_json: String = row.get(4)?;
    let last_run_at: Option<String> = row.get(7)?;
    Ok(LegacySchedule {
        agent_id: AgentId::new(row.get::<_, String>(0)?),
        interval_minutes: row.get(1)?,
        offset_minutes: row.get(2)?,
        blackouts: serde_json::from_str(&blackouts_json).unwrap_or_default(),
        one_offs: serde_json::from_str(&one_offs_json).unwrap_or_default(),
        enabled: row.get::<_, i64>(5)? != 0,
        max_consecutive_skips: row.get(6)?,
        stats: crate::types::RoutineStats {
            last_run_at: last_run_at.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
            total_runs: row.get::<_, i64>(8)? as u64,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RoutineOverrides, RoutineStats};
    use chrono::TimeZone;

    fn routine(agent: &str, interval: u32, offset: u32) -> PulseRoutine {
        PulseRoutine {
            routine_id: RoutineId::new(),
            agent_id: AgentId::new(agent),
            name: "check inbox".into(),
            interval_minutes: interval,
            offset_minutes: offset,
            blackouts: vec![],
            one_offs: vec![],
            enabled: true,
            max_consecutive_skips: 5,
            instructions: None,
            overrides: RoutineOverrides::default(),
            stats: RoutineStats::default(),
            color: None,
        }
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(Connection::open_in_memory().unwrap(), 1).unwrap()
    }

    #[test]
    fn routine_round_trips_through_upsert() {
        let s = scheduler();
        let r = routine("agent-a", 30, 0);
        let id = r.routine_id.clone();
        s.set_routine_schedule(r.clone()).unwrap();
        let routines = s.get_agent_routines(&AgentId::new("agent-a"));
        assert_eq!(routines.len(), 1);
        assert_eq!(routines[0].routine_id, id);
        assert_eq!(routines[0].interval_minutes, 30);
    }

    #[test]
    fn agent_with_routine_never_surfaces_legacy_pulse() {
        let s = scheduler();
        s.set_routine_schedule(routine("agent-a", 30, 0)).unwrap();
        // Attempting a legacy schedule for the same agent is rejected
        // outright once it is routine-managed.
        let legacy = LegacySchedule {
            agent_id: AgentId::new("agent-a"),
            interval_minutes: 10,
            offset_minutes: 0,
            blackouts: vec![],
            one_offs: vec![],
            enabled: true,
            max_consecutive_skips: 5,
            stats: RoutineStats::default(),
        };
        assert!(s.set_agent_schedule(legacy).is_err());
    }

    #[test]
    fn legacy_schedule_used_when_no_routines() {
        let s = scheduler();
        let legacy = LegacySchedule {
            agent_id: AgentId::new("agent-b"),
            interval_minutes: 15,
            offset_minutes: 0,
            blackouts: vec![],
            one_offs: vec![],
            enabled: true,
            max_consecutive_skips: 5,
            stats: RoutineStats::default(),
        };
        s.set_agent_schedule(legacy).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 1, 0).unwrap();
        let next = s.get_next_pulse_time(now).unwrap();
        assert_eq!(next.agent_id, AgentId::new("agent-b"));
        assert!(next.routine_id.is_none());
    }

    #[test]
    fn remove_routine_does_not_revive_legacy() {
        let s = scheduler();
        let r = routine("agent-a", 30, 0);
        let id = r.routine_id.clone();
        s.set_routine_schedule(r).unwrap();
        s.remove_routine(&id).unwrap();

        let legacy = LegacySchedule {
            agent_id: AgentId::new("agent-a"),
            interval_minutes: 10,
            offset_minutes: 0,
            blackouts: vec![],
            one_offs: vec![],
            enabled: true,
            max_consecutive_skips: 5,
            stats: RoutineStats::default(),
        };
        assert!(s.set_agent_schedule(legacy).is_err());
        assert!(s.get_agent_routines(&AgentId::new("agent-a")).is_empty());
    }

    #[test]
    fn auto_assign_offsets_spreads_collisions_evenly() {
        let s = scheduler();
        for name in ["a", "b", "c"] {
            s.set_routine_schedule(routine(name, 60, 0)).unwrap();
        }
        s.auto_assign_offsets().unwrap();
        let mut offsets: Vec<u32> = ["a", "b", "c"]
            .iter()
            .flat_map(|n| s.get_agent_routines(&AgentId::new(*n)))
            .map(|r| r.offset_minutes)
            .collect();
        offsets.sort();
        assert_eq!(offsets, vec![0, 20, 40]);
    }

    #[test]
    fn conflicts_flagged_within_window() {
        let pulses = vec![
            ScheduledPulse {
                agent_id: AgentId::new("a"),
                routine_id: None,
                routine_name: None,
                scheduled_at: Utc.with_ymd_and_hms(2026, 1, 1, 12, 30, 0).unwrap(),
                source: PulseSource::Recurring,
            },
            ScheduledPulse {
                agent_id: AgentId::new("b"),
                routine_id: None,
                routine_name: None,
                scheduled_at: Utc.with_ymd_and_hms(2026, 1, 1, 12, 30, 30).unwrap(),
                source: PulseSource::Recurring,
            },
        ];
        let conflicts = detect_conflicts(&pulses, 1);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, ConflictSeverity::Warning);
    }
}
