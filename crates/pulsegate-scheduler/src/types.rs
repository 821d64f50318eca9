use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use pulsegate_core::{AgentId, RoutineId};

use crate::error::{Result, SchedulerError};

/// A window during which a routine will not fire (spec §3 `blackouts`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Blackout {
    /// Recurs every day within `[start_time, end_time)` clock time. When
    /// `start_time > end_time` the window wraps past midnight (e.g.
    /// `22:00`–`07:00`).
    Recurring {
        start_time: NaiveTime,
        end_time: NaiveTime,
    },
    /// Fires exactly once, bounded by absolute timestamps.
    OneOff { start: DateTime<Utc>, end: DateTime<Utc> },
}

impl Blackout {
    /// If `t` falls inside this blackout window, return the instant the
    /// window ends (the next fire is moved there, per spec §4.1).
    pub fn end_if_covers(&self, t: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Blackout::OneOff { start, end } => {
                if t >= *start && t < *end {
                    Some(*end)
                } else {
                    None
                }
            }
            Blackout::Recurring {
                start_time,
                end_time,
            } => {
                let tod = t.time();
                if start_time <= end_time {
                    if tod >= *start_time && tod < *end_time {
                        Some(t.date_naive().and_time(*end_time).and_utc())
                    } else {
                        None
                    }
                } else {
                    // Wraps midnight: covers [start_time, 24:00) ∪ [00:00, end_time).
                    if tod >= *start_time {
                        let end_date = t.date_naive() + chrono::Duration::days(1);
                        Some(end_date.and_time(*end_time).and_utc())
                    } else if tod < *end_time {
                        Some(t.date_naive().and_time(*end_time).and_utc())
                    } else {
                        None
                    }
                }
            }
        }
    }
}

/// Per-project / per-routine overrides forwarded to the session runner
/// (spec §3 `PulseRoutine.overrides`). Each field is opaque to the
/// scheduler — it only stores and forwards them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutineOverrides {
    pub pulse_columns: Option<Vec<String>>,
    pub timeout_ms: Option<u64>,
    pub planning_model: Option<String>,
    pub executor_model: Option<String>,
    pub tools: Option<Vec<String>>,
    pub stage_affinity: Option<String>,
    pub task_work_types: Option<Vec<String>>,
}

/// Running statistics carried on a routine or legacy schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutineStats {
    pub last_run_at: Option<DateTime<Utc>>,
    pub total_runs: u64,
}

/// A named, recurring pulse configuration attached to an agent (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseRoutine {
    pub routine_id: RoutineId,
    pub agent_id: AgentId,
    pub name: String,
    pub interval_minutes: u32,
    pub offset_minutes: u32,
    #[serde(default)]
    pub blackouts: Vec<Blackout>,
    #[serde(default)]
    pub one_offs: Vec<DateTime<Utc>>,
    pub enabled: bool,
    #[serde(default = "default_max_consecutive_skips")]
    pub max_consecutive_skips: u32,
    pub instructions: Option<String>,
    #[serde(default)]
    pub overrides: RoutineOverrides,
    #[serde(default)]
    pub stats: RoutineStats,
    pub color: Option<String>,
}

fn default_max_consecutive_skips() -> u32 {
    pulsegate_core::config::DEFAULT_MAX_CONSECUTIVE_SKIPS
}

impl PulseRoutine {
    /// Validate the invariants from spec §3: `intervalMinutes ∈ [5,1440]`,
    /// `offsetMinutes ∈ [0,59]`.
    pub fn validate(&self) -> Result<()> {
        if !(pulsegate_core::config::MIN_INTERVAL_MINUTES..=pulsegate_core::config::MAX_INTERVAL_MINUTES)
            .contains(&self.interval_minutes)
        {
            return Err(SchedulerError::InvalidRoutine(format!(
                "interval_minutes {} out of range [5, 1440]",
                self.interval_minutes
            )));
        }
        if self.offset_minutes > 59 {
            return Err(SchedulerError::InvalidRoutine(format!(
                "offset_minutes {} out of range [0, 59]",
                self.offset_minutes
            )));
        }
        Ok(())
    }
}

/// Pre-routine legacy schedule — identical in shape to a routine minus
/// `name`/`instructions`/overrides (spec §3 `Legacy agent schedule`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacySchedule {
    pub agent_id: AgentId,
    pub interval_minutes: u32,
    pub offset_minutes: u32,
    #[serde(default)]
    pub blackouts: Vec<Blackout>,
    #[serde(default)]
    pub one_offs: Vec<DateTime<Utc>>,
    pub enabled: bool,
    #[serde(default = "default_max_consecutive_skips")]
    pub max_consecutive_skips: u32,
    #[serde(default)]
    pub stats: RoutineStats,
}

impl LegacySchedule {
    pub fn validate(&self) -> Result<()> {
        if !(pulsegate_core::config::MIN_INTERVAL_MINUTES..=pulsegate_core::config::MAX_INTERVAL_MINUTES)
            .contains(&self.interval_minutes)
        {
            return Err(SchedulerError::InvalidRoutine(format!(
                "interval_minutes {} out of range [5, 1440]",
                self.interval_minutes
            )));
        }
        if self.offset_minutes > 59 {
            return Err(SchedulerError::InvalidRoutine(format!(
                "offset_minutes {} out of range [0, 59]",
                self.offset_minutes
            )));
        }
        Ok(())
    }
}

/// Where a [`ScheduledPulse`] came from. Ordering matters for tie-breaks
/// (spec §4.1: "on equal timestamps, source = one-off wins over
/// recurring").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PulseSource {
    /// Smaller rank sorts first in a tie — one-off wins over recurring.
    OneOff = 0,
    Recurring = 1,
    Manual = 2,
}

/// A derived, ephemeral tuple produced by the Scheduler (spec §3
/// `Scheduled pulse`). Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledPulse {
    pub agent_id: AgentId,
    pub routine_id: Option<RoutineId>,
    pub routine_name: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub source: PulseSource,
}

/// Outcome of one pulse execution (spec §3 `Pulse result`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseResult {
    pub agent_id: AgentId,
    pub routine_id: Option<RoutineId>,
    pub skipped: bool,
    pub unread_count: u32,
    pub errors: Vec<String>,
    pub actions: Vec<String>,
    pub output: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub source: PulseSource,
}

impl PulseResult {
    pub fn skip(
        agent_id: AgentId,
        routine_id: Option<RoutineId>,
        scheduled_at: DateTime<Utc>,
        source: PulseSource,
    ) -> Self {
        Self {
            agent_id,
            routine_id,
            skipped: true,
            unread_count: 0,
            errors: Vec::new(),
            actions: Vec::new(),
            output: None,
            scheduled_at,
            source,
        }
    }
}

/// A detected scheduling conflict between two or more pulses within the
/// conflict window (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conflict {
    pub window_start: DateTime<Utc>,
    pub pulses: Vec<ScheduledPulse>,
    pub severity: ConflictSeverity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    Warning,
    Critical,
}

/// Read-only view of all pulses due within a horizon (spec §4.1
/// `computeTimeline`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeline {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub pulses: Vec<ScheduledPulse>,
    pub conflicts: Vec<Conflict>,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn recurring_blackout_same_day() {
        let b = Blackout::Recurring {
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        };
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 9, 30, 0).unwrap();
        let end = b.end_if_covers(t).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn recurring_blackout_wraps_midnight() {
        let b = Blackout::Recurring {
            start_time: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
        };
        // 23:00 falls inside the window that started today and ends tomorrow.
        let t = Utc.with_ymd_and_hms(2026, 1, 1, 23, 0, 0).unwrap();
        let end = b.end_if_covers(t).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 1, 2, 7, 0, 0).unwrap());

        // 03:00 falls inside the window that started yesterday and ends today.
        let t2 = Utc.with_ymd_and_hms(2026, 1, 2, 3, 0, 0).unwrap();
        let end2 = b.end_if_covers(t2).unwrap();
        assert_eq!(end2, Utc.with_ymd_and_hms(2026, 1, 2, 7, 0, 0).unwrap());

        // Outside the window entirely.
        let t3 = Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap();
        assert!(b.end_if_covers(t3).is_none());
    }

    #[test]
    fn interval_out_of_range_rejected() {
        let r = PulseRoutine {
            routine_id: RoutineId::new(),
            agent_id: AgentId::new("a"),
            name: "r".into(),
            interval_minutes: 4,
            offset_minutes: 0,
            blackouts: vec![],
            one_offs: vec![],
            enabled: true,
            max_consecutive_skips: 5,
            instructions: None,
            overrides: RoutineOverrides::default(),
            stats: RoutineStats::default(),
            color: None,
        };
        assert!(r.validate().is_err());
    }

    #[test]
    fn pulse_source_ordering_one_off_wins() {
        let mut sources = vec![PulseSource::Recurring, PulseSource::OneOff];
        sources.sort();
        assert_eq!(sources[0], PulseSource::OneOff);
    }
}
