//! Pure next-fire-time computation (spec §4.1). No I/O, no locking — these
//! functions take their inputs by value and return a candidate instant, so
//! the engine can unit test the alignment and blackout math in isolation.

use chrono::{DateTime, Duration, Timelike, Utc};

use crate::types::Blackout;

/// Iteration cap for the blackout-adjustment loop. A pathological stack of
/// overlapping blackouts could otherwise push the candidate forward forever;
/// in practice a handful of windows never chain more than a few times.
const MAX_BLACKOUT_ITERATIONS: usize = 64;

/// `minuteOfHour(t) ≡ offsetMinutes (mod intervalMinutes mod 60)` — spec
/// §4.1's alignment rule reduces to matching the candidate minute against
/// this modulus.
pub fn minute_modulus(interval_minutes: u32) -> u32 {
    if interval_minutes % 60 == 0 {
        60
    } else {
        interval_minutes % 60
    }
}

/// Find the earliest minute-aligned instant at or after `lower_bound` such
/// that `minute_of_hour ≡ offset_minutes (mod minute_modulus)`.
///
/// `interval_minutes >= 60` only constrains minute-of-hour (spec §4.1); the
/// hour itself is unconstrained, so the scan only ever needs to step forward
/// minute-by-minute up to `minute_modulus` times.
pub fn next_recurring_fire(
    lower_bound: DateTime<Utc>,
    interval_minutes: u32,
    offset_minutes: u32,
) -> DateTime<Utc> {
    let modulus = minute_modulus(interval_minutes);
    let target = offset_minutes % modulus;

    let truncated = lower_bound
        .date_naive()
        .and_hms_opt(lower_bound.hour(), lower_bound.minute(), 0)
        .map(|n| n.and_utc())
        .unwrap_or(lower_bound);

    let mut candidate = if truncated < lower_bound {
        truncated + Duration::minutes(1)
    } else {
        truncated
    };

    for _ in 0..modulus {
        let minute_of_hour = candidate.minute() % modulus;
        if minute_of_hour == target {
            return candidate;
        }
        candidate += Duration::minutes(1);
    }
    // Unreachable in practice: modulus in [1, 60] always yields a match
    // within `modulus` steps. Fall back to the scan's final candidate.
    candidate
}

/// Push `candidate` past any blackout windows that cover it, re-checking
/// after each move in case the new instant lands in a different window.
pub fn apply_blackouts(mut candidate: DateTime<Utc>, blackouts: &[Blackout]) -> DateTime<Utc> {
    for _ in 0..MAX_BLACKOUT_ITERATIONS {
        let mut moved = false;
        for b in blackouts {
            if let Some(end) = b.end_if_covers(candidate) {
                candidate = end;
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
    candidate
}

/// Find the earliest pending one-off timestamp strictly before
/// `recurring_candidate`, pruning (dropping) any one-offs that have already
/// passed `now` along the way. Returns `(selected, retained)` where
/// `retained` is the one-off list with past entries removed.
pub fn select_one_off(
    now: DateTime<Utc>,
    recurring_candidate: DateTime<Utc>,
    one_offs: &[DateTime<Utc>],
) -> (Option<DateTime<Utc>>, Vec<DateTime<Utc>>) {
    let retained: Vec<DateTime<Utc>> = one_offs.iter().copied().filter(|t| *t >= now).collect();
    let selected = retained
        .iter()
        .copied()
        .filter(|t| *t < recurring_candidate)
        .min();
    (selected, retained)
}

/// Full next-fire computation for a single schedule: recurring alignment,
/// blackout adjustment, then one-off precedence in `[now, candidate)`.
pub fn next_fire(
    now: DateTime<Utc>,
    last_fire: Option<DateTime<Utc>>,
    interval_minutes: u32,
    offset_minutes: u32,
    blackouts: &[Blackout],
    one_offs: &[DateTime<Utc>],
) -> (DateTime<Utc>, bool, Vec<DateTime<Utc>>) {
    let lower_bound = match last_fire {
        Some(lf) => std::cmp::max(now, lf + Duration::minutes(interval_minutes as i64)),
        None => now,
    };
    let recurring = next_recurring_fire(lower_bound, interval_minutes, offset_minutes);
    let recurring = apply_blackouts(recurring, blackouts);

    let (one_off, retained) = select_one_off(now, recurring, one_offs);
    match one_off {
        Some(t) => (t, true, retained),
        None => (recurring, false, retained),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn modulus_for_sub_hour_interval() {
        assert_eq!(minute_modulus(15), 15);
        assert_eq!(minute_modulus(20), 20);
    }

    #[test]
    fn modulus_for_hour_multiples() {
        assert_eq!(minute_modulus(60), 60);
        assert_eq!(minute_modulus(120), 60);
    }

    #[test]
    fn next_recurring_fire_aligns_forward() {
        // interval=20, offset=5 -> minute_of_hour in {5, 25, 45}
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 7, 0).unwrap();
        let next = next_recurring_fire(now, 20, 5);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 1, 1, 10, 25, 0).unwrap());
    }

    #[test]
    fn next_recurring_fire_exact_match_stays() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 10, 25, 0).unwrap();
        let next = next_recurring_fire(now, 20, 5);
        assert_eq!(next, now);
    }

    #[test]
    fn blackout_pushes_candidate_past_window() {
        let candidate = Utc.with_ymd_and_hms(2026, 1, 1, 9, 30, 0).unwrap();
        let blackouts = vec![Blackout::Recurring {
            start_time: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        }];
        let adjusted = apply_blackouts(candidate, &blackouts);
        assert_eq!(adjusted, Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn one_off_precedes_recurring_when_earlier() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let recurring_candidate = Utc.with_ymd_and_hms(2026, 1, 1, 11, 0, 0).unwrap();
        let one_offs = vec![Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap()];
        let (selected, retained) = select_one_off(now, recurring_candidate, &one_offs);
        assert_eq!(selected, Some(one_offs[0]));
        assert_eq!(retained.len(), 1);
    }

    #[test]
    fn past_one_offs_are_pruned() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let recurring_candidate = Utc.with_ymd_and_hms(2026, 1, 1, 11, 0, 0).unwrap();
        let one_offs = vec![Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap()];
        let (selected, retained) = select_one_off(now, recurring_candidate, &one_offs);
        assert_eq!(selected, None);
        assert!(retained.is_empty());
    }

    #[test]
    fn next_fire_picks_one_off_over_recurring() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let one_offs = vec![Utc.with_ymd_and_hms(2026, 1, 1, 9, 10, 0).unwrap()];
        let (when, is_one_off, _) = next_fire(now, None, 60, 0, &[], &one_offs);
        assert!(is_one_off);
        assert_eq!(when, one_offs[0]);
    }
}
