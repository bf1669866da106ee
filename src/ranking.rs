//! Reach-out ranking and staleness computation.
//!
//! Every surface that needs a "how urgent is it to reach out" signal — the
//! ranked list, the connection detail view, the orbit map — goes through the
//! functions in this module, so the different views can never disagree about
//! the same connection.
//!
//! The score blends an unbounded overdue-days term with the bounded 0–10
//! priority at equal weight, so staleness dominates priority for anything
//! more than ~10 days overdue. That is inherited behavior; tune the weights
//! only together with the stored priorities.

use chrono::{DateTime, Utc};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Weight applied to both the priority and the overdue-days term.
pub const SCORE_WEIGHT: f64 = 0.5;

/// Proximity tier for the orbit map, derived from days since last contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactBucket {
    Recent,
    Neutral,
    Stale,
}

/// Fractional days since the connection was last contacted, falling back to
/// its creation time when it has never been marked reached-out. `None` when
/// neither timestamp is available.
pub fn days_since_contact(
    last_contacted_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<f64> {
    let anchor = last_contacted_at.or(created_at)?;
    Some((now - anchor).num_milliseconds() as f64 / MILLIS_PER_DAY)
}

/// Sortable urgency score: higher = reach out sooner.
///
/// `score = 0.5 * priority + 0.5 * (days_since_contact - reminder_frequency_days)`
///
/// A non-positive reminder frequency or unresolvable timestamps zero out the
/// overdue term rather than erroring, so one bad record cannot poison a sort
/// over the whole list. The SQL `ORDER BY` in the connection store implements
/// the same arithmetic; `sqlite::tests` holds the two in sync.
pub fn ranking_score(
    priority: i64,
    last_contacted_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    reminder_frequency_days: i64,
    now: DateTime<Utc>,
) -> f64 {
    let overdue = match days_since_contact(last_contacted_at, created_at, now) {
        Some(days) if reminder_frequency_days > 0 => days - reminder_frequency_days as f64,
        _ => 0.0,
    };
    SCORE_WEIGHT * priority as f64 + SCORE_WEIGHT * overdue
}

/// Whole days until the next reach-out is due. Zero or negative means due or
/// overdue. `None` means the value cannot be computed for this connection
/// (no reminder cadence, or no usable timestamp).
pub fn days_until_reachout(
    last_contacted_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
    reminder_frequency_days: i64,
    now: DateTime<Utc>,
) -> Option<i64> {
    if reminder_frequency_days <= 0 {
        return None;
    }
    let days = days_since_contact(last_contacted_at, created_at, now)?;
    Some((reminder_frequency_days as f64 - days).round() as i64)
}

/// Bucket a connection into a proximity tier. Unknown staleness lands in the
/// middle ring.
pub fn bucket(days_since: Option<f64>, recent_days: i64, stale_days: i64) -> ContactBucket {
    match days_since {
        None => ContactBucket::Neutral,
        Some(days) if days <= recent_days as f64 => ContactBucket::Recent,
        Some(days) if days >= stale_days as f64 => ContactBucket::Stale,
        Some(_) => ContactBucket::Neutral,
    }
}

/// Human-facing label for a days-until-reach-out value.
pub fn reachout_label(days_until: Option<i64>) -> String {
    match days_until {
        None => "Reach out soon".to_string(),
        Some(d) if d <= 0 => "Reach out now".to_string(),
        Some(1) => "Reach out in 1 day".to_string(),
        Some(d) => format!("Reach out in {} days", d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(now: DateTime<Utc>, days_ago: i64) -> Option<DateTime<Utc>> {
        Some(now - Duration::days(days_ago))
    }

    fn now() -> DateTime<Utc> {
        "2026-08-07T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn score_is_deterministic() {
        let n = now();
        let a = ranking_score(7, at(n, 20), None, 14, n);
        let b = ranking_score(7, at(n, 20), None, 14, n);
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn score_monotone_in_priority() {
        let n = now();
        let mut prev = f64::NEG_INFINITY;
        for priority in 0..=10 {
            let s = ranking_score(priority, at(n, 30), None, 14, n);
            assert!(s >= prev, "priority {} lowered the score", priority);
            prev = s;
        }
    }

    #[test]
    fn score_monotone_in_elapsed_time() {
        let n = now();
        let mut prev = f64::NEG_INFINITY;
        for days_ago in 0..120 {
            let s = ranking_score(5, at(n, days_ago), None, 14, n);
            assert!(s >= prev, "elapsed day {} lowered the score", days_ago);
            prev = s;
        }
    }

    #[test]
    fn non_positive_reminder_zeroes_overdue_term() {
        let n = now();
        // 200 days stale, but the reminder is disabled: only priority counts.
        assert_eq!(ranking_score(8, at(n, 200), None, 0, n), 0.5 * 8.0);
        assert_eq!(ranking_score(8, at(n, 200), None, -3, n), 0.5 * 8.0);
    }

    #[test]
    fn missing_timestamps_zero_overdue_term() {
        let n = now();
        assert_eq!(ranking_score(4, None, None, 14, n), 2.0);
    }

    #[test]
    fn days_until_unknown_cases() {
        let n = now();
        assert_eq!(days_until_reachout(at(n, 5), None, 0, n), None);
        assert_eq!(days_until_reachout(at(n, 5), None, -1, n), None);
        assert_eq!(days_until_reachout(None, None, 30, n), None);
    }

    #[test]
    fn days_until_uses_created_at_fallback() {
        let n = now();
        // Never contacted, created 5 days ago, 30-day cadence: 25 days left.
        assert_eq!(days_until_reachout(None, at(n, 5), 30, n), Some(25));
    }

    #[test]
    fn due_exactly_now() {
        let n = now();
        // priority=7, cadence 14, last contact 14 days ago.
        let due = days_until_reachout(at(n, 14), None, 14, n);
        assert_eq!(due, Some(0));
        assert_eq!(reachout_label(due), "Reach out now");
        // daysSinceContact = 14 lands exactly on the recent boundary.
        let days = days_since_contact(at(n, 14), None, n);
        assert_eq!(bucket(days, 14, 45), ContactBucket::Recent);
    }

    #[test]
    fn high_priority_exactly_on_cadence() {
        let n = now();
        // priority=10, cadence 120, last contact 120 days ago.
        let score = ranking_score(10, at(n, 120), None, 120, n);
        assert_eq!(score, 5.0);
        let days = days_since_contact(at(n, 120), None, n);
        assert_eq!(bucket(days, 14, 45), ContactBucket::Stale);
    }

    #[test]
    fn fresh_connection_scores_negative() {
        let n = now();
        // priority=0, cadence 30, created 5 days ago, never contacted.
        let score = ranking_score(0, None, at(n, 5), 30, n);
        assert_eq!(score, -12.5);
    }

    #[test]
    fn fractional_days_not_truncated() {
        let n = now();
        // 36 hours ago is 1.5 days, not 1.
        let last = Some(n - Duration::hours(36));
        let days = days_since_contact(last, None, n).unwrap();
        assert!((days - 1.5).abs() < 1e-9);
    }

    #[test]
    fn bucket_boundaries() {
        assert_eq!(bucket(Some(0.0), 14, 45), ContactBucket::Recent);
        assert_eq!(bucket(Some(14.0), 14, 45), ContactBucket::Recent);
        assert_eq!(bucket(Some(14.5), 14, 45), ContactBucket::Neutral);
        assert_eq!(bucket(Some(44.9), 14, 45), ContactBucket::Neutral);
        assert_eq!(bucket(Some(45.0), 14, 45), ContactBucket::Stale);
        assert_eq!(bucket(None, 14, 45), ContactBucket::Neutral);
    }

    #[test]
    fn labels() {
        assert_eq!(reachout_label(None), "Reach out soon");
        assert_eq!(reachout_label(Some(-3)), "Reach out now");
        assert_eq!(reachout_label(Some(0)), "Reach out now");
        assert_eq!(reachout_label(Some(1)), "Reach out in 1 day");
        assert_eq!(reachout_label(Some(12)), "Reach out in 12 days");
    }
}
