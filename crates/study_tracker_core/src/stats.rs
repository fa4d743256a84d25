//! crates/study_tracker_core/src/stats.rs
//!
//! The stats aggregator: pure reductions over a user's session history plus
//! the tracked counters. Totals and the streak are read through from the
//! user aggregate, never recomputed, so deleted sessions leave them stale.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{StudySession, UserStats};

/// Per-subject totals over the full session history. Sessions without a
/// subject group under `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectTotals {
    pub subject_id: Option<Uuid>,
    pub total_duration: i64,
    pub count: i64,
}

/// The summary report returned to the caller.
#[derive(Debug, Clone)]
pub struct StudyStats {
    pub total_sessions: usize,
    pub total_time: i64,
    pub study_streak: u32,
    pub sessions_by_subject: Vec<SubjectTotals>,
    pub daily_activity: BTreeMap<NaiveDate, i64>,
}

/// Groups sessions by subject, summing durations and counting sessions.
/// Output is ordered by first appearance of each subject in `sessions`.
pub fn sessions_by_subject(sessions: &[StudySession]) -> Vec<SubjectTotals> {
    let mut totals: Vec<SubjectTotals> = Vec::new();
    for session in sessions {
        match totals
            .iter_mut()
            .find(|t| t.subject_id == session.subject_id)
        {
            Some(entry) => {
                entry.total_duration += i64::from(session.duration);
                entry.count += 1;
            }
            None => totals.push(SubjectTotals {
                subject_id: session.subject_id,
                total_duration: i64::from(session.duration),
                count: 1,
            }),
        }
    }
    totals
}

/// Buckets `recent` session durations into the trailing `window_days`
/// calendar days ending at `now` (inclusive of today, UTC).
///
/// Every day in the window gets a key, even at zero; sessions whose date
/// truncates outside the window are ignored rather than given extra keys.
pub fn daily_activity(
    recent: &[StudySession],
    now: DateTime<Utc>,
    window_days: u32,
) -> BTreeMap<NaiveDate, i64> {
    let today = now.date_naive();
    let mut activity: BTreeMap<NaiveDate, i64> = (0..window_days)
        .map(|i| (today - Days::new(u64::from(i)), 0))
        .collect();

    for session in recent {
        if let Some(minutes) = activity.get_mut(&session.date.date_naive()) {
            *minutes += i64::from(session.duration);
        }
    }
    activity
}

/// Assembles the full report from the session history and the tracked
/// aggregate. `recent` is the history re-queried for the trailing window.
pub fn compute_stats(
    user: &UserStats,
    sessions: &[StudySession],
    recent: &[StudySession],
    now: DateTime<Utc>,
    window_days: u32,
) -> StudyStats {
    StudyStats {
        total_sessions: sessions.len(),
        total_time: user.total_study_time,
        study_streak: user.study_streak,
        sessions_by_subject: sessions_by_subject(sessions),
        daily_activity: daily_activity(recent, now, window_days),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionKind;
    use chrono::{Duration, TimeZone};

    fn session(subject_id: Option<Uuid>, duration: i32, date: DateTime<Utc>) -> StudySession {
        StudySession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            subject_id,
            duration,
            kind: SessionKind::Pomodoro,
            notes: None,
            date,
            completed: true,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 18, 0, 0).unwrap()
    }

    #[test]
    fn window_always_has_exactly_window_days_keys() {
        let activity = daily_activity(&[], now(), 7);
        assert_eq!(activity.len(), 7);
        assert!(activity.values().all(|&v| v == 0));

        let today = now().date_naive();
        for i in 0..7 {
            assert!(activity.contains_key(&(today - Days::new(i))));
        }
    }

    #[test]
    fn sessions_bucket_by_calendar_day() {
        let sessions = vec![
            session(None, 30, now()),
            session(None, 15, now() - Duration::hours(3)),
            session(None, 45, now() - Duration::days(2)),
        ];
        let activity = daily_activity(&sessions, now(), 7);

        let today = now().date_naive();
        assert_eq!(activity[&today], 45);
        assert_eq!(activity[&(today - Days::new(2))], 45);
        assert_eq!(activity[&(today - Days::new(1))], 0);
    }

    #[test]
    fn sessions_outside_the_window_are_ignored() {
        let sessions = vec![session(None, 60, now() - Duration::days(10))];
        let activity = daily_activity(&sessions, now(), 7);
        assert_eq!(activity.len(), 7);
        assert!(activity.values().all(|&v| v == 0));
    }

    #[test]
    fn group_by_subject_sums_and_counts() {
        let math = Some(Uuid::new_v4());
        let physics = Some(Uuid::new_v4());
        let sessions = vec![
            session(math, 30, now()),
            session(physics, 20, now()),
            session(math, 45, now()),
            session(None, 10, now()),
        ];

        let totals = sessions_by_subject(&sessions);
        assert_eq!(totals.len(), 3);
        assert_eq!(
            totals[0],
            SubjectTotals {
                subject_id: math,
                total_duration: 75,
                count: 2
            }
        );
        assert_eq!(
            totals[2],
            SubjectTotals {
                subject_id: None,
                total_duration: 10,
                count: 1
            }
        );
    }

    #[test]
    fn totals_are_read_through_not_recomputed() {
        // The aggregate says 500 even though the surviving history sums to 30:
        // a session was deleted, and the report must keep the stale counter.
        let user = UserStats {
            user_id: Uuid::new_v4(),
            total_study_time: 500,
            study_streak: 4,
            last_study_date: Some(now()),
        };
        let sessions = vec![session(None, 30, now())];

        let report = compute_stats(&user, &sessions, &sessions, now(), 7);
        assert_eq!(report.total_time, 500);
        assert_eq!(report.study_streak, 4);
        assert_eq!(report.total_sessions, 1);
    }
}
