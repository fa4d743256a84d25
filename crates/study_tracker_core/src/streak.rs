//! crates/study_tracker_core/src/streak.rs
//!
//! The streak tracker: a pure transition function over the per-user study
//! counters. The caller reads the previous aggregate, applies the transition,
//! and writes the result back, so the storage layer stays free to wrap the
//! read-modify-write in whatever concurrency control it has.

use chrono::{DateTime, Utc};

use crate::domain::UserStats;

/// Folds one logged session into the user's study counters.
///
/// `now` is the wall-clock instant of the log call, never the session's
/// (possibly backdated) `date` field: backdated entries do not affect the
/// streak. Day arithmetic is done on UTC calendar days.
pub fn apply_study(prev: &UserStats, duration_minutes: i32, now: DateTime<Utc>) -> UserStats {
    let study_streak = match prev.last_study_date {
        // First session ever.
        None => 1,
        Some(last) => {
            let days_diff = (now.date_naive() - last.date_naive()).num_days();
            match days_diff {
                // Studied yesterday too: extend the run.
                1 => prev.study_streak + 1,
                // Missed at least one full day: restart.
                d if d > 1 => 1,
                // Same calendar day (or a clock that went backwards):
                // a second session today does not double-increment.
                _ => prev.study_streak,
            }
        }
    };

    UserStats {
        user_id: prev.user_id,
        total_study_time: prev.total_study_time + i64::from(duration_minutes),
        study_streak,
        last_study_date: Some(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn day(n: u32) -> DateTime<Utc> {
        // An arbitrary month where day numbers line up with calendar days.
        Utc.with_ymd_and_hms(2024, 5, n, 9, 0, 0).unwrap()
    }

    fn fresh() -> UserStats {
        UserStats::empty(Uuid::new_v4())
    }

    #[test]
    fn first_session_starts_the_streak() {
        let next = apply_study(&fresh(), 1, day(1));
        assert_eq!(next.study_streak, 1);
        assert_eq!(next.total_study_time, 1);
        assert_eq!(next.last_study_date, Some(day(1)));
    }

    #[test]
    fn second_session_same_day_leaves_streak_unchanged() {
        let a = apply_study(&fresh(), 25, day(3));
        let b = apply_study(&a, 25, day(3) + Duration::hours(6));
        assert_eq!(b.study_streak, 1);
        assert_eq!(b.total_study_time, 50);
    }

    #[test]
    fn consecutive_days_extend_gaps_reset() {
        // 30, 45, 20 minutes on day 1, day 2, day 4.
        let s1 = apply_study(&fresh(), 30, day(1));
        assert_eq!(s1.study_streak, 1);

        let s2 = apply_study(&s1, 45, day(2));
        assert_eq!(s2.study_streak, 2);

        let s3 = apply_study(&s2, 20, day(4));
        assert_eq!(s3.study_streak, 1);
        assert_eq!(s3.total_study_time, 95);
    }

    #[test]
    fn long_runs_keep_counting() {
        let mut stats = fresh();
        for d in 1..=10 {
            stats = apply_study(&stats, 15, day(d));
        }
        assert_eq!(stats.study_streak, 10);
        assert_eq!(stats.total_study_time, 150);
    }

    #[test]
    fn day_boundary_not_elapsed_time_decides() {
        // 23:50 then 00:10 the next day is still "consecutive days".
        let late = Utc.with_ymd_and_hms(2024, 5, 1, 23, 50, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 5, 2, 0, 10, 0).unwrap();
        let a = apply_study(&fresh(), 10, late);
        let b = apply_study(&a, 10, early);
        assert_eq!(b.study_streak, 2);
    }

    #[test]
    fn total_time_accumulates_exactly() {
        let a = apply_study(&fresh(), 30, day(1));
        let b = apply_study(&a, 45, day(1));
        assert_eq!(b.total_study_time, 75);
    }
}
