//! crates/study_tracker_core/src/srs.rs
//!
//! The spaced-repetition engine: the fixed interval policy and the review
//! scheduler that applies it to a single card.

use chrono::{DateTime, Duration, Utc};

use crate::domain::{Card, Deck, Difficulty};

/// The review interval for a difficulty rating.
///
/// This is a fixed three-bucket table, not an adaptive formula: the interval
/// depends only on the latest rating, never on the review history.
pub fn review_interval(difficulty: Difficulty) -> Duration {
    match difficulty {
        Difficulty::Easy => Duration::days(7),
        Difficulty::Medium => Duration::days(3),
        Difficulty::Hard => Duration::days(1),
    }
}

/// Records one review of `card` at `now`, advancing its schedule.
///
/// Atomic with respect to the single card: the caller persists the whole
/// card afterwards. Calling twice advances the schedule twice, so callers
/// must not retry blindly on ambiguous failure.
pub fn record_review(card: &mut Card, difficulty: Difficulty, now: DateTime<Utc>) {
    card.last_reviewed = Some(now);
    card.review_count += 1;
    card.difficulty = difficulty;
    card.next_review = Some(now + review_interval(difficulty));
}

/// The cards in `deck` that are due for review at `now`: either never
/// reviewed, or scheduled at or before `now`. A derived query, no state.
pub fn cards_due<'a>(deck: &'a Deck, now: DateTime<Utc>) -> Vec<&'a Card> {
    deck.cards
        .iter()
        .filter(|card| card.next_review.map_or(true, |at| at <= now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn card() -> Card {
        Card::new("What is ownership?".to_string(), "A set of rules".to_string())
    }

    fn deck_with(cards: Vec<Card>) -> Deck {
        Deck {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            deck_name: "Rust basics".to_string(),
            cards,
            created_at: Utc::now(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 14, 30, 0).unwrap()
    }

    #[test]
    fn interval_table_is_fixed() {
        assert_eq!(review_interval(Difficulty::Easy), Duration::days(7));
        assert_eq!(review_interval(Difficulty::Medium), Duration::days(3));
        assert_eq!(review_interval(Difficulty::Hard), Duration::days(1));
    }

    #[test]
    fn record_review_sets_all_fields() {
        let mut c = card();
        let now = t0();

        record_review(&mut c, Difficulty::Medium, now);

        assert_eq!(c.last_reviewed, Some(now));
        assert_eq!(c.next_review, Some(now + Duration::days(3)));
        assert_eq!(c.difficulty, Difficulty::Medium);
        assert_eq!(c.review_count, 1);
        assert!(c.next_review.unwrap() > c.last_reviewed.unwrap());
    }

    #[test]
    fn review_count_is_strictly_monotonic() {
        let mut c = card();
        let now = t0();
        for expected in 1..=5 {
            record_review(&mut c, Difficulty::Hard, now);
            assert_eq!(c.review_count, expected);
        }
    }

    #[test]
    fn second_review_overwrites_the_first() {
        // hard then easy at the same instant: the easy rating wins outright.
        let mut c = card();
        let now = t0();

        record_review(&mut c, Difficulty::Hard, now);
        record_review(&mut c, Difficulty::Easy, now);

        assert_eq!(c.difficulty, Difficulty::Easy);
        assert_eq!(c.next_review, Some(now + Duration::days(7)));
        assert_eq!(c.review_count, 2);
    }

    #[test]
    fn never_reviewed_cards_are_due() {
        let deck = deck_with(vec![card(), card()]);
        assert_eq!(cards_due(&deck, t0()).len(), 2);
    }

    #[test]
    fn scheduled_cards_become_due_at_next_review() {
        let mut reviewed = card();
        let now = t0();
        record_review(&mut reviewed, Difficulty::Hard, now);
        let deck = deck_with(vec![reviewed]);

        assert!(cards_due(&deck, now).is_empty());
        assert!(cards_due(&deck, now + Duration::hours(23)).is_empty());
        assert_eq!(cards_due(&deck, now + Duration::days(1)).len(), 1);
    }
}
