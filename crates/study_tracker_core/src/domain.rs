//! crates/study_tracker_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::str::FromStr;
use uuid::Uuid;

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: Option<String>,
}

// Only used internally for login/signup - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// The per-user study counters maintained by the streak tracker.
///
/// This is a denormalized aggregate: `total_study_time` is never recomputed
/// from the session history, and deleting a session does not roll it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    pub user_id: Uuid,
    /// Lifetime study time in minutes. Monotonically non-decreasing.
    pub total_study_time: i64,
    /// Consecutive calendar days with at least one logged session.
    /// Zero exactly when no session has ever been logged.
    pub study_streak: u32,
    /// Wall-clock instant of the most recent `log_session` call.
    pub last_study_date: Option<DateTime<Utc>>,
}

impl UserStats {
    /// The zero state for a user that has never logged a session.
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            total_study_time: 0,
            study_streak: 0,
            last_study_date: None,
        }
    }
}

/// A study subject. Carries its own denormalized study-time counter,
/// deliberately independent of the user-level total.
#[derive(Debug, Clone)]
pub struct Subject {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    pub total_study_time: i64,
    pub created_at: DateTime<Utc>,
}

/// The kind of a study session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionKind {
    #[default]
    Pomodoro,
    Regular,
}

impl SessionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKind::Pomodoro => "pomodoro",
            SessionKind::Regular => "regular",
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("'{0}' is not a valid session kind (expected 'pomodoro' or 'regular')")]
pub struct InvalidSessionKind(pub String);

impl FromStr for SessionKind {
    type Err = InvalidSessionKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pomodoro" => Ok(SessionKind::Pomodoro),
            "regular" => Ok(SessionKind::Regular),
            other => Err(InvalidSessionKind(other.to_string())),
        }
    }
}

/// A logged study session. Immutable once created; its owner may delete it,
/// but deletion never retroactively adjusts the user or subject aggregates.
#[derive(Debug, Clone)]
pub struct StudySession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject_id: Option<Uuid>,
    /// Duration in minutes, strictly positive.
    pub duration: i32,
    pub kind: SessionKind,
    pub notes: Option<String>,
    /// The instant the session covers. Defaults to creation time but may be
    /// backdated by the caller; streak computation ignores it.
    pub date: DateTime<Utc>,
    pub completed: bool,
}

/// Filter for querying a user's session history.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub subject_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

/// A flashcard difficulty rating. The input domain of the interval policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("'{0}' is not a valid difficulty (expected 'easy', 'medium' or 'hard')")]
pub struct InvalidDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = InvalidDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(InvalidDifficulty(other.to_string())),
        }
    }
}

/// A single flashcard embedded in a deck. The review fields are mutated
/// exclusively by the review scheduler and are never decremented.
#[derive(Debug, Clone)]
pub struct Card {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review: Option<DateTime<Utc>>,
    pub review_count: u32,
}

impl Card {
    /// A fresh, never-reviewed card with the default difficulty.
    pub fn new(question: String, answer: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            question,
            answer,
            difficulty: Difficulty::default(),
            last_reviewed: None,
            next_review: None,
            review_count: 0,
        }
    }
}

/// A named deck of flashcards belonging to one user and one subject.
#[derive(Debug, Clone)]
pub struct Deck {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject_id: Uuid,
    pub deck_name: String,
    pub cards: Vec<Card>,
    pub created_at: DateTime<Utc>,
}
