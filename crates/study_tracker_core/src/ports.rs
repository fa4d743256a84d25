//! crates/study_tracker_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like databases
//! or LLM providers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Card, Deck, Difficulty, SessionFilter, StudySession, Subject, User, UserCredentials, UserStats,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
///
/// `Validation` is raised before any mutation and is fully recoverable by
/// correcting the input; `NotFound` and `Unauthorized` are surfaced as-is
/// with no retry.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Not authorized")]
    Unauthorized,
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait StudyStore: Send + Sync {
    // --- Auth Methods ---
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- User Study Aggregate ---
    async fn get_user_stats(&self, user_id: Uuid) -> PortResult<UserStats>;

    /// Overwrites the user's study counters with `stats`. Last write wins;
    /// there is no optimistic-concurrency token (see DESIGN.md).
    async fn put_user_stats(&self, stats: &UserStats) -> PortResult<()>;

    // --- Subject Management ---
    async fn list_subjects(&self, user_id: Uuid) -> PortResult<Vec<Subject>>;

    async fn get_subject_by_id(&self, subject_id: Uuid) -> PortResult<Subject>;

    async fn create_subject(
        &self,
        user_id: Uuid,
        name: &str,
        color: &str,
        description: Option<&str>,
    ) -> PortResult<Subject>;

    async fn update_subject(
        &self,
        subject_id: Uuid,
        name: &str,
        color: &str,
        description: Option<&str>,
    ) -> PortResult<Subject>;

    async fn delete_subject(&self, subject_id: Uuid) -> PortResult<()>;

    /// Best-effort bump of the subject's denormalized study-time counter.
    /// `NotFound` when the subject does not resolve.
    async fn add_subject_study_time(&self, subject_id: Uuid, minutes: i32) -> PortResult<()>;

    // --- Study Session Management ---
    async fn create_session(&self, session: &StudySession) -> PortResult<()>;

    async fn get_session_by_id(&self, session_id: Uuid) -> PortResult<StudySession>;

    /// The user's sessions matching `filter`, newest first.
    async fn find_sessions(
        &self,
        user_id: Uuid,
        filter: &SessionFilter,
    ) -> PortResult<Vec<StudySession>>;

    async fn delete_session(&self, session_id: Uuid) -> PortResult<()>;

    // --- Flashcard Deck Management ---
    async fn list_decks(&self, user_id: Uuid, subject_id: Option<Uuid>) -> PortResult<Vec<Deck>>;

    async fn get_deck_by_id(&self, deck_id: Uuid) -> PortResult<Deck>;

    async fn create_deck(
        &self,
        user_id: Uuid,
        subject_id: Uuid,
        deck_name: &str,
        cards: Vec<Card>,
    ) -> PortResult<Deck>;

    async fn rename_deck(&self, deck_id: Uuid, deck_name: &str) -> PortResult<()>;

    async fn delete_deck(&self, deck_id: Uuid) -> PortResult<()>;

    /// Persists the review fields of one card inside `deck_id`.
    async fn update_card(&self, deck_id: Uuid, card: &Card) -> PortResult<()>;
}

/// An already-validated flashcard draft produced by the generation service.
/// The engine treats these as ordinary deck-create input.
#[derive(Debug, Clone)]
pub struct CardDraft {
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
}

#[async_trait]
pub trait CardGenerationService: Send + Sync {
    /// Generates flashcard drafts for the given source material.
    async fn generate_cards(
        &self,
        content: &str,
        subject_name: &str,
        number_of_cards: u32,
    ) -> PortResult<Vec<CardDraft>>;
}
