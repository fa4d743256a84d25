//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `StudyStore` port from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;
use uuid::Uuid;

use study_tracker_core::domain::{
    Card, Deck, Difficulty, SessionFilter, SessionKind, StudySession, Subject, User,
    UserCredentials, UserStats,
};
use study_tracker_core::ports::{PortError, PortResult, StudyStore};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `StudyStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn load_cards(&self, deck_id: Uuid) -> PortResult<Vec<Card>> {
        let records: Vec<CardRecord> = sqlx::query_as(
            "SELECT id, deck_id, question, answer, difficulty, last_reviewed, next_review, \
             review_count FROM cards WHERE deck_id = $1 ORDER BY position ASC",
        )
        .bind(deck_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }
}

fn not_found_or(e: sqlx::Error, what: &str) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound(what.to_string()),
        _ => PortError::Unexpected(e.to_string()),
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    email: Option<String>,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            email: self.email,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    email: String,
    hashed_password: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            email: self.email,
            hashed_password: self.hashed_password,
        }
    }
}

#[derive(FromRow)]
struct UserStatsRecord {
    user_id: Uuid,
    total_study_time: i64,
    study_streak: i32,
    last_study_date: Option<DateTime<Utc>>,
}
impl UserStatsRecord {
    fn to_domain(self) -> UserStats {
        UserStats {
            user_id: self.user_id,
            total_study_time: self.total_study_time,
            study_streak: self.study_streak as u32,
            last_study_date: self.last_study_date,
        }
    }
}

#[derive(FromRow)]
struct SubjectRecord {
    id: Uuid,
    user_id: Uuid,
    name: String,
    color: String,
    description: Option<String>,
    total_study_time: i64,
    created_at: DateTime<Utc>,
}
impl SubjectRecord {
    fn to_domain(self) -> Subject {
        Subject {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            color: self.color,
            description: self.description,
            total_study_time: self.total_study_time,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    user_id: Uuid,
    subject_id: Option<Uuid>,
    duration: i32,
    kind: String,
    notes: Option<String>,
    date: DateTime<Utc>,
    completed: bool,
}
impl SessionRecord {
    fn to_domain(self) -> PortResult<StudySession> {
        let kind = SessionKind::from_str(&self.kind)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(StudySession {
            id: self.id,
            user_id: self.user_id,
            subject_id: self.subject_id,
            duration: self.duration,
            kind,
            notes: self.notes,
            date: self.date,
            completed: self.completed,
        })
    }
}

#[derive(FromRow)]
struct DeckRecord {
    id: Uuid,
    user_id: Uuid,
    subject_id: Uuid,
    deck_name: String,
    created_at: DateTime<Utc>,
}
impl DeckRecord {
    fn to_domain(self, cards: Vec<Card>) -> Deck {
        Deck {
            id: self.id,
            user_id: self.user_id,
            subject_id: self.subject_id,
            deck_name: self.deck_name,
            cards,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CardRecord {
    id: Uuid,
    question: String,
    answer: String,
    difficulty: String,
    last_reviewed: Option<DateTime<Utc>>,
    next_review: Option<DateTime<Utc>>,
    review_count: i32,
}
impl CardRecord {
    fn to_domain(self) -> PortResult<Card> {
        let difficulty = Difficulty::from_str(&self.difficulty)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Card {
            id: self.id,
            question: self.question,
            answer: self.answer,
            difficulty,
            last_reviewed: self.last_reviewed,
            next_review: self.next_review,
            review_count: self.review_count as u32,
        })
    }
}

//=========================================================================================
// `StudyStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl StudyStore for DbAdapter {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User> {
        let record: UserRecord = sqlx::query_as(
            "INSERT INTO users (user_id, email, hashed_password) VALUES ($1, $2, $3) \
             RETURNING user_id, email",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .map_or(false, |d| d.is_unique_violation())
            {
                PortError::Validation(format!("Email {} is already registered", email))
            } else {
                PortError::Unexpected(e.to_string())
            }
        })?;

        Ok(record.to_domain())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let record: CredentialsRecord = sqlx::query_as(
            "SELECT user_id, email, hashed_password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, &format!("User with email {} not found", email)))?;

        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let row: (Uuid,) = sqlx::query_as(
            "SELECT user_id FROM auth_sessions WHERE id = $1 AND expires_at > now()",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => PortError::Unexpected(e.to_string()),
        })?;
        Ok(row.0)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn get_user_stats(&self, user_id: Uuid) -> PortResult<UserStats> {
        let record: UserStatsRecord = sqlx::query_as(
            "SELECT user_id, total_study_time, study_streak, last_study_date \
             FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, &format!("User {} not found", user_id)))?;

        Ok(record.to_domain())
    }

    async fn put_user_stats(&self, stats: &UserStats) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE users SET total_study_time = $2, study_streak = $3, last_study_date = $4 \
             WHERE user_id = $1",
        )
        .bind(stats.user_id)
        .bind(stats.total_study_time)
        .bind(stats.study_streak as i32)
        .bind(stats.last_study_date)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "User {} not found",
                stats.user_id
            )));
        }
        Ok(())
    }

    async fn list_subjects(&self, user_id: Uuid) -> PortResult<Vec<Subject>> {
        let records: Vec<SubjectRecord> = sqlx::query_as(
            "SELECT id, user_id, name, color, description, total_study_time, created_at \
             FROM subjects WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_subject_by_id(&self, subject_id: Uuid) -> PortResult<Subject> {
        let record: SubjectRecord = sqlx::query_as(
            "SELECT id, user_id, name, color, description, total_study_time, created_at \
             FROM subjects WHERE id = $1",
        )
        .bind(subject_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, &format!("Subject {} not found", subject_id)))?;

        Ok(record.to_domain())
    }

    async fn create_subject(
        &self,
        user_id: Uuid,
        name: &str,
        color: &str,
        description: Option<&str>,
    ) -> PortResult<Subject> {
        let record: SubjectRecord = sqlx::query_as(
            "INSERT INTO subjects (id, user_id, name, color, description) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, user_id, name, color, description, total_study_time, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(name)
        .bind(color)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.to_domain())
    }

    async fn update_subject(
        &self,
        subject_id: Uuid,
        name: &str,
        color: &str,
        description: Option<&str>,
    ) -> PortResult<Subject> {
        let record: SubjectRecord = sqlx::query_as(
            "UPDATE subjects SET name = $2, color = $3, description = $4 WHERE id = $1 \
             RETURNING id, user_id, name, color, description, total_study_time, created_at",
        )
        .bind(subject_id)
        .bind(name)
        .bind(color)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, &format!("Subject {} not found", subject_id)))?;

        Ok(record.to_domain())
    }

    async fn delete_subject(&self, subject_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM subjects WHERE id = $1")
            .bind(subject_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn add_subject_study_time(&self, subject_id: Uuid, minutes: i32) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE subjects SET total_study_time = total_study_time + $2 WHERE id = $1",
        )
        .bind(subject_id)
        .bind(i64::from(minutes))
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Subject {} not found",
                subject_id
            )));
        }
        Ok(())
    }

    async fn create_session(&self, session: &StudySession) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO study_sessions (id, user_id, subject_id, duration, kind, notes, date, \
             completed) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.subject_id)
        .bind(session.duration)
        .bind(session.kind.as_str())
        .bind(session.notes.as_deref())
        .bind(session.date)
        .bind(session.completed)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn get_session_by_id(&self, session_id: Uuid) -> PortResult<StudySession> {
        let record: SessionRecord = sqlx::query_as(
            "SELECT id, user_id, subject_id, duration, kind, notes, date, completed \
             FROM study_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, &format!("Session {} not found", session_id)))?;

        record.to_domain()
    }

    async fn find_sessions(
        &self,
        user_id: Uuid,
        filter: &SessionFilter,
    ) -> PortResult<Vec<StudySession>> {
        let records: Vec<SessionRecord> = sqlx::query_as(
            "SELECT id, user_id, subject_id, duration, kind, notes, date, completed \
             FROM study_sessions \
             WHERE user_id = $1 \
               AND ($2::uuid IS NULL OR subject_id = $2) \
               AND ($3::timestamptz IS NULL OR date >= $3) \
               AND ($4::timestamptz IS NULL OR date <= $4) \
             ORDER BY date DESC",
        )
        .bind(user_id)
        .bind(filter.subject_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn delete_session(&self, session_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM study_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn list_decks(&self, user_id: Uuid, subject_id: Option<Uuid>) -> PortResult<Vec<Deck>> {
        let records: Vec<DeckRecord> = sqlx::query_as(
            "SELECT id, user_id, subject_id, deck_name, created_at FROM decks \
             WHERE user_id = $1 AND ($2::uuid IS NULL OR subject_id = $2) \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut decks = Vec::with_capacity(records.len());
        for record in records {
            let cards = self.load_cards(record.id).await?;
            decks.push(record.to_domain(cards));
        }
        Ok(decks)
    }

    async fn get_deck_by_id(&self, deck_id: Uuid) -> PortResult<Deck> {
        let record: DeckRecord = sqlx::query_as(
            "SELECT id, user_id, subject_id, deck_name, created_at FROM decks WHERE id = $1",
        )
        .bind(deck_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| not_found_or(e, &format!("Flashcard deck {} not found", deck_id)))?;

        let cards = self.load_cards(record.id).await?;
        Ok(record.to_domain(cards))
    }

    async fn create_deck(
        &self,
        user_id: Uuid,
        subject_id: Uuid,
        deck_name: &str,
        cards: Vec<Card>,
    ) -> PortResult<Deck> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let record: DeckRecord = sqlx::query_as(
            "INSERT INTO decks (id, user_id, subject_id, deck_name) VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, subject_id, deck_name, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(subject_id)
        .bind(deck_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        for (position, card) in cards.iter().enumerate() {
            sqlx::query(
                "INSERT INTO cards (id, deck_id, position, question, answer, difficulty, \
                 last_reviewed, next_review, review_count) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(card.id)
            .bind(record.id)
            .bind(position as i32)
            .bind(&card.question)
            .bind(&card.answer)
            .bind(card.difficulty.as_str())
            .bind(card.last_reviewed)
            .bind(card.next_review)
            .bind(card.review_count as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.to_domain(cards))
    }

    async fn rename_deck(&self, deck_id: Uuid, deck_name: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE decks SET deck_name = $2 WHERE id = $1")
            .bind(deck_id)
            .bind(deck_name)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Flashcard deck {} not found",
                deck_id
            )));
        }
        Ok(())
    }

    async fn delete_deck(&self, deck_id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM decks WHERE id = $1")
            .bind(deck_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn update_card(&self, deck_id: Uuid, card: &Card) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE cards SET difficulty = $3, last_reviewed = $4, next_review = $5, \
             review_count = $6 WHERE id = $1 AND deck_id = $2",
        )
        .bind(card.id)
        .bind(deck_id)
        .bind(card.difficulty.as_str())
        .bind(card.last_reviewed)
        .bind(card.next_review)
        .bind(card.review_count as i32)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Card {} not found", card.id)));
        }
        Ok(())
    }

}
