//! services/api/src/web/sessions.rs
//!
//! Handlers for logging, listing, and deleting study sessions, and for the
//! summary statistics report. Session logging is where the streak tracker
//! runs; the stats endpoint is where the aggregator runs.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use study_tracker_core::domain::{SessionFilter, SessionKind, StudySession, Subject};
use study_tracker_core::{stats, streak};

use crate::web::state::AppState;
use crate::web::{port_error_response, MessageResponse, SubjectRef};

/// The trailing-window length of the daily-activity histogram.
const STATS_WINDOW_DAYS: u32 = 7;

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LogSessionRequest {
    pub subject_id: Option<Uuid>,
    /// Duration in minutes. Must be strictly positive.
    pub duration: i32,
    /// "pomodoro" (default) or "regular".
    pub kind: Option<String>,
    pub notes: Option<String>,
    /// Defaults to the time of the call. May be backdated; the streak
    /// computation always uses the wall clock instead.
    pub date: Option<DateTime<Utc>>,
}

#[derive(Deserialize, IntoParams)]
pub struct ListSessionsQuery {
    /// Only sessions for this subject.
    pub subject: Option<Uuid>,
    /// Only sessions at or after this instant.
    pub start_date: Option<DateTime<Utc>>,
    /// Only sessions at or before this instant.
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub subject: Option<SubjectRef>,
    pub duration: i32,
    pub kind: String,
    pub notes: Option<String>,
    pub date: DateTime<Utc>,
    pub completed: bool,
}

impl SessionResponse {
    fn new(session: StudySession, subject: Option<&Subject>) -> Self {
        Self {
            id: session.id,
            subject: subject.map(SubjectRef::from),
            duration: session.duration,
            kind: session.kind.as_str().to_string(),
            notes: session.notes,
            date: session.date,
            completed: session.completed,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SubjectTotalsResponse {
    /// Absent for sessions logged without a subject.
    pub subject_id: Option<Uuid>,
    pub total_duration: i64,
    pub count: i64,
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub total_sessions: usize,
    /// The user aggregate's counter. Deleted sessions leave it unchanged.
    pub total_time: i64,
    pub study_streak: u32,
    pub sessions_by_subject: Vec<SubjectTotalsResponse>,
    /// Minutes studied per calendar day over the trailing week, every day
    /// present even at zero.
    pub daily_activity: BTreeMap<NaiveDate, i64>,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Log a completed study session.
///
/// Creates the session record, then folds it into the user's study counters
/// (total time, streak, last-study date) and bumps the subject's counter when
/// a subject is given. A subject that fails to resolve is logged and ignored;
/// the session still stands.
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = LogSessionRequest,
    responses(
        (status = 201, description = "Session logged", body = SessionResponse),
        (status = 400, description = "Invalid duration or session kind"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn log_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<LogSessionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.duration <= 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Duration must be a positive number of minutes".to_string(),
        ));
    }
    let kind = match req.kind.as_deref() {
        Some(label) => SessionKind::from_str(label)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
        None => SessionKind::default(),
    };

    let now = Utc::now();
    let session = StudySession {
        id: Uuid::new_v4(),
        user_id,
        subject_id: req.subject_id,
        duration: req.duration,
        kind,
        notes: req.notes,
        date: req.date.unwrap_or(now),
        completed: true,
    };
    state
        .store
        .create_session(&session)
        .await
        .map_err(port_error_response)?;

    // One read-modify-write of the user aggregate. A failure here aborts the
    // response even though the session record already exists.
    let prev = state
        .store
        .get_user_stats(user_id)
        .await
        .map_err(port_error_response)?;
    let next = streak::apply_study(&prev, session.duration, now);
    state
        .store
        .put_user_stats(&next)
        .await
        .map_err(port_error_response)?;

    // Best-effort secondary update: the subject counter. Failure is logged
    // and swallowed, and the session is still reported as created.
    if let Some(subject_id) = session.subject_id {
        if let Err(e) = state
            .store
            .add_subject_study_time(subject_id, session.duration)
            .await
        {
            warn!(
                "Failed to update study time for subject {}: {:?}",
                subject_id, e
            );
        }
    }

    let subject = match session.subject_id {
        Some(id) => state.store.get_subject_by_id(id).await.ok(),
        None => None,
    };

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse::new(session, subject.as_ref())),
    ))
}

/// List the caller's study sessions, newest first.
#[utoipa::path(
    get,
    path = "/sessions",
    params(ListSessionsQuery),
    responses(
        (status = 200, description = "Sessions matching the filter", body = [SessionResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let filter = SessionFilter {
        subject_id: query.subject,
        start_date: query.start_date,
        end_date: query.end_date,
    };
    let sessions = state
        .store
        .find_sessions(user_id, &filter)
        .await
        .map_err(port_error_response)?;

    let subjects: HashMap<Uuid, Subject> = state
        .store
        .list_subjects(user_id)
        .await
        .map_err(port_error_response)?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let responses: Vec<SessionResponse> = sessions
        .into_iter()
        .map(|session| {
            let subject = session.subject_id.and_then(|id| subjects.get(&id));
            SessionResponse::new(session, subject)
        })
        .collect();

    Ok(Json(responses))
}

/// Summary statistics: totals, streak, per-subject breakdown, and the
/// trailing seven-day activity histogram.
#[utoipa::path(
    get,
    path = "/sessions/stats",
    responses(
        (status = 200, description = "The study report", body = StatsResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let now = Utc::now();

    let sessions = state
        .store
        .find_sessions(user_id, &SessionFilter::default())
        .await
        .map_err(port_error_response)?;
    let user = state
        .store
        .get_user_stats(user_id)
        .await
        .map_err(port_error_response)?;

    // Re-query the history restricted to the trailing window, as the
    // histogram only buckets sessions that fall inside it anyway.
    let recent_filter = SessionFilter {
        start_date: Some(now - Duration::days(i64::from(STATS_WINDOW_DAYS))),
        ..Default::default()
    };
    let recent = state
        .store
        .find_sessions(user_id, &recent_filter)
        .await
        .map_err(port_error_response)?;

    let report = stats::compute_stats(&user, &sessions, &recent, now, STATS_WINDOW_DAYS);

    Ok(Json(StatsResponse {
        total_sessions: report.total_sessions,
        total_time: report.total_time,
        study_streak: report.study_streak,
        sessions_by_subject: report
            .sessions_by_subject
            .into_iter()
            .map(|t| SubjectTotalsResponse {
                subject_id: t.subject_id,
                total_duration: t.total_duration,
                count: t.count,
            })
            .collect(),
        daily_activity: report.daily_activity,
    }))
}

/// Delete one of the caller's sessions.
///
/// Never rolls back the user or subject aggregates: totals and the streak
/// keep the deleted session's contribution.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "The session to delete")),
    responses(
        (status = 200, description = "Session removed", body = MessageResponse),
        (status = 401, description = "Session belongs to another user"),
        (status = 404, description = "Session not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = state
        .store
        .get_session_by_id(id)
        .await
        .map_err(port_error_response)?;
    if session.user_id != user_id {
        return Err((StatusCode::UNAUTHORIZED, "Not authorized".to_string()));
    }

    state
        .store
        .delete_session(id)
        .await
        .map_err(port_error_response)?;

    Ok(Json(MessageResponse::new("Session removed")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use study_tracker_core::domain::{Card, Deck, User, UserCredentials, UserStats};
    use study_tracker_core::ports::{
        CardDraft, CardGenerationService, PortError, PortResult, StudyStore,
    };

    /// An in-memory store covering the operations the session handlers use.
    #[derive(Default)]
    struct MemStore {
        stats: Mutex<Option<UserStats>>,
        subjects: Mutex<Vec<Subject>>,
        sessions: Mutex<Vec<StudySession>>,
    }

    #[async_trait]
    impl StudyStore for MemStore {
        async fn create_user_with_email(&self, _: &str, _: &str) -> PortResult<User> {
            unimplemented!()
        }
        async fn get_user_by_email(&self, _: &str) -> PortResult<UserCredentials> {
            unimplemented!()
        }
        async fn create_auth_session(
            &self,
            _: &str,
            _: Uuid,
            _: DateTime<Utc>,
        ) -> PortResult<()> {
            unimplemented!()
        }
        async fn validate_auth_session(&self, _: &str) -> PortResult<Uuid> {
            unimplemented!()
        }
        async fn delete_auth_session(&self, _: &str) -> PortResult<()> {
            unimplemented!()
        }

        async fn get_user_stats(&self, user_id: Uuid) -> PortResult<UserStats> {
            Ok(self
                .stats
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| UserStats::empty(user_id)))
        }
        async fn put_user_stats(&self, stats: &UserStats) -> PortResult<()> {
            *self.stats.lock().unwrap() = Some(stats.clone());
            Ok(())
        }

        async fn list_subjects(&self, _: Uuid) -> PortResult<Vec<Subject>> {
            Ok(self.subjects.lock().unwrap().clone())
        }
        async fn get_subject_by_id(&self, subject_id: Uuid) -> PortResult<Subject> {
            self.subjects
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.id == subject_id)
                .cloned()
                .ok_or_else(|| PortError::NotFound("Subject not found".to_string()))
        }
        async fn create_subject(
            &self,
            _: Uuid,
            _: &str,
            _: &str,
            _: Option<&str>,
        ) -> PortResult<Subject> {
            unimplemented!()
        }
        async fn update_subject(
            &self,
            _: Uuid,
            _: &str,
            _: &str,
            _: Option<&str>,
        ) -> PortResult<Subject> {
            unimplemented!()
        }
        async fn delete_subject(&self, _: Uuid) -> PortResult<()> {
            unimplemented!()
        }
        async fn add_subject_study_time(&self, subject_id: Uuid, minutes: i32) -> PortResult<()> {
            let mut subjects = self.subjects.lock().unwrap();
            match subjects.iter_mut().find(|s| s.id == subject_id) {
                Some(subject) => {
                    subject.total_study_time += i64::from(minutes);
                    Ok(())
                }
                None => Err(PortError::NotFound("Subject not found".to_string())),
            }
        }

        async fn create_session(&self, session: &StudySession) -> PortResult<()> {
            self.sessions.lock().unwrap().push(session.clone());
            Ok(())
        }
        async fn get_session_by_id(&self, session_id: Uuid) -> PortResult<StudySession> {
            self.sessions
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.id == session_id)
                .cloned()
                .ok_or_else(|| PortError::NotFound("Session not found".to_string()))
        }
        async fn find_sessions(
            &self,
            user_id: Uuid,
            filter: &SessionFilter,
        ) -> PortResult<Vec<StudySession>> {
            Ok(self
                .sessions
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.user_id == user_id)
                .filter(|s| filter.subject_id.map_or(true, |id| s.subject_id == Some(id)))
                .filter(|s| filter.start_date.map_or(true, |at| s.date >= at))
                .filter(|s| filter.end_date.map_or(true, |at| s.date <= at))
                .cloned()
                .collect())
        }
        async fn delete_session(&self, session_id: Uuid) -> PortResult<()> {
            self.sessions.lock().unwrap().retain(|s| s.id != session_id);
            Ok(())
        }

        async fn list_decks(&self, _: Uuid, _: Option<Uuid>) -> PortResult<Vec<Deck>> {
            unimplemented!()
        }
        async fn get_deck_by_id(&self, _: Uuid) -> PortResult<Deck> {
            unimplemented!()
        }
        async fn create_deck(
            &self,
            _: Uuid,
            _: Uuid,
            _: &str,
            _: Vec<Card>,
        ) -> PortResult<Deck> {
            unimplemented!()
        }
        async fn rename_deck(&self, _: Uuid, _: &str) -> PortResult<()> {
            unimplemented!()
        }
        async fn delete_deck(&self, _: Uuid) -> PortResult<()> {
            unimplemented!()
        }
        async fn update_card(&self, _: Uuid, _: &Card) -> PortResult<()> {
            unimplemented!()
        }
    }

    struct NoCards;

    #[async_trait]
    impl CardGenerationService for NoCards {
        async fn generate_cards(&self, _: &str, _: &str, _: u32) -> PortResult<Vec<CardDraft>> {
            unimplemented!()
        }
    }

    fn app_state(store: Arc<MemStore>) -> Arc<AppState> {
        let config = Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            database_url: String::new(),
            log_level: tracing::Level::INFO,
            cors_origin: "http://localhost:5173".to_string(),
            openai_api_key: None,
            card_model: "gpt-4o-mini".to_string(),
        };
        Arc::new(AppState {
            store,
            config: Arc::new(config),
            cards_adapter: Arc::new(NoCards),
        })
    }

    fn request(subject_id: Option<Uuid>, duration: i32) -> LogSessionRequest {
        LogSessionRequest {
            subject_id,
            duration,
            kind: None,
            notes: None,
            date: None,
        }
    }

    #[tokio::test]
    async fn logging_a_session_updates_the_user_aggregate() {
        let store = Arc::new(MemStore::default());
        let state = app_state(store.clone());
        let user_id = Uuid::new_v4();

        let result = log_session_handler(
            State(state),
            Extension(user_id),
            Json(request(None, 30)),
        )
        .await;
        let response = result.unwrap().into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let stats = store.stats.lock().unwrap().clone().unwrap();
        assert_eq!(stats.total_study_time, 30);
        assert_eq!(stats.study_streak, 1);
        assert!(stats.last_study_date.is_some());
    }

    #[tokio::test]
    async fn second_session_same_day_keeps_streak_at_one() {
        let store = Arc::new(MemStore::default());
        let state = app_state(store.clone());
        let user_id = Uuid::new_v4();

        for duration in [25, 35] {
            log_session_handler(
                State(state.clone()),
                Extension(user_id),
                Json(request(None, duration)),
            )
            .await
            .map(|r| r.into_response())
            .unwrap();
        }

        let stats = store.stats.lock().unwrap().clone().unwrap();
        assert_eq!(stats.study_streak, 1);
        assert_eq!(stats.total_study_time, 60);
    }

    #[tokio::test]
    async fn non_positive_duration_is_rejected_before_any_write() {
        let store = Arc::new(MemStore::default());
        let state = app_state(store.clone());

        let result = log_session_handler(
            State(state),
            Extension(Uuid::new_v4()),
            Json(request(None, 0)),
        )
        .await;
        assert_eq!(result.err().unwrap().0, StatusCode::BAD_REQUEST);

        assert!(store.sessions.lock().unwrap().is_empty());
        assert!(store.stats.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn unresolvable_subject_is_swallowed() {
        // The subject does not exist, yet the session and the user-aggregate
        // update both stand and the call reports success.
        let store = Arc::new(MemStore::default());
        let state = app_state(store.clone());

        let result = log_session_handler(
            State(state),
            Extension(Uuid::new_v4()),
            Json(request(Some(Uuid::new_v4()), 45)),
        )
        .await;
        let response = result.unwrap().into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        assert_eq!(store.sessions.lock().unwrap().len(), 1);
        let stats = store.stats.lock().unwrap().clone().unwrap();
        assert_eq!(stats.total_study_time, 45);
    }

    #[tokio::test]
    async fn resolvable_subject_counter_is_bumped() {
        let store = Arc::new(MemStore::default());
        let user_id = Uuid::new_v4();
        let subject_id = Uuid::new_v4();
        store.subjects.lock().unwrap().push(Subject {
            id: subject_id,
            user_id,
            name: "Mathematics".to_string(),
            color: "#3B82F6".to_string(),
            description: None,
            total_study_time: 0,
            created_at: Utc::now(),
        });
        let state = app_state(store.clone());

        log_session_handler(
            State(state),
            Extension(user_id),
            Json(request(Some(subject_id), 40)),
        )
        .await
        .map(|r| r.into_response())
        .unwrap();

        assert_eq!(store.subjects.lock().unwrap()[0].total_study_time, 40);
    }

    #[tokio::test]
    async fn deleting_a_session_leaves_the_aggregates_alone() {
        let store = Arc::new(MemStore::default());
        let state = app_state(store.clone());
        let user_id = Uuid::new_v4();

        log_session_handler(
            State(state.clone()),
            Extension(user_id),
            Json(request(None, 50)),
        )
        .await
        .map(|r| r.into_response())
        .unwrap();
        let session_id = store.sessions.lock().unwrap()[0].id;

        delete_session_handler(State(state), Extension(user_id), Path(session_id))
            .await
            .map(|r| r.into_response())
            .unwrap();

        assert!(store.sessions.lock().unwrap().is_empty());
        let stats = store.stats.lock().unwrap().clone().unwrap();
        assert_eq!(stats.total_study_time, 50);
        assert_eq!(stats.study_streak, 1);
    }

    #[tokio::test]
    async fn deleting_another_users_session_is_unauthorized() {
        let store = Arc::new(MemStore::default());
        let state = app_state(store.clone());
        let owner = Uuid::new_v4();

        log_session_handler(
            State(state.clone()),
            Extension(owner),
            Json(request(None, 20)),
        )
        .await
        .map(|r| r.into_response())
        .unwrap();
        let session_id = store.sessions.lock().unwrap()[0].id;

        let result =
            delete_session_handler(State(state), Extension(Uuid::new_v4()), Path(session_id))
                .await;
        assert_eq!(result.err().unwrap().0, StatusCode::UNAUTHORIZED);
        assert_eq!(store.sessions.lock().unwrap().len(), 1);
    }
}
