//! services/api/src/web/mod.rs
//!
//! The HTTP surface: handlers grouped by resource, shared response types,
//! and the master definition for the OpenAPI specification.

pub mod auth;
pub mod decks;
pub mod middleware;
pub mod sessions;
pub mod state;
pub mod subjects;

pub use middleware::require_auth;

use axum::http::StatusCode;
use serde::Serialize;
use study_tracker_core::domain::Subject;
use study_tracker_core::ports::PortError;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
        subjects::list_subjects_handler,
        subjects::create_subject_handler,
        subjects::update_subject_handler,
        subjects::delete_subject_handler,
        sessions::log_session_handler,
        sessions::list_sessions_handler,
        sessions::stats_handler,
        sessions::delete_session_handler,
        decks::list_decks_handler,
        decks::create_deck_handler,
        decks::rename_deck_handler,
        decks::delete_deck_handler,
        decks::review_card_handler,
        decks::due_cards_handler,
        decks::generate_deck_handler,
    ),
    components(schemas(
        auth::SignupRequest,
        auth::LoginRequest,
        auth::AuthResponse,
        subjects::SubjectRequest,
        subjects::SubjectResponse,
        sessions::LogSessionRequest,
        sessions::SessionResponse,
        sessions::SubjectTotalsResponse,
        sessions::StatsResponse,
        decks::CardInput,
        decks::CreateDeckRequest,
        decks::RenameDeckRequest,
        decks::ReviewRequest,
        decks::GenerateDeckRequest,
        decks::CardResponse,
        decks::DeckResponse,
        SubjectRef,
        MessageResponse,
    )),
    tags(
        (name = "Study Tracker API", description = "Subjects, study sessions, statistics, and spaced-repetition flashcards.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Response Types
//=========================================================================================

/// A populated subject reference, embedded in session and deck responses.
#[derive(Serialize, ToSchema)]
pub struct SubjectRef {
    pub id: Uuid,
    pub name: String,
    pub color: String,
}

impl From<&Subject> for SubjectRef {
    fn from(subject: &Subject) -> Self {
        Self {
            id: subject.id,
            name: subject.name.clone(),
            color: subject.color.clone(),
        }
    }
}

/// A simple acknowledgement payload.
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Maps a port error to the HTTP response for it.
///
/// Unauthorized and NotFound stay distinct statuses; unexpected errors are
/// logged server-side and surfaced as an opaque 500.
pub(crate) fn port_error_response(err: PortError) -> (StatusCode, String) {
    match err {
        PortError::NotFound(what) => (StatusCode::NOT_FOUND, what),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Not authorized".to_string()),
        PortError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        PortError::Unexpected(msg) => {
            error!("Unexpected port error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            )
        }
    }
}
