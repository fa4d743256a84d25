//! services/api/src/web/subjects.rs
//!
//! CRUD handlers for study subjects.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use study_tracker_core::domain::Subject;

use crate::web::state::AppState;
use crate::web::{port_error_response, MessageResponse};

/// The color a new subject gets when none is supplied.
const DEFAULT_COLOR: &str = "#3B82F6";

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SubjectRequest {
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SubjectResponse {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
    /// Denormalized minutes counter, bumped on every logged session.
    pub total_study_time: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Subject> for SubjectResponse {
    fn from(subject: Subject) -> Self {
        Self {
            id: subject.id,
            name: subject.name,
            color: subject.color,
            description: subject.description,
            total_study_time: subject.total_study_time,
            created_at: subject.created_at,
        }
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the caller's subjects, newest first.
#[utoipa::path(
    get,
    path = "/subjects",
    responses(
        (status = 200, description = "The caller's subjects", body = [SubjectResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_subjects_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let subjects = state
        .store
        .list_subjects(user_id)
        .await
        .map_err(port_error_response)?;

    let responses: Vec<SubjectResponse> =
        subjects.into_iter().map(SubjectResponse::from).collect();
    Ok(Json(responses))
}

/// Create a new subject.
#[utoipa::path(
    post,
    path = "/subjects",
    request_body = SubjectRequest,
    responses(
        (status = 201, description = "Subject created", body = SubjectResponse),
        (status = 400, description = "Missing subject name"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_subject_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<SubjectRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please provide a subject name".to_string(),
        ));
    }

    let subject = state
        .store
        .create_subject(
            user_id,
            name,
            req.color.as_deref().unwrap_or(DEFAULT_COLOR),
            req.description.as_deref(),
        )
        .await
        .map_err(port_error_response)?;

    Ok((StatusCode::CREATED, Json(SubjectResponse::from(subject))))
}

/// Update one of the caller's subjects.
#[utoipa::path(
    put,
    path = "/subjects/{id}",
    params(("id" = Uuid, Path, description = "The subject to update")),
    request_body = SubjectRequest,
    responses(
        (status = 200, description = "Subject updated", body = SubjectResponse),
        (status = 400, description = "Missing subject name"),
        (status = 401, description = "Subject belongs to another user"),
        (status = 404, description = "Subject not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_subject_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubjectRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please provide a subject name".to_string(),
        ));
    }

    let existing = state
        .store
        .get_subject_by_id(id)
        .await
        .map_err(port_error_response)?;
    if existing.user_id != user_id {
        return Err((StatusCode::UNAUTHORIZED, "Not authorized".to_string()));
    }

    let updated = state
        .store
        .update_subject(
            id,
            name,
            req.color.as_deref().unwrap_or(&existing.color),
            req.description.as_deref().or(existing.description.as_deref()),
        )
        .await
        .map_err(port_error_response)?;

    Ok(Json(SubjectResponse::from(updated)))
}

/// Delete one of the caller's subjects.
#[utoipa::path(
    delete,
    path = "/subjects/{id}",
    params(("id" = Uuid, Path, description = "The subject to delete")),
    responses(
        (status = 200, description = "Subject removed", body = MessageResponse),
        (status = 401, description = "Subject belongs to another user"),
        (status = 404, description = "Subject not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_subject_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let subject = state
        .store
        .get_subject_by_id(id)
        .await
        .map_err(port_error_response)?;
    if subject.user_id != user_id {
        return Err((StatusCode::UNAUTHORIZED, "Not authorized".to_string()));
    }

    state
        .store
        .delete_subject(id)
        .await
        .map_err(port_error_response)?;

    Ok(Json(MessageResponse::new("Subject removed")))
}
