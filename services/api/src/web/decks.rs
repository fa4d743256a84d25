//! services/api/src/web/decks.rs
//!
//! Handlers for flashcard decks: CRUD, the review scheduler endpoint, the
//! due-card query, and AI-assisted deck generation.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use study_tracker_core::domain::{Card, Deck, Difficulty};
use study_tracker_core::srs;

use crate::web::state::AppState;
use crate::web::{port_error_response, MessageResponse, SubjectRef};

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct CardInput {
    pub question: String,
    pub answer: String,
    /// "easy", "medium" (default) or "hard".
    pub difficulty: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateDeckRequest {
    pub subject_id: Uuid,
    pub deck_name: String,
    pub cards: Vec<CardInput>,
}

#[derive(Deserialize, ToSchema)]
pub struct RenameDeckRequest {
    pub deck_name: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewRequest {
    pub card_id: Uuid,
    /// One of "easy", "medium", "hard". Anything else is rejected before
    /// any state changes.
    pub difficulty: String,
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateDeckRequest {
    pub subject_id: Uuid,
    pub deck_name: String,
    /// The source material the cards are drawn from.
    pub content: String,
    pub number_of_cards: Option<u32>,
}

#[derive(Deserialize, IntoParams)]
pub struct ListDecksQuery {
    /// Only decks for this subject.
    pub subject: Option<Uuid>,
}

#[derive(Serialize, ToSchema)]
pub struct CardResponse {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub difficulty: String,
    pub last_reviewed: Option<DateTime<Utc>>,
    pub next_review: Option<DateTime<Utc>>,
    pub review_count: u32,
}

impl From<&Card> for CardResponse {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id,
            question: card.question.clone(),
            answer: card.answer.clone(),
            difficulty: card.difficulty.as_str().to_string(),
            last_reviewed: card.last_reviewed,
            next_review: card.next_review,
            review_count: card.review_count,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DeckResponse {
    pub id: Uuid,
    pub subject: Option<SubjectRef>,
    pub deck_name: String,
    pub cards: Vec<CardResponse>,
    pub created_at: DateTime<Utc>,
}

impl DeckResponse {
    fn new(deck: &Deck, subject: Option<SubjectRef>) -> Self {
        Self {
            id: deck.id,
            subject,
            deck_name: deck.deck_name.clone(),
            cards: deck.cards.iter().map(CardResponse::from).collect(),
            created_at: deck.created_at,
        }
    }
}

//=========================================================================================
// Helpers
//=========================================================================================

fn parse_card_inputs(inputs: Vec<CardInput>) -> Result<Vec<Card>, (StatusCode, String)> {
    inputs
        .into_iter()
        .map(|input| {
            let mut card = Card::new(input.question, input.answer);
            if let Some(label) = input.difficulty.as_deref() {
                card.difficulty = Difficulty::from_str(label)
                    .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
            }
            Ok(card)
        })
        .collect()
}

async fn subject_ref(state: &AppState, subject_id: Uuid) -> Option<SubjectRef> {
    state
        .store
        .get_subject_by_id(subject_id)
        .await
        .ok()
        .map(|s| SubjectRef::from(&s))
}

/// Loads a deck and enforces that it belongs to `user_id`.
async fn owned_deck(
    state: &AppState,
    deck_id: Uuid,
    user_id: Uuid,
) -> Result<Deck, (StatusCode, String)> {
    let deck = state
        .store
        .get_deck_by_id(deck_id)
        .await
        .map_err(port_error_response)?;
    if deck.user_id != user_id {
        return Err((StatusCode::UNAUTHORIZED, "Not authorized".to_string()));
    }
    Ok(deck)
}

//=========================================================================================
// Handlers
//=========================================================================================

/// List the caller's flashcard decks, newest first.
#[utoipa::path(
    get,
    path = "/flashcards",
    params(ListDecksQuery),
    responses(
        (status = 200, description = "The caller's decks", body = [DeckResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_decks_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(query): Query<ListDecksQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let decks = state
        .store
        .list_decks(user_id, query.subject)
        .await
        .map_err(port_error_response)?;

    let mut responses = Vec::with_capacity(decks.len());
    for deck in &decks {
        let subject = subject_ref(&state, deck.subject_id).await;
        responses.push(DeckResponse::new(deck, subject));
    }
    Ok(Json(responses))
}

/// Create a flashcard deck with its cards.
#[utoipa::path(
    post,
    path = "/flashcards",
    request_body = CreateDeckRequest,
    responses(
        (status = 201, description = "Deck created", body = DeckResponse),
        (status = 400, description = "Missing deck name or bad difficulty label"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_deck_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<CreateDeckRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let deck_name = req.deck_name.trim();
    if deck_name.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please provide a deck name".to_string(),
        ));
    }
    let cards = parse_card_inputs(req.cards)?;

    let deck = state
        .store
        .create_deck(user_id, req.subject_id, deck_name, cards)
        .await
        .map_err(port_error_response)?;

    let subject = subject_ref(&state, deck.subject_id).await;
    Ok((StatusCode::CREATED, Json(DeckResponse::new(&deck, subject))))
}

/// Rename one of the caller's decks.
#[utoipa::path(
    put,
    path = "/flashcards/{id}",
    params(("id" = Uuid, Path, description = "The deck to rename")),
    request_body = RenameDeckRequest,
    responses(
        (status = 200, description = "Deck renamed", body = DeckResponse),
        (status = 401, description = "Deck belongs to another user"),
        (status = 404, description = "Deck not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn rename_deck_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<RenameDeckRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let deck_name = req.deck_name.trim();
    if deck_name.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Please provide a deck name".to_string(),
        ));
    }

    let mut deck = owned_deck(&state, id, user_id).await?;
    state
        .store
        .rename_deck(id, deck_name)
        .await
        .map_err(port_error_response)?;
    deck.deck_name = deck_name.to_string();

    let subject = subject_ref(&state, deck.subject_id).await;
    Ok(Json(DeckResponse::new(&deck, subject)))
}

/// Delete one of the caller's decks.
#[utoipa::path(
    delete,
    path = "/flashcards/{id}",
    params(("id" = Uuid, Path, description = "The deck to delete")),
    responses(
        (status = 200, description = "Deck removed", body = MessageResponse),
        (status = 401, description = "Deck belongs to another user"),
        (status = 404, description = "Deck not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_deck_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    owned_deck(&state, id, user_id).await?;
    state
        .store
        .delete_deck(id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(MessageResponse::new("Flashcard deck removed")))
}

/// Record a review of one card in a deck.
///
/// Applies the interval policy: the card's next review lands 7, 3, or 1 days
/// out for easy, medium, or hard. Each call advances the schedule again.
#[utoipa::path(
    put,
    path = "/flashcards/{id}/review",
    params(("id" = Uuid, Path, description = "The deck containing the card")),
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review recorded", body = DeckResponse),
        (status = 400, description = "Unknown difficulty label"),
        (status = 401, description = "Deck belongs to another user"),
        (status = 404, description = "Deck or card not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn review_card_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // Validate the label before touching any state.
    let difficulty = Difficulty::from_str(&req.difficulty)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let mut deck = owned_deck(&state, id, user_id).await?;
    let card = deck
        .cards
        .iter_mut()
        .find(|c| c.id == req.card_id)
        .ok_or((StatusCode::NOT_FOUND, "Card not found".to_string()))?;

    srs::record_review(card, difficulty, Utc::now());
    state
        .store
        .update_card(id, card)
        .await
        .map_err(port_error_response)?;

    let subject = subject_ref(&state, deck.subject_id).await;
    Ok(Json(DeckResponse::new(&deck, subject)))
}

/// The cards in a deck that are due for review right now.
#[utoipa::path(
    get,
    path = "/flashcards/{id}/due",
    params(("id" = Uuid, Path, description = "The deck to query")),
    responses(
        (status = 200, description = "Cards due for review", body = [CardResponse]),
        (status = 401, description = "Deck belongs to another user"),
        (status = 404, description = "Deck not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn due_cards_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let deck = owned_deck(&state, id, user_id).await?;
    let due: Vec<CardResponse> = srs::cards_due(&deck, Utc::now())
        .into_iter()
        .map(CardResponse::from)
        .collect();
    Ok(Json(due))
}

/// Generate a flashcard deck from source material with the LLM.
///
/// The generated drafts are already validated by the adapter; from here on
/// they are ordinary deck-create input.
#[utoipa::path(
    post,
    path = "/ai/flashcards",
    request_body = GenerateDeckRequest,
    responses(
        (status = 201, description = "Deck generated and created", body = DeckResponse),
        (status = 400, description = "Missing content or deck name"),
        (status = 404, description = "Subject not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn generate_deck_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<GenerateDeckRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let deck_name = req.deck_name.trim();
    if req.content.trim().is_empty() || deck_name.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Content and deck name are required".to_string(),
        ));
    }

    let subject = state
        .store
        .get_subject_by_id(req.subject_id)
        .await
        .map_err(port_error_response)?;
    if subject.user_id != user_id {
        return Err((StatusCode::UNAUTHORIZED, "Not authorized".to_string()));
    }

    let drafts = state
        .cards_adapter
        .generate_cards(
            &req.content,
            &subject.name,
            req.number_of_cards.unwrap_or(10),
        )
        .await
        .map_err(port_error_response)?;

    let cards: Vec<Card> = drafts
        .into_iter()
        .map(|draft| {
            let mut card = Card::new(draft.question, draft.answer);
            card.difficulty = draft.difficulty;
            card
        })
        .collect();

    let deck = state
        .store
        .create_deck(
            user_id,
            subject.id,
            &format!("{} - AI Generated", deck_name),
            cards,
        )
        .await
        .map_err(port_error_response)?;

    let subject = Some(SubjectRef::from(&subject));
    Ok((StatusCode::CREATED, Json(DeckResponse::new(&deck, subject))))
}
