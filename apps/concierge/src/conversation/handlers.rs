//! Axum route handlers for the conversation API.
//!
//! Every mutating handler runs one transition under the session lock, hands
//! the resulting effects to the engine and returns the snapshot right away.
//! Clients poll `GET /api/v1/sessions/:id` for the outcome.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::machine::{ConversationMachine, ConversationState, Effect};
use crate::conversation::personas::{
    categories, find_category, find_persona, personas, DEFAULT_SECTION,
};
use crate::conversation::session::SessionHandle;
use crate::errors::AppError;
use crate::location::Coords;
use crate::models::persona::{CategoryOption, Persona};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    pub section_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub greeting: String,
    pub created_at: DateTime<Utc>,
    pub state: ConversationState,
}

#[derive(Debug, Deserialize)]
pub struct PersonaRequest {
    pub section_id: String,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubmitRequest {
    /// Falls back to the session draft when absent.
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub category_id: String,
}

#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub enabled: bool,
    pub coords: Option<Coords>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/personas
pub async fn handle_list_personas() -> Json<Vec<Persona>> {
    Json(personas())
}

/// GET /api/v1/categories
pub async fn handle_list_categories() -> Json<Vec<CategoryOption>> {
    Json(categories())
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    request: Option<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let section_id = request
        .and_then(|Json(r)| r.section_id)
        .unwrap_or_else(|| DEFAULT_SECTION.to_string());
    let persona = lookup_persona(&section_id)?;
    let greeting = persona.greeting.clone();

    let machine = ConversationMachine::new(persona, state.config.load_more_dedup);
    let (session_id, handle) = state.sessions.create(machine).await;
    let snapshot = handle.lock().await.state();

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            greeting,
            created_at: Utc::now(),
            state: snapshot,
        }),
    ))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationState>, AppError> {
    let handle = session(&state, id).await?;
    let snapshot = handle.lock().await.state();
    Ok(Json(snapshot))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// PUT /api/v1/sessions/:id/persona
///
/// Any persona change resets the conversation, even mid-request.
pub async fn handle_set_persona(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<PersonaRequest>,
) -> Result<Json<ConversationState>, AppError> {
    let persona = lookup_persona(&request.section_id)?;
    let handle = session(&state, id).await?;
    let mut machine = handle.lock().await;
    machine.set_persona(persona);
    Ok(Json(machine.state()))
}

/// PUT /api/v1/sessions/:id/draft
pub async fn handle_set_draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<DraftRequest>,
) -> Result<Json<ConversationState>, AppError> {
    let handle = session(&state, id).await?;
    let mut machine = handle.lock().await;
    machine.set_draft(&request.text);
    Ok(Json(machine.state()))
}

/// POST /api/v1/sessions/:id/submit
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<SubmitRequest>>,
) -> Result<Json<ConversationState>, AppError> {
    let text = request.and_then(|Json(r)| r.text);
    transition(&state, id, |machine| machine.submit_free_text(text.as_deref())).await
}

/// POST /api/v1/sessions/:id/suggestion
pub async fn handle_select_suggestion(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SuggestionRequest>,
) -> Result<Json<ConversationState>, AppError> {
    let handle = session(&state, id).await?;
    let (snapshot, effects) = {
        let mut machine = handle.lock().await;
        let suggestion = machine
            .persona()
            .suggestions
            .get(request.index)
            .cloned()
            .ok_or_else(|| {
                AppError::Validation(format!("No suggestion at index {}", request.index))
            })?;
        let effects = machine.select_suggestion(&suggestion);
        (machine.state(), effects)
    };
    state.engine.spawn(handle, effects);
    Ok(Json(snapshot))
}

/// POST /api/v1/sessions/:id/category
pub async fn handle_select_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<ConversationState>, AppError> {
    let category = find_category(&request.category_id).ok_or_else(|| {
        AppError::Validation(format!("Unknown category '{}'", request.category_id))
    })?;
    transition(&state, id, |machine| machine.select_category(&category)).await
}

/// POST /api/v1/sessions/:id/load-more
///
/// A no-op (current snapshot returned) when nothing can be loaded.
pub async fn handle_load_more(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationState>, AppError> {
    transition(&state, id, |machine| machine.load_more()).await
}

/// POST /api/v1/sessions/:id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConversationState>, AppError> {
    let handle = session(&state, id).await?;
    let mut machine = handle.lock().await;
    machine.reset();
    Ok(Json(machine.state()))
}

/// PUT /api/v1/sessions/:id/location
pub async fn handle_set_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<LocationRequest>,
) -> Result<Json<ConversationState>, AppError> {
    transition(&state, id, |machine| {
        machine.set_location(request.enabled, request.coords)
    })
    .await
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn session(state: &AppState, id: Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

fn lookup_persona(section_id: &str) -> Result<Persona, AppError> {
    find_persona(section_id)
        .ok_or_else(|| AppError::Validation(format!("Unknown section '{section_id}'")))
}

/// Runs `apply` under the session lock, then hands its effects to the engine.
async fn transition<F>(
    state: &AppState,
    id: Uuid,
    apply: F,
) -> Result<Json<ConversationState>, AppError>
where
    F: FnOnce(&mut ConversationMachine) -> Vec<Effect>,
{
    let handle = session(state, id).await?;
    let (snapshot, effects) = {
        let mut machine = handle.lock().await;
        let effects = apply(&mut machine);
        (machine.state(), effects)
    };
    state.engine.spawn(handle, effects);
    Ok(Json(snapshot))
}
