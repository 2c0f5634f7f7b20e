use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::auth::{session_user, session_user_with_uid};
use crate::api::response::{ApiError, AppJson, AppQuery, Envelope};
use crate::session::Session;
use crate::storage::models::{OwnerRef, Soundboard, SoundboardRecord};
use crate::validation::{normalize_uid, Issue, NAME_MAX_LEN};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub sb_id: String,
    pub name: String,
    pub user: OwnerRef,
    pub created_at: String,
    pub s_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub sb_id: String,
    pub name: String,
    pub user: OwnerRef,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ListCategoriesParams {
    #[serde(default)]
    pub uid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddSoundRequest {
    pub s_id: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Unknown ids answer 400 rather than 404, which clients already rely on.
pub async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(sb_id): Path<String>,
) -> Result<Json<Envelope<CategoryResponse>>, ApiError> {
    let board = state
        .db
        .get_soundboard(&sb_id)?
        .ok_or_else(|| ApiError::bad_request("Category not found"))?;

    Ok(Envelope::success(board_to_response(board)))
}

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListCategoriesParams>,
) -> Result<Json<Envelope<Vec<CategorySummary>>>, ApiError> {
    let uid = params
        .uid
        .map(|u| normalize_uid(&u))
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("uid query parameter is required"))?;

    let boards = state.db.list_soundboards_by_uid(&uid)?;
    Ok(Envelope::success(boards.iter().map(record_to_summary).collect()))
}

pub async fn create_category(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppJson(req): AppJson<CreateCategoryRequest>,
) -> Result<Json<Envelope<CategorySummary>>, ApiError> {
    let (user, uid) = session_user_with_uid(&state, &session)?;

    let name = req.name.trim();
    if name.is_empty() || name.chars().count() > NAME_MAX_LEN {
        return Err(ApiError::Invalid(vec![Issue::new(
            "name",
            "invalid_string",
            format!("Soundboard name must be 1-{NAME_MAX_LEN} characters"),
        )]));
    }

    let record = SoundboardRecord {
        sb_id: uuid::Uuid::new_v4().simple().to_string(),
        name: name.to_string(),
        user: OwnerRef {
            uid,
            name: user.name,
        },
        created_at: Utc::now(),
    };
    state.db.create_soundboard(&record)?;

    tracing::debug!(sb_id = %record.sb_id, uid = %record.user.uid, "Created soundboard");
    Ok(Envelope::success(record_to_summary(&record)))
}

pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(sb_id): Path<String>,
) -> Result<Json<Envelope<()>>, ApiError> {
    owned_board(&state, &session, &sb_id)?;
    state.db.delete_soundboard(&sb_id)?;

    tracing::debug!(sb_id = %sb_id, "Deleted soundboard");
    Ok(Envelope::success(()))
}

pub async fn add_category_sound(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(sb_id): Path<String>,
    AppJson(req): AppJson<AddSoundRequest>,
) -> Result<Json<Envelope<CategoryResponse>>, ApiError> {
    owned_board(&state, &session, &sb_id)?;

    if state.db.get_sound(&req.s_id)?.is_none() {
        return Err(ApiError::not_found("Sound not found"));
    }

    if !state.db.add_to_soundboard(&sb_id, &req.s_id)? {
        return Err(ApiError::conflict("Sound is already on this soundboard"));
    }

    let board = state
        .db
        .get_soundboard(&sb_id)?
        .ok_or_else(|| ApiError::not_found("Soundboard not found"))?;
    Ok(Envelope::success(board_to_response(board)))
}

pub async fn remove_category_sound(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path((sb_id, s_id)): Path<(String, String)>,
) -> Result<Json<Envelope<CategoryResponse>>, ApiError> {
    owned_board(&state, &session, &sb_id)?;

    if !state.db.remove_from_soundboard(&sb_id, &s_id)? {
        return Err(ApiError::not_found("Sound is not on this soundboard"));
    }

    let board = state
        .db
        .get_soundboard(&sb_id)?
        .ok_or_else(|| ApiError::not_found("Soundboard not found"))?;
    Ok(Envelope::success(board_to_response(board)))
}

// ============================================================================
// Helpers
// ============================================================================

/// Load a soundboard the caller owns: 404 if missing, 403 if not theirs.
fn owned_board(state: &AppState, session: &Session, sb_id: &str) -> Result<Soundboard, ApiError> {
    let user = session_user(state, session)?;
    let board = state
        .db
        .get_soundboard(sb_id)?
        .ok_or_else(|| ApiError::not_found("Soundboard not found"))?;

    if user.uid.as_deref() != Some(board.record.user.uid.as_str()) {
        return Err(ApiError::forbidden("Only the owner can change this soundboard"));
    }
    Ok(board)
}

fn record_to_summary(record: &SoundboardRecord) -> CategorySummary {
    CategorySummary {
        sb_id: record.sb_id.clone(),
        name: record.name.clone(),
        user: record.user.clone(),
        created_at: record.created_at.to_rfc3339(),
    }
}

fn board_to_response(board: Soundboard) -> CategoryResponse {
    CategoryResponse {
        sb_id: board.record.sb_id,
        name: board.record.name,
        user: board.record.user,
        created_at: board.record.created_at.to_rfc3339(),
        s_ids: board.s_ids,
    }
}
