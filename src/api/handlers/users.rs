use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::auth::session_user;
use crate::api::response::{ApiError, AppJson, AppQuery, Envelope};
use crate::session::Session;
use crate::storage::models::{ClaimOutcome, Preference, UserRecord};
use crate::validation::{normalize_uid, validate_name, validate_uid, PreferenceUpdate};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

/// Public view of an account. Email and preferences stay private.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub uid: String,
    pub name: String,
    pub image: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: String,
    pub uid: Option<String>,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    pub preference: Preference,
    pub created_at: String,
    pub updated_at: String,
}

impl From<UserRecord> for MeResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            uid: user.uid,
            email: user.email,
            name: user.name,
            image: user.image,
            preference: user.preference,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckUidParams {
    #[serde(default)]
    pub uid: String,
}

#[derive(Debug, Serialize)]
pub struct CheckUidResponse {
    pub uid: String,
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct ClaimUidRequest {
    pub uid: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeNameRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ChangeNameResponse {
    pub name: String,
    pub sounds_updated: u64,
    pub soundboards_updated: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<Envelope<ProfileResponse>>, ApiError> {
    let user = state
        .db
        .get_user_by_uid(&normalize_uid(&uid))?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Envelope::success(ProfileResponse {
        uid: user.uid.unwrap_or_default(),
        name: user.name,
        image: user.image,
        created_at: user.created_at.to_rfc3339(),
    }))
}

/// Route: GET /api/user/check-uid?uid=
pub async fn check_uid(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<CheckUidParams>,
) -> Result<Json<Envelope<CheckUidResponse>>, ApiError> {
    let uid = validate_uid(&params.uid)?;
    let available = !state.db.uid_exists(&uid)?;

    Ok(Envelope::success(CheckUidResponse { uid, available }))
}

pub async fn get_me(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<Envelope<MeResponse>>, ApiError> {
    let user = session_user(&state, &session)?;
    Ok(Envelope::success(user.into()))
}

/// Set the caller's handle. A handle can only be set once.
pub async fn claim_uid(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppJson(req): AppJson<ClaimUidRequest>,
) -> Result<Json<Envelope<MeResponse>>, ApiError> {
    let uid = validate_uid(&req.uid)?;

    match state.db.claim_uid(&session.user_id, &uid)? {
        ClaimOutcome::Claimed => {}
        ClaimOutcome::AlreadySet => {
            return Err(ApiError::conflict("Username has already been set"));
        }
        ClaimOutcome::Taken => {
            return Err(ApiError::conflict(format!("Username '{uid}' is taken")));
        }
        ClaimOutcome::UnknownUser => return Err(ApiError::Unauthorized),
    }

    tracing::info!(user_id = %session.user_id, uid = %uid, "Claimed username");
    let user = session_user(&state, &session)?;
    Ok(Envelope::success(user.into()))
}

/// Rename the caller and refresh the copies of the name on everything they own.
///
/// The three writes are separate transactions. If a later one fails, the
/// earlier ones stay applied and the request answers 500.
pub async fn change_name(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppJson(req): AppJson<ChangeNameRequest>,
) -> Result<Json<Envelope<ChangeNameResponse>>, ApiError> {
    let name = validate_name(&req.name)?;

    let user = state
        .db
        .rename_user(&session.user_id, &name)?
        .ok_or(ApiError::Unauthorized)?;

    // No handle yet means nothing carries a copy of the name
    let Some(uid) = user.uid else {
        return Ok(Envelope::success(ChangeNameResponse {
            name,
            sounds_updated: 0,
            soundboards_updated: 0,
        }));
    };

    let sounds_updated = state.db.rename_in_sounds(&uid, &name).map_err(|e| {
        tracing::warn!(uid = %uid, error = %e, "Name changed on user but not on sounds");
        ApiError::internal("Failed to update sounds", e)
    })?;

    let soundboards_updated = state.db.rename_in_soundboards(&uid, &name).map_err(|e| {
        tracing::warn!(uid = %uid, error = %e, "Name changed on user and sounds but not on soundboards");
        ApiError::internal("Failed to update soundboards", e)
    })?;

    tracing::debug!(uid = %uid, sounds_updated, soundboards_updated, "Renamed user");
    Ok(Envelope::success(ChangeNameResponse {
        name,
        sounds_updated,
        soundboards_updated,
    }))
}

pub async fn update_preference(
    State(state): State<Arc<AppState>>,
    session: Session,
    AppJson(update): AppJson<PreferenceUpdate>,
) -> Result<Json<Envelope<Preference>>, ApiError> {
    let user = session_user(&state, &session)?;
    let preference = update.apply(&user.preference)?;

    let user = state
        .db
        .update_preference(&user.id, &preference)?
        .ok_or(ApiError::Unauthorized)?;

    Ok(Envelope::success(user.preference))
}
