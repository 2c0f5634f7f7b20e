use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::{ApiError, Envelope};
use crate::storage::models::MessageRecord;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub users_deleted: u64,
    pub sounds_deleted: u64,
    pub soundboards_deleted: u64,
    pub favs_deleted: u64,
    pub messages_deleted: u64,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<Envelope<HealthResponse>> {
    Envelope::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Wipe every collection. Only routed in test mode.
pub async fn admin_purge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Envelope<PurgeResponse>>, ApiError> {
    let stats = state.db.purge_all()?;

    tracing::warn!(
        users = stats.users,
        sounds = stats.sounds,
        soundboards = stats.soundboards,
        "Purged all data"
    );

    Ok(Envelope::success(PurgeResponse {
        users_deleted: stats.users,
        sounds_deleted: stats.sounds,
        soundboards_deleted: stats.soundboards,
        favs_deleted: stats.favs,
        messages_deleted: stats.messages,
    }))
}

/// Stored contact messages, newest first. Only routed in test mode.
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Envelope<Vec<MessageRecord>>>, ApiError> {
    Ok(Envelope::success(state.db.list_messages()?))
}
