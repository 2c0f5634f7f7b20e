use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, Envelope};
use crate::storage::models::MessageRecord;
use crate::validation::{Issue, MessageInput};
use crate::AppState;

const MAX_PATH_LEN: usize = 512;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct NotFoundRequest {
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct NotFoundResponse {
    pub path: String,
    pub hits: u64,
}

/// Contact and report form.
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    AppJson(input): AppJson<MessageInput>,
) -> Result<Json<Envelope<MessageResponse>>, ApiError> {
    input.validate()?;

    let record = MessageRecord {
        id: uuid::Uuid::new_v4().to_string(),
        name: input.name.trim().to_string(),
        email: input.email.trim().to_lowercase(),
        message: input.message.trim().to_string(),
        s_id: input.s_id.filter(|s| !s.is_empty()),
        created_at: Utc::now(),
    };
    state.db.insert_message(&record)?;

    tracing::info!(id = %record.id, s_id = ?record.s_id, "Stored message");
    Ok(Envelope::success(MessageResponse {
        id: record.id,
        created_at: record.created_at.to_rfc3339(),
    }))
}

/// Count a hit on a path the frontend could not resolve.
pub async fn record_not_found(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<NotFoundRequest>,
) -> Result<Json<Envelope<NotFoundResponse>>, ApiError> {
    let path = req.path.trim();
    if path.is_empty() || path.len() > MAX_PATH_LEN {
        return Err(ApiError::Invalid(vec![Issue::new(
            "path",
            "invalid_string",
            format!("path must be 1-{MAX_PATH_LEN} bytes"),
        )]));
    }

    let record = state.db.record_not_found(path)?;
    Ok(Envelope::success(NotFoundResponse {
        path: record.path,
        hits: record.hits,
    }))
}
