use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::session::Session;
use crate::storage::models::UserRecord;
use crate::AppState;

/// Resolves `Authorization: Bearer <token>` into the caller's session.
/// Handlers that take a `Session` are never entered without one.
#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, ApiError> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        state.sessions.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected session token");
            ApiError::Unauthorized
        })
    }
}

/// Load the account behind a session. A token for a deleted account is
/// treated like no token at all.
pub fn session_user(state: &AppState, session: &Session) -> Result<UserRecord, ApiError> {
    state
        .db
        .get_user(&session.user_id)?
        .ok_or(ApiError::Unauthorized)
}

/// Like [`session_user`] but also requires a claimed handle, returning it.
pub fn session_user_with_uid(
    state: &AppState,
    session: &Session,
) -> Result<(UserRecord, String), ApiError> {
    let user = session_user(state, session)?;
    match user.uid.clone() {
        Some(uid) => Ok((user, uid)),
        None => Err(ApiError::forbidden("Choose a username first")),
    }
}
