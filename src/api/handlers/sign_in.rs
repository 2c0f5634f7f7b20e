use axum::extract::State;
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::users::MeResponse;
use crate::api::auth::session_user;
use crate::api::response::{ApiError, AppJson, Envelope};
use crate::session::{consume_verification_token, issue_verification_token, Session};
use crate::storage::models::{Preference, UserRecord};
use crate::validation::Issue;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
    pub email: String,
    pub expires_in_minutes: i64,
    /// Only present in test mode; otherwise the token travels by mail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub token: String,
    pub user: MeResponse,
    pub created: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Start an email sign-in by issuing a single-use token.
pub async fn request_sign_in(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<SignInRequest>,
) -> Result<Json<Envelope<SignInResponse>>, ApiError> {
    let email = normalize_email(&req.email)?;
    let ttl_minutes = state.config.session.verification_ttl_minutes;

    let token = issue_verification_token(&state.db, &email, Duration::minutes(ttl_minutes))
        .map_err(|e| ApiError::internal("Failed to issue sign-in token", e))?;

    // Delivery is handled by whatever tails the mailer target.
    tracing::info!(target: "mailer", email = %email, token = %token, "Sign-in token issued");

    Ok(Envelope::success(SignInResponse {
        email,
        expires_in_minutes: ttl_minutes,
        token: state.config.test_mode.then_some(token),
    }))
}

/// Exchange an emailed token for a session, creating the account on first use.
pub async fn verify_sign_in(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<VerifyRequest>,
) -> Result<Json<Envelope<VerifyResponse>>, ApiError> {
    let email = normalize_email(&req.email)?;

    if !consume_verification_token(&state.db, &email, req.token.trim())? {
        return Err(ApiError::bad_request("Invalid or expired sign-in token"));
    }

    let (user, created) = match state.db.get_user_by_email(&email)? {
        Some(user) => (user, false),
        None => {
            let user = new_user(&email);
            if state.db.create_user(&user)? {
                tracing::info!(user_id = %user.id, "Created account");
                (user, true)
            } else {
                // Lost a race with a concurrent first sign-in
                let user = state
                    .db
                    .get_user_by_email(&email)?
                    .ok_or_else(|| ApiError::conflict("Account is being created, retry"))?;
                (user, false)
            }
        }
    };

    let token = state
        .sessions
        .issue(&user.id, &user.email)
        .map_err(|e| ApiError::internal("Failed to issue session", e))?;

    Ok(Envelope::success(VerifyResponse {
        token,
        user: user.into(),
        created,
    }))
}

pub async fn current_session(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<Envelope<MeResponse>>, ApiError> {
    let user = session_user(&state, &session)?;
    Ok(Envelope::success(user.into()))
}

// ============================================================================
// Helpers
// ============================================================================

fn normalize_email(raw: &str) -> Result<String, ApiError> {
    let email = raw.trim().to_lowercase();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(ApiError::Invalid(vec![Issue::new(
            "email",
            "invalid_string",
            "Invalid email",
        )]));
    }
    Ok(email)
}

fn new_user(email: &str) -> UserRecord {
    let now = Utc::now();
    let name = email
        .split_once('@')
        .map(|(local, _)| local)
        .unwrap_or(email)
        .to_string();

    UserRecord {
        id: uuid::Uuid::new_v4().to_string(),
        uid: None,
        email: email.to_string(),
        name,
        image: None,
        preference: Preference::default(),
        created_at: now,
        updated_at: now,
    }
}
