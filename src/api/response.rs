use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::validation::Issue;

// ============================================================================
// Envelope
// ============================================================================

/// The JSON body every route answers with:
/// `{success, data?, message?, error?, issues?}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<Issue>>,
}

impl<T: Serialize> Envelope<T> {
    pub fn success(data: T) -> Json<Envelope<T>> {
        Json(Envelope {
            success: true,
            data: Some(data),
            message: None,
            error: None,
            issues: None,
        })
    }
}

impl Envelope<()> {
    fn failure(message: Option<String>, error: Option<String>, issues: Option<Vec<Issue>>) -> Self {
        Envelope {
            success: false,
            data: None,
            message,
            error,
            issues,
        }
    }
}

// ============================================================================
// Paginated payload
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PaginatedData<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: u64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: total.div_ceil(limit.max(1) as u64),
        }
    }

    /// Rows to skip for this page (pages are 1-based)
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }
}

impl<T: Serialize> Envelope<PaginatedData<T>> {
    pub fn paginated(items: Vec<T>, pagination: Pagination) -> Json<Self> {
        Envelope::success(PaginatedData { items, pagination })
    }
}

// ============================================================================
// Unified error type for handlers
// ============================================================================

/// Every way a handler can fail, mapped onto the envelope.
#[derive(Debug)]
pub enum ApiError {
    /// Expected client-side failure (4xx) with a descriptive message
    Fail(StatusCode, String),
    /// Bad input with one issue per offending field (400)
    Invalid(Vec<Issue>),
    /// No valid session (401)
    Unauthorized,
    /// Unexpected failure (5xx): message plus the stringified cause
    Error(StatusCode, String, String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::Fail(code, msg) => (code, Envelope::failure(Some(msg), None, None)),
            ApiError::Invalid(issues) => (
                StatusCode::BAD_REQUEST,
                Envelope::failure(Some("Invalid input".to_string()), None, Some(issues)),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Envelope::failure(None, Some("Unauthorized".to_string()), None),
            ),
            ApiError::Error(code, msg, cause) => {
                tracing::error!(status = %code, error = %cause, "{msg}");
                (code, Envelope::failure(Some(msg), Some(cause), None))
            }
        };
        (status, Json(body)).into_response()
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::BAD_REQUEST, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::NOT_FOUND, message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::FORBIDDEN, message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::PAYLOAD_TOO_LARGE, message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::CONFLICT, message.into())
    }

    pub fn internal(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        ApiError::Error(
            StatusCode::INTERNAL_SERVER_ERROR,
            message.into(),
            cause.to_string(),
        )
    }
}

impl From<crate::storage::DatabaseError> for ApiError {
    fn from(e: crate::storage::DatabaseError) -> Self {
        ApiError::internal("Database error", e)
    }
}

impl From<Vec<Issue>> for ApiError {
    fn from(issues: Vec<Issue>) -> Self {
        ApiError::Invalid(issues)
    }
}

// ============================================================================
// Custom extractors (reject with enveloped ApiError)
// ============================================================================

/// Drop-in replacement for `axum::Json` that rejects with the envelope.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = match rejection {
                    JsonRejection::JsonDataError(err) => {
                        format!("Invalid request body: {}", err.body_text())
                    }
                    JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body".into(),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing Content-Type: application/json header".into()
                    }
                    _ => "Failed to read request body".into(),
                };
                Err(ApiError::bad_request(message))
            }
        }
    }
}

/// Drop-in replacement for `axum::extract::Query` that rejects with the envelope.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(friendly_query_error(&e.to_string())))
    }
}

/// Translate serde/serde_qs error messages into human-friendly descriptions.
fn friendly_query_error(raw: &str) -> String {
    let cleaned = raw
        .replace("u32", "non-negative integer")
        .replace("u64", "non-negative integer")
        .replace("i32", "integer")
        .replace("i64", "integer");

    format!("Invalid query parameter: {cleaned}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;
    use http_body_util::BodyExt;

    async fn body_json(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn unauthorized_shape() {
        let (status, body) = body_json(ApiError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({"success": false, "error": "Unauthorized"}));
    }

    #[tokio::test]
    async fn internal_carries_message_and_cause() {
        let (status, body) = body_json(ApiError::internal("Failed to store file", "disk full")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to store file");
        assert_eq!(body["error"], "disk full");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn invalid_lists_issues() {
        let issues = vec![Issue::new("uid", "too_small", "short")];
        let (status, body) = body_json(ApiError::Invalid(issues)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["issues"][0]["path"], "uid");
        assert!(body.get("data").is_none());
    }

    #[test]
    fn pagination_math() {
        let p = Pagination::new(3, 20, 41);
        assert_eq!(p.pages, 3);
        assert_eq!(p.offset(), 40);
        assert_eq!(Pagination::new(1, 20, 0).pages, 0);
    }
}
