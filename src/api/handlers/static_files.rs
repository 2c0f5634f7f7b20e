use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::api::response::ApiError;
use crate::object_store::{validate_key, ObjectStoreError};
use crate::AppState;

/// Serve an object by key, for deployments on the local backend.
/// Route: GET /static/*key
pub async fn serve_static(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    validate_key(&key).map_err(|_| ApiError::not_found("File not found"))?;

    let data = state.object_store.get(&key).await.map_err(|e| match e {
        ObjectStoreError::NotFound(_) => ApiError::not_found("File not found"),
        _ => ApiError::internal("Failed to retrieve file", e),
    })?;

    let content_type = mime_guess::from_path(&key)
        .first_or_octet_stream()
        .to_string();
    let byte_size = data.len() as u64;

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        content_type
            .parse()
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, header::HeaderValue::from(byte_size));

    let filename = key.rsplit('/').next().unwrap_or(&key);
    if let Ok(value) = format!("inline; filename=\"{filename}\"").parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Keys never get new content except through an explicit re-upload
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=3600"),
    );

    Ok(response)
}
