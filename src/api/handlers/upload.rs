use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{declared_mime, read_multipart, resolve_mime};
use crate::api::response::{ApiError, AppQuery, Envelope};
use crate::audio::AudioError;
use crate::object_store::{public_url, validate_key, Folder};
use crate::session::Session;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub byte_size: u64,
}

#[derive(Debug, Deserialize)]
pub struct DeleteUploadParams {
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteUploadResponse {
    pub key: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Store a file under `{folder}/{fileName}` or `{folder}/{uuid}.{ext}`.
/// Route: POST /api/upload
///
/// Multipart fields: `file` (required), `folder` (required, one of
/// store/thumb/avatars), `fileName` (optional). Clips sent to `store` must
/// pass the audio policy.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    _session: Session,
    multipart: Multipart,
) -> Result<Json<Envelope<UploadResponse>>, ApiError> {
    let form = read_multipart(multipart, state.config.max_upload_size).await?;

    let file = form
        .file
        .as_ref()
        .ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let folder_name = form
        .field("folder")
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or_else(|| ApiError::bad_request("folder field is required"))?;
    let folder = Folder::parse(folder_name).ok_or_else(|| {
        ApiError::bad_request(format!(
            "Invalid folder '{folder_name}'. Expected one of: store, thumb, avatars"
        ))
    })?;

    // Clips keep the declared type so the audio check sees what the client sent
    let content_type = match folder {
        Folder::Store => declared_mime(file.content_type.as_deref()),
        _ => resolve_mime(file.content_type.as_deref(), file.file_name.as_deref()),
    };

    if folder == Folder::Store {
        let file_name = file.file_name.as_deref().unwrap_or_default();
        state
            .config
            .audio
            .validate(&content_type, file_name, &file.data)
            .map_err(|e| match e {
                AudioError::TooLarge { .. } => ApiError::payload_too_large(e.to_string()),
                _ => ApiError::bad_request(e.to_string()),
            })?;
    }

    let name = match form.field("fileName") {
        Some(requested) => sanitize_file_name(requested)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid fileName '{requested}'")))?,
        None => generated_name(file.file_name.as_deref(), &content_type),
    };
    let key = folder.key(&name);

    state
        .object_store
        .put(&key, file.data.clone(), &content_type)
        .await
        .map_err(|e| ApiError::internal("Failed to store file", e))?;

    tracing::debug!(key = %key, bytes = file.data.len(), "Stored upload");

    Ok(Envelope::success(UploadResponse {
        url: public_url(&state.config.storage.public_url, &key),
        key,
        content_type,
        byte_size: file.data.len() as u64,
    }))
}

/// Route: DELETE /api/upload?key=
///
/// Removes the object unconditionally. Nothing checks whether a sound still
/// points at the key.
pub async fn delete_upload(
    State(state): State<Arc<AppState>>,
    _session: Session,
    AppQuery(params): AppQuery<DeleteUploadParams>,
) -> Result<Json<Envelope<DeleteUploadResponse>>, ApiError> {
    let key = params.key.trim().to_string();
    if key.is_empty() {
        return Err(ApiError::bad_request("key query parameter is required"));
    }
    validate_key(&key).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let in_folder = key
        .split_once('/')
        .and_then(|(folder, _)| Folder::parse(folder))
        .is_some();
    if !in_folder {
        return Err(ApiError::bad_request(
            "key must start with store/, thumb/ or avatars/",
        ));
    }

    state
        .object_store
        .delete(&key)
        .await
        .map_err(|e| ApiError::internal("Failed to delete file", e))?;

    tracing::debug!(key = %key, "Deleted upload");
    Ok(Envelope::success(DeleteUploadResponse { key }))
}

// ============================================================================
// Helpers
// ============================================================================

/// Accept a caller-chosen object name made of `[A-Za-z0-9._-]`, not hidden.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw.trim();
    let ok = !name.is_empty()
        && name.len() <= 128
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    ok.then(|| name.to_string())
}

fn generated_name(original: Option<&str>, content_type: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();

    let ext = original
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .or_else(|| {
            mime_guess::get_mime_extensions_str(content_type)
                .and_then(|exts| exts.first())
                .map(|ext| ext.to_string())
        });

    match ext {
        Some(ext) => format!("{id}.{ext}"),
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_sanitizing() {
        assert_eq!(sanitize_file_name("boom.mp3").as_deref(), Some("boom.mp3"));
        assert_eq!(sanitize_file_name(" cover_01.png ").as_deref(), Some("cover_01.png"));
        assert_eq!(sanitize_file_name("../etc/passwd"), None);
        assert_eq!(sanitize_file_name(".hidden"), None);
        assert_eq!(sanitize_file_name("a b.png"), None);
    }

    #[test]
    fn generated_name_keeps_extension() {
        let name = generated_name(Some("Horn.MP3"), "audio/mpeg");
        assert!(name.ends_with(".mp3"));
        assert_eq!(name.len(), 32 + 4);

        let name = generated_name(None, "image/png");
        assert!(name.ends_with(".png"));
    }
}
