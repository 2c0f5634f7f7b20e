use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{declared_mime, read_multipart};
use crate::api::auth::{session_user, session_user_with_uid};
use crate::api::response::{ApiError, AppQuery, Envelope, PaginatedData, Pagination};
use crate::audio::AudioError;
use crate::object_store::{public_url, Folder};
use crate::session::Session;
use crate::storage::models::{Counter, OwnerRef, SoundFilter, SoundRecord};
use crate::validation::{slugify, validate_sound_meta};
use crate::AppState;

pub const MAX_PAGE_SIZE: u32 = 100;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SoundResponse {
    pub s_id: String,
    pub slug: String,
    pub title: String,
    pub duration: f64,
    pub views: u64,
    pub downloads: u64,
    pub category: String,
    pub tags: Vec<String>,
    pub nsfw: bool,
    pub url: String,
    pub user: OwnerRef,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct ListSoundsParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub nsfw: bool,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Serialize)]
pub struct ViewsResponse {
    pub s_id: String,
    pub views: u64,
}

#[derive(Debug, Serialize)]
pub struct DownloadsResponse {
    pub s_id: String,
    pub downloads: u64,
}

#[derive(Debug, Serialize)]
pub struct FavResponse {
    pub s_id: String,
    pub favorited: bool,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_sounds(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<ListSoundsParams>,
) -> Result<Json<Envelope<PaginatedData<SoundResponse>>>, ApiError> {
    if params.limit == 0 || params.limit > MAX_PAGE_SIZE {
        return Err(ApiError::bad_request(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }
    if params.page == 0 {
        return Err(ApiError::bad_request("page must be greater than 0"));
    }

    let filter = SoundFilter {
        category: params.category.filter(|c| !c.is_empty()),
        tag: params.tag.filter(|t| !t.is_empty()),
        uid: params.uid.filter(|u| !u.is_empty()),
        query: params.q.filter(|q| !q.trim().is_empty()),
        include_nsfw: params.nsfw,
    };

    let offset = Pagination::new(params.page, params.limit, 0).offset();
    let (total, sounds) = state
        .db
        .list_sounds(&filter, offset, params.limit as usize)?;

    let items = sounds
        .iter()
        .map(|s| sound_to_response(&state, s))
        .collect();

    Ok(Envelope::paginated(
        items,
        Pagination::new(params.page, params.limit, total),
    ))
}

pub async fn get_sound(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<SoundResponse>>, ApiError> {
    let sound = find_sound(&state, &id)?.ok_or_else(|| ApiError::not_found("Sound not found"))?;
    Ok(Envelope::success(sound_to_response(&state, &sound)))
}

pub async fn create_sound(
    State(state): State<Arc<AppState>>,
    session: Session,
    multipart: Multipart,
) -> Result<Json<Envelope<SoundResponse>>, ApiError> {
    let (user, uid) = session_user_with_uid(&state, &session)?;
    let form = read_multipart(multipart, state.config.max_upload_size).await?;

    let file = form
        .file
        .as_ref()
        .ok_or_else(|| ApiError::bad_request("file field is required"))?;

    let meta = validate_sound_meta(
        form.field("title"),
        form.field("category"),
        form.field("tags"),
    )?;

    let file_name = file.file_name.as_deref().unwrap_or_default();
    let mime_type = declared_mime(file.content_type.as_deref());
    let audio = state
        .config
        .audio
        .validate(&mime_type, file_name, &file.data)
        .map_err(|e| match e {
            AudioError::TooLarge { .. } => ApiError::payload_too_large(e.to_string()),
            _ => ApiError::bad_request(e.to_string()),
        })?;

    let s_id = uuid::Uuid::new_v4().simple().to_string();
    let slug = match slugify(&meta.title) {
        base if base.is_empty() => format!("sound-{}", &s_id[..8]),
        base => format!("{base}-{}", &s_id[..8]),
    };
    let audio_key = Folder::Store.key(&format!("{s_id}.mp3"));

    // Phase 1: Upload bytes to object storage
    state
        .object_store
        .put(&audio_key, file.data.clone(), &mime_type)
        .await
        .map_err(|e| ApiError::internal("Failed to store file", e))?;

    // Phase 2: Write the document
    let sound = SoundRecord {
        s_id: s_id.clone(),
        slug,
        title: meta.title,
        duration: audio.duration_secs,
        views: 0,
        downloads: 0,
        category: meta.category,
        tags: meta.tags,
        nsfw: matches!(form.field("nsfw"), Some("true") | Some("1") | Some("on")),
        audio_key: audio_key.clone(),
        user: OwnerRef {
            uid,
            name: user.name,
        },
        created_at: Utc::now(),
    };

    let created = match state.db.create_sound(&sound) {
        Ok(created) => created,
        Err(e) => {
            // Best-effort cleanup of the uploaded blob
            let _ = state.object_store.delete(&audio_key).await;
            return Err(e.into());
        }
    };
    if !created {
        let _ = state.object_store.delete(&audio_key).await;
        return Err(ApiError::conflict(format!(
            "slug '{}' is already in use",
            sound.slug
        )));
    }

    tracing::debug!(s_id = %s_id, slug = %sound.slug, duration = sound.duration, "Created sound");
    Ok(Envelope::success(sound_to_response(&state, &sound)))
}

pub async fn delete_sound(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<Envelope<()>>, ApiError> {
    let user = session_user(&state, &session)?;
    let sound = find_sound(&state, &id)?.ok_or_else(|| ApiError::not_found("Sound not found"))?;

    if user.uid.as_deref() != Some(sound.user.uid.as_str()) {
        return Err(ApiError::forbidden("Only the uploader can delete this sound"));
    }

    state.db.delete_sound(&sound.s_id)?;

    if let Err(e) = state.object_store.delete(&sound.audio_key).await {
        tracing::warn!(s_id = %sound.s_id, key = %sound.audio_key, error = %e, "Failed to delete sound from object storage");
    }

    tracing::debug!(s_id = %sound.s_id, "Deleted sound");
    Ok(Envelope::success(()))
}

pub async fn increment_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<ViewsResponse>>, ApiError> {
    let (s_id, views) = bump_counter(&state, &id, Counter::Views)?;
    Ok(Envelope::success(ViewsResponse { s_id, views }))
}

pub async fn increment_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<DownloadsResponse>>, ApiError> {
    let (s_id, downloads) = bump_counter(&state, &id, Counter::Downloads)?;

    Ok(Envelope::success(DownloadsResponse { s_id, downloads }))
}

pub async fn add_fav(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<Envelope<FavResponse>>, ApiError> {
    let sound = find_sound(&state, &id)?.ok_or_else(|| ApiError::not_found("Sound not found"))?;
    state.db.add_fav(&session.user_id, &sound.s_id)?;

    Ok(Envelope::success(FavResponse {
        s_id: sound.s_id,
        favorited: true,
    }))
}

pub async fn remove_fav(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<Envelope<FavResponse>>, ApiError> {
    let s_id = match find_sound(&state, &id)? {
        Some(sound) => sound.s_id,
        None => id,
    };
    state.db.remove_fav(&session.user_id, &s_id)?;

    Ok(Envelope::success(FavResponse {
        s_id,
        favorited: false,
    }))
}

pub async fn list_favs(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<Envelope<Vec<SoundResponse>>>, ApiError> {
    let s_ids = state.db.list_favs(&session.user_id)?;
    let sounds = state.db.get_sounds(&s_ids)?;

    Ok(Envelope::success(
        sounds.iter().map(|s| sound_to_response(&state, s)).collect(),
    ))
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolve a path segment that may be either a slug or an s_id.
/// Resolve a slug or s_id, then bump one of its counters.
fn bump_counter(state: &AppState, id: &str, counter: Counter) -> Result<(String, u64), ApiError> {
    let s_id = find_sound(state, id)?
        .map(|sound| sound.s_id)
        .ok_or_else(|| ApiError::not_found("Sound not found"))?;
    // The sound can vanish between the lookup and the write
    let value = state
        .db
        .increment_sound_counter(&s_id, counter)?
        .ok_or_else(|| ApiError::not_found("Sound not found"))?;
    Ok((s_id, value))
}

fn find_sound(state: &AppState, id: &str) -> Result<Option<SoundRecord>, ApiError> {
    if let Some(sound) = state.db.get_sound_by_slug(id)? {
        return Ok(Some(sound));
    }
    Ok(state.db.get_sound(id)?)
}

pub(crate) fn sound_to_response(state: &AppState, sound: &SoundRecord) -> SoundResponse {
    SoundResponse {
        s_id: sound.s_id.clone(),
        slug: sound.slug.clone(),
        title: sound.title.clone(),
        duration: sound.duration,
        views: sound.views,
        downloads: sound.downloads,
        category: sound.category.clone(),
        tags: sound.tags.clone(),
        nsfw: sound.nsfw,
        url: public_url(&state.config.storage.public_url, &sound.audio_key),
        user: sound.user.clone(),
        created_at: sound.created_at.to_rfc3339(),
    }
}
