mod admin;
mod categories;
mod logs;
mod sign_in;
mod sounds;
mod static_files;
mod upload;
mod users;

use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::api::response::ApiError;

pub use admin::{admin_purge, health, list_messages};
pub use categories::{
    add_category_sound, create_category, delete_category, get_category, list_categories,
    remove_category_sound,
};
pub use logs::{create_message, record_not_found};
pub use sign_in::{current_session, request_sign_in, verify_sign_in};
pub use sounds::{
    add_fav, create_sound, delete_sound, get_sound, increment_download, increment_view,
    list_favs, list_sounds, remove_fav,
};
pub use static_files::serve_static;
pub use upload::{delete_upload, upload};
pub use users::{change_name, check_uid, claim_uid, get_me, get_profile, update_preference};

/// The `file` part of a multipart request
pub(crate) struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// A parsed multipart body: at most one file plus text fields
pub(crate) struct MultipartForm {
    pub file: Option<UploadedFile>,
    pub fields: HashMap<String, String>,
}

impl MultipartForm {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Drain a multipart body. The `file` part is capped at `max_file_size`.
pub(crate) async fn read_multipart(
    mut multipart: Multipart,
    max_file_size: u64,
) -> Result<MultipartForm, ApiError> {
    let mut form = MultipartForm {
        file: None,
        fields: HashMap::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        if field_name == "file" {
            let file_name = field.file_name().map(|s| s.to_string());
            let content_type = field.content_type().map(|s| s.to_string());

            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

            if data.len() as u64 > max_file_size {
                return Err(ApiError::payload_too_large(format!(
                    "File exceeds maximum upload size of {max_file_size} bytes"
                )));
            }

            form.file = Some(UploadedFile {
                file_name,
                content_type,
                data,
            });
        } else if !field_name.is_empty() {
            let text = field
                .text()
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid {field_name}: {e}")))?;
            form.fields.insert(field_name, text);
        }
    }

    Ok(form)
}

/// The part's declared Content-Type, as sent. A missing type is treated as
/// opaque bytes so it never passes an exact-type check.
pub(crate) fn declared_mime(content_type: Option<&str>) -> String {
    content_type
        .map(str::trim)
        .filter(|ct| !ct.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// MIME type from the part's Content-Type, else guessed from the file name.
pub(crate) fn resolve_mime(content_type: Option<&str>, file_name: Option<&str>) -> String {
    content_type
        .filter(|ct| *ct != "application/octet-stream")
        .map(|ct| ct.to_string())
        .or_else(|| {
            file_name
                .and_then(|n| mime_guess::from_path(n).first())
                .map(|m| m.to_string())
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}
