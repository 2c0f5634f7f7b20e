mod local;
mod r2;

pub use local::LocalStore;
pub use r2::{R2Credentials, R2Store};

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Abstraction over object storage backends.
/// Keys are `{folder}/{name}` paths; the bucket layout is flat otherwise.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes, content_type: &str)
        -> Result<(), ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;
    /// Remove an object. Missing keys are not an error.
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;
}

/// Top-level namespaces uploads may target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    /// Sound clips
    Store,
    /// Sound cover images
    Thumb,
    Avatars,
}

impl Folder {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "store" => Some(Folder::Store),
            "thumb" => Some(Folder::Thumb),
            "avatars" => Some(Folder::Avatars),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Folder::Store => "store",
            Folder::Thumb => "thumb",
            Folder::Avatars => "avatars",
        }
    }

    /// Deterministic object key for a file name inside this folder
    pub fn key(&self, file_name: &str) -> String {
        format!("{}/{}", self.as_str(), file_name)
    }
}

/// Reject keys that could escape the bucket root or are otherwise unusable.
pub fn validate_key(key: &str) -> Result<(), ObjectStoreError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(ObjectStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Public URL of an object given the configured base URL
pub fn public_url(base: &str, key: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_round_trip() {
        for folder in [Folder::Store, Folder::Thumb, Folder::Avatars] {
            assert_eq!(Folder::parse(folder.as_str()), Some(folder));
        }
        assert_eq!(Folder::parse("secrets"), None);
        assert_eq!(Folder::Thumb.key("abc.png"), "thumb/abc.png");
    }

    #[test]
    fn validate_key_rejects_traversal() {
        assert!(validate_key("store/a.mp3").is_ok());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("store/../../x").is_err());
        assert!(validate_key("/store/a.mp3").is_err());
        assert!(validate_key("store//a.mp3").is_err());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn public_url_joins_without_double_slash() {
        assert_eq!(
            public_url("https://cdn.example.com/", "store/a.mp3"),
            "https://cdn.example.com/store/a.mp3"
        );
    }
}
