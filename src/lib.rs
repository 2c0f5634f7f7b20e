//! sfx-share - API server for a sound-effects sharing site
//!
//! This crate provides sound upload, soundboards, favorites and profiles with:
//! - Swappable object storage backends (local filesystem, Cloudflare R2)
//! - redb embedded database for documents (ACID, MVCC, crash-safe)
//! - Server-side MP3 validation (type, size, duration)
//! - Stateless HMAC-signed session tokens
//! - REST API with multipart upload support

pub mod api;
pub mod audio;
pub mod config;
pub mod object_store;
pub mod session;
pub mod storage;
#[cfg(test)]
pub mod testutil;
pub mod validation;

use std::sync::Arc;

use config::Config;
use session::SessionKeys;
use storage::Database;

/// Shared application state. Built once by the startup routine and handed
/// to every handler; nothing in the request path reaches for globals.
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub object_store: Arc<dyn object_store::ObjectStore>,
    pub sessions: SessionKeys,
}
