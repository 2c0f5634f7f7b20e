//! Shared helpers for in-crate API tests.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::audio::AudioPolicy;
use crate::config::{Config, CorsConfig, NodeConfig, SessionConfig, StorageConfig};
use crate::object_store::LocalStore;
use crate::session::SessionKeys;
use crate::storage::models::{Preference, UserRecord};
use crate::storage::Database;
use crate::AppState;

pub const TEST_SECRET: &[u8] = b"test-secret-test-secret-test-secret!";

/// Create a test AppState with a temporary database and local object store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("files");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
        },
        storage: StorageConfig {
            local_storage_path: files_dir.to_string_lossy().to_string(),
            ..StorageConfig::default()
        },
        cors: CorsConfig::default(),
        session: SessionConfig::default(),
        audio: AudioPolicy::default(),
        test_mode: true,
        max_upload_size: 10 * 1024 * 1024, // 10MB for tests
    };

    let db = Database::open(&data_dir).expect("Failed to open test database");
    let object_store = LocalStore::new(&files_dir).expect("Failed to create test object store");

    Arc::new(AppState {
        config,
        db,
        object_store: Arc::new(object_store),
        sessions: SessionKeys::new(TEST_SECRET, Duration::hours(1)),
    })
}

/// Insert an account (with an optional handle) and return a bearer token for it.
pub fn signed_in_user(state: &AppState, email: &str, uid: Option<&str>) -> (UserRecord, String) {
    let now = Utc::now();
    let user = UserRecord {
        id: uuid::Uuid::new_v4().to_string(),
        uid: uid.map(str::to_string),
        email: email.to_string(),
        name: email.split('@').next().unwrap_or(email).to_string(),
        image: None,
        preference: Preference::default(),
        created_at: now,
        updated_at: now,
    };
    assert!(state.db.create_user(&user).unwrap(), "duplicate test user");
    let token = state.sessions.issue(&user.id, &user.email).unwrap();
    (user, token)
}
