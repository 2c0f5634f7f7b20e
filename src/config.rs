use thiserror::Error;

use crate::audio::{AudioPolicy, DEFAULT_MAX_AUDIO_BYTES, DEFAULT_MAX_DURATION_SECS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    pub cors: CorsConfig,
    pub session: SessionConfig,
    pub audio: AudioPolicy,
    /// Enables dangerous operations like purge. Must never be true in production.
    pub test_mode: bool,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StorageBackend {
    Local,
    R2,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for local storage backend
    pub local_storage_path: String,
    /// Base URL objects are publicly reachable under
    pub public_url: String,
    pub r2: R2Config,
}

#[derive(Clone, Default)]
pub struct R2Config {
    pub account_id: Option<String>,
    pub bucket: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Overrides `https://{account_id}.r2.cloudflarestorage.com`
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Clone)]
pub struct SessionConfig {
    /// HMAC key for session tokens. `None` means generate one per process.
    pub secret: Option<String>,
    pub ttl_hours: i64,
    pub verification_ttl_minutes: i64,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("ttl_hours", &self.ttl_hours)
            .field("verification_ttl_minutes", &self.verification_ttl_minutes)
            .finish()
    }
}

impl std::fmt::Debug for R2Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("R2Config")
            .field("account_id", &self.account_id)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

pub const MIN_SESSION_SECRET_LEN: usize = 32;

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: "./files".to_string(),
            public_url: "http://localhost:8080/static".to_string(),
            r2: R2Config::default(),
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_hours: 24 * 30,
            verification_ttl_minutes: 15,
        }
    }
}

impl R2Config {
    /// S3 API endpoint for the configured account
    pub fn endpoint(&self) -> Option<String> {
        self.endpoint.clone().or_else(|| {
            self.account_id
                .as_ref()
                .map(|id| format!("https://{id}.r2.cloudflarestorage.com"))
        })
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let test_mode = std::env::var("TEST_MODE")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let max_upload_size = env_parse("MAX_UPLOAD_SIZE").unwrap_or(10 * 1024 * 1024); // 10MB

        let audio = AudioPolicy {
            max_bytes: env_parse("MAX_AUDIO_SIZE").unwrap_or(DEFAULT_MAX_AUDIO_BYTES),
            max_duration_secs: env_parse("MAX_AUDIO_DURATION")
                .unwrap_or(DEFAULT_MAX_DURATION_SECS),
        };

        let storage_backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "r2" => StorageBackend::R2,
            _ => StorageBackend::Local,
        };

        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./files".to_string());

        let public_url = std::env::var("PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:8080/static".to_string());

        let r2 = R2Config {
            account_id: std::env::var("R2_ACCOUNT_ID").ok(),
            bucket: std::env::var("R2_BUCKET").ok(),
            access_key_id: std::env::var("R2_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("R2_SECRET_ACCESS_KEY").ok(),
            endpoint: std::env::var("R2_ENDPOINT").ok(),
        };

        let allowed_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().trim_end_matches('/').to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_else(|_| CorsConfig::default().allowed_origins);

        let session = SessionConfig {
            secret: std::env::var("SESSION_SECRET").ok(),
            ttl_hours: env_parse("SESSION_TTL_HOURS").unwrap_or(24 * 30),
            verification_ttl_minutes: env_parse("VERIFICATION_TTL_MINUTES").unwrap_or(15),
        };

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig {
                backend: storage_backend,
                local_storage_path,
                public_url,
                r2,
            },
            cors: CorsConfig { allowed_origins },
            session,
            audio,
            test_mode,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if matches!(self.storage.backend, StorageBackend::R2) {
            let r2 = &self.storage.r2;
            if r2.endpoint().is_none() {
                return Err(ConfigError::ValidationError(
                    "R2_ACCOUNT_ID or R2_ENDPOINT is required when STORAGE_BACKEND=r2".to_string(),
                ));
            }
            if r2.bucket.is_none() || r2.access_key_id.is_none() || r2.secret_access_key.is_none()
            {
                return Err(ConfigError::ValidationError(
                    "R2_BUCKET, R2_ACCESS_KEY_ID and R2_SECRET_ACCESS_KEY are required when STORAGE_BACKEND=r2"
                        .to_string(),
                ));
            }
        }

        if let Some(ref secret) = self.session.secret {
            if secret.len() < MIN_SESSION_SECRET_LEN {
                return Err(ConfigError::ValidationError(format!(
                    "SESSION_SECRET must be at least {MIN_SESSION_SECRET_LEN} bytes"
                )));
            }
        }

        if self.session.ttl_hours <= 0 || self.session.verification_ttl_minutes <= 0 {
            return Err(ConfigError::ValidationError(
                "session lifetimes must be positive".to_string(),
            ));
        }

        if self.audio.max_bytes > self.max_upload_size {
            tracing::warn!(
                "MAX_AUDIO_SIZE ({}) exceeds MAX_UPLOAD_SIZE ({}); the body limit wins",
                self.audio.max_bytes,
                self.max_upload_size
            );
        }

        if self.cors.allowed_origins.iter().any(|o| o == "*") {
            return Err(ConfigError::ValidationError(
                "CORS_ORIGINS must list explicit origins".to_string(),
            ));
        }

        Ok(())
    }
}
