use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sfx_share::{
    api,
    config::{Config, StorageBackend},
    object_store as obj,
    session::SessionKeys,
    storage::Database,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "sfx-share starting");

    let config = Config::load()?;
    if config.test_mode {
        tracing::warn!("TEST_MODE is on; never run this configuration in production");
    }

    let db = Database::open(&config.node.data_dir)?;
    info!("Database opened at: {}", config.node.data_dir);

    let object_store: Arc<dyn obj::ObjectStore> = match config.storage.backend {
        StorageBackend::Local => {
            let store = obj::LocalStore::new(&config.storage.local_storage_path)?;
            info!(
                "Using local storage backend at: {}",
                config.storage.local_storage_path
            );
            Arc::new(store)
        }
        StorageBackend::R2 => {
            let r2 = &config.storage.r2;
            let (Some(endpoint), Some(bucket), Some(access_key_id), Some(secret_access_key)) = (
                r2.endpoint(),
                r2.bucket.as_deref(),
                r2.access_key_id.clone(),
                r2.secret_access_key.clone(),
            ) else {
                anyhow::bail!("R2 settings incomplete after validation");
            };
            let store = obj::R2Store::new(
                &endpoint,
                bucket,
                obj::R2Credentials {
                    access_key_id,
                    secret_access_key,
                },
            )?;
            info!("Using R2 storage backend, bucket: {}", bucket);
            Arc::new(store)
        }
    };

    let sessions = SessionKeys::from_config(&config.session)
        .map_err(|_| anyhow::anyhow!("failed to generate a session key"))?;

    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        object_store,
        sessions,
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.node.bind_address).await?;
    info!(
        origins = ?config.cors.allowed_origins,
        "Listening on: {}", config.node.bind_address
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
