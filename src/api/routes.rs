use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::cors::{build_cors_layer, preflight_no_content};
use super::handlers;
use super::response::ApiError;
use crate::AppState;

/// Room for multipart boundaries and text fields on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_size as usize + MULTIPART_OVERHEAD);

    let mut router = Router::new()
        // Soundboards
        .route(
            "/api/category",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/api/category/:id",
            get(handlers::get_category).delete(handlers::delete_category),
        )
        .route("/api/category/:id/sounds", post(handlers::add_category_sound))
        .route(
            "/api/category/:id/sounds/:s_id",
            delete(handlers::remove_category_sound),
        )
        // Sounds
        .route("/api/sounds", get(handlers::list_sounds))
        .route(
            "/api/sounds",
            post(handlers::create_sound).layer(upload_limit.clone()),
        )
        .route(
            "/api/sounds/:id",
            get(handlers::get_sound).delete(handlers::delete_sound),
        )
        .route(
            "/api/sounds/:id/increment-view",
            post(handlers::increment_view),
        )
        .route(
            "/api/sounds/:id/increment-download",
            post(handlers::increment_download),
        )
        .route(
            "/api/sounds/:id/fav",
            put(handlers::add_fav).delete(handlers::remove_fav),
        )
        // Users
        .route("/api/profile/:uid", get(handlers::get_profile))
        .route("/api/user/check-uid", get(handlers::check_uid))
        .route("/api/me", get(handlers::get_me))
        .route("/api/me/uid", put(handlers::claim_uid))
        .route("/api/me/name", put(handlers::change_name))
        .route("/api/me/preference", put(handlers::update_preference))
        .route("/api/me/favs", get(handlers::list_favs))
        // Uploads
        .route(
            "/api/upload",
            post(handlers::upload).layer(upload_limit),
        )
        .route("/api/upload", delete(handlers::delete_upload))
        // Logs
        .route("/api/message", post(handlers::create_message))
        .route("/api/not-found", post(handlers::record_not_found))
        // Sign-in
        .route("/api/auth/email", post(handlers::request_sign_in))
        .route("/api/auth/verify", post(handlers::verify_sign_in))
        .route("/api/auth/session", get(handlers::current_session))
        // Static content (local backend)
        .route("/static/*key", get(handlers::serve_static))
        // Internal
        .route("/_internal/health", get(handlers::health));

    // Test-only routes
    if state.config.test_mode {
        tracing::warn!("Test mode enabled; purge and message listing routes are available.");
        router = router
            .route("/admin/purge", delete(handlers::admin_purge))
            .route("/admin/messages", get(handlers::list_messages));
    }

    router
        .fallback(route_not_found)
        .layer(build_cors_layer(&state.config.cors))
        .layer(middleware::from_fn(preflight_no_content))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use tower::ServiceExt;

    use crate::testutil::test_state;

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/sounds")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn preflight_from_allowed_origin_is_204() {
        let dir = tempfile::tempdir().unwrap();
        let app = super::create_router(test_state(&dir));

        let response = app.oneshot(preflight("http://localhost:3000")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn unlisted_origin_gets_no_cors_headers() {
        let dir = tempfile::tempdir().unwrap();
        let app = super::create_router(test_state(&dir));

        let response = app.oneshot(preflight("https://evil.example")).await.unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn simple_request_from_allowed_origin_is_tagged() {
        let dir = tempfile::tempdir().unwrap();
        let app = super::create_router(test_state(&dir));

        let request = Request::builder()
            .uri("/_internal/health")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn unknown_route_is_enveloped_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = super::create_router(test_state(&dir));

        let request = Request::builder()
            .uri("/api/nope")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
