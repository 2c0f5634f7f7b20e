use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use crate::audio::mp3::tests::cbr_stream;
use crate::audio::AudioError;
use crate::storage::models::{OwnerRef, SoundRecord, SoundboardRecord};
use crate::testutil::{signed_in_user, test_state};
use crate::AppState;

const BOUNDARY: &str = "sfx-test-boundary";

struct TestApp {
    _dir: tempfile::TempDir,
    state: Arc<AppState>,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let router = super::create_router(Arc::clone(&state));
        Self {
            _dir: dir,
            state,
            router,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request(Method::GET, uri, token, Body::empty(), None))
            .await
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.send(request(
            method,
            uri,
            token,
            Body::from(body.to_string()),
            Some("application/json"),
        ))
        .await
    }

    async fn multipart(
        &self,
        uri: &str,
        token: Option<&str>,
        fields: &[(&str, &str)],
        file: Option<(&str, &str, &[u8])>,
    ) -> (StatusCode, Value) {
        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
        self.send(request(
            Method::POST,
            uri,
            token,
            Body::from(multipart_body(fields, file)),
            Some(&content_type),
        ))
        .await
    }

    fn seed_sound(&self, s_id: &str, owner: OwnerRef) -> SoundRecord {
        let sound = SoundRecord {
            s_id: s_id.to_string(),
            slug: format!("{s_id}-slug"),
            title: format!("Sound {s_id}"),
            duration: 1.5,
            views: 0,
            downloads: 0,
            category: "memes".to_string(),
            tags: vec!["loud".to_string()],
            nsfw: false,
            audio_key: format!("store/{s_id}.mp3"),
            user: owner,
            created_at: Utc::now(),
        };
        assert!(self.state.db.create_sound(&sound).unwrap());
        sound
    }
}

fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Body,
    content_type: Option<&str>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).unwrap()
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn owner(uid: &str, name: &str) -> OwnerRef {
    OwnerRef {
        uid: uid.to_string(),
        name: name.to_string(),
    }
}

// ============================================================================
// Soundboards
// ============================================================================

#[tokio::test]
async fn unknown_category_is_400_failure() {
    let app = TestApp::new();
    let (status, body) = app.get("/api/category/does-not-exist", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn category_lifecycle() {
    let app = TestApp::new();
    let (_, token) = signed_in_user(&app.state, "ada@example.com", Some("ada1"));
    let (_, other) = signed_in_user(&app.state, "bob@example.com", Some("bob1"));
    app.seed_sound("s1", owner("bob1", "bob"));

    let (status, body) = app
        .json(Method::POST, "/api/category", Some(&token), json!({"name": "Favorites"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let sb_id = body["data"]["sb_id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["user"]["uid"], "ada1");

    let uri = format!("/api/category/{sb_id}/sounds");
    let (status, _) = app
        .json(Method::POST, &uri, Some(&token), json!({"s_id": "s1"}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(Method::POST, &uri, Some(&token), json!({"s_id": "s1"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .json(Method::POST, &uri, Some(&token), json!({"s_id": "missing"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .json(Method::POST, &uri, Some(&other), json!({"s_id": "s1"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get(&format!("/api/category/{sb_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["s_ids"], json!(["s1"]));

    let (status, body) = app.get("/api/category?uid=ada1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .send(request(
            Method::DELETE,
            &format!("/api/category/{sb_id}/sounds/s1"),
            Some(&token),
            Body::empty(),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(request(
            Method::DELETE,
            &format!("/api/category/{sb_id}"),
            Some(&token),
            Body::empty(),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&format!("/api/category/{sb_id}"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn creating_category_requires_handle() {
    let app = TestApp::new();
    let (_, token) = signed_in_user(&app.state, "new@example.com", None);
    let (status, _) = app
        .json(Method::POST, "/api/category", Some(&token), json!({"name": "Mine"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json(Method::POST, "/api/category", None, json!({"name": "Mine"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"success": false, "error": "Unauthorized"}));
}

// ============================================================================
// Counters
// ============================================================================

#[tokio::test]
async fn increments_accumulate() {
    let app = TestApp::new();
    app.seed_sound("s1", owner("ada1", "ada"));

    for expected in 1..=2 {
        let (status, body) = app
            .send(request(
                Method::POST,
                "/api/sounds/s1/increment-view",
                None,
                Body::empty(),
                None,
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["views"], expected);
    }

    let (_, body) = app
        .send(request(
            Method::POST,
            "/api/sounds/s1/increment-download",
            None,
            Body::empty(),
            None,
        ))
        .await;
    assert_eq!(body["data"]["downloads"], 1);

    let (_, body) = app.get("/api/sounds/s1", None).await;
    assert_eq!(body["data"]["views"], 2);
    assert_eq!(body["data"]["downloads"], 1);

    let (status, _) = app
        .send(request(
            Method::POST,
            "/api/sounds/nope/increment-view",
            None,
            Body::empty(),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn counters_accept_slug() {
    let app = TestApp::new();
    app.seed_sound("s1", owner("ada1", "ada"));

    for path in [
        "/api/sounds/s1-slug/increment-view",
        "/api/sounds/s1-slug/increment-download",
    ] {
        let (status, body) = app
            .send(request(Method::POST, path, None, Body::empty(), None))
            .await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(body["data"]["s_id"], "s1");
    }

    let (_, body) = app.get("/api/sounds/s1", None).await;
    assert_eq!(body["data"]["views"], 1);
    assert_eq!(body["data"]["downloads"], 1);
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn rename_fans_out_to_sounds_and_soundboards() {
    let app = TestApp::new();
    let (_, token) = signed_in_user(&app.state, "ada@example.com", Some("ada1"));
    app.seed_sound("s1", owner("ada1", "ada"));
    app.seed_sound("s2", owner("bob1", "bob"));
    app.state
        .db
        .create_soundboard(&SoundboardRecord {
            sb_id: "sb1".to_string(),
            name: "Board".to_string(),
            user: owner("ada1", "ada"),
            created_at: Utc::now(),
        })
        .unwrap();

    let (status, body) = app
        .json(Method::PUT, "/api/me/name", Some(&token), json!({"name": "Ada L."}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["sounds_updated"], 1);
    assert_eq!(body["data"]["soundboards_updated"], 1);

    let (_, body) = app.get("/api/sounds/s1", None).await;
    assert_eq!(body["data"]["user"]["name"], "Ada L.");
    let (_, body) = app.get("/api/sounds/s2", None).await;
    assert_eq!(body["data"]["user"]["name"], "bob");
    let (_, body) = app.get("/api/category/sb1", None).await;
    assert_eq!(body["data"]["user"]["name"], "Ada L.");
    let (_, body) = app.get("/api/profile/ada1", None).await;
    assert_eq!(body["data"]["name"], "Ada L.");
}

#[tokio::test]
async fn check_uid_reports_availability() {
    let app = TestApp::new();
    signed_in_user(&app.state, "ada@example.com", Some("ada1"));

    let (status, body) = app.get("/api/user/check-uid?uid=%20Ada1%20", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"uid": "ada1", "available": false}));

    let (_, body) = app.get("/api/user/check-uid?uid=grace42", None).await;
    assert_eq!(body["data"]["available"], true);

    for bad in ["12345", "abcdef", "ab1", "_abc1"] {
        let (status, body) = app
            .get(&format!("/api/user/check-uid?uid={bad}"), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{bad}");
        assert_eq!(body["success"], false);
        assert_eq!(body["issues"][0]["path"], "uid");
    }
}

#[tokio::test]
async fn sign_in_then_claim_handle_once() {
    let app = TestApp::new();

    let (status, body) = app
        .json(Method::POST, "/api/auth/email", None, json!({"email": "Grace@Example.com"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let email_token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/verify",
            None,
            json!({"email": "grace@example.com", "token": "wrong"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/verify",
            None,
            json!({"email": "grace@example.com", "token": email_token}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["created"], true);
    assert_eq!(body["data"]["user"]["name"], "grace");
    let session = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/api/auth/session", Some(&session)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "grace@example.com");

    let (status, body) = app
        .json(Method::PUT, "/api/me/uid", Some(&session), json!({"uid": "Grace42"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["uid"], "grace42");

    let (status, _) = app
        .json(Method::PUT, "/api/me/uid", Some(&session), json!({"uid": "grace43"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn taken_handle_conflicts() {
    let app = TestApp::new();
    signed_in_user(&app.state, "ada@example.com", Some("ada1"));
    let (_, token) = signed_in_user(&app.state, "bob@example.com", None);

    let (status, _) = app
        .json(Method::PUT, "/api/me/uid", Some(&token), json!({"uid": "ada1"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn preference_update_validates() {
    let app = TestApp::new();
    let (_, token) = signed_in_user(&app.state, "ada@example.com", Some("ada1"));

    let (status, body) = app
        .json(
            Method::PUT,
            "/api/me/preference",
            Some(&token),
            json!({"theme": "dark", "language": "ja"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["theme"], "dark");
    assert_eq!(body["data"]["language"], "ja");

    let (status, body) = app
        .json(
            Method::PUT,
            "/api/me/preference",
            Some(&token),
            json!({"theme": "neon"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["issues"][0]["path"], "theme");

    let (_, body) = app.get("/api/me", Some(&token)).await;
    assert_eq!(body["data"]["preference"]["theme"], "dark");
}

// ============================================================================
// Uploads
// ============================================================================

#[tokio::test]
async fn upload_requires_session_before_touching_storage() {
    let app = TestApp::new();
    let (status, body) = app
        .multipart(
            "/api/upload",
            None,
            &[("folder", "thumb")],
            Some(("cover.png", "image/png", &b"png-bytes"[..])),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Unauthorized");
    assert!(!app.state.object_store.exists("thumb/cover.png").await.unwrap());
}

#[tokio::test]
async fn upload_requires_file_and_folder() {
    let app = TestApp::new();
    let (_, token) = signed_in_user(&app.state, "ada@example.com", Some("ada1"));

    let (status, _) = app
        .multipart(
            "/api/upload",
            Some(&token),
            &[],
            Some(("cover.png", "image/png", &b"png-bytes"[..])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .multipart("/api/upload", Some(&token), &[("folder", "thumb")], None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .multipart(
            "/api/upload",
            Some(&token),
            &[("folder", "secrets")],
            Some(("cover.png", "image/png", &b"png-bytes"[..])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_serve_and_delete() {
    let app = TestApp::new();
    let (_, token) = signed_in_user(&app.state, "ada@example.com", Some("ada1"));

    let (status, body) = app
        .multipart(
            "/api/upload",
            Some(&token),
            &[("folder", "thumb"), ("fileName", "cover.png")],
            Some(("whatever.png", "image/png", &b"png-bytes"[..])),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["key"], "thumb/cover.png");
    assert_eq!(
        body["data"]["url"],
        "http://localhost:8080/static/thumb/cover.png"
    );

    let response = app
        .router
        .clone()
        .oneshot(request(Method::GET, "/static/thumb/cover.png", None, Body::empty(), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"png-bytes");

    let (status, _) = app
        .send(request(
            Method::DELETE,
            "/api/upload?key=thumb/cover.png",
            Some(&token),
            Body::empty(),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!app.state.object_store.exists("thumb/cover.png").await.unwrap());

    let (status, _) = app
        .send(request(
            Method::DELETE,
            "/api/upload?key=../etc/passwd",
            Some(&token),
            Body::empty(),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_to_store_applies_audio_policy() {
    let app = TestApp::new();
    let (_, token) = signed_in_user(&app.state, "ada@example.com", Some("ada1"));

    let (status, body) = app
        .multipart(
            "/api/upload",
            Some(&token),
            &[("folder", "store")],
            Some(("clip.wav", "audio/wav", &b"RIFF...."[..])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("audio/mpeg"));
}

#[tokio::test]
async fn mp3_name_does_not_stand_in_for_audio_type() {
    let app = TestApp::new();
    let (_, token) = signed_in_user(&app.state, "ada@example.com", Some("ada1"));
    let clip = cbr_stream(10);

    let (status, body) = app
        .multipart(
            "/api/upload",
            Some(&token),
            &[("folder", "store")],
            Some(("clip.mp3", "application/octet-stream", &clip[..])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let expected = AudioError::UnsupportedMime("application/octet-stream".into()).to_string();
    assert_eq!(body["message"], expected.as_str());

    let (status, body) = app
        .multipart(
            "/api/sounds",
            Some(&token),
            &[("title", "Boom"), ("category", "memes")],
            Some(("clip.mp3", "application/octet-stream", &clip[..])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], expected.as_str());

    // Cover images still get a type from their name
    let (status, body) = app
        .multipart(
            "/api/upload",
            Some(&token),
            &[("folder", "thumb")],
            Some(("cover.png", "application/octet-stream", &b"\x89PNG"[..])),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["content_type"], "image/png");
}

// ============================================================================
// Sounds
// ============================================================================

#[tokio::test]
async fn create_sound_validates_and_stores() {
    let app = TestApp::new();
    let (_, token) = signed_in_user(&app.state, "ada@example.com", Some("ada1"));
    let clip = cbr_stream(40);

    let (status, body) = app
        .multipart(
            "/api/sounds",
            Some(&token),
            &[("title", "Vine Boom"), ("category", "Memes"), ("tags", "loud,Boom")],
            Some(("boom.mp3", "audio/mpeg", &clip[..])),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let data = &body["data"];
    let s_id = data["s_id"].as_str().unwrap();
    assert!(data["slug"].as_str().unwrap().starts_with("vine-boom-"));
    assert_eq!(data["category"], "memes");
    assert_eq!(data["tags"], json!(["loud", "boom"]));
    assert_eq!(data["user"], json!({"uid": "ada1", "name": "ada"}));
    let key = format!("store/{s_id}.mp3");
    assert!(app.state.object_store.exists(&key).await.unwrap());

    let (_, listing) = app.get("/api/sounds?category=memes", None).await;
    assert_eq!(listing["data"]["pagination"]["total"], 1);
    assert_eq!(listing["data"]["items"][0]["s_id"], s_id);

    let slug = data["slug"].as_str().unwrap();
    let (status, _) = app.get(&format!("/api/sounds/{slug}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn create_sound_rejects_bad_audio() {
    let app = TestApp::new();
    let (_, token) = signed_in_user(&app.state, "ada@example.com", Some("ada1"));
    let fields = [("title", "Boom"), ("category", "memes")];

    let (status, _) = app
        .multipart(
            "/api/sounds",
            Some(&token),
            &fields,
            Some(("boom.ogg", "audio/ogg", &b"OggS"[..])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .multipart(
            "/api/sounds",
            Some(&token),
            &fields,
            Some(("boom.mp3", "audio/mpeg", &[0u8; 2048][..])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // ~18s at 128 kbit/s
    let long = cbr_stream(700);
    let (status, body) = app
        .multipart(
            "/api/sounds",
            Some(&token),
            &fields,
            Some(("boom.mp3", "audio/mpeg", &long[..])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("limit"));

    let (status, body) = app
        .multipart(
            "/api/sounds",
            Some(&token),
            &[("category", "memes")],
            Some(("boom.mp3", "audio/mpeg", &cbr_stream(10)[..])),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["issues"][0]["path"], "title");

    let (_, listing) = app.get("/api/sounds", None).await;
    assert_eq!(listing["data"]["pagination"]["total"], 0);
}

#[tokio::test]
async fn only_uploader_deletes_sound() {
    let app = TestApp::new();
    let (_, ada) = signed_in_user(&app.state, "ada@example.com", Some("ada1"));
    let (_, bob) = signed_in_user(&app.state, "bob@example.com", Some("bob1"));
    app.seed_sound("s1", owner("ada1", "ada"));

    let delete = |token: &str| {
        request(Method::DELETE, "/api/sounds/s1", Some(token), Body::empty(), None)
    };

    let (status, _) = app.send(delete(&bob)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(delete(&ada)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/sounds/s1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn favs_round_trip() {
    let app = TestApp::new();
    let (_, token) = signed_in_user(&app.state, "ada@example.com", Some("ada1"));
    app.seed_sound("s1", owner("bob1", "bob"));

    let fav = |method: Method| request(method, "/api/sounds/s1/fav", Some(&token), Body::empty(), None);

    let (status, body) = app.send(fav(Method::PUT)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["favorited"], true);

    let (_, body) = app.get("/api/me/favs", Some(&token)).await;
    assert_eq!(body["data"][0]["s_id"], "s1");

    let (_, body) = app.send(fav(Method::DELETE)).await;
    assert_eq!(body["data"]["favorited"], false);

    let (_, body) = app.get("/api/me/favs", Some(&token)).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn list_sounds_rejects_bad_paging() {
    let app = TestApp::new();
    let (status, _) = app.get("/api/sounds?limit=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/sounds?page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = app.get("/api/sounds?page=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Invalid query parameter"));
}

// ============================================================================
// Logs and admin
// ============================================================================

#[tokio::test]
async fn messages_and_not_found_hits() {
    let app = TestApp::new();

    let (status, _) = app
        .json(
            Method::POST,
            "/api/message",
            None,
            json!({"name": "A", "email": "a@example.com", "message": "Mislabeled", "s_id": "s1"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .json(Method::POST, "/api/message", None, json!({"email": "x", "message": ""}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["issues"].as_array().unwrap().len(), 2);

    let (_, body) = app.get("/admin/messages", None).await;
    assert_eq!(body["data"][0]["s_id"], "s1");

    for hits in 1..=2 {
        let (_, body) = app
            .json(Method::POST, "/api/not-found", None, json!({"path": "/sounds/gone"}))
            .await;
        assert_eq!(body["data"]["hits"], hits);
    }
}

#[tokio::test]
async fn purge_wipes_everything() {
    let app = TestApp::new();
    signed_in_user(&app.state, "ada@example.com", Some("ada1"));
    app.seed_sound("s1", owner("ada1", "ada"));

    let (status, body) = app
        .send(request(Method::DELETE, "/admin/purge", None, Body::empty(), None))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["users_deleted"], 1);
    assert_eq!(body["data"]["sounds_deleted"], 1);

    let (status, _) = app.get("/api/sounds/s1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_reports_version() {
    let app = TestApp::new();
    let (status, body) = app.get("/_internal/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}
