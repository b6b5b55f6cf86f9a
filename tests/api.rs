//! In-process API tests against the in-memory data and object stores.

use std::sync::Arc;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use tidepool_api::handlers;
use tidepool_api::media::{MemoryObjectStore, UploadRouter, UrlSigner};
use tidepool_api::models::EdgeKind;
use tidepool_api::state::AppState;
use tidepool_api::store::{DataStore, MemoryStore};

const PUBLIC_BASE: &str = "https://media.test.example";

struct TestApp {
    app: Router,
    store: Arc<MemoryStore>,
}

fn test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let signer = Arc::new(UrlSigner::new("test-secret", PUBLIC_BASE, 3600));
    let objects = Arc::new(MemoryObjectStore::new());
    let uploads = Arc::new(UploadRouter::new(
        objects,
        signer.clone(),
        PUBLIC_BASE,
        "test-bucket",
    ));
    let state = AppState::new(store.clone(), uploads, signer);
    TestApp {
        app: handlers::router(state),
        store,
    }
}

async fn request_json(
    app: &Router,
    method: Method,
    uri: &str,
    body: Value,
) -> Result<(StatusCode, Value)> {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))?,
        )
        .await?;

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value: Value = serde_json::from_slice(&bytes)?;
    Ok((status, value))
}

async fn create_post(app: &Router, actor: &str, content: &str) -> Result<String> {
    let (status, body) = request_json(
        app,
        Method::POST,
        "/api/posts",
        json!({ "actor_id": actor, "content": content }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    Ok(body["data"]["id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn end_to_end_post_lifecycle() -> Result<()> {
    let t = test_app();

    // u1 creates a post
    let post_id = create_post(&t.app, "u1", "hello").await?;

    // u2 likes, then unlikes
    let like_uri = format!("/api/posts/{post_id}/like");
    let (status, body) =
        request_json(&t.app, Method::POST, &like_uri, json!({ "actor_id": "u2" })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["liked"], json!(true));

    let (_, body) =
        request_json(&t.app, Method::POST, &like_uri, json!({ "actor_id": "u2" })).await?;
    assert_eq!(body["data"]["liked"], json!(false));

    // u2 may not delete u1's post
    let post_uri = format!("/api/posts/{post_id}");
    let (status, body) =
        request_json(&t.app, Method::DELETE, &post_uri, json!({ "actor_id": "u2" })).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("FORBIDDEN"));

    // u1 deletes it; a second attempt finds nothing
    let (status, _) =
        request_json(&t.app, Method::DELETE, &post_uri, json!({ "actor_id": "u1" })).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        request_json(&t.app, Method::DELETE, &post_uri, json!({ "actor_id": "u1" })).await?;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
    Ok(())
}

#[tokio::test]
async fn create_post_validates_required_fields() -> Result<()> {
    let t = test_app();

    let (status, body) = request_json(
        &t.app,
        Method::POST,
        "/api/posts",
        json!({ "actor_id": "u1", "content": "   " }),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));
    assert!(body["field_errors"]["content"].is_string());

    let (status, body) = request_json(
        &t.app,
        Method::POST,
        "/api/posts",
        json!({ "actor_id": "", "content": "hi" }),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["actor_id"].is_string());
    Ok(())
}

#[tokio::test]
async fn undeserializable_body_answers_in_the_envelope() -> Result<()> {
    let t = test_app();
    let post_id = create_post(&t.app, "u1", "hello").await?;

    // Field missing from the body entirely
    let (status, body) = request_json(
        &t.app,
        Method::POST,
        &format!("/api/posts/{post_id}/like"),
        json!({}),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("INVALID_JSON"));
    assert!(body["error"].as_str().unwrap().contains("actor_id"));

    // Body that is not JSON at all
    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/posts")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("not json"))?,
        )
        .await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let body: Value = serde_json::from_slice(&bytes)?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!("INVALID_JSON"));
    Ok(())
}

#[tokio::test]
async fn toggle_alternation_matches_edge_state() -> Result<()> {
    let t = test_app();
    let post_id = create_post(&t.app, "u1", "toggle me").await?;
    let uri = format!("/api/posts/{post_id}/like");
    let target: uuid::Uuid = post_id.parse()?;

    for round in 1..=5 {
        let (_, body) =
            request_json(&t.app, Method::POST, &uri, json!({ "actor_id": "u2" })).await?;
        let liked = body["data"]["liked"].as_bool().unwrap();
        assert_eq!(liked, round % 2 == 1, "round {round}");

        let edge = t
            .store
            .edge_exists(EdgeKind::PostLike, "u2", target)
            .await
            .unwrap();
        assert_eq!(edge, liked, "edge state diverged on round {round}");
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_toggles_never_duplicate_an_edge() -> Result<()> {
    let t = test_app();
    let post_id = create_post(&t.app, "u1", "raced").await?;
    let uri = format!("/api/posts/{post_id}/like");
    let target: uuid::Uuid = post_id.parse()?;

    let app_a = t.app.clone();
    let app_b = t.app.clone();
    let uri_a = uri.clone();
    let uri_b = uri.clone();

    let (a, b) = tokio::join!(
        tokio::spawn(async move {
            request_json(&app_a, Method::POST, &uri_a, json!({ "actor_id": "u2" })).await
        }),
        tokio::spawn(async move {
            request_json(&app_b, Method::POST, &uri_b, json!({ "actor_id": "u2" })).await
        }),
    );

    let (_, body_a) = a??;
    let (_, body_b) = b??;
    let liked_a = body_a["data"]["liked"].as_bool().unwrap();
    let liked_b = body_b["data"]["liked"].as_bool().unwrap();

    // Whatever the interleaving, the edge set holds at most one edge and
    // the reported states must agree with it: two trues mean both raced the
    // insert (edge present); a true/false pair means a full flip happened.
    let edge = t
        .store
        .edge_exists(EdgeKind::PostLike, "u2", target)
        .await
        .unwrap();
    match (liked_a, liked_b) {
        (true, true) => assert!(edge, "both inserts reported liked but no edge exists"),
        (true, false) | (false, true) => assert!(!edge, "flip completed but edge remains"),
        (false, false) => panic!("two first-toggles cannot both unlike"),
    }
    Ok(())
}

#[tokio::test]
async fn post_update_is_partial() -> Result<()> {
    let t = test_app();

    let (_, body) = request_json(
        &t.app,
        Method::POST,
        "/api/posts",
        json!({
            "actor_id": "u1",
            "content": "original",
            "tags": ["a", "b"],
            "content_warning": "spoilers"
        }),
    )
    .await?;
    let post_id = body["data"]["id"].as_str().unwrap().to_string();

    // Only content changes; tags and warning stay
    let (status, body) = request_json(
        &t.app,
        Method::PATCH,
        &format!("/api/posts/{post_id}"),
        json!({ "actor_id": "u1", "content": "edited" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["content"], json!("edited"));
    assert_eq!(body["data"]["tags"], json!(["a", "b"]));
    assert_eq!(body["data"]["content_warning"], json!("spoilers"));
    assert!(body["data"]["updated_at"].is_string());

    // Empty string clears an optional field
    let (_, body) = request_json(
        &t.app,
        Method::PATCH,
        &format!("/api/posts/{post_id}"),
        json!({ "actor_id": "u1", "content_warning": "" }),
    )
    .await?;
    assert_eq!(body["data"]["content_warning"], json!(null));
    assert_eq!(body["data"]["content"], json!("edited"));
    Ok(())
}

#[tokio::test]
async fn non_owner_cannot_update_a_comment() -> Result<()> {
    let t = test_app();
    let post_id = create_post(&t.app, "u1", "target").await?;

    let (status, body) = request_json(
        &t.app,
        Method::POST,
        "/api/comments",
        json!({ "actor_id": "u1", "post_id": post_id, "content": "first!" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let comment_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = request_json(
        &t.app,
        Method::PATCH,
        &format!("/api/comments/{comment_id}"),
        json!({ "actor_id": "u2", "content": "hijacked" }),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request_json(
        &t.app,
        Method::DELETE,
        &format!("/api/comments/{comment_id}"),
        json!({ "actor_id": "u2" }),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Untouched by the denied attempts
    let comment = t
        .store
        .get_comment(comment_id.parse()?)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(comment.content, "first!");
    Ok(())
}

#[tokio::test]
async fn journal_entries_default_to_private() -> Result<()> {
    let t = test_app();

    let (status, body) = request_json(
        &t.app,
        Method::POST,
        "/api/journal",
        json!({ "actor_id": "u1", "title": "day one", "body": "it rained" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_private"], json!(true));
    let entry_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = request_json(
        &t.app,
        Method::PATCH,
        &format!("/api/journal/{entry_id}"),
        json!({ "actor_id": "u1", "is_private": false }),
    )
    .await?;
    assert_eq!(body["data"]["is_private"], json!(false));
    // Partial semantics: title and body untouched
    assert_eq!(body["data"]["title"], json!("day one"));
    assert_eq!(body["data"]["body"], json!("it rained"));
    Ok(())
}

#[tokio::test]
async fn album_update_is_full_replace() -> Result<()> {
    let t = test_app();

    let (status, body) = request_json(
        &t.app,
        Method::POST,
        "/api/albums",
        json!({ "title": "summer", "description": "beach photos" }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let album_id = body["data"]["id"].as_str().unwrap().to_string();

    // Omitting description resets it
    let (_, body) = request_json(
        &t.app,
        Method::PATCH,
        &format!("/api/albums/{album_id}"),
        json!({ "title": "summer 2024" }),
    )
    .await?;
    assert_eq!(body["data"]["title"], json!("summer 2024"));
    assert_eq!(body["data"]["description"], json!(null));

    let (status, _) = request_json(
        &t.app,
        Method::DELETE,
        &format!("/api/albums/{album_id}"),
        json!({}),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request_json(
        &t.app,
        Method::DELETE,
        &format!("/api/albums/{album_id}"),
        json!({}),
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

// ---- media ----

const BOUNDARY: &str = "tidepool-test-boundary";

fn multipart_upload_body(
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((filename, content_type, data)) = file {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn upload(
    app: &Router,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Result<(StatusCode, Value)> {
    let body = multipart_upload_body(fields, file);
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/api/media")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))?,
        )
        .await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    let value: Value = serde_json::from_slice(&bytes)?;
    Ok((status, value))
}

#[tokio::test]
async fn upload_stores_and_reports_reference() -> Result<()> {
    let t = test_app();

    let (status, body) = upload(
        &t.app,
        &[("category", "avatar"), ("actor_id", "u1")],
        Some(("me.jpg", "image/jpeg", b"\xff\xd8\xff\xe0jpeg-bytes")),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{body}");

    let data = &body["data"];
    assert_eq!(data["bucket"], json!("test-bucket"));
    let path = data["path"].as_str().unwrap();
    assert!(path.starts_with("u1/avatar/"), "{path}");
    assert!(path.ends_with("_me.jpg"), "{path}");
    assert_eq!(
        data["url"].as_str().unwrap(),
        format!("{PUBLIC_BASE}/{path}")
    );
    Ok(())
}

#[tokio::test]
async fn identical_uploads_get_distinct_paths() -> Result<()> {
    let t = test_app();

    let (_, first) = upload(
        &t.app,
        &[("category", "avatar"), ("actor_id", "u1")],
        Some(("me.jpg", "image/jpeg", b"one")),
    )
    .await?;
    let (_, second) = upload(
        &t.app,
        &[("category", "avatar"), ("actor_id", "u1")],
        Some(("me.jpg", "image/jpeg", b"two")),
    )
    .await?;

    assert_ne!(first["data"]["path"], second["data"]["path"]);
    Ok(())
}

#[tokio::test]
async fn upload_rejects_disallowed_type_and_oversize() -> Result<()> {
    let t = test_app();

    let (status, body) = upload(
        &t.app,
        &[("category", "avatar"), ("actor_id", "u1")],
        Some(("tool.exe", "application/x-msdownload", b"MZ")),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("UNSUPPORTED_TYPE"));

    let oversize = vec![0u8; 5 * 1024 * 1024 + 1];
    let (status, body) = upload(
        &t.app,
        &[("category", "avatar"), ("actor_id", "u1")],
        Some(("big.jpg", "image/jpeg", &oversize)),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("TOO_LARGE"));
    assert!(body["error"].as_str().unwrap().contains("5 MiB"));
    Ok(())
}

#[tokio::test]
async fn upload_requires_file_category_and_actor() -> Result<()> {
    let t = test_app();

    let (status, body) = upload(
        &t.app,
        &[("category", "avatar"), ("actor_id", "u1")],
        None,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["file"].is_string());

    let (status, _) = upload(
        &t.app,
        &[("actor_id", "u1")],
        Some(("me.jpg", "image/jpeg", b"x")),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = upload(
        &t.app,
        &[("category", "banner"), ("actor_id", "u1")],
        Some(("me.jpg", "image/jpeg", b"x")),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("banner"));
    Ok(())
}

#[tokio::test]
async fn private_upload_resolves_signed_url() -> Result<()> {
    let t = test_app();

    let (status, body) = upload(
        &t.app,
        &[("category", "journal"), ("actor_id", "u1"), ("folder", "april")],
        Some(("page.jpg", "image/jpeg", b"scan")),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let path = body["data"]["path"].as_str().unwrap();
    assert!(path.starts_with("u1/journal/april/"), "{path}");
    let url = body["data"]["url"].as_str().unwrap();
    assert!(url.contains("/sign/"), "{url}");
    assert!(url.contains("token="), "{url}");
    Ok(())
}

#[tokio::test]
async fn signed_url_batch_isolates_malformed_entries() -> Result<()> {
    let t = test_app();
    let before = chrono::Utc::now();

    let (status, body) = request_json(
        &t.app,
        Method::POST,
        "/api/media/sign",
        json!({
            "refs": [
                "u1/journal/123_a.jpg",
                "not-a-reference",
                format!("{PUBLIC_BASE}/u2/archive/2024/456_b.pdf"),
            ]
        }),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);

    assert!(results[0]["error"].is_null());
    assert!(results[0]["url"].as_str().unwrap().contains("token="));
    let expiry: chrono::DateTime<chrono::Utc> =
        results[0]["expires_at"].as_str().unwrap().parse()?;
    assert!(expiry >= before);

    assert!(results[1]["error"].is_string());
    assert_eq!(results[1]["url"], json!("not-a-reference"));

    assert!(results[2]["error"].is_null());
    assert!(results[2]["url"]
        .as_str()
        .unwrap()
        .contains("u2/archive/2024/456_b.pdf"));
    Ok(())
}

#[tokio::test]
async fn health_reports_store_status() -> Result<()> {
    let t = test_app();
    let (status, body) = {
        let response = t
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/health")
                    .body(Body::empty())?,
            )
            .await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        (status, serde_json::from_slice::<Value>(&bytes)?)
    };
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("ok"));
    Ok(())
}
