//! HTTP handlers, one module per entity kind plus the media endpoints.
//!
//! Every mutating request carries `actor_id` in its body; the external
//! identity provider has already authenticated it by the time it reaches
//! this layer.

pub mod albums;
pub mod archive;
pub mod comments;
pub mod extract;
pub mod journal;
pub mod likes;
pub mod media;
pub mod posts;
pub mod response;

pub use extract::ApiJson;
pub use response::{ApiResponse, ApiResult};

use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::config;
use crate::error::ApiError;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        // Posts
        .route("/api/posts", post(posts::create))
        .route("/api/posts/:id", patch(posts::update).delete(posts::delete))
        .route("/api/posts/:id/like", post(likes::toggle_post_like))
        // Comments
        .route("/api/comments", post(comments::create))
        .route(
            "/api/comments/:id",
            patch(comments::update).delete(comments::delete),
        )
        // Journal entries
        .route("/api/journal", post(journal::create))
        .route(
            "/api/journal/:id",
            patch(journal::update).delete(journal::delete),
        )
        // Archive items
        .route("/api/archive", post(archive::create))
        .route(
            "/api/archive/:id",
            patch(archive::update).delete(archive::delete),
        )
        .route("/api/archive/:id/like", post(likes::toggle_archive_like))
        // Albums (administrative scope)
        .route("/api/albums", post(albums::create))
        .route(
            "/api/albums/:id",
            patch(albums::update).delete(albums::delete),
        )
        // Media
        .route("/api/media", post(media::upload))
        .route("/api/media/sign", post(media::sign))
        // The default 2 MiB body limit is far below the archive ceiling
        .layer(DefaultBodyLimit::max(config::config().server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Tidepool API",
            "version": version,
            "description": "Secure mutation and media access layer",
            "endpoints": {
                "posts": "/api/posts[/:id][/like]",
                "comments": "/api/comments[/:id]",
                "journal": "/api/journal[/:id]",
                "archive": "/api/archive[/:id][/like]",
                "albums": "/api/albums[/:id]",
                "media": "/api/media, /api/media/sign",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    let now = chrono::Utc::now();
    state
        .store
        .ping()
        .await
        .map_err(|e| ApiError::service_unavailable(format!("data store unavailable: {e}")))?;

    Ok(ApiResponse::success(json!({
        "status": "ok",
        "timestamp": now,
        "store": "ok"
    })))
}

/// Trim a required text field, rejecting values that are empty after trimming.
pub(crate) fn required_trimmed(field: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::missing_field(field));
    }
    Ok(trimmed.to_string())
}

/// Collapse blank optional text to `None`. Sending an empty string is how
/// callers clear an optional field under partial-update semantics.
pub(crate) fn none_if_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
