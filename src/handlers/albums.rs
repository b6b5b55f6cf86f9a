//! Album mutators. Administrative scope: albums have no per-record owner
//! and the policy gate is never consulted; the admin surface in front of
//! this layer decides who may call these endpoints.

use axum::extract::{Path, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::{none_if_blank, required_trimmed, ApiJson, ApiResponse, ApiResult};
use crate::models::Album;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAlbumRequest {
    pub title: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
}

/// Full replace: the moderation form submits the whole record, so omitted
/// optional fields reset to null rather than staying unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateAlbumRequest {
    pub title: String,
    pub description: Option<String>,
    pub cover_url: Option<String>,
}

/// POST /api/albums - Create an album
pub async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateAlbumRequest>,
) -> ApiResult<Value> {
    let title = required_trimmed("title", &payload.title)?;

    let album = Album {
        id: Uuid::new_v4(),
        title,
        description: none_if_blank(payload.description),
        cover_url: none_if_blank(payload.cover_url),
        created_at: Utc::now(),
        updated_at: None,
    };

    state.store.insert_album(&album).await?;
    Ok(ApiResponse::success(json!(album)))
}

/// PATCH /api/albums/:id - Replace an album's fields
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateAlbumRequest>,
) -> ApiResult<Value> {
    let mut album = state
        .store
        .get_album(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("album {id} not found")))?;

    album.title = required_trimmed("title", &payload.title)?;
    album.description = none_if_blank(payload.description);
    album.cover_url = none_if_blank(payload.cover_url);
    album.updated_at = Some(Utc::now());

    if !state.store.update_album(&album).await? {
        return Err(ApiError::not_found(format!("album {id} not found")));
    }
    Ok(ApiResponse::success(json!(album)))
}

/// DELETE /api/albums/:id - Delete an album
pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    if !state.store.delete_album(id).await? {
        return Err(ApiError::not_found(format!("album {id} not found")));
    }
    Ok(ApiResponse::success(json!({ "deleted": true })))
}
