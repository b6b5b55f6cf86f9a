use axum::extract::{Path, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::posts::ActorRequest;
use crate::handlers::{none_if_blank, required_trimmed, ApiJson, ApiResponse, ApiResult};
use crate::models::ArchiveItem;
use crate::policy::{authorize, Action, Decision};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateArchiveItemRequest {
    pub actor_id: String,
    pub title: String,
    pub description: Option<String>,
    pub media_url: Option<String>,
}

/// Partial update: an omitted field is left unchanged. Optional text fields
/// are cleared by sending an empty string.
#[derive(Debug, Deserialize)]
pub struct UpdateArchiveItemRequest {
    pub actor_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub media_url: Option<String>,
}

/// POST /api/archive - Create an archive item
pub async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateArchiveItemRequest>,
) -> ApiResult<Value> {
    let actor_id = required_trimmed("actor_id", &payload.actor_id)?;
    let title = required_trimmed("title", &payload.title)?;

    let item = ArchiveItem {
        id: Uuid::new_v4(),
        owner_id: actor_id,
        title,
        description: none_if_blank(payload.description),
        media_url: none_if_blank(payload.media_url),
        created_at: Utc::now(),
        updated_at: None,
    };

    state.store.insert_archive_item(&item).await?;
    Ok(ApiResponse::success(json!(item)))
}

/// PATCH /api/archive/:id - Update an archive item (owner only)
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateArchiveItemRequest>,
) -> ApiResult<Value> {
    let actor_id = required_trimmed("actor_id", &payload.actor_id)?;

    let mut item = state
        .store
        .get_archive_item(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("archive item {id} not found")))?;

    if authorize(&actor_id, &item.owner_id, Action::Update) == Decision::Deny {
        return Err(ApiError::forbidden(
            "only the owner may update this archive item",
        ));
    }

    if let Some(title) = payload.title {
        item.title = required_trimmed("title", &title)?;
    }
    if let Some(description) = payload.description {
        item.description = none_if_blank(Some(description));
    }
    if let Some(media_url) = payload.media_url {
        item.media_url = none_if_blank(Some(media_url));
    }
    item.updated_at = Some(Utc::now());

    if !state.store.update_archive_item(&item).await? {
        return Err(ApiError::not_found(format!("archive item {id} not found")));
    }
    Ok(ApiResponse::success(json!(item)))
}

/// DELETE /api/archive/:id - Delete an archive item (owner only)
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ActorRequest>,
) -> ApiResult<Value> {
    let actor_id = required_trimmed("actor_id", &payload.actor_id)?;

    let item = state
        .store
        .get_archive_item(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("archive item {id} not found")))?;

    if authorize(&actor_id, &item.owner_id, Action::Delete) == Decision::Deny {
        return Err(ApiError::forbidden(
            "only the owner may delete this archive item",
        ));
    }

    if !state.store.delete_archive_item(id, &actor_id).await? {
        return Err(ApiError::not_found(format!("archive item {id} not found")));
    }
    Ok(ApiResponse::success(json!({ "deleted": true })))
}
