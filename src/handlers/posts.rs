use axum::extract::{Path, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::{none_if_blank, required_trimmed, ApiJson, ApiResponse, ApiResult};
use crate::models::Post;
use crate::policy::{authorize, Action, Decision};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub actor_id: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub content_warning: Option<String>,
    pub media_url: Option<String>,
}

/// Partial update: an omitted field is left unchanged. Optional text fields
/// (`content_warning`, `media_url`) are cleared by sending an empty string.
#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub actor_id: String,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub content_warning: Option<String>,
    pub media_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActorRequest {
    pub actor_id: String,
}

/// POST /api/posts - Create a post
pub async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreatePostRequest>,
) -> ApiResult<Value> {
    let actor_id = required_trimmed("actor_id", &payload.actor_id)?;
    let content = required_trimmed("content", &payload.content)?;

    let post = Post {
        id: Uuid::new_v4(),
        owner_id: actor_id,
        content,
        tags: payload.tags,
        content_warning: none_if_blank(payload.content_warning),
        media_url: none_if_blank(payload.media_url),
        created_at: Utc::now(),
        updated_at: None,
    };

    state.store.insert_post(&post).await?;
    Ok(ApiResponse::success(json!(post)))
}

/// PATCH /api/posts/:id - Update a post (owner only)
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdatePostRequest>,
) -> ApiResult<Value> {
    let actor_id = required_trimmed("actor_id", &payload.actor_id)?;

    let mut post = state
        .store
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("post {id} not found")))?;

    if authorize(&actor_id, &post.owner_id, Action::Update) == Decision::Deny {
        return Err(ApiError::forbidden("only the owner may update this post"));
    }

    if let Some(content) = payload.content {
        post.content = required_trimmed("content", &content)?;
    }
    if let Some(tags) = payload.tags {
        post.tags = tags;
    }
    if let Some(warning) = payload.content_warning {
        post.content_warning = none_if_blank(Some(warning));
    }
    if let Some(media_url) = payload.media_url {
        post.media_url = none_if_blank(Some(media_url));
    }
    post.updated_at = Some(Utc::now());

    if !state.store.update_post(&post).await? {
        return Err(ApiError::not_found(format!("post {id} not found")));
    }
    Ok(ApiResponse::success(json!(post)))
}

/// DELETE /api/posts/:id - Delete a post (owner only)
///
/// Two-step protocol: fetch to learn the owner, then delete with the
/// compound (id AND owner) predicate so an ownership change between the
/// check and the delete cannot remove someone else's record.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ActorRequest>,
) -> ApiResult<Value> {
    let actor_id = required_trimmed("actor_id", &payload.actor_id)?;

    let post = state
        .store
        .get_post(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("post {id} not found")))?;

    if authorize(&actor_id, &post.owner_id, Action::Delete) == Decision::Deny {
        // Denial short-circuits: the delete call is never attempted
        return Err(ApiError::forbidden("only the owner may delete this post"));
    }

    if !state.store.delete_post(id, &actor_id).await? {
        return Err(ApiError::not_found(format!("post {id} not found")));
    }
    Ok(ApiResponse::success(json!({ "deleted": true })))
}
