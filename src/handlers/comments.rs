use axum::extract::{Path, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::posts::ActorRequest;
use crate::handlers::{required_trimmed, ApiJson, ApiResponse, ApiResult};
use crate::models::Comment;
use crate::policy::{authorize, Action, Decision};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub actor_id: String,
    pub post_id: Uuid,
    pub content: String,
}

/// Content is the comment's only mutable field, so update is a full replace
/// and the field is required.
#[derive(Debug, Deserialize)]
pub struct UpdateCommentRequest {
    pub actor_id: String,
    pub content: String,
}

/// POST /api/comments - Create a comment on a post
///
/// The target post's existence is not verified here; a bogus `post_id` is
/// the store's to reject.
pub async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateCommentRequest>,
) -> ApiResult<Value> {
    let actor_id = required_trimmed("actor_id", &payload.actor_id)?;
    let content = required_trimmed("content", &payload.content)?;

    let comment = Comment {
        id: Uuid::new_v4(),
        post_id: payload.post_id,
        owner_id: actor_id,
        content,
        created_at: Utc::now(),
        updated_at: None,
    };

    state.store.insert_comment(&comment).await?;
    Ok(ApiResponse::success(json!(comment)))
}

/// PATCH /api/comments/:id - Update a comment (owner only)
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateCommentRequest>,
) -> ApiResult<Value> {
    let actor_id = required_trimmed("actor_id", &payload.actor_id)?;
    let content = required_trimmed("content", &payload.content)?;

    let mut comment = state
        .store
        .get_comment(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("comment {id} not found")))?;

    if authorize(&actor_id, &comment.owner_id, Action::Update) == Decision::Deny {
        return Err(ApiError::forbidden("only the owner may update this comment"));
    }

    comment.content = content;
    comment.updated_at = Some(Utc::now());

    if !state.store.update_comment(&comment).await? {
        return Err(ApiError::not_found(format!("comment {id} not found")));
    }
    Ok(ApiResponse::success(json!(comment)))
}

/// DELETE /api/comments/:id - Delete a comment (owner only)
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ActorRequest>,
) -> ApiResult<Value> {
    let actor_id = required_trimmed("actor_id", &payload.actor_id)?;

    let comment = state
        .store
        .get_comment(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("comment {id} not found")))?;

    if authorize(&actor_id, &comment.owner_id, Action::Delete) == Decision::Deny {
        return Err(ApiError::forbidden("only the owner may delete this comment"));
    }

    if !state.store.delete_comment(id, &actor_id).await? {
        return Err(ApiError::not_found(format!("comment {id} not found")));
    }
    Ok(ApiResponse::success(json!({ "deleted": true })))
}
