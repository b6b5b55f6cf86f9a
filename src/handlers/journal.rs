use axum::extract::{Path, State};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::posts::ActorRequest;
use crate::handlers::{required_trimmed, ApiJson, ApiResponse, ApiResult};
use crate::models::JournalEntry;
use crate::policy::{authorize, Action, Decision};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJournalRequest {
    pub actor_id: String,
    pub title: String,
    pub body: String,
    /// Journal entries are private unless explicitly opened up
    pub is_private: Option<bool>,
}

/// Partial update: an omitted field is left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateJournalRequest {
    pub actor_id: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub is_private: Option<bool>,
}

/// POST /api/journal - Create a journal entry
pub async fn create(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateJournalRequest>,
) -> ApiResult<Value> {
    let actor_id = required_trimmed("actor_id", &payload.actor_id)?;
    let title = required_trimmed("title", &payload.title)?;
    let body = required_trimmed("body", &payload.body)?;

    let entry = JournalEntry {
        id: Uuid::new_v4(),
        owner_id: actor_id,
        title,
        body,
        is_private: payload.is_private.unwrap_or(true),
        created_at: Utc::now(),
        updated_at: None,
    };

    state.store.insert_journal_entry(&entry).await?;
    Ok(ApiResponse::success(json!(entry)))
}

/// PATCH /api/journal/:id - Update a journal entry (owner only)
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateJournalRequest>,
) -> ApiResult<Value> {
    let actor_id = required_trimmed("actor_id", &payload.actor_id)?;

    let mut entry = state
        .store
        .get_journal_entry(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("journal entry {id} not found")))?;

    if authorize(&actor_id, &entry.owner_id, Action::Update) == Decision::Deny {
        return Err(ApiError::forbidden(
            "only the owner may update this journal entry",
        ));
    }

    if let Some(title) = payload.title {
        entry.title = required_trimmed("title", &title)?;
    }
    if let Some(body) = payload.body {
        entry.body = required_trimmed("body", &body)?;
    }
    if let Some(is_private) = payload.is_private {
        entry.is_private = is_private;
    }
    entry.updated_at = Some(Utc::now());

    if !state.store.update_journal_entry(&entry).await? {
        return Err(ApiError::not_found(format!("journal entry {id} not found")));
    }
    Ok(ApiResponse::success(json!(entry)))
}

/// DELETE /api/journal/:id - Delete a journal entry (owner only)
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ActorRequest>,
) -> ApiResult<Value> {
    let actor_id = required_trimmed("actor_id", &payload.actor_id)?;

    let entry = state
        .store
        .get_journal_entry(id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("journal entry {id} not found")))?;

    if authorize(&actor_id, &entry.owner_id, Action::Delete) == Decision::Deny {
        return Err(ApiError::forbidden(
            "only the owner may delete this journal entry",
        ));
    }

    if !state.store.delete_journal_entry(id, &actor_id).await? {
        return Err(ApiError::not_found(format!("journal entry {id} not found")));
    }
    Ok(ApiResponse::success(json!({ "deleted": true })))
}
