use axum::extract::{Multipart, State};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::{required_trimmed, ApiJson, ApiResponse, ApiResult};
use crate::media::{MediaCategory, UploadRequest};
use crate::state::AppState;

/// POST /api/media - Upload a media file
///
/// Multipart fields: `file` (required), `category` (required), `actor_id`
/// (required), `folder` (optional). Validation runs before any storage
/// write; a rejected upload leaves no trace in the object store.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Value> {
    let mut file: Option<(Bytes, String, String)> = None;
    let mut category: Option<String> = None;
    let mut actor_id: Option<String> = None;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "file" => {
                let filename = field.file_name().unwrap_or("file").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("failed to read file: {e}")))?;
                file = Some((data, content_type, filename));
            }
            "category" => category = Some(read_text_field(field).await?),
            "actor_id" => actor_id = Some(read_text_field(field).await?),
            "folder" => folder = Some(read_text_field(field).await?),
            // Unknown parts are ignored rather than rejected
            _ => {}
        }
    }

    let (payload, content_type, original_name) =
        file.ok_or_else(|| ApiError::missing_field("file"))?;
    let category: MediaCategory = category
        .ok_or_else(|| ApiError::missing_field("category"))?
        .trim()
        .parse()
        .map_err(ApiError::from)?;
    let actor_id = required_trimmed("actor_id", &actor_id.unwrap_or_default())?;
    let folder = folder.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());

    let stored = state
        .uploads
        .store(UploadRequest {
            payload,
            content_type,
            category,
            owner_id: actor_id,
            folder,
            original_name,
        })
        .await?;

    Ok(ApiResponse::success(json!(stored)))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::bad_request(format!("malformed multipart field: {e}")))
}

#[derive(Debug, Deserialize)]
pub struct SignRequest {
    pub refs: Vec<String>,
}

/// POST /api/media/sign - Mint time-bounded access URLs for a batch of
/// stored-object references
///
/// Per-item failure isolation: a malformed reference degrades alone, with
/// the original reference echoed back as its fallback URL.
pub async fn sign(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignRequest>,
) -> ApiResult<Value> {
    let results = state.signer.issue_access(&payload.refs);
    Ok(ApiResponse::success(json!({ "results": results })))
}
