//! Toggle engine: like/unlike as an idempotent state flip keyed by
//! (actor, target).

use axum::extract::{Path, State};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::handlers::posts::ActorRequest;
use crate::handlers::{required_trimmed, ApiJson, ApiResponse, ApiResult};
use crate::models::EdgeKind;
use crate::state::AppState;
use crate::store::StoreError;

/// POST /api/posts/:id/like - Toggle a like on a post
pub async fn toggle_post_like(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ActorRequest>,
) -> ApiResult<Value> {
    toggle(&state, EdgeKind::PostLike, id, payload).await
}

/// POST /api/archive/:id/like - Toggle a like on an archive item
pub async fn toggle_archive_like(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<ActorRequest>,
) -> ApiResult<Value> {
    toggle(&state, EdgeKind::ArchiveLike, id, payload).await
}

/// Check-then-act flip. The check and the write are separate store calls, so
/// two concurrent first-toggles can both observe "absent"; the store's
/// unique (actor, target) constraint is the backstop, and the loser's
/// conflict is converted into the normal "already liked" outcome. Target
/// existence is not verified here; foreign-key enforcement belongs to the
/// store.
async fn toggle(
    state: &AppState,
    kind: EdgeKind,
    target_id: Uuid,
    payload: ActorRequest,
) -> ApiResult<Value> {
    let actor_id = required_trimmed("actor_id", &payload.actor_id)?;

    let liked = if state.store.edge_exists(kind, &actor_id, target_id).await? {
        // A concurrent unlike may have won; either way the edge is gone now
        state.store.delete_edge(kind, &actor_id, target_id).await?;
        false
    } else {
        interpret_insert(state.store.insert_edge(kind, &actor_id, target_id).await)?
    };

    Ok(ApiResponse::success(json!({ "liked": liked })))
}

/// Map the edge insert's outcome to the reported liked state. A duplicate-key
/// conflict means a concurrent toggle created the edge first; the edge
/// exists, which is the state this call wanted, so it is not an error.
fn interpret_insert(result: Result<(), StoreError>) -> Result<bool, StoreError> {
    match result {
        Ok(()) => Ok(true),
        Err(StoreError::Conflict(_)) => Ok(true),
        Err(e) => Err(e),
    }
}
