use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;

/// Success envelope: every handler answers `{"success": true, "data": ...}`
/// with a 200. Failures take the [`ApiError`] path, which emits the matching
/// `success: false` shape, so no response escapes the envelope.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize>(pub T);

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self(data)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.0) {
            Ok(data) => Json(json!({ "success": true, "data": data })).into_response(),
            Err(e) => {
                tracing::error!("failed to serialize response data: {}", e);
                ApiError::internal_server_error("Failed to serialize response data")
                    .into_response()
            }
        }
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;
