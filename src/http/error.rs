//! Request-path error taxonomy and its JSON rendering.
//!
//! Most routes answer failures with `{ "error": message }`. The
//! cancellation route keeps its `{ success: false, message }` envelope and
//! the chat route answers with a reply-shaped body, so the dashboard can
//! render the apology like any other assistant message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// An external adapter failed. `message` is what the client sees,
    /// `detail` is only logged.
    #[error("upstream failure: {detail}")]
    Upstream { message: String, detail: String },

    #[error("storage failure: {detail}")]
    Storage { message: String, detail: String },

    /// Failure on the cancellation route.
    #[error("cancellation failed ({status}): {message}")]
    Cancel { status: StatusCode, message: String },

    /// Failure on the chat route.
    #[error("chat failed: {detail}")]
    Chat { message: String, detail: String },
}

impl ApiError {
    pub fn upstream(message: &str, detail: impl std::fmt::Display) -> Self {
        ApiError::Upstream { message: message.to_string(), detail: detail.to_string() }
    }

    pub fn storage(message: &str, detail: impl std::fmt::Display) -> Self {
        ApiError::Storage { message: message.to_string(), detail: detail.to_string() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream { .. } | ApiError::Storage { .. } | ApiError::Chat { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Cancel { status, .. } => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), "{self}");
        } else {
            warn!(status = status.as_u16(), "{self}");
        }

        let body = match self {
            ApiError::BadRequest(message)
            | ApiError::Unauthorized(message)
            | ApiError::NotFound(message)
            | ApiError::Upstream { message, .. }
            | ApiError::Storage { message, .. } => json!({ "error": message }),
            ApiError::Cancel { message, .. } => json!({ "success": false, "message": message }),
            ApiError::Chat { message, .. } => json!({ "response": message, "actions": [] }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::upstream("x", "boom").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::storage("x", "boom").status(), StatusCode::INTERNAL_SERVER_ERROR);
        let cancel = ApiError::Cancel { status: StatusCode::NOT_FOUND, message: "x".into() };
        assert_eq!(cancel.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn upstream_detail_is_not_rendered() {
        let resp = ApiError::upstream("Failed to analyze transactions", "api key rejected").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let e = ApiError::upstream("generic", "secret detail");
        assert!(e.to_string().contains("secret detail"));
    }
}
