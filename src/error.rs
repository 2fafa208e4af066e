// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("User not found")]
    UserNotFound,

    #[error("Monthly limit reached. Please upgrade to Pro.")]
    QuotaExceeded,

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("AI service error: {0}")]
    UpstreamAi(String),

    #[error("Todoist API error: {0}")]
    TaskManager(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::UserNotFound | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::QuotaExceeded | AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamAi(_) | AppError::TaskManager(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Upstream and storage detail goes to the log, never to the client.
        let error = match &self {
            AppError::BadRequest(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::UpstreamAi(msg) => {
                tracing::warn!(error = %msg, "AI service error");
                "Error connecting to AI service".to_string()
            }
            AppError::TaskManager(msg) => {
                tracing::warn!(error = %msg, "Todoist API error");
                "Todoist request failed".to_string()
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                "Internal server error".to_string()
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (self.status(), Json(ErrorResponse { error })).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_status_mapping() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::UserNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::QuotaExceeded.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::BadRequest("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::UpstreamAi("down".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::TaskManager("rejected".into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Database("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_body_has_single_error_field() {
        let (status, body) = body_json(AppError::QuotaExceeded).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(
            body,
            serde_json::json!({ "error": "Monthly limit reached. Please upgrade to Pro." })
        );
    }

    #[tokio::test]
    async fn test_upstream_detail_not_leaked() {
        let (_, body) = body_json(AppError::UpstreamAi("HTTP 500: secret trace".into())).await;
        assert!(!body["error"].as_str().unwrap().contains("secret trace"));

        let (_, body) = body_json(AppError::TaskManager("HTTP 403: token xyz".into())).await;
        assert!(!body["error"].as_str().unwrap().contains("xyz"));

        let (_, body) = body_json(AppError::Database("connection string".into())).await;
        assert_eq!(body["error"], "Internal server error");
    }
}
