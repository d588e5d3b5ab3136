//! Custom error types for the API service

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::ParseListKindError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing, invalid or revoked bearer token
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated, but acting on another user's data
    #[error("Forbidden")]
    Forbidden,

    /// Requested entity does not exist
    #[error("{0}")]
    NotFound(String),

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// List name outside backlog/watchlist/played
    #[error(transparent)]
    InvalidList(#[from] ParseListKindError),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] common::error::DatabaseError),
}

impl ApiError {
    /// Log a storage failure with context and hide it behind a 500
    pub fn internal(action: &'static str) -> impl FnOnce(anyhow::Error) -> ApiError {
        move |e| {
            error!("Failed to {}: {:#}", action, e);
            ApiError::InternalServerError
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::InvalidList(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
            ApiError::Database(e) => {
                error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden, StatusCode::FORBIDDEN),
            (ApiError::NotFound("Game not found".into()), StatusCode::NOT_FOUND),
            (ApiError::BadRequest("nope".into()), StatusCode::BAD_REQUEST),
            (
                ApiError::InvalidList(ParseListKindError("wishlist".into())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::InternalServerError,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_hides_details() {
        let err = ApiError::internal("load games")(anyhow::anyhow!("connection reset"));
        assert!(matches!(err, ApiError::InternalServerError));
    }
}
