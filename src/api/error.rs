use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::forecast::ForecastError;

/// API error types that can be returned from handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response that gets serialized to JSON
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::TrainingError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string
    fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::TrainingError(_) => "TrainingError",
            ApiError::InternalError(_) => "InternalServerError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            ApiError::InternalError(_) => {
                tracing::error!(error = %self, "API error occurred");
                "An internal error occurred".to_string()
            }
            _ => {
                tracing::debug!(error = %self, "Client error");
                self.to_string()
            }
        };

        let error_response = ErrorResponse {
            error: self.error_type().to_string(),
            message,
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<ForecastError> for ApiError {
    fn from(error: ForecastError) -> Self {
        match error {
            ForecastError::Validation(msg) => ApiError::ValidationError(msg),
            ForecastError::ModelNotFound(kind) => {
                ApiError::NotFound(format!("no trained {kind} model; train it first"))
            }
            ForecastError::ProductModelNotFound(product_id) => {
                ApiError::NotFound(format!("no seasonal model for product {product_id}"))
            }
            ForecastError::Training(msg) => ApiError::TrainingError(msg),
            ForecastError::Prediction(msg) => ApiError::InternalError(msg),
            ForecastError::Store(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::NotFound("test".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::ValidationError("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::TrainingError("test".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::InternalError("test".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_kinds_stay_distinguishable() {
        let untrained: ApiError = ForecastError::ModelNotFound("seasonal").into();
        let unseen: ApiError = ForecastError::ProductModelNotFound(9).into();

        assert_eq!(untrained.status_code(), unseen.status_code());
        assert!(untrained.to_string().contains("train it first"));
        assert!(unseen.to_string().contains("product 9"));
    }

    #[test]
    fn forecast_error_kinds_map_to_api_kinds() {
        let err: ApiError = ForecastError::Validation("bad date".to_string()).into();
        assert_eq!(err.error_type(), "ValidationError");

        let err: ApiError = ForecastError::Training("too few records".to_string()).into();
        assert_eq!(err.error_type(), "TrainingError");
    }
}
