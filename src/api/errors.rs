//! API error handling.
//!
//! Structured error responses with stable rejection codes and request
//! tracking.

use crate::errors::EngineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable rejection code (ROUND_CLOSED, DUPLICATE_BET, ...)
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub request_id: String,
}

impl ApiError {
    pub fn not_found(request_id: String, message: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "NOT_FOUND".to_string(),
            message,
            request_id,
        }
    }

    pub fn unauthorized(request_id: String, message: String) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            code: "UNAUTHORIZED".to_string(),
            message,
            request_id,
        }
    }

    /// Map an engine rejection to its HTTP shape, keeping the engine's
    /// stable code verbatim so clients can branch on it.
    pub fn from_engine(request_id: String, err: EngineError) -> Self {
        let status = match &err {
            EngineError::InvalidInput(_) | EngineError::InsufficientFunds => {
                StatusCode::BAD_REQUEST
            }
            EngineError::RoundClosed
            | EngineError::DuplicateBet
            | EngineError::BonusAlreadyClaimed
            | EngineError::OverrideNotAllowed(_) => StatusCode::CONFLICT,
            EngineError::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        Self {
            status,
            code: err.code().to_string(),
            message: err.to_string(),
            request_id,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.request_id, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code: self.code,
                message: self.message,
            },
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_rejections_keep_stable_codes() {
        let err = ApiError::from_engine("req-1".to_string(), EngineError::DuplicateBet);
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "DUPLICATE_BET");

        let err = ApiError::from_engine("req-2".to_string(), EngineError::InsufficientFunds);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "INSUFFICIENT_FUNDS");

        let err = ApiError::from_engine("req-3".to_string(), EngineError::OverrideNotAllowed(7));
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "OVERRIDE_NOT_ALLOWED");
    }
}
