//! Centralized API error handling
//!
//! A unified error type for API responses with HTTP status mapping, stable
//! error codes and JSON bodies. Engine, store and auth failures each map
//! into it losslessly.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::engine::EngineError;
use crate::services::UserError;
use crate::storage::StorageError;
use crate::store::StoreError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("{0}")]
    Authorization(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("Document storage error: {0}")]
    Storage(String),

    #[error("{message}")]
    DocumentsNotStored {
        message: String,
        application_id: uuid::Uuid,
    },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("{0}")]
    PartialTransition(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Stable error code for clients.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Authorization(_) => "AUTHORIZATION_ERROR",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::DocumentsNotStored { .. } => "STORAGE_ERROR",
            ApiError::Persistence(_) => "PERSISTENCE_ERROR",
            ApiError::PartialTransition(_) => "PARTIAL_TRANSITION_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::BAD_GATEWAY,
            ApiError::DocumentsNotStored { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::PartialTransition(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Extra machine-readable context for the response body.
    pub fn details(&self) -> Option<String> {
        match self {
            ApiError::DocumentsNotStored { application_id, .. } => Some(format!(
                "application_id={}; retry the document upload against this id",
                application_id
            )),
            _ => None,
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();
        let details = self.details();

        match &self {
            ApiError::Persistence(_) | ApiError::PartialTransition(_) | ApiError::Internal(_) => {
                tracing::error!(error = %message, code = %error_code, "server error");
            }
            ApiError::Storage(_) | ApiError::DocumentsNotStored { .. } => {
                tracing::warn!(error = %message, code = %error_code, "upstream storage error");
            }
            _ => {
                tracing::debug!(error = %message, code = %error_code, "client error");
            }
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Validation(errors) => ApiError::Validation(errors.to_string()),
            EngineError::Authorization(msg) => ApiError::Authorization(msg),
            EngineError::NotFound(id) => ApiError::NotFound(format!("loan {}", id)),
            EngineError::AlreadyDecided(id) => {
                ApiError::Conflict(format!("loan {} has already been decided", id))
            }
            EngineError::Storage(err) => ApiError::Storage(err.to_string()),
            EngineError::DocumentsNotStored { id, reason } => ApiError::DocumentsNotStored {
                message: format!("documents for application {} were not stored: {}", id, reason),
                application_id: id,
            },
            EngineError::Persistence(msg) => ApiError::Persistence(msg),
            partial @ EngineError::PartialTransition { .. } => {
                ApiError::PartialTransition(partial.to_string())
            }
        }
    }
}

impl From<UserError> for ApiError {
    fn from(e: UserError) -> Self {
        match e {
            UserError::Validation(errors) => ApiError::Validation(errors.to_string()),
            UserError::EmailTaken(email) => {
                ApiError::Conflict(format!("an account with email {} already exists", email))
            }
            UserError::NotFound(id) => ApiError::NotFound(format!("user {}", id)),
            UserError::Authorization(msg) => ApiError::Authorization(msg),
            UserError::Hash(msg) => ApiError::Internal(msg),
            UserError::Persistence(msg) => ApiError::Persistence(msg),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized("invalid email or password".to_string())
            }
            AuthError::InvalidConfirmationToken => {
                ApiError::BadRequest("invalid or expired confirmation token".to_string())
            }
            AuthError::InvalidRefreshToken => {
                ApiError::Unauthorized("invalid refresh token".to_string())
            }
            AuthError::TokenError(msg) => ApiError::Unauthorized(msg),
            AuthError::User(err) => err.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { collection, id } => {
                ApiError::NotFound(format!("{} record {}", collection, id))
            }
            StoreError::Conflict { collection, id } => {
                ApiError::Conflict(format!("{} record {} already exists", collection, id))
            }
            other => ApiError::Persistence(other.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Storage(e.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        ApiError::Validation(e.to_string())
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            ApiError::Validation("bad amount".to_string()).error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            ApiError::Authorization("admin required".to_string()).error_code(),
            "AUTHORIZATION_ERROR"
        );
        assert_eq!(
            ApiError::PartialTransition("stuck".to_string()).error_code(),
            "PARTIAL_TRANSITION_ERROR"
        );
        assert_eq!(
            ApiError::Storage("upload".to_string()).error_code(),
            "STORAGE_ERROR"
        );
    }

    #[test]
    fn status_codes_follow_taxonomy() {
        assert_eq!(
            ApiError::Validation("x".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Authorization("x".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Unauthorized("x".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Conflict("x".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Storage("x".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn documents_not_stored_keeps_the_record_id() {
        let id = uuid::Uuid::new_v4();
        let err: ApiError = EngineError::DocumentsNotStored {
            id,
            reason: "upstream down".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        let details = err.details().unwrap();
        assert!(details.contains(&id.to_string()));
    }

    #[test]
    fn engine_errors_map_faithfully() {
        let id = uuid::Uuid::new_v4();
        let err: ApiError = EngineError::AlreadyDecided(id).into();
        assert_eq!(err.error_code(), "CONFLICT");

        let err: ApiError = EngineError::PartialTransition {
            id,
            destination: "approved",
        }
        .into();
        assert_eq!(err.error_code(), "PARTIAL_TRANSITION_ERROR");
        assert!(err.to_string().contains("not removed from pending"));
    }
}
