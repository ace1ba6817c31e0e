//! API error types for handler operations
//!
//! Repository and query errors convert into [`ApiError`], whose
//! `IntoResponse` picks the status code and body.
//!
//! # Example
//!
//! ```rust
//! use player_service::handlers::{ApiError, ApiErrorKind};
//! use player_service::repository::RepositoryError;
//!
//! let error = ApiError::from(RepositoryError::not_found("Player", "player_123"));
//! assert_eq!(error.kind, ApiErrorKind::NotFound);
//! assert_eq!(error.entity_id.as_deref(), Some("player_123"));
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::ErrorResponse;
use crate::query::QueryError;
use crate::repository::{RepositoryError, RepositoryErrorKind, RepositoryOperation};

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Entity was not found
    NotFound,
    /// Requested to-one relation is not set
    RelationUnset,
    /// Filter, sort or pagination parameter is malformed
    InvalidQuery,
    /// Request body is malformed
    BadRequest,
    /// Entity already exists
    AlreadyExists,
    /// Store constraint rejected the write
    Conflict,
    /// Request validation failed
    ValidationFailed,
    /// Write lost a race against a concurrent modification
    ConcurrencyConflict,
    /// Internal server error
    InternalError,
    /// Service temporarily unavailable
    ServiceUnavailable,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::RelationUnset => write!(f, "relation_unset"),
            Self::InvalidQuery => write!(f, "invalid_query"),
            Self::BadRequest => write!(f, "bad_request"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::Conflict => write!(f, "conflict"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::ConcurrencyConflict => write!(f, "concurrency_conflict"),
            Self::InternalError => write!(f, "internal_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
        }
    }
}

impl ApiErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound | Self::RelationUnset => StatusCode::NOT_FOUND,
            Self::InvalidQuery | Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::AlreadyExists | Self::Conflict => StatusCode::CONFLICT,
            Self::ValidationFailed => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ConcurrencyConflict | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error code string for this error kind
    #[must_use]
    pub fn error_code(&self) -> String {
        self.to_string().to_uppercase()
    }

    const fn is_server_side(&self) -> bool {
        matches!(
            self,
            Self::ConcurrencyConflict | Self::InternalError | Self::ServiceUnavailable
        )
    }
}

/// Structured API error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The operation being performed when the error occurred
    pub operation: Option<RepositoryOperation>,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
}

impl ApiError {
    /// Create a new API error
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation: None,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// Create a bad request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::BadRequest, message)
    }

    /// Check if this error is retriable
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, ApiErrorKind::ServiceUnavailable)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API {} error", self.kind)?;
        if let Some(operation) = self.operation {
            write!(f, " during {}", operation)?;
        }
        write!(f, ": {}", self.message)?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.kind.status_code();

        if self.kind.is_server_side() {
            tracing::error!(
                operation = ?self.operation,
                kind = %self.kind,
                entity_type = ?self.entity_type,
                entity_id = ?self.entity_id,
                retriable = self.is_retriable(),
                "API error: {}", self.message
            );
        } else {
            tracing::debug!(
                operation = ?self.operation,
                kind = %self.kind,
                entity_id = ?self.entity_id,
                "Request rejected: {}", self.message
            );
        }

        // A missing entity is reported by status alone
        if self.kind == ApiErrorKind::NotFound {
            return status.into_response();
        }

        let message = match self.kind {
            ApiErrorKind::InternalError => "An internal error occurred".to_string(),
            ApiErrorKind::ServiceUnavailable => "Service temporarily unavailable".to_string(),
            ApiErrorKind::ConcurrencyConflict => {
                "The record was modified concurrently".to_string()
            }
            _ => self.message,
        };

        let body = ErrorResponse::with_code(status, self.kind.error_code(), message);
        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        let kind = match err.kind {
            RepositoryErrorKind::NotFound => ApiErrorKind::NotFound,
            RepositoryErrorKind::RelationUnset => ApiErrorKind::RelationUnset,
            RepositoryErrorKind::InvalidQuery => ApiErrorKind::InvalidQuery,
            RepositoryErrorKind::AlreadyExists => ApiErrorKind::AlreadyExists,
            RepositoryErrorKind::ConstraintViolation => ApiErrorKind::Conflict,
            RepositoryErrorKind::ValidationFailed => ApiErrorKind::ValidationFailed,
            RepositoryErrorKind::ConcurrencyConflict => ApiErrorKind::ConcurrencyConflict,
            RepositoryErrorKind::ConnectionFailed | RepositoryErrorKind::Timeout => {
                ApiErrorKind::ServiceUnavailable
            }
            RepositoryErrorKind::DatabaseError => ApiErrorKind::InternalError,
        };

        Self {
            operation: Some(err.operation),
            kind,
            message: err.message,
            entity_type: err.entity_type,
            entity_id: err.entity_id,
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        Self::new(ApiErrorKind::InvalidQuery, err.to_string())
    }
}
