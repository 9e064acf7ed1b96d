//! Error taxonomy: domain-level [`ServiceError`] mapped to HTTP-facing [`AppError`].

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{dao::storage::StorageError, state::lifecycle::InvalidTransition};

/// Errors that can occur in service layer operations.
///
/// Transient contract violations (duplicate vote, duplicate join, full roster)
/// are informational and safe to retry after the client refreshes its view.
/// Structural violations (finalizing twice, skipping a lifecycle state) must
/// never be retried blindly, so they map to a distinct HTTP class.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input rejected before any state change.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Lifecycle contract violation reported by the match state machine.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// Operation requires a match status the match is not in.
    #[error("match does not accept this operation in its current status")]
    WrongStatus,
    /// Roster is already at its configured maximum.
    #[error("match is full ({max} players)")]
    CapacityExceeded {
        /// Configured roster maximum.
        max: u8,
    },
    /// The user already holds an active roster slot.
    #[error("user already joined this match")]
    AlreadyJoined,
    /// The user has no active roster slot to withdraw.
    #[error("user has not joined this match")]
    NotJoined,
    /// The user already voted at the current passcode version.
    #[error("user already voted at this passcode version")]
    AlreadyVoted,
    /// The user may not take part in the split vote.
    #[error("not eligible to vote: {0}")]
    NotEligible(String),
    /// Idempotency guard: the match was already finalized.
    #[error("match is already finalized")]
    AlreadyFinalized,
    /// Capability check failed for a moderator command.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The passcode space is exhausted by concurrently active lobbies.
    #[error("no unique passcode available")]
    PasscodeUnavailable,
    /// Storage backend failure.
    #[error("storage error")]
    Storage(#[source] StorageError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Storage(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid or transiently rejected input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Capability check failure.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Structural conflict with the current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::InvalidTransition(invalid) => AppError::Conflict(invalid.to_string()),
            ServiceError::WrongStatus
            | ServiceError::CapacityExceeded { .. }
            | ServiceError::AlreadyJoined
            | ServiceError::NotJoined
            | ServiceError::AlreadyVoted
            | ServiceError::NotEligible(_) => AppError::BadRequest(err.to_string()),
            ServiceError::AlreadyFinalized => AppError::Conflict(err.to_string()),
            ServiceError::PermissionDenied(message) => AppError::Forbidden(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::PasscodeUnavailable => AppError::ServiceUnavailable(err.to_string()),
            ServiceError::Storage(source) => AppError::ServiceUnavailable(source.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
