use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::dao::storage::StorageError;

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The caller's subscription tier does not include duels.
    #[error("duels require a premium plan")]
    CapabilityDenied,
    /// The user already participates in a pending or active duel.
    #[error("you already have an active duel")]
    TooManyActive,
    /// The invite token is unknown, consumed or expired.
    #[error("this invitation is no longer valid")]
    InviteNotFound,
    /// The challenger tried to accept their own invite.
    #[error("you cannot accept your own invitation")]
    SelfDuel,
    /// The caller is neither the challenger nor the opponent.
    #[error("you are not a participant in this duel")]
    NotAParticipant,
    /// No duel exists with the requested identifier.
    #[error("duel not found")]
    DuelNotFound,
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ActiveDuelConflict { .. } => ServiceError::TooManyActive,
            other => ServiceError::Unavailable(other),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("{0}")]
    BadRequest(String),
    /// Missing or malformed caller identity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Caller is not allowed to perform the operation.
    #[error("{0}")]
    Forbidden(String),
    /// Requested resource not found.
    #[error("{0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("{0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::CapabilityDenied | ServiceError::NotAParticipant => {
                AppError::Forbidden(message)
            }
            ServiceError::TooManyActive => AppError::Conflict(message),
            ServiceError::InviteNotFound | ServiceError::DuelNotFound => {
                AppError::NotFound(message)
            }
            ServiceError::SelfDuel => AppError::BadRequest(message),
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
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
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn policy_errors_map_to_distinct_statuses() {
        assert_eq!(status_of(ServiceError::CapabilityDenied), StatusCode::FORBIDDEN);
        assert_eq!(status_of(ServiceError::TooManyActive), StatusCode::CONFLICT);
        assert_eq!(status_of(ServiceError::InviteNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(ServiceError::NotAParticipant), StatusCode::FORBIDDEN);
        assert_eq!(status_of(ServiceError::SelfDuel), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(ServiceError::Degraded), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn uniqueness_conflict_surfaces_as_too_many_active() {
        let err = ServiceError::from(StorageError::ActiveDuelConflict {
            user_id: Uuid::new_v4(),
        });
        assert!(matches!(err, ServiceError::TooManyActive));
    }
}
