use std::error::Error;

use thiserror::Error;
use uuid::Uuid;

/// Outcome of a duel, profile or marker store call.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failures every storage backend reports in the same shape, so services never
/// see driver errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or rejected the operation. Routes answer
    /// it with 503.
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The user already participates in a pending or active duel.
    #[error("user `{user_id}` already participates in an open duel")]
    ActiveDuelConflict { user_id: Uuid },
}

impl StorageError {
    /// Wrap a backend failure, keeping it as the error source.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        Self::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
