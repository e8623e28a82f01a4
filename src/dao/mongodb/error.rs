use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save duel `{id}`")]
    SaveDuel {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load duel `{id}`")]
    LoadDuel {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to query duels")]
    QueryDuels {
        #[source]
        source: MongoError,
    },
    #[error("failed to update duel claim for user `{user_id}`")]
    Claim {
        user_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load profiles")]
    LoadProfiles {
        #[source]
        source: MongoError,
    },
    #[error("failed to update profile `{user_id}`")]
    UpdateProfile {
        user_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to write dedup marker `{key}`")]
    Marker {
        key: String,
        #[source]
        source: MongoError,
    },
    #[error("stored document `{id}` is malformed: {reason}")]
    Malformed { id: String, reason: &'static str },
}

/// Whether `err` reports a unique-index violation.
pub fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}
