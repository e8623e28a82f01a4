use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

/// Database used when `MONGO_DB` is not set.
const DEFAULT_DB: &str = "duel_arena";

/// Parsed connection settings for the duel database.
#[derive(Clone)]
pub struct MongoConfig {
    /// Driver options parsed from the connection string.
    pub options: ClientOptions,
    /// Database holding the duel, profile, claim and marker collections.
    pub database_name: String,
}

impl MongoConfig {
    /// Parse `uri` and pick the database, falling back to `duel_arena`.
    ///
    /// Only the string is validated here; no connection is opened.
    pub async fn from_uri(uri: &str, database: Option<&str>) -> MongoResult<Self> {
        let options = ClientOptions::parse(uri)
            .await
            .map_err(|source| MongoDaoError::InvalidUri {
                uri: uri.to_owned(),
                source,
            })?;

        Ok(Self {
            options,
            database_name: database.unwrap_or(DEFAULT_DB).to_owned(),
        })
    }
}
