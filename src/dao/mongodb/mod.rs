mod config;
mod connection;
mod duel_store;
mod error;
mod marker_store;
mod models;
mod profile_store;

use std::{sync::Arc, time::Duration};

use mongodb::{
    Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};

pub use config::MongoConfig;
pub use connection::MongoConnection;
pub use duel_store::MongoDuelStore;
pub use error::{MongoDaoError, MongoResult};
pub use marker_store::MongoDedupMarkers;
pub use profile_store::MongoProfileStore;

use crate::{
    dao::{Backend, storage::StorageError},
    state::leveling::LevelCurve,
};

/// Dedup markers only need to outlive the calendar day they guard.
const MARKER_RETENTION: Duration = Duration::from_secs(3 * 24 * 60 * 60);

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}

/// Connect to MongoDB, ensure indexes and build the full storage [`Backend`].
pub async fn connect(config: MongoConfig, curve: LevelCurve) -> MongoResult<Backend> {
    let connection = MongoConnection::open(config).await?;
    ensure_indexes(&connection.database().await).await?;

    Ok(Backend {
        duels: Arc::new(MongoDuelStore::new(connection.clone())),
        profiles: Arc::new(MongoProfileStore::new(connection.clone(), curve)),
        markers: Arc::new(MongoDedupMarkers::new(connection)),
    })
}

/// Ensure the indexes required by the application are present.
pub async fn ensure_indexes(database: &Database) -> MongoResult<()> {
    let duels = duel_store::DUEL_COLLECTION_NAME;
    create_index(
        database,
        duels,
        "invite_token",
        doc! {"invite_token": 1},
        IndexOptions::builder()
            .name(Some("duel_invite_token_idx".to_owned()))
            .unique(Some(true))
            .sparse(Some(true))
            .build(),
    )
    .await?;
    create_index(
        database,
        duels,
        "challenger_id",
        doc! {"challenger_id": 1},
        named("duel_challenger_idx"),
    )
    .await?;
    create_index(
        database,
        duels,
        "opponent_id",
        doc! {"opponent_id": 1},
        named("duel_opponent_idx"),
    )
    .await?;
    create_index(
        database,
        duels,
        "status,end_date",
        doc! {"status": 1, "end_date": 1},
        named("duel_status_end_idx"),
    )
    .await?;
    create_index(
        database,
        duels,
        "status,expires_at",
        doc! {"status": 1, "expires_at": 1},
        named("duel_status_expiry_idx"),
    )
    .await?;
    create_index(
        database,
        duels,
        "status,rewards_pending",
        doc! {"status": 1, "rewards_pending": 1},
        named("duel_status_rewards_idx"),
    )
    .await?;
    create_index(
        database,
        duel_store::CLAIM_COLLECTION_NAME,
        "duel_id",
        doc! {"duel_id": 1},
        named("claim_duel_idx"),
    )
    .await?;
    create_index(
        database,
        marker_store::MARKER_COLLECTION_NAME,
        "created_at",
        doc! {"created_at": 1},
        IndexOptions::builder()
            .name(Some("marker_ttl_idx".to_owned()))
            .expire_after(Some(MARKER_RETENTION))
            .build(),
    )
    .await?;
    Ok(())
}

fn named(name: &str) -> IndexOptions {
    IndexOptions::builder().name(Some(name.to_owned())).build()
}

async fn create_index(
    database: &Database,
    collection: &'static str,
    index: &'static str,
    keys: Document,
    options: IndexOptions,
) -> MongoResult<()> {
    let model = IndexModel::builder().keys(keys).options(options).build();
    database
        .collection::<Document>(collection)
        .create_index(model)
        .await
        .map_err(|source| MongoDaoError::EnsureIndex {
            collection,
            index,
            source,
        })?;
    Ok(())
}
