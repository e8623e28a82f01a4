use futures::future::BoxFuture;
use mongodb::bson::{DateTime, doc};

use super::{
    connection::MongoConnection,
    error::{MongoDaoError, is_duplicate_key},
    models::MongoMarkerDocument,
};
use crate::dao::{
    marker_store::{DedupKey, DedupMarkers},
    storage::StorageResult,
};

pub const MARKER_COLLECTION_NAME: &str = "dedup_markers";

/// MongoDB-backed [`DedupMarkers`]; markers are reaped by a TTL index.
#[derive(Clone)]
pub struct MongoDedupMarkers {
    connection: MongoConnection,
}

impl MongoDedupMarkers {
    /// Marker store over the shared connection.
    pub fn new(connection: MongoConnection) -> Self {
        Self { connection }
    }
}

impl DedupMarkers for MongoDedupMarkers {
    fn try_mark(&self, key: DedupKey) -> BoxFuture<'static, StorageResult<bool>> {
        let connection = self.connection.clone();
        Box::pin(async move {
            let document = MongoMarkerDocument {
                key: key.to_string(),
                created_at: DateTime::now(),
            };
            let collection = connection
                .collection::<MongoMarkerDocument>(MARKER_COLLECTION_NAME)
                .await;

            match collection.insert_one(&document).await {
                Ok(_) => Ok(true),
                Err(err) if is_duplicate_key(&err) => Ok(false),
                Err(source) => Err(MongoDaoError::Marker {
                    key: document.key,
                    source,
                }
                .into()),
            }
        })
    }

    fn release(&self, key: DedupKey) -> BoxFuture<'static, StorageResult<()>> {
        let connection = self.connection.clone();
        Box::pin(async move {
            let key = key.to_string();
            connection
                .collection::<MongoMarkerDocument>(MARKER_COLLECTION_NAME)
                .await
                .delete_one(doc! {"_id": key.as_str()})
                .await
                .map_err(|source| MongoDaoError::Marker { key, source })?;
            Ok(())
        })
    }
}
