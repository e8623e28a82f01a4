use std::sync::Arc;

use futures::future::BoxFuture;

/// Duel persistence contract.
pub mod duel_store;
/// Daily idempotency markers.
pub mod marker_store;
/// In-process storage backend.
pub mod memory;
/// Database model definitions.
pub mod models;
/// MongoDB storage backend.
#[cfg(feature = "mongo-store")]
pub mod mongodb;
/// Gamification profile contract.
pub mod profile_store;
/// Storage abstraction layer for database operations.
pub mod storage;

use self::{
    duel_store::DuelStore, marker_store::DedupMarkers, profile_store::ProfileStore,
    storage::StorageResult,
};

/// Set of storage handles installed together once a backend is reachable.
#[derive(Clone)]
pub struct Backend {
    pub duels: Arc<dyn DuelStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub markers: Arc<dyn DedupMarkers>,
}

impl Backend {
    pub fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.duels.health_check()
    }

    pub fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.duels.try_reconnect()
    }
}
