use std::sync::Arc;

use dashmap::DashSet;
use futures::future::BoxFuture;

use crate::dao::{
    marker_store::{DedupKey, DedupMarkers},
    storage::StorageResult,
};

/// [`DedupMarkers`] kept in process memory.
///
/// Only markers for the current and the previous UTC day are retained; older
/// ones are pruned whenever a new marker is written.
#[derive(Clone, Default)]
pub struct MemoryDedupMarkers {
    markers: Arc<DashSet<DedupKey>>,
}

impl MemoryDedupMarkers {
    /// Empty marker set.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DedupMarkers for MemoryDedupMarkers {
    fn try_mark(&self, key: DedupKey) -> BoxFuture<'static, StorageResult<bool>> {
        let markers = self.markers.clone();
        Box::pin(async move {
            let oldest_kept = key.day.previous_day().unwrap_or(key.day);
            markers.retain(|marker| marker.day >= oldest_kept);
            Ok(markers.insert(key))
        })
    }

    fn release(&self, key: DedupKey) -> BoxFuture<'static, StorageResult<()>> {
        let markers = self.markers.clone();
        Box::pin(async move {
            markers.remove(&key);
            Ok(())
        })
    }
}
