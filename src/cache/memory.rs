use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::time::Instant;
use uuid::Uuid;

use super::{CacheResult, ScoreboardCache};
use crate::dto::duel::ScoreboardView;

struct Entry {
    payload: String,
    expires_at: Instant,
}

/// Process-local scoreboard cache. Entries are stored as JSON.
///
/// A stale entry is dropped when it is read, and every write prunes whatever else went stale,
/// so views that are never read again do not pile up.
#[derive(Clone, Default)]
pub struct DashMapScoreboardCache {
    entries: Arc<DashMap<Uuid, Entry>>,
}

impl DashMapScoreboardCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreboardCache for DashMapScoreboardCache {
    fn get(&self, duel_id: Uuid) -> BoxFuture<'static, CacheResult<Option<ScoreboardView>>> {
        let entries = self.entries.clone();
        Box::pin(async move {
            let now = Instant::now();
            let fresh = entries
                .get(&duel_id)
                .map(|entry| (entry.expires_at > now).then(|| entry.payload.clone()));
            match fresh {
                Some(Some(payload)) => Ok(Some(serde_json::from_str(&payload)?)),
                Some(None) => {
                    entries.remove_if(&duel_id, |_, entry| entry.expires_at <= now);
                    Ok(None)
                }
                None => Ok(None),
            }
        })
    }

    fn put(&self, view: ScoreboardView, ttl: Duration) -> BoxFuture<'static, CacheResult<()>> {
        let entries = self.entries.clone();
        Box::pin(async move {
            let payload = serde_json::to_string(&view)?;
            let now = Instant::now();
            entries.retain(|_, entry| entry.expires_at > now);
            entries.insert(
                view.duel_id,
                Entry {
                    payload,
                    expires_at: now + ttl,
                },
            );
            Ok(())
        })
    }

    fn invalidate(&self, duel_id: Uuid) -> BoxFuture<'static, CacheResult<()>> {
        let entries = self.entries.clone();
        Box::pin(async move {
            entries.remove(&duel_id);
            Ok(())
        })
    }
}
