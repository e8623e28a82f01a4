//! Read-through cache for assembled scoreboards.

mod memory;

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::dto::duel::ScoreboardView;

pub use self::memory::DashMapScoreboardCache;

/// Result alias for cache port operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Failures of a cache backend. Never surfaced to callers of the services.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("cache entry could not be encoded or decoded")]
    Codec(#[from] serde_json::Error),
    #[error("cache backend failure: {0}")]
    Backend(String),
}

/// Scoreboard cache port keyed by duel id.
pub trait ScoreboardCache: Send + Sync {
    fn get(&self, duel_id: Uuid) -> BoxFuture<'static, CacheResult<Option<ScoreboardView>>>;
    fn put(
        &self,
        view: ScoreboardView,
        ttl: Duration,
    ) -> BoxFuture<'static, CacheResult<()>>;
    fn invalidate(&self, duel_id: Uuid) -> BoxFuture<'static, CacheResult<()>>;
}

/// Wraps a [`ScoreboardCache`] so that slow or failing operations become misses.
#[derive(Clone)]
pub struct BestEffortCache {
    inner: Arc<dyn ScoreboardCache>,
    timeout: Duration,
    ttl: Duration,
}

impl BestEffortCache {
    pub fn new(inner: Arc<dyn ScoreboardCache>, timeout: Duration, ttl: Duration) -> Self {
        Self {
            inner,
            timeout,
            ttl,
        }
    }

    /// Cached view, or `None` on miss, timeout or backend failure.
    pub async fn get(&self, duel_id: Uuid) -> Option<ScoreboardView> {
        match self.bounded(self.inner.get(duel_id)).await {
            Ok(view) => view,
            Err(err) => {
                warn!(%duel_id, error = %err, "scoreboard cache read failed; treating as miss");
                None
            }
        }
    }

    /// Store `view` with the configured TTL.
    pub async fn put(&self, view: ScoreboardView) {
        let duel_id = view.duel_id;
        if let Err(err) = self.bounded(self.inner.put(view, self.ttl)).await {
            warn!(%duel_id, error = %err, "scoreboard cache write failed");
        }
    }

    pub async fn invalidate(&self, duel_id: Uuid) {
        if let Err(err) = self.bounded(self.inner.invalidate(duel_id)).await {
            warn!(%duel_id, error = %err, "scoreboard cache invalidation failed");
        }
    }

    async fn bounded<T>(&self, operation: BoxFuture<'static, CacheResult<T>>) -> CacheResult<T> {
        match timeout(self.timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;

    /// Cache whose every operation fails, or hangs past any reasonable timeout.
    pub struct BrokenCache {
        pub hang: bool,
    }

    impl BrokenCache {
        fn fail<T: Send + 'static>(&self) -> BoxFuture<'static, CacheResult<T>> {
            let hang = self.hang;
            Box::pin(async move {
                if hang {
                    futures::future::pending::<()>().await;
                }
                Err(CacheError::Backend("connection refused".into()))
            })
        }
    }

    impl ScoreboardCache for BrokenCache {
        fn get(&self, _duel_id: Uuid) -> BoxFuture<'static, CacheResult<Option<ScoreboardView>>> {
            self.fail()
        }

        fn put(
            &self,
            _view: ScoreboardView,
            _ttl: Duration,
        ) -> BoxFuture<'static, CacheResult<()>> {
            self.fail()
        }

        fn invalidate(&self, _duel_id: Uuid) -> BoxFuture<'static, CacheResult<()>> {
            self.fail()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{fakes::BrokenCache, *};
    use crate::{dao::models::DuelStatus, dto::duel::ParticipantView};

    fn view() -> ScoreboardView {
        ScoreboardView {
            duel_id: Uuid::new_v4(),
            status: DuelStatus::Pending,
            challenger: ParticipantView {
                user_id: Uuid::new_v4(),
                display_name: "Grace".into(),
                score: 0,
            },
            opponent: None,
            start_date: None,
            end_date: None,
            invite_expires_at: None,
            winner_id: None,
            remaining_ms: 0,
        }
    }

    #[tokio::test]
    async fn failures_become_misses() {
        let cache = BestEffortCache::new(
            Arc::new(BrokenCache { hang: false }),
            Duration::from_millis(50),
            Duration::from_secs(30),
        );
        let view = view();
        cache.put(view.clone()).await;
        assert_eq!(cache.get(view.duel_id).await, None);
        cache.invalidate(view.duel_id).await;
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_backend_is_cut_off_by_the_timeout() {
        let cache = BestEffortCache::new(
            Arc::new(BrokenCache { hang: true }),
            Duration::from_millis(150),
            Duration::from_secs(30),
        );
        assert_eq!(cache.get(Uuid::new_v4()).await, None);
    }

    #[tokio::test]
    async fn healthy_backend_serves_hits() {
        let cache = BestEffortCache::new(
            Arc::new(DashMapScoreboardCache::new()),
            Duration::from_millis(150),
            Duration::from_secs(30),
        );
        let view = view();
        cache.put(view.clone()).await;
        assert_eq!(cache.get(view.duel_id).await, Some(view.clone()));
        cache.invalidate(view.duel_id).await;
        assert_eq!(cache.get(view.duel_id).await, None);
    }
}
