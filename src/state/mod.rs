pub mod capability;
pub mod clock;
pub mod duel;
pub mod leveling;
pub mod scoring;

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::{RwLock, watch};

use crate::{
    cache::{BestEffortCache, DashMapScoreboardCache, ScoreboardCache},
    config::AppConfig,
    dao::Backend,
    error::ServiceError,
};

use self::{
    capability::{CapabilityGate, TierAllowList},
    clock::{Clock, SystemClock},
};

pub type SharedState = Arc<AppState>;

/// Central application state: storage handles, scoreboard cache and injected collaborators.
pub struct AppState {
    backend: RwLock<Option<Backend>>,
    degraded: watch::Sender<bool>,
    cache: BestEffortCache,
    clock: Arc<dyn Clock>,
    gate: Arc<dyn CapabilityGate>,
    config: AppConfig,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(
        config: AppConfig,
        cache: Arc<dyn ScoreboardCache>,
        clock: Arc<dyn Clock>,
        gate: Arc<dyn CapabilityGate>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        let cache = BestEffortCache::new(cache, config.cache_timeout, config.scoreboard_ttl);
        Arc::new(Self {
            backend: RwLock::new(None),
            degraded: degraded_tx,
            cache,
            clock,
            gate,
            config,
        })
    }

    /// Production wiring: process-local cache, wall clock and the configured tier allow-list.
    pub fn from_config(config: AppConfig) -> SharedState {
        let gate = TierAllowList::new(config.duel_tiers.iter().cloned());
        Self::new(
            config,
            Arc::new(DashMapScoreboardCache::new()),
            Arc::new(SystemClock),
            Arc::new(gate),
        )
    }

    /// Obtain the current storage backend, if one is installed.
    pub async fn backend(&self) -> Option<Backend> {
        let guard = self.backend.read().await;
        guard.as_ref().cloned()
    }

    /// Backend for a duel operation; fails while the application is degraded.
    pub async fn require_backend(&self) -> Result<Backend, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.backend().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new storage backend and leave degraded mode.
    pub async fn install_backend(&self, backend: Backend) {
        {
            let mut guard = self.backend.write().await;
            *guard = Some(backend);
        }
        self.update_degraded(false);
    }

    /// Remove the current backend and enter degraded mode.
    pub async fn clear_backend(&self) {
        {
            let mut guard = self.backend.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub(crate) fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    pub fn cache(&self) -> &BestEffortCache {
        &self.cache
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    pub fn gate(&self) -> &dyn CapabilityGate {
        self.gate.as_ref()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicBool, Ordering};

    use futures::future::BoxFuture;
    use time::macros::datetime;
    use uuid::Uuid;

    use super::*;
    use crate::dao::{
        duel_store::{Activation, Completion, DuelStore},
        marker_store::{DedupKey, DedupMarkers},
        memory::{MemoryDedupMarkers, MemoryDuelStore, MemoryProfileStore},
        models::{DuelEntity, ParticipantSide, ProfileEntity, XpAward},
        profile_store::ProfileStore,
        storage::{StorageError, StorageResult},
    };
    use crate::state::{clock::ManualClock, leveling::default_level_curve};

    pub const START: OffsetDateTime = datetime!(2026-03-02 09:00 UTC);

    fn outage() -> StorageError {
        StorageError::unavailable(
            "store offline".into(),
            std::io::Error::other("connection reset"),
        )
    }

    /// Application state on top of in-memory stores and a manual clock.
    pub struct Harness {
        pub state: SharedState,
        pub clock: Arc<ManualClock>,
        pub profiles: MemoryProfileStore,
    }

    impl Harness {
        pub async fn new() -> Self {
            Self::build(
                Arc::new(DashMapScoreboardCache::new()),
                Arc::new(MemoryDedupMarkers::new()),
            )
            .await
        }

        pub async fn with_cache(cache: Arc<dyn ScoreboardCache>) -> Self {
            Self::build(cache, Arc::new(MemoryDedupMarkers::new())).await
        }

        pub async fn with_markers(markers: Arc<dyn DedupMarkers>) -> Self {
            Self::build(Arc::new(DashMapScoreboardCache::new()), markers).await
        }

        /// Harness whose duel store can be told to fail score increments.
        pub async fn with_flaky_duels() -> (Self, Arc<FlakyDuels>) {
            let flaky = Arc::new(FlakyDuels::new(MemoryDuelStore::new()));
            let profiles = MemoryProfileStore::new(default_level_curve);
            let harness = Self::assemble(
                Arc::new(DashMapScoreboardCache::new()),
                Arc::new(MemoryDedupMarkers::new()),
                flaky.clone(),
                profiles.clone(),
                Arc::new(profiles),
            )
            .await;
            (harness, flaky)
        }

        /// Harness whose profile store can be told to fail every write.
        pub async fn with_flaky_profiles() -> (Self, Arc<FlakyProfiles>) {
            let profiles = MemoryProfileStore::new(default_level_curve);
            let flaky = Arc::new(FlakyProfiles::new(profiles.clone()));
            let harness = Self::assemble(
                Arc::new(DashMapScoreboardCache::new()),
                Arc::new(MemoryDedupMarkers::new()),
                Arc::new(MemoryDuelStore::new()),
                profiles,
                flaky.clone(),
            )
            .await;
            (harness, flaky)
        }

        async fn build(cache: Arc<dyn ScoreboardCache>, markers: Arc<dyn DedupMarkers>) -> Self {
            let profiles = MemoryProfileStore::new(default_level_curve);
            Self::assemble(
                cache,
                markers,
                Arc::new(MemoryDuelStore::new()),
                profiles.clone(),
                Arc::new(profiles),
            )
            .await
        }

        /// Wire the state. The memory profile store is kept for inspection next to
        /// the handle installed in the backend, which may wrap it.
        async fn assemble(
            cache: Arc<dyn ScoreboardCache>,
            markers: Arc<dyn DedupMarkers>,
            duels: Arc<dyn DuelStore>,
            profiles: MemoryProfileStore,
            profile_handle: Arc<dyn ProfileStore>,
        ) -> Self {
            let clock = Arc::new(ManualClock::new(START));
            let config = AppConfig::default();
            let gate = TierAllowList::new(config.duel_tiers.iter().cloned());
            let state = AppState::new(config, cache, clock.clone(), Arc::new(gate));

            state
                .install_backend(Backend {
                    duels,
                    profiles: profile_handle,
                    markers,
                })
                .await;

            Self {
                state,
                clock,
                profiles,
            }
        }

        /// Create a user with a gamification profile.
        pub fn user(&self, name: &str) -> Uuid {
            let id = Uuid::new_v4();
            self.profiles.upsert(ProfileEntity::new(id, name));
            id
        }
    }

    /// Marker store that is always unreachable.
    pub struct UnreachableMarkers;

    impl DedupMarkers for UnreachableMarkers {
        fn try_mark(&self, _key: DedupKey) -> BoxFuture<'static, StorageResult<bool>> {
            Box::pin(async { Err(outage()) })
        }

        fn release(&self, _key: DedupKey) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Err(outage()) })
        }
    }

    /// Memory duel store whose score increments fail while `failing` is set.
    pub struct FlakyDuels {
        inner: MemoryDuelStore,
        failing: AtomicBool,
    }

    impl FlakyDuels {
        fn new(inner: MemoryDuelStore) -> Self {
            Self {
                inner,
                failing: AtomicBool::new(false),
            }
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }
    }

    impl DuelStore for FlakyDuels {
        fn insert_pending(&self, duel: DuelEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.insert_pending(duel)
        }

        fn count_open_for_user(&self, user_id: Uuid) -> BoxFuture<'static, StorageResult<u64>> {
            self.inner.count_open_for_user(user_id)
        }

        fn find_duel(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<DuelEntity>>> {
            self.inner.find_duel(id)
        }

        fn find_by_invite_token(
            &self,
            token: String,
        ) -> BoxFuture<'static, StorageResult<Option<DuelEntity>>> {
            self.inner.find_by_invite_token(token)
        }

        fn activate(&self, activation: Activation) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.activate(activation)
        }

        fn expire_pending(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.expire_pending(id)
        }

        fn find_active_for_user(
            &self,
            user_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<DuelEntity>>> {
            self.inner.find_active_for_user(user_id)
        }

        fn increment_score(
            &self,
            id: Uuid,
            side: ParticipantSide,
            points: u32,
            now: OffsetDateTime,
        ) -> BoxFuture<'static, StorageResult<bool>> {
            if self.failing.load(Ordering::SeqCst) {
                return Box::pin(async { Err(outage()) });
            }
            self.inner.increment_score(id, side, points, now)
        }

        fn complete(&self, completion: Completion) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.complete(completion)
        }

        fn settle_rewards(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
            self.inner.settle_rewards(id)
        }

        fn list_for_user(
            &self,
            user_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Vec<DuelEntity>>> {
            self.inner.list_for_user(user_id)
        }

        fn list_due(
            &self,
            now: OffsetDateTime,
            limit: usize,
        ) -> BoxFuture<'static, StorageResult<Vec<DuelEntity>>> {
            self.inner.list_due(now, limit)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.health_check()
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            self.inner.try_reconnect()
        }
    }

    /// Memory profile store whose writes fail while `failing` is set.
    pub struct FlakyProfiles {
        inner: MemoryProfileStore,
        failing: AtomicBool,
    }

    impl FlakyProfiles {
        fn new(inner: MemoryProfileStore) -> Self {
            Self {
                inner,
                failing: AtomicBool::new(false),
            }
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        fn failing(&self) -> bool {
            self.failing.load(Ordering::SeqCst)
        }
    }

    impl ProfileStore for FlakyProfiles {
        fn find_profiles(
            &self,
            ids: Vec<Uuid>,
        ) -> BoxFuture<'static, StorageResult<Vec<ProfileEntity>>> {
            self.inner.find_profiles(ids)
        }

        fn award_xp(
            &self,
            user_id: Uuid,
            duel_id: Uuid,
            amount: u64,
        ) -> BoxFuture<'static, StorageResult<XpAward>> {
            if self.failing() {
                return Box::pin(async { Err(outage()) });
            }
            self.inner.award_xp(user_id, duel_id, amount)
        }

        fn apply_level(&self, user_id: Uuid, level: u32) -> BoxFuture<'static, StorageResult<()>> {
            if self.failing() {
                return Box::pin(async { Err(outage()) });
            }
            self.inner.apply_level(user_id, level)
        }

        fn grant_badge(
            &self,
            user_id: Uuid,
            badge: &'static str,
        ) -> BoxFuture<'static, StorageResult<bool>> {
            if self.failing() {
                return Box::pin(async { Err(outage()) });
            }
            self.inner.grant_badge(user_id, badge)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{test_support::Harness, *};

    #[tokio::test]
    async fn starts_degraded_until_backend_installed() {
        let state = AppState::from_config(AppConfig::default());
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_backend().await,
            Err(ServiceError::Degraded)
        ));
    }

    #[tokio::test]
    async fn clearing_backend_broadcasts_degraded() {
        let harness = Harness::new().await;
        let mut watcher = harness.state.degraded_watcher();
        assert!(!*watcher.borrow_and_update());

        harness.state.clear_backend().await;
        watcher.changed().await.unwrap();
        assert!(*watcher.borrow());
        assert!(harness.state.require_backend().await.is_err());
    }
}
