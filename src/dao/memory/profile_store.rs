use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::{
    dao::{
        models::{ProfileEntity, XpAward},
        profile_store::ProfileStore,
        storage::StorageResult,
    },
    state::leveling::LevelCurve,
};

/// [`ProfileStore`] kept in process memory.
#[derive(Clone)]
pub struct MemoryProfileStore {
    profiles: Arc<DashMap<Uuid, ProfileEntity>>,
    curve: LevelCurve,
}

impl MemoryProfileStore {
    /// Empty store deriving levels with `curve`.
    pub fn new(curve: LevelCurve) -> Self {
        Self {
            profiles: Arc::new(DashMap::new()),
            curve,
        }
    }

    /// Register or replace a profile.
    pub fn upsert(&self, profile: ProfileEntity) {
        self.profiles.insert(profile.user_id, profile);
    }

    /// Copy of the stored profile, if any.
    pub fn profile(&self, user_id: Uuid) -> Option<ProfileEntity> {
        self.profiles.get(&user_id).map(|entry| entry.clone())
    }
}

impl ProfileStore for MemoryProfileStore {
    fn find_profiles(
        &self,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<ProfileEntity>>> {
        let profiles = self.profiles.clone();
        Box::pin(async move {
            Ok(ids
                .into_iter()
                .filter_map(|id| profiles.get(&id).map(|entry| entry.clone()))
                .collect())
        })
    }

    fn award_xp(
        &self,
        user_id: Uuid,
        duel_id: Uuid,
        amount: u64,
    ) -> BoxFuture<'static, StorageResult<XpAward>> {
        let profiles = self.profiles.clone();
        let curve = self.curve;
        Box::pin(async move {
            let mut entry = profiles
                .entry(user_id)
                .or_insert_with(|| ProfileEntity::new(user_id, String::new()));
            let credited = entry.rewarded_duels.insert(duel_id);
            if credited {
                entry.xp = entry.xp.saturating_add(amount);
            }
            Ok(XpAward {
                total_xp: entry.xp,
                previous_level: entry.level,
                new_level: curve(entry.xp),
                credited,
            })
        })
    }

    fn apply_level(&self, user_id: Uuid, level: u32) -> BoxFuture<'static, StorageResult<()>> {
        let profiles = self.profiles.clone();
        Box::pin(async move {
            if let Some(mut entry) = profiles.get_mut(&user_id) {
                entry.level = level;
            }
            Ok(())
        })
    }

    fn grant_badge(
        &self,
        user_id: Uuid,
        badge: &'static str,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let profiles = self.profiles.clone();
        Box::pin(async move {
            let mut entry = profiles
                .entry(user_id)
                .or_insert_with(|| ProfileEntity::new(user_id, String::new()));
            Ok(entry.badges.insert(badge))
        })
    }
}
