use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{ProfileEntity, XpAward},
    storage::StorageResult,
};

/// Gamification collaborator: display names, XP, levels and badges.
pub trait ProfileStore: Send + Sync {
    /// Load the profiles that exist among `ids`; unknown users are simply absent.
    fn find_profiles(&self, ids: Vec<Uuid>)
    -> BoxFuture<'static, StorageResult<Vec<ProfileEntity>>>;
    /// Credit `amount` XP for `duel_id` and report the level derived from the new total
    /// alongside the stored one.
    ///
    /// A duel is credited at most once per user; repeating the call only reports the
    /// current totals, so completion rewards can be retried safely.
    fn award_xp(
        &self,
        user_id: Uuid,
        duel_id: Uuid,
        amount: u64,
    ) -> BoxFuture<'static, StorageResult<XpAward>>;
    /// Persist a recomputed level.
    fn apply_level(&self, user_id: Uuid, level: u32) -> BoxFuture<'static, StorageResult<()>>;
    /// Add `badge` to the user's badge set. `true` only when it was newly granted.
    fn grant_badge(
        &self,
        user_id: Uuid,
        badge: &'static str,
    ) -> BoxFuture<'static, StorageResult<bool>>;
}
