use futures::future::BoxFuture;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::dao::{
    models::{DuelEntity, ParticipantSide},
    storage::StorageResult,
};

/// Conditional `pending -> active` update applied when an invite is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activation {
    pub duel_id: Uuid,
    /// User accepting the invite.
    pub opponent_id: Uuid,
    pub start_date: OffsetDateTime,
    pub end_date: OffsetDateTime,
}

/// Conditional `active -> completed` update applied once a window elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub duel_id: Uuid,
    /// Higher scorer, `None` on a tie.
    pub winner_id: Option<Uuid>,
    pub completed_at: OffsetDateTime,
}

/// Abstraction over the persistence layer for duels.
///
/// Every mutation is a conditional update evaluated atomically by the backend;
/// the boolean results report whether the condition held and the write landed.
pub trait DuelStore: Send + Sync {
    /// Persist a new pending duel.
    ///
    /// Fails with [`StorageError::ActiveDuelConflict`](crate::dao::storage::StorageError)
    /// when the challenger already participates in a pending or active duel.
    fn insert_pending(&self, duel: DuelEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Count pending or active duels in which `user_id` participates, in either role.
    fn count_open_for_user(&self, user_id: Uuid) -> BoxFuture<'static, StorageResult<u64>>;
    fn find_duel(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<DuelEntity>>>;
    /// Duel still holding `token` as its invite secret.
    fn find_by_invite_token(
        &self,
        token: String,
    ) -> BoxFuture<'static, StorageResult<Option<DuelEntity>>>;
    /// Turn a pending duel active and consume its token. `false` when it was no longer pending.
    ///
    /// Fails with `ActiveDuelConflict` when the opponent already has an open duel.
    fn activate(&self, activation: Activation) -> BoxFuture<'static, StorageResult<bool>>;
    /// Mark a pending duel expired. `false` when it was no longer pending.
    fn expire_pending(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    fn find_active_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<DuelEntity>>>;
    /// Atomically add `points` to one side while the duel is active and its window is open at `now`.
    fn increment_score(
        &self,
        id: Uuid,
        side: ParticipantSide,
        points: u32,
        now: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Finalize an active duel and flag its rewards as pending, in one conditional write.
    /// `false` when another caller already left `active`.
    fn complete(&self, completion: Completion) -> BoxFuture<'static, StorageResult<bool>>;
    /// Clear the pending-rewards flag of a completed duel. `false` when it was already clear.
    fn settle_rewards(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    /// Every duel the user took part in, newest first.
    fn list_for_user(&self, user_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<DuelEntity>>>;
    /// Non-terminal duels whose invite deadline or window end is at or before `now`,
    /// plus completed duels whose rewards are still pending.
    fn list_due(
        &self,
        now: OffsetDateTime,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<DuelEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
