use std::fmt;

use futures::future::BoxFuture;
use time::Date;
use uuid::Uuid;

use crate::dao::storage::StorageResult;

/// Identifies a once-per-day award for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey {
    /// User the award belongs to.
    pub user_id: Uuid,
    /// UTC calendar day the award was made on.
    pub day: Date,
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.user_id, self.day)
    }
}

/// Idempotency markers backing the daily dedup of repeatable actions.
pub trait DedupMarkers: Send + Sync {
    /// Record `key`, returning `true` when it was not present yet.
    fn try_mark(&self, key: DedupKey) -> BoxFuture<'static, StorageResult<bool>>;
    /// Forget `key` so the award can be made again. Used when the marked award never landed.
    fn release(&self, key: DedupKey) -> BoxFuture<'static, StorageResult<()>>;
}
