use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::{
    dao::{Backend, marker_store::DedupKey},
    state::{SharedState, scoring::ScorableAction},
};

/// What a reported action did to the caller's duel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    /// Points were added to the caller's side.
    Scored { duel_id: Uuid, points: u32 },
    /// The caller has no active duel.
    NotDueling,
    /// The action is worth nothing.
    NoPoints,
    /// A once-per-day action was already scored today.
    AlreadyScoredToday,
    /// The duel window closed before the increment landed.
    WindowClosed,
    /// Storage failed; nothing was scored.
    Failed,
}

/// Hand an action to the ledger without waiting for it.
pub fn spawn_record_action(state: SharedState, user_id: Uuid, action: ScorableAction) {
    tokio::spawn(async move {
        record_action(&state, user_id, action).await;
    });
}

/// Score `action` for `user_id` in their active duel, if any. Never fails.
pub async fn record_action(
    state: &SharedState,
    user_id: Uuid,
    action: ScorableAction,
) -> LedgerOutcome {
    let points = action.points();
    if points == 0 {
        debug!(%user_id, action = action.as_str(), "action carries no duel points");
        return LedgerOutcome::NoPoints;
    }

    let backend = match state.require_backend().await {
        Ok(backend) => backend,
        Err(err) => {
            warn!(%user_id, action = action.as_str(), error = %err, "dropping scorable action");
            return LedgerOutcome::Failed;
        }
    };

    let duel = match backend.duels.find_active_for_user(user_id).await {
        Ok(Some(duel)) => duel,
        Ok(None) => return LedgerOutcome::NotDueling,
        Err(err) => {
            error!(%user_id, action = action.as_str(), error = %err, "failed to look up active duel");
            return LedgerOutcome::Failed;
        }
    };
    let Some(side) = duel.side_of(user_id) else {
        return LedgerOutcome::NotDueling;
    };

    let now = state.now();
    let mut marked = None;
    if action.once_per_day() {
        let key = DedupKey {
            user_id,
            day: now.date(),
        };
        match backend.markers.try_mark(key).await {
            Ok(true) => marked = Some(key),
            Ok(false) => {
                debug!(%user_id, duel_id = %duel.id, "daily action already scored");
                return LedgerOutcome::AlreadyScoredToday;
            }
            // Scoring twice beats dropping the action.
            Err(err) => warn!(%key, error = %err, "dedup marker unavailable; scoring anyway"),
        }
    }

    match backend.duels.increment_score(duel.id, side, points, now).await {
        Ok(true) => {
            state.cache().invalidate(duel.id).await;
            debug!(%user_id, duel_id = %duel.id, action = action.as_str(), points, "duel score incremented");
            LedgerOutcome::Scored {
                duel_id: duel.id,
                points,
            }
        }
        Ok(false) => {
            release_marker(&backend, marked).await;
            LedgerOutcome::WindowClosed
        }
        Err(err) => {
            error!(%user_id, duel_id = %duel.id, error = %err, "failed to increment duel score");
            release_marker(&backend, marked).await;
            LedgerOutcome::Failed
        }
    }
}

/// Give back a daily marker whose points never landed.
async fn release_marker(backend: &Backend, marked: Option<DedupKey>) {
    let Some(key) = marked else {
        return;
    };
    if let Err(err) = backend.markers.release(key).await {
        warn!(%key, error = %err, "failed to release dedup marker");
    }
}
