use tracing::{info, warn};

use crate::{
    dao::models::DuelEntity,
    error::ServiceError,
    services::completion_service,
    state::{
        SharedState,
        duel::{DueTransition, due_transition},
    },
};

/// Apply any transition `duel` is owed at the current instant and return its resolved state.
pub async fn resolve(state: &SharedState, duel: DuelEntity) -> Result<DuelEntity, ServiceError> {
    let Some(transition) = due_transition(&duel, state.now()) else {
        return Ok(duel);
    };

    let backend = state.require_backend().await?;
    match transition {
        DueTransition::Complete => {
            completion_service::complete_duel(state, duel.id).await?;
        }
        DueTransition::Expire => {
            if backend.duels.expire_pending(duel.id).await? {
                info!(duel_id = %duel.id, "unaccepted invite expired");
                state.cache().invalidate(duel.id).await;
            }
        }
        DueTransition::SettleRewards => {
            completion_service::settle_rewards(state, &duel).await?;
        }
    }

    backend
        .duels
        .find_duel(duel.id)
        .await?
        .ok_or(ServiceError::DuelNotFound)
}

/// Resolve one batch of overdue duels: open ones whose deadline passed and
/// completed ones whose rewards are still pending.
///
/// Returns how many of them ended up terminal with nothing left owed.
pub async fn sweep_expired_and_ended(state: &SharedState) -> Result<usize, ServiceError> {
    let backend = state.require_backend().await?;
    let due = backend
        .duels
        .list_due(state.now(), state.config().sweep_batch_size)
        .await?;

    let mut processed = 0;
    for duel in due {
        let duel_id = duel.id;
        match resolve(state, duel).await {
            Ok(resolved) if resolved.status.is_terminal() && !resolved.rewards_pending => {
                processed += 1
            }
            Ok(_) => {}
            Err(err) => warn!(%duel_id, error = %err, "failed to resolve due duel"),
        }
    }
    Ok(processed)
}
