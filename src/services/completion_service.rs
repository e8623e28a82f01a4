use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        Backend,
        duel_store::Completion,
        models::{DUEL_CHAMPION_BADGE, DuelEntity, DuelStatus},
    },
    error::ServiceError,
    state::{SharedState, duel::decide_winner},
};

/// Finalize an active duel whose window elapsed and distribute rewards.
///
/// Returns `true` only for the caller whose conditional update moved the duel
/// out of `active`; every other concurrent caller gets `false` and does nothing.
/// Rewards that fail to land stay flagged on the duel and are retried by
/// [`settle_rewards`].
pub async fn complete_duel(state: &SharedState, duel_id: Uuid) -> Result<bool, ServiceError> {
    let backend = state.require_backend().await?;
    let Some(duel) = backend.duels.find_duel(duel_id).await? else {
        return Err(ServiceError::DuelNotFound);
    };
    if duel.status != DuelStatus::Active {
        return Ok(false);
    }

    // Scores are frozen once the window closed, so this read is final.
    let winner_id = decide_winner(&duel);
    let completed_at = state.now();
    let won = backend
        .duels
        .complete(Completion {
            duel_id,
            winner_id,
            completed_at,
        })
        .await?;
    if !won {
        return Ok(false);
    }

    info!(
        %duel_id,
        winner_id = ?winner_id,
        challenger_score = duel.challenger_score,
        opponent_score = duel.opponent_score,
        "duel completed"
    );

    let completed = DuelEntity {
        status: DuelStatus::Completed,
        winner_id,
        completed_at: Some(completed_at),
        rewards_pending: true,
        ..duel
    };
    distribute_rewards(state, &backend, &completed).await;

    state.cache().invalidate(duel_id).await;
    Ok(true)
}

/// Retry the rewards of a completed duel that still has some pending.
///
/// Returns `true` once every reward landed and the duel was marked settled.
pub async fn settle_rewards(state: &SharedState, duel: &DuelEntity) -> Result<bool, ServiceError> {
    if duel.status != DuelStatus::Completed || !duel.rewards_pending {
        return Ok(false);
    }
    let backend = state.require_backend().await?;
    let settled = distribute_rewards(state, &backend, duel).await;
    if settled {
        info!(duel_id = %duel.id, "pending duel rewards settled");
        state.cache().invalidate(duel.id).await;
    }
    Ok(settled)
}

/// Award participation XP, the winner bonus and the champion badge.
///
/// Every step is idempotent per duel, so this may run again after a partial failure.
async fn distribute_rewards(state: &SharedState, backend: &Backend, duel: &DuelEntity) -> bool {
    let duel_id = duel.id;
    let mut delivered = true;

    let participation = state.config().participation_xp;
    for participant in duel.participants() {
        let bonus = if Some(participant) == duel.winner_id {
            state.config().winner_bonus_xp
        } else {
            0
        };
        delivered &= award(backend, duel_id, participant, participation + bonus).await;
    }
    if let Some(winner_id) = duel.winner_id {
        match backend
            .profiles
            .grant_badge(winner_id, DUEL_CHAMPION_BADGE)
            .await
        {
            Ok(true) => info!(%duel_id, user_id = %winner_id, "champion badge granted"),
            Ok(false) => {}
            Err(err) => {
                error!(%duel_id, user_id = %winner_id, error = %err, "failed to grant champion badge");
                delivered = false;
            }
        }
    }

    if !delivered {
        warn!(%duel_id, "duel rewards incomplete; left pending for retry");
        return false;
    }
    match backend.duels.settle_rewards(duel_id).await {
        Ok(_) => true,
        Err(err) => {
            warn!(%duel_id, error = %err, "failed to mark duel rewards settled");
            false
        }
    }
}

async fn award(backend: &Backend, duel_id: Uuid, user_id: Uuid, amount: u64) -> bool {
    let award = match backend.profiles.award_xp(user_id, duel_id, amount).await {
        Ok(award) => award,
        Err(err) => {
            error!(%duel_id, %user_id, amount, error = %err, "failed to award duel xp");
            return false;
        }
    };
    if !award.credited {
        debug!(%duel_id, %user_id, "duel xp already credited");
    }
    if !award.level_changed() {
        return true;
    }
    match backend.profiles.apply_level(user_id, award.new_level).await {
        Ok(()) => {
            info!(
                %user_id,
                from = award.previous_level,
                to = award.new_level,
                "level changed after duel"
            );
            true
        }
        Err(err) => {
            warn!(%user_id, error = %err, "failed to persist recomputed level");
            false
        }
    }
}
