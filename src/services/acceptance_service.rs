use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{duel_store::Activation, models::DuelStatus},
    dto::duel::AcceptDuelResponse,
    error::ServiceError,
    state::{SharedState, duel::competition_window},
};

/// Redeem an invite token and start the competition window.
///
/// Absent, consumed and expired tokens are reported identically.
pub async fn accept_duel(
    state: &SharedState,
    token: String,
    user_id: Uuid,
) -> Result<AcceptDuelResponse, ServiceError> {
    let backend = state.require_backend().await?;
    let Some(duel) = backend.duels.find_by_invite_token(token).await? else {
        return Err(ServiceError::InviteNotFound);
    };
    if duel.status != DuelStatus::Pending {
        return Err(ServiceError::InviteNotFound);
    }

    let now = state.now();
    if duel.expires_at < now {
        if backend.duels.expire_pending(duel.id).await? {
            info!(duel_id = %duel.id, "invite expired at acceptance");
            state.cache().invalidate(duel.id).await;
        }
        return Err(ServiceError::InviteNotFound);
    }

    if duel.challenger_id == user_id {
        return Err(ServiceError::SelfDuel);
    }
    if backend.duels.count_open_for_user(user_id).await? > 0 {
        debug!(%user_id, "acceptance refused; user already in an open duel");
        return Err(ServiceError::TooManyActive);
    }

    let (start_date, end_date) = competition_window(now, state.config().duel_duration);
    let activated = backend
        .duels
        .activate(Activation {
            duel_id: duel.id,
            opponent_id: user_id,
            start_date,
            end_date,
        })
        .await?;
    if !activated {
        // Another acceptance consumed the token first.
        return Err(ServiceError::InviteNotFound);
    }

    state.cache().invalidate(duel.id).await;
    info!(duel_id = %duel.id, %user_id, "duel accepted");
    Ok(AcceptDuelResponse { duel_id: duel.id })
}
