use rand::RngCore;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::models::DuelEntity,
    dto::{duel::CreateDuelResponse, format_timestamp},
    error::ServiceError,
    state::SharedState,
};

const INVITE_TOKEN_BYTES: usize = 16;

/// Issue a pending duel and its single-use invite for `challenger_id`.
pub async fn create_duel(
    state: &SharedState,
    challenger_id: Uuid,
    tier: &str,
) -> Result<CreateDuelResponse, ServiceError> {
    if !state.gate().has_duel_capability(tier) {
        debug!(user_id = %challenger_id, tier, "duel creation denied for tier");
        return Err(ServiceError::CapabilityDenied);
    }

    let backend = state.require_backend().await?;
    if backend.duels.count_open_for_user(challenger_id).await? > 0 {
        return Err(ServiceError::TooManyActive);
    }

    let now = state.now();
    let expires_at = now + state.config().invite_ttl;
    let token = generate_invite_token();
    let duel = DuelEntity::pending(challenger_id, token.clone(), now, expires_at);
    let duel_id = duel.id;

    // Concurrent creations that both passed the count are settled here.
    backend.duels.insert_pending(duel).await?;
    info!(%duel_id, user_id = %challenger_id, "duel invite issued");

    Ok(CreateDuelResponse {
        duel_id,
        invite_link: state.config().invite_link(&token),
        invite_token: token,
        expires_at: format_timestamp(expires_at),
    })
}

/// 128 random bits, hex-encoded.
fn generate_invite_token() -> String {
    let mut bytes = [0u8; INVITE_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::DuelStatus,
        dto::validation::validate_invite_token,
        state::test_support::{Harness, START},
    };
    use time::Duration;

    #[test]
    fn tokens_are_unique_lowercase_hex() {
        let first = generate_invite_token();
        let second = generate_invite_token();
        assert!(validate_invite_token(&first).is_ok());
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn premium_user_gets_pending_duel_and_link() {
        let harness = Harness::new().await;
        let alice = harness.user("Alice");

        let created = create_duel(&harness.state, alice, "premium").await.unwrap();
        assert!(created.invite_link.ends_with(&format!("?token={}", created.invite_token)));
        assert_eq!(created.expires_at, format_timestamp(START + Duration::hours(48)));

        let stored = harness
            .state
            .require_backend()
            .await
            .unwrap()
            .duels
            .find_duel(created.duel_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, DuelStatus::Pending);
        assert_eq!(stored.challenger_id, alice);
        assert_eq!(stored.invite_token.as_deref(), Some(created.invite_token.as_str()));
    }

    #[tokio::test]
    async fn free_tier_is_denied() {
        let harness = Harness::new().await;
        let user = harness.user("Bob");
        let err = create_duel(&harness.state, user, "free").await.unwrap_err();
        assert!(matches!(err, ServiceError::CapabilityDenied));
    }

    #[tokio::test]
    async fn second_invite_while_pending_is_rejected() {
        let harness = Harness::new().await;
        let alice = harness.user("Alice");
        create_duel(&harness.state, alice, "premium").await.unwrap();

        let err = create_duel(&harness.state, alice, "family").await.unwrap_err();
        assert!(matches!(err, ServiceError::TooManyActive));
    }

    #[tokio::test]
    async fn concurrent_creations_leave_one_open_duel() {
        let harness = Harness::new().await;
        let alice = harness.user("Alice");

        let (first, second) = tokio::join!(
            create_duel(&harness.state, alice, "premium"),
            create_duel(&harness.state, alice, "premium"),
        );
        assert_eq!(
            [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(),
            1
        );
        let backend = harness.state.require_backend().await.unwrap();
        assert_eq!(backend.duels.count_open_for_user(alice).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn degraded_state_refuses_creation() {
        let harness = Harness::new().await;
        let alice = harness.user("Alice");
        harness.state.clear_backend().await;
        let err = create_duel(&harness.state, alice, "premium").await.unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }
}
