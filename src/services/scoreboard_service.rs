use std::collections::HashMap;

use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::{
        Backend,
        models::{DuelEntity, DuelStatus, ParticipantSide},
    },
    dto::{
        duel::{DuelSummary, ParticipantView, ScoreboardView},
        format_timestamp,
    },
    error::ServiceError,
    services::lifecycle_monitor,
    state::{SharedState, duel::remaining_ms},
};

/// Scoreboard of `duel_id` as seen by one of its participants.
///
/// Cached views are served as-is; a miss resolves due transitions before assembling.
pub async fn get_scoreboard(
    state: &SharedState,
    duel_id: Uuid,
    user_id: Uuid,
) -> Result<ScoreboardView, ServiceError> {
    if let Some(view) = state.cache().get(duel_id).await {
        if !view.is_participant(user_id) {
            return Err(ServiceError::NotAParticipant);
        }
        return Ok(view);
    }

    let backend = state.require_backend().await?;
    let Some(duel) = backend.duels.find_duel(duel_id).await? else {
        return Err(ServiceError::DuelNotFound);
    };
    if !duel.is_participant(user_id) {
        return Err(ServiceError::NotAParticipant);
    }

    let duel = lifecycle_monitor::resolve(state, duel).await?;
    let view = assemble(state, &backend, &duel).await;
    state.cache().put(view.clone()).await;
    Ok(view)
}

/// Every duel the user took part in, newest first, resolving overdue ones on the way.
pub async fn list_duels_for_user(
    state: &SharedState,
    user_id: Uuid,
) -> Result<Vec<DuelSummary>, ServiceError> {
    let backend = state.require_backend().await?;
    let duels = backend.duels.list_for_user(user_id).await?;

    let mut summaries = Vec::with_capacity(duels.len());
    for duel in duels {
        let duel = lifecycle_monitor::resolve(state, duel).await?;
        summaries.extend(DuelSummary::for_participant(&duel, user_id));
    }
    Ok(summaries)
}

async fn assemble(state: &SharedState, backend: &Backend, duel: &DuelEntity) -> ScoreboardView {
    let names: HashMap<Uuid, String> = match backend.profiles.find_profiles(duel.participants()).await
    {
        Ok(profiles) => profiles
            .into_iter()
            .map(|profile| (profile.user_id, profile.display_name))
            .collect(),
        Err(err) => {
            warn!(duel_id = %duel.id, error = %err, "failed to load participant names");
            HashMap::new()
        }
    };
    let participant = |user_id: Uuid, side: ParticipantSide| ParticipantView {
        user_id,
        display_name: names.get(&user_id).cloned().unwrap_or_default(),
        score: duel.score_of(side),
    };

    ScoreboardView {
        duel_id: duel.id,
        status: duel.status,
        challenger: participant(duel.challenger_id, ParticipantSide::Challenger),
        opponent: duel
            .opponent_id
            .map(|opponent_id| participant(opponent_id, ParticipantSide::Opponent)),
        start_date: duel.start_date.map(format_timestamp),
        end_date: duel.end_date.map(format_timestamp),
        invite_expires_at: (duel.status == DuelStatus::Pending)
            .then(|| format_timestamp(duel.expires_at)),
        winner_id: duel.winner_id,
        remaining_ms: remaining_ms(duel, state.now()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        cache::fakes::BrokenCache,
        dao::models::DUEL_CHAMPION_BADGE,
        services::{
            acceptance_service::accept_duel, invite_service::create_duel,
            score_ledger::record_action,
        },
        state::{scoring::ScorableAction, test_support::Harness},
    };
    use time::Duration;

    async fn active_duel(harness: &Harness) -> (Uuid, Uuid, Uuid) {
        let alice = harness.user("Alice");
        let bob = harness.user("Bob");
        let created = create_duel(&harness.state, alice, "premium").await.unwrap();
        accept_duel(&harness.state, created.invite_token, bob)
            .await
            .unwrap();
        (created.duel_id, alice, bob)
    }

    #[tokio::test]
    async fn scoreboard_shows_names_scores_and_time_left() {
        let harness = Harness::new().await;
        let (duel_id, alice, bob) = active_duel(&harness).await;
        record_action(&harness.state, alice, ScorableAction::LessonCompleted).await;
        harness.clock.advance(Duration::days(6));

        let view = get_scoreboard(&harness.state, duel_id, bob).await.unwrap();
        assert_eq!(view.status, DuelStatus::Active);
        assert_eq!(view.challenger.display_name, "Alice");
        assert_eq!(view.challenger.score, 10);
        assert_eq!(view.opponent.as_ref().unwrap().display_name, "Bob");
        assert_eq!(view.remaining_ms, 24 * 60 * 60 * 1000);
        assert_eq!(view.winner_id, None);
    }

    #[tokio::test]
    async fn strangers_are_refused_even_on_cache_hit() {
        let harness = Harness::new().await;
        let (duel_id, alice, _) = active_duel(&harness).await;
        let eve = harness.user("Eve");

        let err = get_scoreboard(&harness.state, duel_id, eve).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotAParticipant));

        get_scoreboard(&harness.state, duel_id, alice).await.unwrap();
        let err = get_scoreboard(&harness.state, duel_id, eve).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotAParticipant));
    }

    #[tokio::test]
    async fn unknown_duel_is_not_found() {
        let harness = Harness::new().await;
        let alice = harness.user("Alice");
        let err = get_scoreboard(&harness.state, Uuid::new_v4(), alice)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::DuelNotFound));
    }

    #[tokio::test]
    async fn elapsed_duel_is_completed_on_read() {
        let harness = Harness::new().await;
        let (duel_id, alice, bob) = active_duel(&harness).await;
        record_action(&harness.state, bob, ScorableAction::StreakMaintained).await;
        harness.clock.advance(Duration::days(7) + Duration::minutes(1));

        let view = get_scoreboard(&harness.state, duel_id, alice).await.unwrap();
        assert_eq!(view.status, DuelStatus::Completed);
        assert_eq!(view.winner_id, Some(bob));
        assert_eq!(view.remaining_ms, 0);

        let winner = harness.profiles.profile(bob).unwrap();
        assert!(winner.badges.contains(DUEL_CHAMPION_BADGE));
        assert_eq!(winner.xp, 150);
    }

    #[tokio::test]
    async fn concurrent_reads_after_deadline_reward_once() {
        let harness = Harness::new().await;
        let (duel_id, alice, bob) = active_duel(&harness).await;
        record_action(&harness.state, alice, ScorableAction::MealLogged).await;
        harness.clock.advance(Duration::days(8));

        let (left, right) = tokio::join!(
            get_scoreboard(&harness.state, duel_id, alice),
            get_scoreboard(&harness.state, duel_id, bob),
        );
        assert_eq!(left.unwrap().status, DuelStatus::Completed);
        assert_eq!(right.unwrap().status, DuelStatus::Completed);
        assert_eq!(harness.profiles.profile(alice).unwrap().xp, 150);
        assert_eq!(harness.profiles.profile(bob).unwrap().xp, 50);
    }

    #[tokio::test]
    async fn pending_scoreboard_carries_invite_deadline() {
        let harness = Harness::new().await;
        let alice = harness.user("Alice");
        let created = create_duel(&harness.state, alice, "premium").await.unwrap();

        let view = get_scoreboard(&harness.state, created.duel_id, alice)
            .await
            .unwrap();
        assert_eq!(view.status, DuelStatus::Pending);
        assert_eq!(view.opponent, None);
        assert_eq!(view.invite_expires_at, Some(created.expires_at));
        assert_eq!(view.remaining_ms, 0);
    }

    #[tokio::test]
    async fn scores_become_visible_after_invalidation() {
        let harness = Harness::new().await;
        let (duel_id, alice, _) = active_duel(&harness).await;

        let before = get_scoreboard(&harness.state, duel_id, alice).await.unwrap();
        assert_eq!(before.challenger.score, 0);

        record_action(&harness.state, alice, ScorableAction::LessonCompleted).await;
        let after = get_scoreboard(&harness.state, duel_id, alice).await.unwrap();
        assert_eq!(after.challenger.score, 10);
    }

    #[tokio::test]
    async fn broken_cache_falls_back_to_store() {
        let harness = Harness::with_cache(Arc::new(BrokenCache { hang: false })).await;
        let (duel_id, alice, bob) = active_duel(&harness).await;
        record_action(&harness.state, bob, ScorableAction::MealLogged).await;

        let view = get_scoreboard(&harness.state, duel_id, alice).await.unwrap();
        assert_eq!(view.opponent.unwrap().score, 5);
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_relative() {
        let harness = Harness::new().await;
        let (first_id, alice, bob) = active_duel(&harness).await;
        record_action(&harness.state, bob, ScorableAction::LessonCompleted).await;
        harness.clock.advance(Duration::days(7));
        lifecycle_monitor::sweep_expired_and_ended(&harness.state)
            .await
            .unwrap();

        let created = create_duel(&harness.state, alice, "premium").await.unwrap();
        let carol = harness.user("Carol");
        accept_duel(&harness.state, created.invite_token, carol)
            .await
            .unwrap();

        let summaries = list_duels_for_user(&harness.state, alice).await.unwrap();
        let ids: Vec<Uuid> = summaries.iter().map(|summary| summary.duel_id).collect();
        assert_eq!(ids, vec![created.duel_id, first_id]);
        assert_eq!(summaries[0].rival_id, Some(carol));
        assert_eq!(summaries[1].status, DuelStatus::Completed);
        assert_eq!(summaries[1].rival_score, 10);

        assert!(list_duels_for_user(&harness.state, harness.user("Nobody"))
            .await
            .unwrap()
            .is_empty());
    }
}
