use std::sync::Arc;

use futures::future::BoxFuture;
use indexmap::IndexMap;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::dao::{
    duel_store::{Activation, Completion, DuelStore},
    models::{DuelEntity, DuelStatus, ParticipantSide},
    storage::{StorageError, StorageResult},
};

/// [`DuelStore`] kept in process memory, ordered by insertion.
#[derive(Clone, Default)]
pub struct MemoryDuelStore {
    duels: Arc<RwLock<IndexMap<Uuid, DuelEntity>>>,
}

impl MemoryDuelStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_open_for(duel: &DuelEntity, user_id: Uuid) -> bool {
    !duel.status.is_terminal() && duel.is_participant(user_id)
}

fn has_open_duel(duels: &IndexMap<Uuid, DuelEntity>, user_id: Uuid) -> bool {
    duels.values().any(|duel| is_open_for(duel, user_id))
}

impl DuelStore for MemoryDuelStore {
    fn insert_pending(&self, duel: DuelEntity) -> BoxFuture<'static, StorageResult<()>> {
        let duels = self.duels.clone();
        Box::pin(async move {
            let mut guard = duels.write().await;
            if has_open_duel(&guard, duel.challenger_id) {
                return Err(StorageError::ActiveDuelConflict {
                    user_id: duel.challenger_id,
                });
            }
            guard.insert(duel.id, duel);
            Ok(())
        })
    }

    fn count_open_for_user(&self, user_id: Uuid) -> BoxFuture<'static, StorageResult<u64>> {
        let duels = self.duels.clone();
        Box::pin(async move {
            let guard = duels.read().await;
            Ok(guard
                .values()
                .filter(|duel| is_open_for(duel, user_id))
                .count() as u64)
        })
    }

    fn find_duel(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<DuelEntity>>> {
        let duels = self.duels.clone();
        Box::pin(async move { Ok(duels.read().await.get(&id).cloned()) })
    }

    fn find_by_invite_token(
        &self,
        token: String,
    ) -> BoxFuture<'static, StorageResult<Option<DuelEntity>>> {
        let duels = self.duels.clone();
        Box::pin(async move {
            let guard = duels.read().await;
            Ok(guard
                .values()
                .find(|duel| duel.invite_token.as_deref() == Some(token.as_str()))
                .cloned())
        })
    }

    fn activate(&self, activation: Activation) -> BoxFuture<'static, StorageResult<bool>> {
        let duels = self.duels.clone();
        Box::pin(async move {
            let mut guard = duels.write().await;
            let pending = guard
                .get(&activation.duel_id)
                .is_some_and(|duel| duel.status == DuelStatus::Pending);
            if !pending {
                return Ok(false);
            }
            if has_open_duel(&guard, activation.opponent_id) {
                return Err(StorageError::ActiveDuelConflict {
                    user_id: activation.opponent_id,
                });
            }

            let Some(duel) = guard.get_mut(&activation.duel_id) else {
                return Ok(false);
            };
            duel.opponent_id = Some(activation.opponent_id);
            duel.status = DuelStatus::Active;
            duel.invite_token = None;
            duel.start_date = Some(activation.start_date);
            duel.end_date = Some(activation.end_date);
            Ok(true)
        })
    }

    fn expire_pending(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let duels = self.duels.clone();
        Box::pin(async move {
            let mut guard = duels.write().await;
            match guard.get_mut(&id) {
                Some(duel) if duel.status == DuelStatus::Pending => {
                    duel.status = DuelStatus::Expired;
                    duel.invite_token = None;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn find_active_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<DuelEntity>>> {
        let duels = self.duels.clone();
        Box::pin(async move {
            let guard = duels.read().await;
            Ok(guard
                .values()
                .find(|duel| duel.status == DuelStatus::Active && duel.is_participant(user_id))
                .cloned())
        })
    }

    fn increment_score(
        &self,
        id: Uuid,
        side: ParticipantSide,
        points: u32,
        now: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let duels = self.duels.clone();
        Box::pin(async move {
            let mut guard = duels.write().await;
            let Some(duel) = guard.get_mut(&id) else {
                return Ok(false);
            };
            let window_open = duel.end_date.is_some_and(|end| now < end);
            if duel.status != DuelStatus::Active || !window_open {
                return Ok(false);
            }
            let score = match side {
                ParticipantSide::Challenger => &mut duel.challenger_score,
                ParticipantSide::Opponent => &mut duel.opponent_score,
            };
            *score = score.saturating_add(points);
            Ok(true)
        })
    }

    fn complete(&self, completion: Completion) -> BoxFuture<'static, StorageResult<bool>> {
        let duels = self.duels.clone();
        Box::pin(async move {
            let mut guard = duels.write().await;
            match guard.get_mut(&completion.duel_id) {
                Some(duel) if duel.status == DuelStatus::Active => {
                    duel.status = DuelStatus::Completed;
                    duel.winner_id = completion.winner_id;
                    duel.completed_at = Some(completion.completed_at);
                    duel.rewards_pending = true;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn settle_rewards(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let duels = self.duels.clone();
        Box::pin(async move {
            let mut guard = duels.write().await;
            match guard.get_mut(&id) {
                Some(duel) if duel.rewards_pending => {
                    duel.rewards_pending = false;
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn list_for_user(&self, user_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<DuelEntity>>> {
        let duels = self.duels.clone();
        Box::pin(async move {
            let guard = duels.read().await;
            Ok(guard
                .values()
                .rev()
                .filter(|duel| duel.is_participant(user_id))
                .cloned()
                .collect())
        })
    }

    fn list_due(
        &self,
        now: OffsetDateTime,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<DuelEntity>>> {
        let duels = self.duels.clone();
        Box::pin(async move {
            let guard = duels.read().await;
            Ok(guard
                .values()
                .filter(|duel| match duel.status {
                    DuelStatus::Pending => duel.expires_at <= now,
                    DuelStatus::Active => duel.end_date.is_some_and(|end| end <= now),
                    DuelStatus::Completed => duel.rewards_pending,
                    DuelStatus::Expired => false,
                })
                .take(limit)
                .cloned()
                .collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Duration, macros::datetime};

    const NOW: OffsetDateTime = datetime!(2026-03-02 10:00 UTC);

    fn pending_for(challenger: Uuid) -> DuelEntity {
        DuelEntity::pending(
            challenger,
            hex::encode(Uuid::new_v4().as_bytes()),
            NOW,
            NOW + Duration::hours(48),
        )
    }

    async fn active_duel(store: &MemoryDuelStore) -> (DuelEntity, Uuid) {
        let duel = pending_for(Uuid::new_v4());
        let opponent = Uuid::new_v4();
        store.insert_pending(duel.clone()).await.unwrap();
        assert!(
            store
                .activate(Activation {
                    duel_id: duel.id,
                    opponent_id: opponent,
                    start_date: NOW,
                    end_date: NOW + Duration::days(7),
                })
                .await
                .unwrap()
        );
        (store.find_duel(duel.id).await.unwrap().unwrap(), opponent)
    }

    #[tokio::test]
    async fn second_open_duel_for_challenger_is_rejected() {
        let store = MemoryDuelStore::new();
        let challenger = Uuid::new_v4();
        store.insert_pending(pending_for(challenger)).await.unwrap();

        let err = store
            .insert_pending(pending_for(challenger))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ActiveDuelConflict { user_id } if user_id == challenger));
        assert_eq!(store.count_open_for_user(challenger).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn activation_consumes_token_once() {
        let store = MemoryDuelStore::new();
        let duel = pending_for(Uuid::new_v4());
        let token = duel.invite_token.clone().unwrap();
        store.insert_pending(duel.clone()).await.unwrap();

        let activation = Activation {
            duel_id: duel.id,
            opponent_id: Uuid::new_v4(),
            start_date: NOW,
            end_date: NOW + Duration::days(7),
        };
        assert!(store.activate(activation.clone()).await.unwrap());
        assert!(!store.activate(activation).await.unwrap());
        assert!(store.find_by_invite_token(token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn opponent_with_open_duel_cannot_activate() {
        let store = MemoryDuelStore::new();
        let (_, busy_opponent) = active_duel(&store).await;
        let duel = pending_for(Uuid::new_v4());
        store.insert_pending(duel.clone()).await.unwrap();

        let err = store
            .activate(Activation {
                duel_id: duel.id,
                opponent_id: busy_opponent,
                start_date: NOW,
                end_date: NOW + Duration::days(7),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ActiveDuelConflict { .. }));
        let stored = store.find_duel(duel.id).await.unwrap().unwrap();
        assert_eq!(stored.status, DuelStatus::Pending);
    }

    #[tokio::test]
    async fn increments_stop_once_window_closes() {
        let store = MemoryDuelStore::new();
        let (duel, _) = active_duel(&store).await;

        assert!(
            store
                .increment_score(duel.id, ParticipantSide::Challenger, 10, NOW)
                .await
                .unwrap()
        );
        let end = duel.end_date.unwrap();
        assert!(
            !store
                .increment_score(duel.id, ParticipantSide::Challenger, 10, end)
                .await
                .unwrap()
        );
        let stored = store.find_duel(duel.id).await.unwrap().unwrap();
        assert_eq!(stored.challenger_score, 10);
    }

    #[tokio::test]
    async fn completion_is_conditional_on_active() {
        let store = MemoryDuelStore::new();
        let (duel, _) = active_duel(&store).await;
        let completion = Completion {
            duel_id: duel.id,
            winner_id: None,
            completed_at: NOW + Duration::days(7),
        };
        assert!(store.complete(completion.clone()).await.unwrap());
        assert!(!store.complete(completion).await.unwrap());
    }

    #[tokio::test]
    async fn completed_duel_stays_due_until_rewards_settle() {
        let store = MemoryDuelStore::new();
        let (duel, _) = active_duel(&store).await;
        let later = NOW + Duration::days(7);
        store
            .complete(Completion {
                duel_id: duel.id,
                winner_id: None,
                completed_at: later,
            })
            .await
            .unwrap();

        let due = store.list_due(later, 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert!(due[0].rewards_pending);

        assert!(store.settle_rewards(duel.id).await.unwrap());
        assert!(!store.settle_rewards(duel.id).await.unwrap());
        assert!(store.list_due(later, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_due_only_returns_elapsed_open_duels() {
        let store = MemoryDuelStore::new();
        let (active, _) = active_duel(&store).await;
        let pending = pending_for(Uuid::new_v4());
        store.insert_pending(pending.clone()).await.unwrap();

        assert!(store.list_due(NOW, 10).await.unwrap().is_empty());

        let later = NOW + Duration::days(8);
        let due: Vec<Uuid> = store
            .list_due(later, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|duel| duel.id)
            .collect();
        assert_eq!(due, vec![active.id, pending.id]);
        assert_eq!(store.list_due(later, 1).await.unwrap().len(), 1);
    }
}
