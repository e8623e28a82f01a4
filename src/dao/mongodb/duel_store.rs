use std::time::Duration;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Collection,
    bson::{DateTime, Document, doc},
};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use super::{
    connection::MongoConnection,
    error::{MongoDaoError, is_duplicate_key},
    models::{MongoClaimDocument, MongoDuelDocument, doc_id, participant_filter, to_bson},
};
use crate::dao::{
    duel_store::{Activation, Completion, DuelStore},
    models::{DuelEntity, DuelStatus, ParticipantSide},
    storage::{StorageError, StorageResult},
};

pub const DUEL_COLLECTION_NAME: &str = "duels";
pub const CLAIM_COLLECTION_NAME: &str = "duel_claims";

/// A claim whose duel document never showed up is abandoned after this long.
const ORPHAN_CLAIM_GRACE: Duration = Duration::from_secs(120);

/// MongoDB-backed [`DuelStore`].
///
/// The one-open-duel-per-user rule is enforced through the `duel_claims`
/// collection: a user holds at most one claim document (keyed by user id)
/// while any of their duels is pending or active.
#[derive(Clone)]
pub struct MongoDuelStore {
    connection: MongoConnection,
}

impl MongoDuelStore {
    /// Duel store over the shared connection.
    pub fn new(connection: MongoConnection) -> Self {
        Self { connection }
    }

    async fn collection(&self) -> Collection<MongoDuelDocument> {
        self.connection.collection(DUEL_COLLECTION_NAME).await
    }

    async fn claims(&self) -> Collection<MongoClaimDocument> {
        self.connection.collection(CLAIM_COLLECTION_NAME).await
    }

    async fn find_one(&self, id: Uuid) -> StorageResult<Option<DuelEntity>> {
        let document = self
            .collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadDuel { id, source })?;
        Ok(document.map(DuelEntity::try_from).transpose()?)
    }

    async fn query(
        &self,
        filter: Document,
        limit: Option<i64>,
    ) -> StorageResult<Vec<DuelEntity>> {
        let collection = self.collection().await;
        let mut find = collection.find(filter).sort(doc! {"created_at": -1});
        if let Some(limit) = limit {
            find = find.limit(limit);
        }
        let documents: Vec<MongoDuelDocument> = find
            .await
            .map_err(|source| MongoDaoError::QueryDuels { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::QueryDuels { source })?;

        let duels = documents
            .into_iter()
            .map(DuelEntity::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(duels)
    }

    /// Take the open-duel slot of `user_id` for `duel_id`.
    async fn claim(&self, user_id: Uuid, duel_id: Uuid) -> StorageResult<()> {
        let claims = self.claims().await;
        let claim = MongoClaimDocument {
            user_id: user_id.to_string(),
            duel_id: duel_id.to_string(),
            claimed_at: DateTime::now(),
        };

        // A second attempt is made only after a stale claim was cleared.
        for _ in 0..2 {
            match claims.insert_one(&claim).await {
                Ok(_) => return Ok(()),
                Err(err) if is_duplicate_key(&err) => {
                    if !self.release_stale_claim(user_id).await? {
                        return Err(StorageError::ActiveDuelConflict { user_id });
                    }
                }
                Err(source) => return Err(MongoDaoError::Claim { user_id, source }.into()),
            }
        }

        Err(StorageError::ActiveDuelConflict { user_id })
    }

    /// Drop the claim of `user_id` when it points at a finished or abandoned duel.
    async fn release_stale_claim(&self, user_id: Uuid) -> StorageResult<bool> {
        let claims = self.claims().await;
        let Some(existing) = claims
            .find_one(doc_id(user_id))
            .await
            .map_err(|source| MongoDaoError::Claim { user_id, source })?
        else {
            return Ok(true);
        };

        let holder = match Uuid::parse_str(&existing.duel_id) {
            Ok(duel_id) => self.find_one(duel_id).await?,
            Err(_) => None,
        };
        let stale = match holder {
            Some(duel) => duel.status.is_terminal(),
            None => existing
                .claimed_at
                .to_system_time()
                .elapsed()
                .is_ok_and(|age| age >= ORPHAN_CLAIM_GRACE),
        };
        if !stale {
            return Ok(false);
        }

        warn!(%user_id, duel_id = %existing.duel_id, "releasing stale duel claim");
        claims
            .delete_one(doc! {"_id": user_id.to_string(), "duel_id": existing.duel_id.as_str()})
            .await
            .map_err(|source| MongoDaoError::Claim { user_id, source })?;
        Ok(true)
    }

    async fn release_claim(&self, user_id: Uuid, duel_id: Uuid) {
        let result = self
            .claims()
            .await
            .delete_one(doc! {"_id": user_id.to_string(), "duel_id": duel_id.to_string()})
            .await;
        if let Err(err) = result {
            warn!(%user_id, %duel_id, error = %err, "failed to release duel claim");
        }
    }

    /// Free the slots held for a duel that reached a terminal state.
    async fn release_claims(&self, duel_id: Uuid) {
        let result = self
            .claims()
            .await
            .delete_many(doc! {"duel_id": duel_id.to_string()})
            .await;
        if let Err(err) = result {
            warn!(%duel_id, error = %err, "failed to release duel claims");
        }
    }

    async fn insert_pending(&self, duel: DuelEntity) -> StorageResult<()> {
        let id = duel.id;
        let challenger_id = duel.challenger_id;
        self.claim(challenger_id, id).await?;

        let document: MongoDuelDocument = duel.into();
        if let Err(source) = self.collection().await.insert_one(&document).await {
            self.release_claim(challenger_id, id).await;
            return Err(MongoDaoError::SaveDuel { id, source }.into());
        }
        Ok(())
    }

    async fn count_open_for_user(&self, user_id: Uuid) -> StorageResult<u64> {
        let mut filter = participant_filter(user_id);
        let open: Vec<&str> = DuelStatus::OPEN.iter().map(|status| status.as_str()).collect();
        filter.insert("status", doc! {"$in": open});
        let count = self
            .collection()
            .await
            .count_documents(filter)
            .await
            .map_err(|source| MongoDaoError::QueryDuels { source })?;
        Ok(count)
    }

    async fn find_by_invite_token(&self, token: String) -> StorageResult<Option<DuelEntity>> {
        let document = self
            .collection()
            .await
            .find_one(doc! {"invite_token": token})
            .await
            .map_err(|source| MongoDaoError::QueryDuels { source })?;
        Ok(document.map(DuelEntity::try_from).transpose()?)
    }

    async fn activate(&self, activation: Activation) -> StorageResult<bool> {
        let Activation {
            duel_id,
            opponent_id,
            start_date,
            end_date,
        } = activation;
        self.claim(opponent_id, duel_id).await?;

        let result = self
            .collection()
            .await
            .update_one(
                doc! {"_id": duel_id.to_string(), "status": DuelStatus::Pending.as_str()},
                doc! {
                    "$set": {
                        "opponent_id": opponent_id.to_string(),
                        "status": DuelStatus::Active.as_str(),
                        "start_date": to_bson(start_date),
                        "end_date": to_bson(end_date),
                    },
                    "$unset": {"invite_token": ""},
                },
            )
            .await;

        match result {
            Ok(outcome) if outcome.matched_count > 0 => Ok(true),
            Ok(_) => {
                self.release_claim(opponent_id, duel_id).await;
                Ok(false)
            }
            Err(source) => {
                self.release_claim(opponent_id, duel_id).await;
                Err(MongoDaoError::SaveDuel { id: duel_id, source }.into())
            }
        }
    }

    async fn expire_pending(&self, id: Uuid) -> StorageResult<bool> {
        let outcome = self
            .collection()
            .await
            .update_one(
                doc! {"_id": id.to_string(), "status": DuelStatus::Pending.as_str()},
                doc! {
                    "$set": {"status": DuelStatus::Expired.as_str()},
                    "$unset": {"invite_token": ""},
                },
            )
            .await
            .map_err(|source| MongoDaoError::SaveDuel { id, source })?;

        let expired = outcome.matched_count > 0;
        if expired {
            self.release_claims(id).await;
        }
        Ok(expired)
    }

    async fn find_active_for_user(&self, user_id: Uuid) -> StorageResult<Option<DuelEntity>> {
        let mut filter = participant_filter(user_id);
        filter.insert("status", DuelStatus::Active.as_str());
        let document = self
            .collection()
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::QueryDuels { source })?;
        Ok(document.map(DuelEntity::try_from).transpose()?)
    }

    async fn increment_score(
        &self,
        id: Uuid,
        side: ParticipantSide,
        points: u32,
        now: OffsetDateTime,
    ) -> StorageResult<bool> {
        let field = match side {
            ParticipantSide::Challenger => "challenger_score",
            ParticipantSide::Opponent => "opponent_score",
        };
        let outcome = self
            .collection()
            .await
            .update_one(
                doc! {
                    "_id": id.to_string(),
                    "status": DuelStatus::Active.as_str(),
                    "end_date": {"$gt": to_bson(now)},
                },
                doc! {"$inc": {field: i64::from(points)}},
            )
            .await
            .map_err(|source| MongoDaoError::SaveDuel { id, source })?;
        Ok(outcome.matched_count > 0)
    }

    async fn complete(&self, completion: Completion) -> StorageResult<bool> {
        let Completion {
            duel_id,
            winner_id,
            completed_at,
        } = completion;
        let outcome = self
            .collection()
            .await
            .update_one(
                doc! {"_id": duel_id.to_string(), "status": DuelStatus::Active.as_str()},
                doc! {
                    "$set": {
                        "status": DuelStatus::Completed.as_str(),
                        "winner_id": winner_id.map(|id| id.to_string()),
                        "completed_at": to_bson(completed_at),
                        "rewards_pending": true,
                    },
                },
            )
            .await
            .map_err(|source| MongoDaoError::SaveDuel { id: duel_id, source })?;

        let completed = outcome.matched_count > 0;
        if completed {
            self.release_claims(duel_id).await;
        }
        Ok(completed)
    }

    async fn settle_rewards(&self, id: Uuid) -> StorageResult<bool> {
        let outcome = self
            .collection()
            .await
            .update_one(
                doc! {"_id": id.to_string(), "rewards_pending": true},
                doc! {"$set": {"rewards_pending": false}},
            )
            .await
            .map_err(|source| MongoDaoError::SaveDuel { id, source })?;
        Ok(outcome.matched_count > 0)
    }

    async fn list_due(&self, now: OffsetDateTime, limit: usize) -> StorageResult<Vec<DuelEntity>> {
        let now = to_bson(now);
        let filter = doc! {
            "$or": [
                {"status": DuelStatus::Pending.as_str(), "expires_at": {"$lte": now}},
                {"status": DuelStatus::Active.as_str(), "end_date": {"$lte": now}},
                {"status": DuelStatus::Completed.as_str(), "rewards_pending": true},
            ]
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query(filter, Some(limit)).await
    }
}

impl DuelStore for MongoDuelStore {
    fn insert_pending(&self, duel: DuelEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_pending(duel).await })
    }

    fn count_open_for_user(&self, user_id: Uuid) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.count_open_for_user(user_id).await })
    }

    fn find_duel(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<DuelEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_one(id).await })
    }

    fn find_by_invite_token(
        &self,
        token: String,
    ) -> BoxFuture<'static, StorageResult<Option<DuelEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_by_invite_token(token).await })
    }

    fn activate(&self, activation: Activation) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.activate(activation).await })
    }

    fn expire_pending(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.expire_pending(id).await })
    }

    fn find_active_for_user(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<DuelEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_active_for_user(user_id).await })
    }

    fn increment_score(
        &self,
        id: Uuid,
        side: ParticipantSide,
        points: u32,
        now: OffsetDateTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.increment_score(id, side, points, now).await })
    }

    fn complete(&self, completion: Completion) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.complete(completion).await })
    }

    fn settle_rewards(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.settle_rewards(id).await })
    }

    fn list_for_user(&self, user_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<DuelEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.query(participant_filter(user_id), None).await })
    }

    fn list_due(
        &self,
        now: OffsetDateTime,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<DuelEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_due(now, limit).await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.connection.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.connection.reconnect().await.map_err(Into::into) })
    }
}
