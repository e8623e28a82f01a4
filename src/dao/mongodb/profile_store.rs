use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Collection, bson::doc, options::ReturnDocument};
use uuid::Uuid;

use super::{
    connection::MongoConnection,
    error::{MongoDaoError, is_duplicate_key},
    models::{MongoProfileDocument, clamp_level, doc_id},
};
use crate::{
    dao::{
        models::{ProfileEntity, XpAward},
        profile_store::ProfileStore,
        storage::StorageResult,
    },
    state::leveling::LevelCurve,
};

pub const PROFILE_COLLECTION_NAME: &str = "profiles";

/// MongoDB-backed [`ProfileStore`].
#[derive(Clone)]
pub struct MongoProfileStore {
    connection: MongoConnection,
    curve: LevelCurve,
}

impl MongoProfileStore {
    /// Profile store over the shared connection, deriving levels with `curve`.
    pub fn new(connection: MongoConnection, curve: LevelCurve) -> Self {
        Self { connection, curve }
    }

    async fn collection(&self) -> Collection<MongoProfileDocument> {
        self.connection.collection(PROFILE_COLLECTION_NAME).await
    }

    async fn find_profiles(&self, ids: Vec<Uuid>) -> StorageResult<Vec<ProfileEntity>> {
        let ids: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        let documents: Vec<MongoProfileDocument> = self
            .collection()
            .await
            .find(doc! {"_id": {"$in": ids}})
            .await
            .map_err(|source| MongoDaoError::LoadProfiles { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadProfiles { source })?;

        let profiles = documents
            .into_iter()
            .map(ProfileEntity::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }

    async fn award_xp(&self, user_id: Uuid, duel_id: Uuid, amount: u64) -> StorageResult<XpAward> {
        let collection = self.collection().await;
        let map_err = |source| MongoDaoError::UpdateProfile { user_id, source };

        let created = collection
            .update_one(
                doc_id(user_id),
                doc! {"$setOnInsert": {"xp": 0_i64, "level": 1_i64, "display_name": ""}},
            )
            .upsert(true)
            .await;
        match created {
            Ok(_) => {}
            // Lost an upsert race; the profile exists either way.
            Err(err) if is_duplicate_key(&err) => {}
            Err(source) => return Err(map_err(source).into()),
        }

        let duel = duel_id.to_string();
        let amount = i64::try_from(amount).unwrap_or(i64::MAX);
        let credited = collection
            .find_one_and_update(
                doc! {"_id": user_id.to_string(), "rewarded_duels": {"$ne": duel.as_str()}},
                doc! {
                    "$inc": {"xp": amount},
                    "$addToSet": {"rewarded_duels": duel.as_str()},
                },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(map_err)?;

        let (document, credited) = match credited {
            Some(document) => (document, true),
            None => {
                let current = collection
                    .find_one(doc_id(user_id))
                    .await
                    .map_err(map_err)?
                    .ok_or(MongoDaoError::Malformed {
                        id: user_id.to_string(),
                        reason: "profile vanished while awarding xp",
                    })?;
                (current, false)
            }
        };

        let total_xp = u64::try_from(document.xp).unwrap_or_default();
        Ok(XpAward {
            total_xp,
            previous_level: clamp_level(document.level),
            new_level: (self.curve)(total_xp),
            credited,
        })
    }

    async fn apply_level(&self, user_id: Uuid, level: u32) -> StorageResult<()> {
        self.collection()
            .await
            .update_one(doc_id(user_id), doc! {"$set": {"level": i64::from(level)}})
            .await
            .map_err(|source| MongoDaoError::UpdateProfile { user_id, source })?;
        Ok(())
    }

    async fn grant_badge(&self, user_id: Uuid, badge: &'static str) -> StorageResult<bool> {
        let outcome = self
            .collection()
            .await
            .update_one(doc_id(user_id), doc! {"$addToSet": {"badges": badge}})
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::UpdateProfile { user_id, source })?;
        Ok(outcome.modified_count > 0 || outcome.upserted_id.is_some())
    }
}

impl ProfileStore for MongoProfileStore {
    fn find_profiles(
        &self,
        ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Vec<ProfileEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_profiles(ids).await })
    }

    fn award_xp(
        &self,
        user_id: Uuid,
        duel_id: Uuid,
        amount: u64,
    ) -> BoxFuture<'static, StorageResult<XpAward>> {
        let store = self.clone();
        Box::pin(async move { store.award_xp(user_id, duel_id, amount).await })
    }

    fn apply_level(&self, user_id: Uuid, level: u32) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.apply_level(user_id, level).await })
    }

    fn grant_badge(
        &self,
        user_id: Uuid,
        badge: &'static str,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { store.grant_badge(user_id, badge).await })
    }
}
