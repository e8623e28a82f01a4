use std::time::SystemTime;

use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{BadgeSet, DuelEntity, DuelStatus, ProfileEntity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoDuelDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub challenger_id: String,
    pub opponent_id: Option<String>,
    // Absent rather than null once consumed, so the sparse unique index ignores it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_token: Option<String>,
    pub status: DuelStatus,
    pub challenger_score: i64,
    pub opponent_score: i64,
    pub expires_at: DateTime,
    pub start_date: Option<DateTime>,
    pub end_date: Option<DateTime>,
    pub winner_id: Option<String>,
    pub created_at: DateTime,
    #[serde(default)]
    pub completed_at: Option<DateTime>,
    #[serde(default)]
    pub rewards_pending: bool,
}

impl From<DuelEntity> for MongoDuelDocument {
    fn from(value: DuelEntity) -> Self {
        Self {
            id: value.id.to_string(),
            challenger_id: value.challenger_id.to_string(),
            opponent_id: value.opponent_id.map(|id| id.to_string()),
            invite_token: value.invite_token,
            status: value.status,
            challenger_score: i64::from(value.challenger_score),
            opponent_score: i64::from(value.opponent_score),
            expires_at: to_bson(value.expires_at),
            start_date: value.start_date.map(to_bson),
            end_date: value.end_date.map(to_bson),
            winner_id: value.winner_id.map(|id| id.to_string()),
            created_at: to_bson(value.created_at),
            completed_at: value.completed_at.map(to_bson),
            rewards_pending: value.rewards_pending,
        }
    }
}

impl TryFrom<MongoDuelDocument> for DuelEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoDuelDocument) -> Result<Self, Self::Error> {
        let parse = |raw: &str| parse_id(&value.id, raw);
        Ok(Self {
            id: parse(&value.id)?,
            challenger_id: parse(&value.challenger_id)?,
            opponent_id: value.opponent_id.as_deref().map(parse).transpose()?,
            invite_token: value.invite_token.clone(),
            status: value.status,
            challenger_score: clamp_score(value.challenger_score),
            opponent_score: clamp_score(value.opponent_score),
            expires_at: from_bson(value.expires_at),
            start_date: value.start_date.map(from_bson),
            end_date: value.end_date.map(from_bson),
            winner_id: value.winner_id.as_deref().map(parse).transpose()?,
            created_at: from_bson(value.created_at),
            completed_at: value.completed_at.map(from_bson),
            rewards_pending: value.rewards_pending,
        })
    }
}

/// Marks a user as holding an open duel; the unique `_id` enforces one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoClaimDocument {
    #[serde(rename = "_id")]
    pub user_id: String,
    pub duel_id: String,
    pub claimed_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoProfileDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub xp: i64,
    #[serde(default = "first_level")]
    pub level: i64,
    #[serde(default)]
    pub badges: Vec<String>,
    #[serde(default)]
    pub rewarded_duels: Vec<String>,
}

impl TryFrom<MongoProfileDocument> for ProfileEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoProfileDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: parse_id(&value.id, &value.id)?,
            display_name: value.display_name,
            xp: u64::try_from(value.xp).unwrap_or_default(),
            level: clamp_level(value.level),
            badges: value.badges.into_iter().collect::<BadgeSet>(),
            rewarded_duels: value
                .rewarded_duels
                .iter()
                .map(|raw| parse_id(&value.id, raw))
                .collect::<Result<_, _>>()?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMarkerDocument {
    #[serde(rename = "_id")]
    pub key: String,
    pub created_at: DateTime,
}

fn first_level() -> i64 {
    1
}

pub fn clamp_level(level: i64) -> u32 {
    u32::try_from(level.max(1)).unwrap_or(u32::MAX)
}

fn clamp_score(score: i64) -> u32 {
    u32::try_from(score.max(0)).unwrap_or(u32::MAX)
}

fn parse_id(document_id: &str, raw: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(raw).map_err(|_| MongoDaoError::Malformed {
        id: document_id.to_owned(),
        reason: "invalid uuid",
    })
}

pub fn to_bson(value: OffsetDateTime) -> DateTime {
    DateTime::from_system_time(SystemTime::from(value))
}

pub fn from_bson(value: DateTime) -> OffsetDateTime {
    OffsetDateTime::from(value.to_system_time())
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

/// Filter matching duels where `user_id` plays either role.
pub fn participant_filter(user_id: Uuid) -> Document {
    let id = user_id.to_string();
    doc! {"$or": [{"challenger_id": id.as_str()}, {"opponent_id": id.as_str()}]}
}
