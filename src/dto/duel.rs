//! DTO definitions for duel creation, acceptance and read models.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{DuelEntity, DuelStatus, ParticipantSide},
    dto::{format_timestamp, validation::validate_invite_token},
};

/// Returned to the challenger once an invite was issued.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CreateDuelResponse {
    pub duel_id: Uuid,
    pub invite_token: String,
    pub invite_link: String,
    pub expires_at: String,
}

/// Invite acceptance payload.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AcceptDuelRequest {
    #[validate(custom(function = "validate_invite_token"))]
    pub token: String,
}

/// Identifier of the duel that just became active.
#[derive(Debug, Serialize, ToSchema)]
pub struct AcceptDuelResponse {
    pub duel_id: Uuid,
}

/// One side of a scoreboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ParticipantView {
    pub user_id: Uuid,
    pub display_name: String,
    pub score: u32,
}

/// Assembled read model of a duel, cached as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScoreboardView {
    pub duel_id: Uuid,
    pub status: DuelStatus,
    pub challenger: ParticipantView,
    /// Absent until the invite is accepted.
    pub opponent: Option<ParticipantView>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Present while the invite is still pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invite_expires_at: Option<String>,
    pub winner_id: Option<Uuid>,
    pub remaining_ms: u64,
}

impl ScoreboardView {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.challenger.user_id == user_id
            || self
                .opponent
                .as_ref()
                .is_some_and(|opponent| opponent.user_id == user_id)
    }
}

/// Result of a finished duel from the point of view of one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DuelOutcome {
    Won,
    Lost,
    Tied,
}

/// Compact projection of a duel listed for one of its participants.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DuelSummary {
    pub duel_id: Uuid,
    pub status: DuelStatus,
    /// The other participant, once there is one.
    pub rival_id: Option<Uuid>,
    pub my_score: u32,
    pub rival_score: u32,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub winner_id: Option<Uuid>,
    /// Set once the duel is completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<DuelOutcome>,
}

impl DuelSummary {
    /// Project `duel` for `user_id`, who must be one of its participants.
    pub fn for_participant(duel: &DuelEntity, user_id: Uuid) -> Option<Self> {
        let side = duel.side_of(user_id)?;
        let rival_side = match side {
            ParticipantSide::Challenger => ParticipantSide::Opponent,
            ParticipantSide::Opponent => ParticipantSide::Challenger,
        };
        let outcome = (duel.status == DuelStatus::Completed).then(|| match duel.winner_id {
            Some(winner) if winner == user_id => DuelOutcome::Won,
            Some(_) => DuelOutcome::Lost,
            None => DuelOutcome::Tied,
        });

        Some(Self {
            duel_id: duel.id,
            status: duel.status,
            rival_id: duel.other_participant(user_id),
            my_score: duel.score_of(side),
            rival_score: duel.score_of(rival_side),
            start_date: duel.start_date.map(format_timestamp),
            end_date: duel.end_date.map(format_timestamp),
            winner_id: duel.winner_id,
            outcome,
        })
    }
}
