use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Badge granted to the winner of a completed duel.
pub const DUEL_CHAMPION_BADGE: &str = "duel_champion";

/// Lifecycle status of a duel. `Completed` and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DuelStatus {
    /// Invite issued, waiting for an opponent.
    Pending,
    /// Accepted; the competition window is running.
    Active,
    /// Window elapsed and the duel was resolved.
    Completed,
    /// Invite was never accepted before its deadline.
    Expired,
}

impl DuelStatus {
    /// Statuses that count toward the one-open-duel-per-user limit.
    pub const OPEN: [DuelStatus; 2] = [DuelStatus::Pending, DuelStatus::Active];

    /// Persisted representation of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            DuelStatus::Pending => "pending",
            DuelStatus::Active => "active",
            DuelStatus::Completed => "completed",
            DuelStatus::Expired => "expired",
        }
    }

    /// Whether the duel can no longer change status.
    pub fn is_terminal(self) -> bool {
        matches!(self, DuelStatus::Completed | DuelStatus::Expired)
    }
}

/// Which score column of a duel belongs to a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantSide {
    /// The user who issued the invite.
    Challenger,
    /// The user who accepted it.
    Opponent,
}

/// Aggregate duel entity persisted by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelEntity {
    /// Primary key of the duel.
    pub id: Uuid,
    /// User who issued the invite.
    pub challenger_id: Uuid,
    /// User who accepted the invite, once accepted.
    pub opponent_id: Option<Uuid>,
    /// Single-use invite secret, cleared as soon as the duel leaves `pending`.
    pub invite_token: Option<String>,
    /// Current lifecycle status.
    pub status: DuelStatus,
    /// Points collected by the challenger during the window.
    pub challenger_score: u32,
    /// Points collected by the opponent during the window.
    pub opponent_score: u32,
    /// Invite deadline, meaningful while pending.
    pub expires_at: OffsetDateTime,
    /// Start of the competition window, set on acceptance.
    pub start_date: Option<OffsetDateTime>,
    /// End of the competition window, set on acceptance.
    pub end_date: Option<OffsetDateTime>,
    /// Set at completion to the higher scorer; stays empty on a tie.
    pub winner_id: Option<Uuid>,
    /// When the invite was issued.
    pub created_at: OffsetDateTime,
    /// When the duel was finalized, if it was.
    pub completed_at: Option<OffsetDateTime>,
    /// Raised together with the switch to `completed` and cleared once every
    /// completion reward has landed. A completed duel still carrying it is retried.
    pub rewards_pending: bool,
}

impl DuelEntity {
    /// Build a fresh pending duel for `challenger_id`.
    pub fn pending(
        challenger_id: Uuid,
        invite_token: String,
        now: OffsetDateTime,
        expires_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            challenger_id,
            opponent_id: None,
            invite_token: Some(invite_token),
            status: DuelStatus::Pending,
            challenger_score: 0,
            opponent_score: 0,
            expires_at,
            start_date: None,
            end_date: None,
            winner_id: None,
            created_at: now,
            completed_at: None,
            rewards_pending: false,
        }
    }

    /// Return the side `user_id` plays on, if they participate at all.
    pub fn side_of(&self, user_id: Uuid) -> Option<ParticipantSide> {
        if self.challenger_id == user_id {
            Some(ParticipantSide::Challenger)
        } else if self.opponent_id == Some(user_id) {
            Some(ParticipantSide::Opponent)
        } else {
            None
        }
    }

    /// Whether `user_id` plays in this duel, in either role.
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.side_of(user_id).is_some()
    }

    /// Participants that have joined so far (challenger first).
    pub fn participants(&self) -> Vec<Uuid> {
        std::iter::once(self.challenger_id)
            .chain(self.opponent_id)
            .collect()
    }

    /// The participant that is not `user_id`.
    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        match self.side_of(user_id)? {
            ParticipantSide::Challenger => self.opponent_id,
            ParticipantSide::Opponent => Some(self.challenger_id),
        }
    }

    /// Current score of one side.
    pub fn score_of(&self, side: ParticipantSide) -> u32 {
        match side {
            ParticipantSide::Challenger => self.challenger_score,
            ParticipantSide::Opponent => self.opponent_score,
        }
    }
}

/// Set of badge identifiers owned by a user. Insertion is idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BadgeSet(BTreeSet<String>);

impl BadgeSet {
    /// Empty badge set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `badge`, returning `true` only when it was not already owned.
    pub fn insert(&mut self, badge: &str) -> bool {
        if self.0.contains(badge) {
            return false;
        }
        self.0.insert(badge.to_owned())
    }

    /// Whether `badge` is owned.
    pub fn contains(&self, badge: &str) -> bool {
        self.0.contains(badge)
    }

    /// Number of owned badges.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no badge is owned.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for BadgeSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Gamification profile of a user as seen by the duel engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntity {
    /// Owner of the profile.
    pub user_id: Uuid,
    /// Name shown on scoreboards.
    pub display_name: String,
    /// Accumulated experience points.
    pub xp: u64,
    /// Level derived from `xp` by the level curve.
    pub level: u32,
    /// Badges earned so far.
    pub badges: BadgeSet,
    /// Duels whose completion XP was already credited to this profile.
    pub rewarded_duels: BTreeSet<Uuid>,
}

impl ProfileEntity {
    /// Fresh level-one profile without XP or badges.
    pub fn new(user_id: Uuid, display_name: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            xp: 0,
            level: 1,
            badges: BadgeSet::new(),
            rewarded_duels: BTreeSet::new(),
        }
    }
}

/// Outcome of a duel XP award: new total plus the stored and the derived level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpAward {
    /// XP total after the award.
    pub total_xp: u64,
    /// Level currently stored on the profile.
    pub previous_level: u32,
    /// Level the curve derives from `total_xp`.
    pub new_level: u32,
    /// `false` when this duel had already been credited and nothing was added.
    pub credited: bool,
}

impl XpAward {
    /// Whether the stored level lags behind the derived one.
    pub fn level_changed(&self) -> bool {
        self.previous_level != self.new_level
    }
}
