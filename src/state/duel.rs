//! Pure lifecycle rules of a duel: deadlines, winner selection and remaining time.

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::dao::models::{DuelEntity, DuelStatus};

/// State change a duel is owed at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueTransition {
    /// Active duel whose window elapsed.
    Complete,
    /// Pending invite past its deadline.
    Expire,
    /// Completed duel whose rewards did not all land yet.
    SettleRewards,
}

/// Decide whether `duel` must change state at `now`.
pub fn due_transition(duel: &DuelEntity, now: OffsetDateTime) -> Option<DueTransition> {
    match duel.status {
        DuelStatus::Active if duel.end_date.is_some_and(|end| now >= end) => {
            Some(DueTransition::Complete)
        }
        DuelStatus::Pending if now >= duel.expires_at => Some(DueTransition::Expire),
        DuelStatus::Completed if duel.rewards_pending => Some(DueTransition::SettleRewards),
        _ => None,
    }
}

/// Higher score wins; a tie (including 0-0) has no winner.
pub fn decide_winner(duel: &DuelEntity) -> Option<Uuid> {
    let opponent_id = duel.opponent_id?;
    match duel.challenger_score.cmp(&duel.opponent_score) {
        std::cmp::Ordering::Greater => Some(duel.challenger_id),
        std::cmp::Ordering::Less => Some(opponent_id),
        std::cmp::Ordering::Equal => None,
    }
}

/// Competition window starting at `now`.
pub fn competition_window(
    now: OffsetDateTime,
    duration: Duration,
) -> (OffsetDateTime, OffsetDateTime) {
    (now, now + duration)
}

/// Milliseconds left in the window, zero once elapsed or before acceptance.
pub fn remaining_ms(duel: &DuelEntity, now: OffsetDateTime) -> u64 {
    let Some(end) = duel.end_date else {
        return 0;
    };
    let remaining = (end - now).whole_milliseconds().max(0);
    u64::try_from(remaining).unwrap_or(u64::MAX)
}
