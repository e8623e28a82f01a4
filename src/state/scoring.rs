//! Point values of the actions that count toward a duel.

use serde::{Deserialize, Serialize};

/// Actions reported by the lesson, meal and streak subsystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorableAction {
    LessonCompleted,
    MealLogged,
    StreakMaintained,
    /// Any action the duel engine does not score.
    #[serde(other)]
    Unknown,
}

impl ScorableAction {
    /// Points awarded for one occurrence of the action.
    pub const fn points(self) -> u32 {
        match self {
            ScorableAction::LessonCompleted => 10,
            ScorableAction::MealLogged => 5,
            ScorableAction::StreakMaintained => 15,
            ScorableAction::Unknown => 0,
        }
    }

    /// Whether the action scores at most once per participant and calendar day.
    pub const fn once_per_day(self) -> bool {
        matches!(self, ScorableAction::StreakMaintained)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScorableAction::LessonCompleted => "lesson_completed",
            ScorableAction::MealLogged => "meal_logged",
            ScorableAction::StreakMaintained => "streak_maintained",
            ScorableAction::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_actions_deserialize_and_score_nothing() {
        let action: ScorableAction = serde_json::from_str(r#""yoga_session""#).unwrap();
        assert_eq!(action, ScorableAction::Unknown);
        assert_eq!(action.points(), 0);
    }

    #[test]
    fn only_streaks_are_deduplicated() {
        assert!(ScorableAction::StreakMaintained.once_per_day());
        assert!(!ScorableAction::MealLogged.once_per_day());
        assert!(!ScorableAction::LessonCompleted.once_per_day());
    }
}
