use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::scoring::ScorableAction;

/// Report of a scorable action performed by the caller.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScorableActionRequest {
    #[schema(value_type = String, example = "lesson_completed")]
    pub action: ScorableAction,
}

/// Result of a maintenance sweep.
#[derive(Debug, Serialize, ToSchema)]
pub struct SweepResponse {
    /// Number of duels moved to a terminal state.
    pub processed: usize,
}
