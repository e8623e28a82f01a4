use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::action::SweepResponse, error::AppError, services::lifecycle_monitor, state::SharedState,
};

/// Operational routes.
pub fn router() -> Router<SharedState> {
    Router::new().route("/maintenance/sweep", post(sweep))
}

/// Resolve one batch of overdue duels immediately.
#[utoipa::path(
    post,
    path = "/maintenance/sweep",
    tag = "maintenance",
    responses(
        (status = 200, description = "Sweep finished", body = SweepResponse),
        (status = 503, description = "Storage unavailable"),
    )
)]
pub async fn sweep(State(state): State<SharedState>) -> Result<Json<SweepResponse>, AppError> {
    let processed = lifecycle_monitor::sweep_expired_and_ended(&state).await?;
    Ok(Json(SweepResponse { processed }))
}
