use axum::{Json, Router, extract::State, http::StatusCode, routing::post};

use crate::{
    dto::action::ScorableActionRequest, routes::Caller, services::score_ledger,
    state::SharedState,
};

/// Entry point for features reporting scorable actions.
pub fn router() -> Router<SharedState> {
    Router::new().route("/actions", post(report_action))
}

/// Report a scorable action; scoring happens after the response is sent.
#[utoipa::path(
    post,
    path = "/actions",
    tag = "scoring",
    params(("x-user-id" = String, Header, description = "Acting user id")),
    request_body = ScorableActionRequest,
    responses((status = 202, description = "Action accepted for scoring"))
)]
pub async fn report_action(
    State(state): State<SharedState>,
    caller: Caller,
    Json(payload): Json<ScorableActionRequest>,
) -> StatusCode {
    score_ledger::spawn_record_action(state, caller.user_id, payload.action);
    StatusCode::ACCEPTED
}
