use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::duel::{
        AcceptDuelRequest, AcceptDuelResponse, CreateDuelResponse, DuelSummary, ScoreboardView,
    },
    error::AppError,
    routes::Caller,
    services::{acceptance_service, invite_service, scoreboard_service},
    state::SharedState,
};

/// Routes covering the duel lifecycle as seen by participants.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/duels", post(create_duel).get(list_duels))
        .route("/duels/accept", post(accept_duel))
        .route("/duels/{id}/scoreboard", get(get_scoreboard))
}

/// Issue a duel invite on behalf of the caller.
#[utoipa::path(
    post,
    path = "/duels",
    tag = "duels",
    params(
        ("x-user-id" = String, Header, description = "Caller id"),
        ("x-subscription-tier" = String, Header, description = "Caller subscription tier"),
    ),
    responses(
        (status = 201, description = "Invite issued", body = CreateDuelResponse),
        (status = 403, description = "Tier does not include duels"),
        (status = 409, description = "Caller already has an open duel"),
    )
)]
pub async fn create_duel(
    State(state): State<SharedState>,
    caller: Caller,
) -> Result<(StatusCode, Json<CreateDuelResponse>), AppError> {
    let created = invite_service::create_duel(&state, caller.user_id, &caller.tier).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Accept an invite and start the duel.
#[utoipa::path(
    post,
    path = "/duels/accept",
    tag = "duels",
    params(("x-user-id" = String, Header, description = "Caller id")),
    request_body = AcceptDuelRequest,
    responses(
        (status = 200, description = "Duel started", body = AcceptDuelResponse),
        (status = 400, description = "Malformed token or own invite"),
        (status = 404, description = "Invite absent, consumed or expired"),
        (status = 409, description = "Caller already has an open duel"),
    )
)]
pub async fn accept_duel(
    State(state): State<SharedState>,
    caller: Caller,
    Valid(Json(payload)): Valid<Json<AcceptDuelRequest>>,
) -> Result<Json<AcceptDuelResponse>, AppError> {
    let accepted = acceptance_service::accept_duel(&state, payload.token, caller.user_id).await?;
    Ok(Json(accepted))
}

/// List the caller's duels, newest first.
#[utoipa::path(
    get,
    path = "/duels",
    tag = "duels",
    params(("x-user-id" = String, Header, description = "Caller id")),
    responses((status = 200, description = "Duels of the caller", body = [DuelSummary]))
)]
pub async fn list_duels(
    State(state): State<SharedState>,
    caller: Caller,
) -> Result<Json<Vec<DuelSummary>>, AppError> {
    let duels = scoreboard_service::list_duels_for_user(&state, caller.user_id).await?;
    Ok(Json(duels))
}

/// Current scoreboard of a duel the caller participates in.
#[utoipa::path(
    get,
    path = "/duels/{id}/scoreboard",
    tag = "duels",
    params(
        ("id" = Uuid, Path, description = "Duel identifier"),
        ("x-user-id" = String, Header, description = "Caller id"),
    ),
    responses(
        (status = 200, description = "Scoreboard", body = ScoreboardView),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Duel not found"),
    )
)]
pub async fn get_scoreboard(
    State(state): State<SharedState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ScoreboardView>, AppError> {
    let view = scoreboard_service::get_scoreboard(&state, id, caller.user_id).await?;
    Ok(Json(view))
}
