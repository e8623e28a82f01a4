use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the duel service.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::duels::create_duel,
        crate::routes::duels::accept_duel,
        crate::routes::duels::list_duels,
        crate::routes::duels::get_scoreboard,
        crate::routes::actions::report_action,
        crate::routes::maintenance::sweep,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::duel::CreateDuelResponse,
            crate::dto::duel::AcceptDuelRequest,
            crate::dto::duel::AcceptDuelResponse,
            crate::dto::duel::ScoreboardView,
            crate::dto::duel::ParticipantView,
            crate::dto::duel::DuelSummary,
            crate::dto::duel::DuelOutcome,
            crate::dto::action::ScorableActionRequest,
            crate::dto::action::SweepResponse,
            crate::dao::models::DuelStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "duels", description = "Duel invites, acceptance and scoreboards"),
        (name = "scoring", description = "Scorable actions reported by other features"),
        (name = "maintenance", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;
