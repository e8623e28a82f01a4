use serde::Serialize;
use utoipa::ToSchema;

/// Whether duel operations are currently served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Storage is reachable; invites, scoring and scoreboards work.
    Ok,
    /// Storage is unreachable; duel routes answer 503 until it recovers.
    Degraded,
}

/// Body of `GET /healthcheck`.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
}

impl From<bool> for HealthResponse {
    /// Build the response from the application's degraded flag.
    fn from(degraded: bool) -> Self {
        let status = if degraded {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        };
        Self { status }
    }
}
