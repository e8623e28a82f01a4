use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report whether duel operations are currently served, logging connectivity issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.backend().await {
        Some(backend) => {
            if let Err(err) = backend.health_check().await {
                warn!(error = %err, "storage health check failed");
            }
        }
        None => warn!("storage unavailable (degraded mode)"),
    }

    HealthResponse::from(state.is_degraded())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dto::health::HealthStatus, state::test_support::Harness};

    #[tokio::test]
    async fn reflects_degraded_flag() {
        let harness = Harness::new().await;
        assert_eq!(health_status(&harness.state).await.status, HealthStatus::Ok);

        harness.state.clear_backend().await;
        let body = serde_json::to_value(health_status(&harness.state).await).unwrap();
        assert_eq!(body, serde_json::json!({"status": "degraded"}));
    }
}
