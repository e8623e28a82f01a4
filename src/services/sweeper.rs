use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::{services::lifecycle_monitor, state::SharedState};

/// Periodically resolve duels nobody reads anymore. Runs until the task is dropped.
pub async fn run(state: SharedState) {
    let mut ticker = interval(state.config().sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if state.is_degraded() {
            debug!("skipping duel sweep while degraded");
            continue;
        }
        match lifecycle_monitor::sweep_expired_and_ended(&state).await {
            Ok(0) => {}
            Ok(processed) => info!(processed, "duel sweep resolved overdue duels"),
            Err(err) => warn!(error = %err, "duel sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        dao::models::DuelStatus, services::invite_service::create_duel,
        state::test_support::Harness,
    };

    #[tokio::test(start_paused = true)]
    async fn background_sweep_expires_stale_invites() {
        let harness = Harness::new().await;
        let created = create_duel(&harness.state, harness.user("Alice"), "premium")
            .await
            .unwrap();
        harness.clock.advance(time::Duration::hours(49));

        let task = tokio::spawn(run(harness.state.clone()));
        tokio::time::sleep(Duration::from_secs(1)).await;
        task.abort();

        let backend = harness.state.require_backend().await.unwrap();
        let duel = backend
            .duels
            .find_duel(created.duel_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(duel.status, DuelStatus::Expired);
    }
}
