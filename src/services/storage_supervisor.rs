use std::{future::Future, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{Backend, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Connect the storage backend and keep the shared state degraded while it is unreachable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Backend, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(backend) => {
                state.install_backend(backend.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                if !watch_health(&state, &backend).await {
                    warn!("exhausted storage reconnect attempts; staying in degraded mode");
                    state.clear_backend().await;
                }

                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Poll backend health until reconnection gives up. Returns `false` at that point.
async fn watch_health(state: &SharedState, backend: &Backend) -> bool {
    loop {
        if backend.health_check().await.is_ok() {
            if state.is_degraded() {
                info!("storage healthy again; leaving degraded mode");
                state.update_degraded(false);
            }
            sleep(HEALTH_POLL_INTERVAL).await;
            continue;
        }

        let mut reconnect_delay = INITIAL_DELAY;
        let mut reconnected = false;
        for attempt in 0..MAX_RECONNECT_ATTEMPTS {
            match backend.try_reconnect().await {
                Ok(()) => {
                    info!(attempt, "storage reconnection succeeded after health check failure");
                    reconnected = true;
                    break;
                }
                Err(err) => {
                    if attempt == 0 {
                        warn!(attempt, error = %err, "storage reconnect failed; entering degraded mode");
                        state.update_degraded(true);
                    } else {
                        warn!(attempt, error = %err, "storage reconnect attempt failed");
                    }
                    sleep(reconnect_delay).await;
                    reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
                }
            }
        }

        if !reconnected {
            return false;
        }
        state.update_degraded(false);
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}
