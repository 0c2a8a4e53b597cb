use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::state::SharedState;

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Probe the external resource host and publish its reachability.
///
/// Healthy hosts are re-probed at the configured cadence; unreachable hosts
/// are retried with exponential backoff. Transitions are logged once, not on
/// every probe.
pub async fn run(state: SharedState) {
    let poll_interval = state.config().host_poll_interval;
    let mut delay = INITIAL_DELAY;

    loop {
        match state.host().ping().await {
            Ok(()) => {
                if !state.is_host_healthy() {
                    info!("external resource host reachable");
                }
                state.set_host_healthy(true);
                delay = INITIAL_DELAY;
                sleep(poll_interval).await;
            }
            Err(err) => {
                if state.is_host_healthy() {
                    warn!(error = %err, "external resource host ping failed");
                }
                state.set_host_healthy(false);
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}
