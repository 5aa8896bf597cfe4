// Periodic status refresh - "offline" depends on the clock, not only on new data
use crate::application::dashboard_state::StateHandle;
use std::time::Duration;
use tokio::task::JoinHandle;

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Recompute every node's status on a fixed interval. Abort the returned
/// handle to stop it.
pub fn spawn_status_ticker(state: StateHandle, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let transitions = state.write().await.refresh_statuses(now_ms());
            for t in transitions {
                tracing::info!(
                    "Device {} status changed: {} -> {}",
                    t.dev_addr,
                    t.from,
                    t.to
                );
            }
        }
    })
}
