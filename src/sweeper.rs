use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::rate_limit::Registry;

// Idle sweeper - forgets clients unseen for longer than `idle_threshold`.
// Runs until the task is aborted at shutdown.
pub async fn idle_sweeper(registry: Arc<Registry>, sweep_interval: Duration, idle_threshold: Duration) {
    let mut interval = interval(sweep_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        interval_secs = sweep_interval.as_secs(),
        idle_threshold_secs = idle_threshold.as_secs(),
        "Idle sweeper started"
    );

    loop {
        interval.tick().await;

        let evicted = registry.sweep(Instant::now(), idle_threshold);
        if evicted > 0 {
            info!(evicted, remaining = registry.len(), "Swept idle clients");
        } else {
            debug!(remaining = registry.len(), "Sweep found no idle clients");
        }
    }
}

// Spawn the sweeper with the registry's own settings
pub fn spawn_sweeper(registry: Arc<Registry>) -> JoinHandle<()> {
    let sweep_interval = registry.config().sweep_interval;
    let idle_threshold = registry.config().idle_threshold;
    tokio::spawn(idle_sweeper(registry, sweep_interval, idle_threshold))
}
