use std::sync::Arc;
use std::time::Duration;

use keygate::Registry;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Spawns a task that reclaims idle limiters.
///
/// Every `every`, keys not seen for at least `idle` are removed from `registry`.
/// A reclaimed key starts over with a fresh limiter on its next request, so `idle`
/// should comfortably exceed the longest window or refill time of the config.
/// An `every` below one millisecond is raised to one millisecond.
/// The task runs until the returned handle is aborted.
pub fn spawn_sweeper(registry: Arc<Registry>, every: Duration, idle: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(MIN_PERIOD));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = registry.sweep(idle);
            debug!(removed, tracked = registry.len(), "sweep complete");
        }
    })
}
