//! Periodic scan loop

use super::monitor::Monitor;
use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// Drive scans until shutdown is signalled.
///
/// Waits for the startup delay, then ticks at the scan interval. The first
/// tick fires immediately and captures the baseline. Ticks missed while a
/// slow scan runs are skipped rather than bunched up.
pub(crate) async fn run(monitor: Monitor, mut shutdown: broadcast::Receiver<()>) {
    let settings = monitor.settings().clone();
    info!(
        interval_secs = settings.scan_interval.as_secs(),
        startup_delay_secs = settings.startup_delay.as_secs(),
        "Starting workload scan loop"
    );
    monitor.register_components().await;

    tokio::select! {
        _ = tokio::time::sleep(settings.startup_delay) => {}
        _ = shutdown.recv() => {
            info!("Scan loop stopped before first scan");
            return;
        }
    }

    let mut ticker = interval(settings.scan_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tick_count = 0u64;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                monitor.tick().await;
                tick_count += 1;
                debug!(ticks = tick_count, "Scan tick complete");
            }
            _ = shutdown.recv() => {
                info!(ticks = tick_count, "Shutting down workload scan loop");
                break;
            }
        }
    }
}
