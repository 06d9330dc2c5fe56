//! Workload Monitor - cluster workload health alerting
//!
//! This binary runs as a single Deployment, scanning pods and nodes across
//! the cluster and sending debounced health digests.

use anyhow::Result;
use monitor_lib::{Monitor, NotificationSink, PodSnapshotSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use workload_monitor::{
    api,
    config::MonitorConfig,
    groups::StaticGroups,
    kube_source::KubeSnapshotSource,
    webhook::WebhookSink,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting workload-monitor");

    let config = MonitorConfig::load()?;
    info!(cluster = %config.cluster_name, "Monitor configured");

    let mut builder = Monitor::builder().settings(config.settings());

    // Without cluster access the process still serves probes and status
    match KubeSnapshotSource::try_default().await {
        Ok(source) => {
            builder = builder.source(Arc::new(source) as Arc<dyn PodSnapshotSource>);
        }
        Err(e) => warn!(error = %e, "Kubernetes client unavailable, scanning disabled"),
    }

    if let Some(url) = &config.webhook_url {
        let sink = WebhookSink::new(url.clone(), Duration::from_secs(config.fetch_timeout_secs))?;
        info!(url = %sink.url(), "Webhook notifications enabled");
        builder = builder.sink(Arc::new(sink) as Arc<dyn NotificationSink>);
    }

    if let Some(table) = &config.groups {
        let groups = StaticGroups::parse(table)?;
        info!(groups = groups.len(), "Recipient groups loaded");
        builder = builder.groups(Arc::new(groups));
    }

    let monitor = builder.build()?;

    let app_state = Arc::new(api::AppState::new(monitor.clone()));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    if !monitor.start() {
        warn!("Monitor not started; serving status only");
    }

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    monitor.stop().await;
    api_handle.abort();

    Ok(())
}
