//! Observability infrastructure for the monitor
//!
//! Provides:
//! - Prometheus metrics (scan latency, tracked workloads, alert events, notifications)
//! - Structured JSON logging with tracing

use crate::alert::BatchCounts;
use crate::detect::RestartStormAlert;
use crate::models::{AlertEvent, AlertEventType};
use crate::node::NodeTransition;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for scan latency (in seconds); scans include an API call
const SCAN_LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<MonitorMetricsInner> = OnceLock::new();

struct MonitorMetricsInner {
    scan_latency_seconds: Histogram,
    workloads_tracked: IntGauge,
    pods_observed: IntGauge,
    alert_events: IntCounterVec,
    pending_alerts: IntGauge,
    restart_storms: IntCounter,
    fetch_errors: IntCounterVec,
    scans_skipped: IntCounter,
    notifications: IntCounterVec,
    node_transitions: IntCounter,
    nodes_not_ready: IntGauge,
}

impl MonitorMetricsInner {
    fn new() -> Self {
        Self {
            scan_latency_seconds: register_histogram!(
                "workload_monitor_scan_latency_seconds",
                "Time spent fetching and diffing one cluster snapshot",
                SCAN_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register scan_latency_seconds"),

            workloads_tracked: register_int_gauge!(
                "workload_monitor_workloads_tracked",
                "Number of workloads currently tracked"
            )
            .expect("Failed to register workloads_tracked"),

            pods_observed: register_int_gauge!(
                "workload_monitor_pods_observed",
                "Number of pods in the most recent snapshot"
            )
            .expect("Failed to register pods_observed"),

            alert_events: register_int_counter_vec!(
                "workload_monitor_alert_events_total",
                "Workload transition events emitted",
                &["type"]
            )
            .expect("Failed to register alert_events"),

            pending_alerts: register_int_gauge!(
                "workload_monitor_pending_alerts",
                "Alert events waiting for the next flush"
            )
            .expect("Failed to register pending_alerts"),

            restart_storms: register_int_counter!(
                "workload_monitor_restart_storms_total",
                "Restart storm alerts emitted"
            )
            .expect("Failed to register restart_storms"),

            fetch_errors: register_int_counter_vec!(
                "workload_monitor_fetch_errors_total",
                "Failed listing calls",
                &["target"]
            )
            .expect("Failed to register fetch_errors"),

            scans_skipped: register_int_counter!(
                "workload_monitor_scans_skipped_total",
                "Scans skipped because another scan was in flight"
            )
            .expect("Failed to register scans_skipped"),

            notifications: register_int_counter_vec!(
                "workload_monitor_notifications_total",
                "Notification delivery attempts",
                &["result"]
            )
            .expect("Failed to register notifications"),

            node_transitions: register_int_counter!(
                "workload_monitor_node_transitions_total",
                "Node readiness changes observed"
            )
            .expect("Failed to register node_transitions"),

            nodes_not_ready: register_int_gauge!(
                "workload_monitor_nodes_not_ready",
                "Nodes currently reporting not ready"
            )
            .expect("Failed to register nodes_not_ready"),
        }
    }
}

/// Monitor metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct MonitorMetrics {
    _private: (),
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &MonitorMetricsInner {
        GLOBAL_METRICS.get_or_init(MonitorMetricsInner::new)
    }

    pub fn observe_scan_latency(&self, duration_secs: f64) {
        self.inner().scan_latency_seconds.observe(duration_secs);
    }

    pub fn set_snapshot_size(&self, workloads: usize, pods: usize) {
        self.inner().workloads_tracked.set(workloads as i64);
        self.inner().pods_observed.set(pods as i64);
    }

    pub fn inc_alert_event(&self, event_type: AlertEventType) {
        self.inner()
            .alert_events
            .with_label_values(&[event_type.as_str()])
            .inc();
    }

    pub fn set_pending_alerts(&self, pending: usize) {
        self.inner().pending_alerts.set(pending as i64);
    }

    pub fn inc_restart_storms(&self, count: usize) {
        self.inner().restart_storms.inc_by(count as u64);
    }

    pub fn inc_fetch_errors(&self, target: &str) {
        self.inner().fetch_errors.with_label_values(&[target]).inc();
    }

    pub fn inc_scans_skipped(&self) {
        self.inner().scans_skipped.inc();
    }

    pub fn inc_notifications(&self, success: bool) {
        let result = if success { "sent" } else { "failed" };
        self.inner().notifications.with_label_values(&[result]).inc();
    }

    pub fn record_node_scan(&self, transitions: usize, not_ready: usize) {
        self.inner().node_transitions.inc_by(transitions as u64);
        self.inner().nodes_not_ready.set(not_ready as i64);
    }
}

/// Structured logger for monitor events
///
/// Emits consistent, event-named records for transitions, storms, flushes
/// and lifecycle changes.
#[derive(Clone)]
pub struct StructuredLogger {
    cluster: String,
}

impl StructuredLogger {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "monitor_started",
            cluster = %self.cluster,
            version = %version,
            "Workload monitor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str, discarded_alerts: usize) {
        info!(
            event = "monitor_stopped",
            cluster = %self.cluster,
            reason = %reason,
            discarded_alerts = discarded_alerts,
            "Workload monitor stopped"
        );
    }

    pub fn log_baseline(&self, workloads: usize, grace_secs: u64) {
        info!(
            event = "baseline_captured",
            cluster = %self.cluster,
            workloads = workloads,
            grace_secs = grace_secs,
            "Baseline captured, alerts suppressed during grace period"
        );
    }

    pub fn log_initialization_complete(&self) {
        info!(
            event = "initialization_complete",
            cluster = %self.cluster,
            "Grace period over, transition alerts enabled"
        );
    }

    pub fn log_transition(&self, event: &AlertEvent) {
        let (previous_healthy, current_healthy) = event
            .metadata
            .map(|m| (m.previous_healthy, m.current_healthy))
            .unwrap_or_default();

        match event.event_type {
            AlertEventType::Failed | AlertEventType::Stopped | AlertEventType::Degraded => {
                warn!(
                    event = "workload_transition",
                    cluster = %self.cluster,
                    workload = %event.workload.key,
                    transition = %event.event_type,
                    previous_healthy = previous_healthy,
                    current_healthy = current_healthy,
                    score = event.workload.health.score,
                    reason = %event.reason,
                    "Workload health worsened"
                );
            }
            AlertEventType::Recovered | AlertEventType::Started => {
                info!(
                    event = "workload_transition",
                    cluster = %self.cluster,
                    workload = %event.workload.key,
                    transition = %event.event_type,
                    previous_healthy = previous_healthy,
                    current_healthy = current_healthy,
                    score = event.workload.health.score,
                    reason = %event.reason,
                    "Workload health improved"
                );
            }
        }
    }

    pub fn log_restart_storm(&self, alert: &RestartStormAlert) {
        warn!(
            event = "restart_storm_detected",
            cluster = %self.cluster,
            namespace = %alert.namespace,
            pod_name = %alert.pod_name,
            restart_count = alert.restart_count,
            previous_restart_count = ?alert.previous_restart_count,
            threshold = alert.threshold,
            "Pod restart count over threshold"
        );
    }

    pub fn log_node_transition(&self, transition: &NodeTransition) {
        if transition.ready {
            info!(
                event = "node_readiness_changed",
                cluster = %self.cluster,
                node = %transition.name,
                ready = true,
                "Node became ready"
            );
        } else {
            warn!(
                event = "node_readiness_changed",
                cluster = %self.cluster,
                node = %transition.name,
                ready = false,
                "Node became not ready"
            );
        }
    }

    pub fn log_flush(&self, counts: &BatchCounts, recipients: usize, delivered: bool) {
        if delivered {
            info!(
                event = "alert_batch_flushed",
                cluster = %self.cluster,
                failed = counts.failed,
                degraded = counts.degraded,
                recovered = counts.recovered,
                stopped = counts.stopped,
                started = counts.started,
                recipients = recipients,
                "Alert batch delivered"
            );
        } else {
            warn!(
                event = "alert_batch_flush_failed",
                cluster = %self.cluster,
                pending = counts.total(),
                recipients = recipients,
                "Alert batch delivery failed, keeping events for the next flush"
            );
        }
    }
}
