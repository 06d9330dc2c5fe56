//! Async monitor facade
//!
//! `Monitor` is a cheap, cloneable handle. It owns the scan loop, the flush
//! and grace timers, and the collaborators handed in by the binary. All
//! workload state lives in a single `MonitorState` behind one mutex.

use super::baseline::BaselinePhase;
use super::r#loop;
use super::settings::MonitorSettings;
use super::state::{MonitorState, MonitorStats, ScanOutcome};
use crate::alert::{BatchCounts, DebounceTimer, DigestRenderer, PlainTextRenderer};
use crate::detect::{RestartStormAlert, RestartStormConfig};
use crate::error::{MonitorError, Result, SourceError};
use crate::health::{components, HealthRegistry};
use crate::models::{Severity, WorkloadKey, WorkloadStatus};
use crate::node::{NodeHealthMonitor, NodeTransition};
use crate::observability::{MonitorMetrics, StructuredLogger};
use crate::scan::ClusterOverview;
use crate::source::{GroupLookup, Notification, NotificationSink, PodSnapshotSource};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Summary of one workload scan
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub pods: usize,
    pub workloads: usize,
    pub events: BatchCounts,
    pub restart_storms: usize,
    pub node_transitions: usize,
    pub baseline_captured: bool,
    pub in_grace: bool,
    pub duration_ms: u64,
}

impl ScanReport {
    fn from_outcome(outcome: &ScanOutcome, duration_ms: u64) -> Self {
        Self {
            pods: outcome.pods,
            workloads: outcome.workloads,
            events: BatchCounts::from_events(&outcome.events),
            restart_storms: outcome.restart_storms.len(),
            node_transitions: 0,
            baseline_captured: outcome.baseline_captured,
            in_grace: outcome.in_grace,
            duration_ms,
        }
    }
}

/// What a flush did with the pending batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FlushOutcome {
    /// Nothing was pending
    Empty,
    /// The digest was delivered and the delivered events removed
    Delivered { events: usize, recipients: usize },
    /// No sink or recipients are configured; the batch was logged and dropped
    Undeliverable { dropped: usize },
}

/// Compact view of a workload that is not fully healthy
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadSummary {
    pub key: WorkloadKey,
    pub status: WorkloadStatus,
    pub severity: Severity,
    pub score: u8,
    pub healthy_pods: u32,
    pub total_pods: u32,
    pub status_minutes: i64,
}

/// Snapshot returned by the status endpoint
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub cluster: String,
    pub running: bool,
    pub configured: bool,
    pub baseline: BaselinePhase,
    pub initialization_complete: bool,
    pub workloads: usize,
    pub unhealthy_workloads: Vec<WorkloadSummary>,
    pub pending_alerts: BatchCounts,
    pub flush_deadline: Option<DateTime<Utc>>,
    pub evicted_alerts: u64,
    pub restart_storm: RestartStormConfig,
    pub restart_tracked_pods: usize,
    pub nodes_tracked: usize,
    pub nodes_not_ready: usize,
    pub skipped_scans: u64,
    pub stats: MonitorStats,
}

struct RunnerHandle {
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

struct MonitorInner {
    settings: MonitorSettings,
    source: Option<Arc<dyn PodSnapshotSource>>,
    sink: Option<Arc<dyn NotificationSink>>,
    groups: Option<Arc<dyn GroupLookup>>,
    renderer: Arc<dyn DigestRenderer>,
    state: Mutex<MonitorState>,
    nodes: NodeHealthMonitor,
    scan_guard: Mutex<()>,
    flush_guard: Mutex<()>,
    flush_timer: DebounceTimer,
    grace_timer: DebounceTimer,
    runner: std::sync::Mutex<Option<RunnerHandle>>,
    skipped_scans: AtomicU64,
    health: HealthRegistry,
    metrics: MonitorMetrics,
    logger: StructuredLogger,
}

/// Handle to a workload health monitor
#[derive(Clone)]
pub struct Monitor {
    inner: Arc<MonitorInner>,
}

impl Monitor {
    pub fn builder() -> MonitorBuilder {
        MonitorBuilder::new()
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.inner.settings
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.inner.health
    }

    pub fn metrics(&self) -> &MonitorMetrics {
        &self.inner.metrics
    }

    /// A snapshot source is present
    pub fn is_configured(&self) -> bool {
        self.inner.source.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.runner_slot()
            .as_ref()
            .map_or(false, |r| !r.task.is_finished())
    }

    /// Launch the scan loop. Returns false if unconfigured or already running.
    pub fn start(&self) -> bool {
        if !self.is_configured() {
            warn!("Cluster access not configured, monitor not started");
            return false;
        }

        let mut runner = self.runner_slot();
        if runner.as_ref().map_or(false, |r| !r.task.is_finished()) {
            debug!("Monitor already running");
            return false;
        }

        let (shutdown, rx) = broadcast::channel(1);
        let task = tokio::spawn(r#loop::run(self.clone(), rx));
        *runner = Some(RunnerHandle { shutdown, task });
        drop(runner);

        self.inner.logger.log_startup(VERSION);
        true
    }

    /// Stop the loop and cancel timers. Pending alerts are discarded unless
    /// `flush_on_stop` is set. Returns false if the loop was not running.
    pub async fn stop(&self) -> bool {
        let Some(handle) = self.runner_slot().take() else {
            return false;
        };
        let _ = handle.shutdown.send(());
        handle.task.abort();
        self.inner.flush_timer.cancel();
        self.inner.grace_timer.cancel();

        let discarded = if self.inner.settings.flush_on_stop {
            match self.flush().await {
                Ok(_) => 0,
                Err(e) => {
                    warn!(error = %e, "Final flush failed, discarding pending alerts");
                    self.discard_pending().await
                }
            }
        } else {
            self.discard_pending().await
        };

        self.inner.logger.log_shutdown("stop requested", discarded);
        true
    }

    /// Run a workload scan and a node scan immediately
    pub async fn force_scan(&self) -> Result<ScanReport> {
        let mut report = self.scan_workloads().await?;
        match self.scan_nodes().await {
            Ok(transitions) => report.node_transitions = transitions.len(),
            Err(e) => warn!(error = %e, "Node scan failed"),
        }
        Ok(report)
    }

    /// Drop the baseline and capture a new one from a fresh scan
    pub async fn recapture_baseline(&self) -> Result<ScanReport> {
        self.inner.grace_timer.cancel();
        self.inner.state.lock().await.request_recapture();
        self.inner.health.set_baseline_captured(false).await;
        info!("Baseline recapture requested");
        self.scan_workloads().await
    }

    /// Forget all tracked state and pending alerts; configuration is kept
    pub async fn reset(&self) -> usize {
        self.inner.flush_timer.cancel();
        self.inner.grace_timer.cancel();
        let discarded = self.inner.state.lock().await.reset();
        self.inner.nodes.clear();
        self.inner.skipped_scans.store(0, Ordering::Relaxed);
        self.inner.health.set_baseline_captured(false).await;
        self.inner.metrics.set_pending_alerts(0);
        info!(discarded_alerts = discarded, "Monitor state reset");
        discarded
    }

    pub async fn status(&self) -> MonitorStatus {
        let now = Utc::now();
        let state = self.inner.state.lock().await;

        let unhealthy_workloads = state
            .workloads()
            .values()
            .filter(|w| w.health.severity != Severity::Success)
            .map(|w| WorkloadSummary {
                key: w.key.clone(),
                status: w.health.status,
                severity: w.health.severity,
                score: w.health.score,
                healthy_pods: w.healthy_count(),
                total_pods: w.total_count(),
                status_minutes: w.status_duration_minutes(now),
            })
            .collect();

        MonitorStatus {
            cluster: self.inner.settings.cluster_name.clone(),
            running: self.is_running(),
            configured: self.is_configured(),
            baseline: state.phase(),
            initialization_complete: state.is_initialization_complete(),
            workloads: state.workloads().len(),
            unhealthy_workloads,
            pending_alerts: state.pending_counts(),
            flush_deadline: state.flush_deadline(),
            evicted_alerts: state.evicted_alerts(),
            restart_storm: state.restart_storm_config(),
            restart_tracked_pods: state.restart_tracker().len(),
            nodes_tracked: self.inner.nodes.len(),
            nodes_not_ready: self.inner.nodes.not_ready_count(),
            skipped_scans: self.inner.skipped_scans.load(Ordering::Relaxed),
            stats: state.stats().clone(),
        }
    }

    /// Update restart storm settings at runtime
    pub async fn configure_restart_storm(&self, config: RestartStormConfig) -> Result<()> {
        self.inner
            .state
            .lock()
            .await
            .configure_restart_storm(config)?;
        info!(
            enabled = config.enabled,
            threshold = config.threshold,
            cooldown_minutes = config.cooldown_minutes,
            "Restart storm detection reconfigured"
        );
        Ok(())
    }

    pub async fn restart_storm_config(&self) -> RestartStormConfig {
        self.inner.state.lock().await.restart_storm_config()
    }

    /// Render and deliver the pending batch.
    ///
    /// Events are removed only after a successful send; on failure the
    /// batch stays pending for the next attempt.
    pub async fn flush(&self) -> Result<FlushOutcome> {
        let _guard = self.inner.flush_guard.lock().await;

        let batch = {
            let state = self.inner.state.lock().await;
            let batch = state.pending();
            if batch.is_empty() {
                return Ok(FlushOutcome::Empty);
            }
            batch
        };
        let counts = batch.counts();

        let (sink, recipients) = match (self.inner.sink.clone(), self.recipients()) {
            (Some(sink), Some(recipients)) => (sink, recipients),
            _ => {
                let overview = ClusterOverview::from_pods(&[], Utc::now());
                let (subject, _) = self.inner.renderer.render_batch(&batch, &overview);
                warn!(
                    subject = %subject,
                    pending = counts.total(),
                    "No notification recipients configured, dropping alert batch"
                );
                let mut state = self.inner.state.lock().await;
                state.acknowledge(&counts);
                self.inner
                    .metrics
                    .set_pending_alerts(state.pending_counts().total());
                return Ok(FlushOutcome::Undeliverable {
                    dropped: counts.total(),
                });
            }
        };

        let source = self.source()?;
        let pods = match self.fetch(source.list_pods()).await {
            Ok(pods) => pods,
            Err(e) => {
                self.inner.metrics.inc_fetch_errors("pods");
                warn!(error = %e, "Could not fetch cluster overview, keeping alerts pending");
                return Err(e.into());
            }
        };

        let now = Utc::now();
        let overview = ClusterOverview::from_pods(&pods, now);
        let (subject, body) = self.inner.renderer.render_batch(&batch, &overview);
        let notification = Notification {
            subject,
            body,
            recipients,
        };
        let recipient_count = notification.recipients.len();

        let delivered = self.deliver(sink.as_ref(), &notification).await;
        let mut state = self.inner.state.lock().await;
        state.record_notification(delivered.is_ok(), now);
        self.inner.metrics.inc_notifications(delivered.is_ok());
        self.inner
            .logger
            .log_flush(&counts, recipient_count, delivered.is_ok());

        match delivered {
            Ok(()) => {
                state.acknowledge(&counts);
                self.inner
                    .metrics
                    .set_pending_alerts(state.pending_counts().total());
                drop(state);
                self.inner.health.set_healthy(components::NOTIFIER).await;
                Ok(FlushOutcome::Delivered {
                    events: counts.total(),
                    recipients: recipient_count,
                })
            }
            Err(e) => {
                drop(state);
                self.inner
                    .health
                    .record_failure(
                        components::NOTIFIER,
                        e.to_string(),
                        self.inner.settings.unhealthy_after_failures,
                    )
                    .await;
                Err(MonitorError::NotificationFailed(e.to_string()))
            }
        }
    }

    /// One loop iteration: workload scan, node scan, flush retry
    pub(crate) async fn tick(&self) {
        match self.scan_workloads().await {
            Ok(report) => debug!(
                pods = report.pods,
                workloads = report.workloads,
                events = report.events.total(),
                duration_ms = report.duration_ms,
                "Workload scan complete"
            ),
            Err(MonitorError::ScanInProgress) => {}
            Err(e) => warn!(error = %e, "Workload scan failed"),
        }

        if let Err(e) = self.scan_nodes().await {
            warn!(error = %e, "Node scan failed");
        }

        // Retry batches left behind by a failed flush
        let pending = self.inner.state.lock().await.pending_counts().total();
        if pending > 0 && !self.inner.flush_timer.is_pending() {
            debug!(pending = pending, "Rescheduling flush for pending alerts");
            self.schedule_flush();
        }
    }

    pub(crate) async fn register_components(&self) {
        for name in [
            components::SCANNER,
            components::NODE_MONITOR,
            components::NOTIFIER,
        ] {
            self.inner.health.register(name).await;
        }
    }

    async fn scan_workloads(&self) -> Result<ScanReport> {
        let Ok(_guard) = self.inner.scan_guard.try_lock() else {
            self.inner.skipped_scans.fetch_add(1, Ordering::Relaxed);
            self.inner.metrics.inc_scans_skipped();
            debug!("Previous scan still running, skipping");
            return Err(MonitorError::ScanInProgress);
        };

        let source = self.source()?;
        let started = Instant::now();

        let pods = match self.fetch(source.list_pods()).await {
            Ok(pods) => pods,
            Err(e) => {
                self.inner.metrics.inc_fetch_errors("pods");
                self.inner.state.lock().await.record_scan_failure();
                self.inner
                    .health
                    .record_failure(
                        components::SCANNER,
                        e.to_string(),
                        self.inner.settings.unhealthy_after_failures,
                    )
                    .await;
                warn!(error = %e, "Pod listing failed, keeping previous state");
                return Err(e.into());
            }
        };

        let (outcome, pending) = {
            let mut state = self.inner.state.lock().await;
            let outcome = state.apply_scan(&pods, Utc::now());
            (outcome, state.pending_counts().total())
        };

        let elapsed = started.elapsed();
        let metrics = &self.inner.metrics;
        metrics.observe_scan_latency(elapsed.as_secs_f64());
        metrics.set_snapshot_size(outcome.workloads, outcome.pods);
        metrics.set_pending_alerts(pending);
        self.inner.health.set_healthy(components::SCANNER).await;

        for event in &outcome.events {
            self.inner.logger.log_transition(event);
            metrics.inc_alert_event(event.event_type);
        }

        if outcome.baseline_captured {
            self.inner.health.set_baseline_captured(true).await;
            self.inner.logger.log_baseline(
                outcome.workloads,
                self.inner.settings.grace_period.as_secs(),
            );
            self.schedule_grace(outcome.baseline_epoch, self.inner.settings.grace_period);
        } else if outcome.in_grace && !self.inner.grace_timer.is_pending() {
            // Timer was cancelled by a stop; resume it for the same baseline
            let remaining = outcome
                .grace_ends_at
                .and_then(|ends_at| (ends_at - Utc::now()).to_std().ok())
                .unwrap_or_default();
            debug!(
                epoch = outcome.baseline_epoch,
                remaining_secs = remaining.as_secs(),
                "Re-arming grace timer"
            );
            self.schedule_grace(outcome.baseline_epoch, remaining);
        }

        if !outcome.events.is_empty() {
            self.schedule_flush();
        }

        if !outcome.restart_storms.is_empty() {
            metrics.inc_restart_storms(outcome.restart_storms.len());
            for alert in &outcome.restart_storms {
                self.inner.logger.log_restart_storm(alert);
            }
            self.notify_restart_storms(&outcome.restart_storms).await;
        }

        Ok(ScanReport::from_outcome(
            &outcome,
            elapsed.as_millis() as u64,
        ))
    }

    async fn scan_nodes(&self) -> Result<Vec<NodeTransition>> {
        let source = self.source()?;
        let nodes = match self.fetch(source.list_nodes()).await {
            Ok(nodes) => nodes,
            Err(e) => {
                self.inner.metrics.inc_fetch_errors("nodes");
                self.inner
                    .health
                    .record_failure(
                        components::NODE_MONITOR,
                        e.to_string(),
                        self.inner.settings.unhealthy_after_failures,
                    )
                    .await;
                return Err(e.into());
            }
        };

        let transitions = self.inner.nodes.observe(&nodes, Utc::now());
        for transition in &transitions {
            self.inner.logger.log_node_transition(transition);
        }
        self.inner
            .metrics
            .record_node_scan(transitions.len(), self.inner.nodes.not_ready_count());
        self.inner.health.set_healthy(components::NODE_MONITOR).await;
        Ok(transitions)
    }

    /// Storm alerts bypass the coalescer and go out once per scan
    async fn notify_restart_storms(&self, alerts: &[RestartStormAlert]) {
        let (Some(sink), Some(recipients)) = (self.inner.sink.clone(), self.recipients()) else {
            debug!(
                storms = alerts.len(),
                "No notification recipients configured, restart storm alert not sent"
            );
            return;
        };

        let (subject, body) = self.inner.renderer.render_restart_storms(alerts);
        let notification = Notification {
            subject,
            body,
            recipients,
        };
        let delivered = self.deliver(sink.as_ref(), &notification).await;
        self.inner.metrics.inc_notifications(delivered.is_ok());
        if let Err(e) = delivered {
            warn!(error = %e, storms = alerts.len(), "Restart storm notification failed");
        }
    }

    fn schedule_flush(&self) {
        let monitor = self.clone();
        self.inner
            .flush_timer
            .schedule(self.inner.settings.debounce, async move {
                if let Err(e) = monitor.flush().await {
                    warn!(error = %e, "Scheduled alert flush failed");
                }
            });
    }

    fn schedule_grace(&self, epoch: u64, delay: Duration) {
        let monitor = self.clone();
        self.inner
            .grace_timer
            .schedule(delay, async move {
                monitor.complete_initialization(epoch).await;
            });
    }

    async fn complete_initialization(&self, epoch: u64) {
        let completed = self
            .inner
            .state
            .lock()
            .await
            .complete_initialization(epoch, Utc::now());
        if completed {
            self.inner.logger.log_initialization_complete();
        }
    }

    async fn discard_pending(&self) -> usize {
        let discarded = self.inner.state.lock().await.discard_pending();
        self.inner.metrics.set_pending_alerts(0);
        discarded
    }

    async fn fetch<T, F>(&self, call: F) -> std::result::Result<T, SourceError>
    where
        F: Future<Output = std::result::Result<T, SourceError>>,
    {
        let limit = self.inner.settings.fetch_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(SourceError::Timeout(limit)))
    }

    async fn deliver(
        &self,
        sink: &dyn NotificationSink,
        notification: &Notification,
    ) -> anyhow::Result<()> {
        let limit = self.inner.settings.fetch_timeout;
        tokio::time::timeout(limit, sink.send(notification))
            .await
            .map_err(|_| anyhow::anyhow!("delivery timed out after {:?}", limit))?
    }

    fn source(&self) -> Result<Arc<dyn PodSnapshotSource>> {
        self.inner
            .source
            .clone()
            .ok_or(MonitorError::NotConfigured)
    }

    fn recipients(&self) -> Option<Vec<String>> {
        let group = self.inner.settings.notification_group.as_deref()?;
        let recipients: Vec<String> = self
            .inner
            .groups
            .as_ref()?
            .resolve(group)?
            .into_iter()
            .filter(|r| !r.trim().is_empty())
            .collect();
        (!recipients.is_empty()).then_some(recipients)
    }

    fn runner_slot(&self) -> MutexGuard<'_, Option<RunnerHandle>> {
        self.inner.runner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Builder for a `Monitor`
pub struct MonitorBuilder {
    settings: MonitorSettings,
    source: Option<Arc<dyn PodSnapshotSource>>,
    sink: Option<Arc<dyn NotificationSink>>,
    groups: Option<Arc<dyn GroupLookup>>,
    renderer: Option<Arc<dyn DigestRenderer>>,
    health: Option<HealthRegistry>,
}

impl MonitorBuilder {
    pub fn new() -> Self {
        Self {
            settings: MonitorSettings::default(),
            source: None,
            sink: None,
            groups: None,
            renderer: None,
            health: None,
        }
    }

    pub fn settings(mut self, settings: MonitorSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the cluster snapshot source
    pub fn source(mut self, source: Arc<dyn PodSnapshotSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the notification sink
    pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set the recipient group lookup
    pub fn groups(mut self, groups: Arc<dyn GroupLookup>) -> Self {
        self.groups = Some(groups);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn DigestRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Share a health registry with the HTTP probes
    pub fn health_registry(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn build(self) -> Result<Monitor> {
        self.settings.validate()?;
        let settings = self.settings;

        let renderer = self.renderer.unwrap_or_else(|| {
            Arc::new(PlainTextRenderer::new(Some(settings.cluster_name.clone())))
        });
        let logger = StructuredLogger::new(settings.cluster_name.clone());

        Ok(Monitor {
            inner: Arc::new(MonitorInner {
                state: Mutex::new(MonitorState::new(&settings)),
                source: self.source,
                sink: self.sink,
                groups: self.groups,
                renderer,
                nodes: NodeHealthMonitor::new(),
                scan_guard: Mutex::new(()),
                flush_guard: Mutex::new(()),
                flush_timer: DebounceTimer::new(),
                grace_timer: DebounceTimer::new(),
                runner: std::sync::Mutex::new(None),
                skipped_scans: AtomicU64::new(0),
                health: self.health.unwrap_or_default(),
                metrics: MonitorMetrics::new(),
                logger,
                settings,
            }),
        })
    }
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
