//! Single-writer monitor state
//!
//! All mutation of workload state, restart tracking and the pending alert
//! buffer goes through `MonitorState`, which the async facade keeps behind
//! one mutex. A scan is applied atomically: missing-workload detection runs
//! against the previous map, classification runs per workload, and the map
//! is replaced last.

use crate::alert::{AlertCoalescer, BatchCounts, PendingAlertBatch};
use crate::detect::{
    classify, classify_enhanced, classify_from_baseline, detect_missing, ClassifierMode,
    RestartStormAlert, RestartStormConfig, RestartStormTracker, Transition,
};
use crate::engine::baseline::{BaselineManager, BaselinePhase};
use crate::engine::settings::MonitorSettings;
use crate::error::Result;
use crate::models::{AlertEvent, AlertMetadata, PodRecord, WorkloadKey, WorkloadState};
use crate::scan::{assess, basic_severity, group_pods, WorkloadGroup};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// Running counters exposed through the status endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStats {
    pub scans_completed: u64,
    pub scans_failed: u64,
    pub events_emitted: u64,
    pub restart_storms: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub last_scan_at: Option<DateTime<Utc>>,
    pub last_flush_at: Option<DateTime<Utc>>,
}

/// Result of applying one snapshot
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    pub pods: usize,
    pub workloads: usize,
    /// This scan captured a new baseline
    pub baseline_captured: bool,
    /// Epoch of the current baseline, for the grace timer
    pub baseline_epoch: u64,
    pub in_grace: bool,
    /// When the grace period of the current baseline ends
    pub grace_ends_at: Option<DateTime<Utc>>,
    /// Events buffered by this scan
    pub events: Vec<AlertEvent>,
    pub restart_storms: Vec<RestartStormAlert>,
}

pub struct MonitorState {
    workloads: BTreeMap<WorkloadKey, WorkloadState>,
    restarts: RestartStormTracker,
    coalescer: AlertCoalescer,
    baseline: BaselineManager,
    classifier: ClassifierMode,
    persistent_after: chrono::Duration,
    stats: MonitorStats,
}

impl MonitorState {
    pub fn new(settings: &MonitorSettings) -> Self {
        Self {
            workloads: BTreeMap::new(),
            restarts: RestartStormTracker::new(settings.restart_storm),
            coalescer: AlertCoalescer::new(settings.debounce, settings.max_pending_per_type),
            baseline: BaselineManager::new(settings.grace_period),
            classifier: settings.classifier,
            persistent_after: chrono::Duration::from_std(settings.persistent_critical_after)
                .unwrap_or_else(|_| chrono::Duration::minutes(10)),
            stats: MonitorStats::default(),
        }
    }

    /// Apply a successful pod listing
    pub fn apply_scan(&mut self, pods: &[PodRecord], now: DateTime<Utc>) -> ScanOutcome {
        let groups = group_pods(pods);
        let mut outcome = ScanOutcome {
            pods: pods.len(),
            workloads: groups.len(),
            ..Default::default()
        };

        // Storm tracking runs in every phase, independent of workload alerts
        outcome.restart_storms = pods
            .iter()
            .filter_map(|pod| self.restarts.observe(pod, now))
            .collect();
        let pruned = self.restarts.prune(now);
        if pruned > 0 {
            debug!(pruned = pruned, "Pruned stale restart tracking entries");
        }
        self.stats.restart_storms += outcome.restart_storms.len() as u64;
        self.stats.scans_completed += 1;
        self.stats.last_scan_at = Some(now);

        match self.baseline.phase() {
            BaselinePhase::AwaitingBaseline => {
                self.workloads = self.rebuild(groups, now, true);
                outcome.baseline_epoch = self.baseline.capture(now);
                outcome.baseline_captured = true;
                outcome.in_grace = true;
                if let BaselinePhase::Grace { ends_at, .. } = self.baseline.phase() {
                    outcome.grace_ends_at = Some(ends_at);
                }
            }
            BaselinePhase::Grace { ends_at, .. } => {
                self.workloads = self.rebuild(groups, now, true);
                outcome.baseline_epoch = self.baseline.epoch();
                outcome.in_grace = true;
                outcome.grace_ends_at = Some(ends_at);
            }
            BaselinePhase::Complete { .. } => {
                outcome.events = self.classify_scan(groups, now);
            }
        }

        outcome
    }

    fn rebuild(
        &self,
        groups: BTreeMap<WorkloadKey, WorkloadGroup>,
        now: DateTime<Utc>,
        is_baseline: bool,
    ) -> BTreeMap<WorkloadKey, WorkloadState> {
        groups
            .into_iter()
            .map(|(key, group)| {
                let prev = self.workloads.get(&key);
                let state = build_state(key.clone(), group, prev, now, is_baseline);
                (key, state)
            })
            .collect()
    }

    fn classify_scan(
        &mut self,
        groups: BTreeMap<WorkloadKey, WorkloadGroup>,
        now: DateTime<Utc>,
    ) -> Vec<AlertEvent> {
        let mut events = detect_missing(&self.workloads, &groups, now);
        let mut next = BTreeMap::new();

        for (key, group) in groups {
            let prev = self.workloads.get(&key);
            let mut cur = build_state(key.clone(), group, prev, now, false);

            let transition = match prev {
                Some(p) if p.is_baseline => classify_from_baseline(p, &cur),
                _ => match self.classifier {
                    ClassifierMode::Standard => classify(prev, &cur),
                    ClassifierMode::Enhanced => {
                        classify_enhanced(prev, &cur, now, self.persistent_after)
                    }
                },
            };

            if let Some(transition) = transition {
                if transition.persistent_critical {
                    cur.persistent_alerted = true;
                }
                events.push(event_from(transition, &cur, now));
            }
            next.insert(key, cur);
        }

        for event in &events {
            self.coalescer.add(event.clone(), now);
        }
        self.stats.events_emitted += events.len() as u64;
        self.workloads = next;
        events
    }

    /// End the grace period if the epoch still matches
    pub fn complete_initialization(&mut self, epoch: u64, now: DateTime<Utc>) -> bool {
        self.baseline.complete(epoch, now)
    }

    /// Next scan captures a fresh baseline
    pub fn request_recapture(&mut self) {
        self.baseline.request_recapture();
    }

    /// Forget everything except configuration; returns discarded alerts
    pub fn reset(&mut self) -> usize {
        self.workloads.clear();
        self.restarts.clear();
        self.baseline.request_recapture();
        self.stats = MonitorStats::default();
        self.coalescer.clear()
    }

    pub fn record_scan_failure(&mut self) {
        self.stats.scans_failed += 1;
    }

    pub fn record_notification(&mut self, delivered: bool, now: DateTime<Utc>) {
        if delivered {
            self.stats.notifications_sent += 1;
            self.stats.last_flush_at = Some(now);
        } else {
            self.stats.notifications_failed += 1;
        }
    }

    pub fn workloads(&self) -> &BTreeMap<WorkloadKey, WorkloadState> {
        &self.workloads
    }

    pub fn workload(&self, key: &WorkloadKey) -> Option<&WorkloadState> {
        self.workloads.get(key)
    }

    pub fn phase(&self) -> BaselinePhase {
        self.baseline.phase()
    }

    pub fn is_initialization_complete(&self) -> bool {
        self.baseline.is_initialization_complete()
    }

    pub fn stats(&self) -> &MonitorStats {
        &self.stats
    }

    pub fn restart_storm_config(&self) -> RestartStormConfig {
        self.restarts.config()
    }

    pub fn configure_restart_storm(&mut self, config: RestartStormConfig) -> Result<()> {
        self.restarts.configure(config)
    }

    pub fn restart_tracker(&self) -> &RestartStormTracker {
        &self.restarts
    }

    pub fn pending(&self) -> PendingAlertBatch {
        self.coalescer.snapshot()
    }

    pub fn pending_counts(&self) -> BatchCounts {
        self.coalescer.counts()
    }

    pub fn flush_deadline(&self) -> Option<DateTime<Utc>> {
        self.coalescer.deadline()
    }

    pub fn evicted_alerts(&self) -> u64 {
        self.coalescer.evicted()
    }

    pub fn acknowledge(&mut self, delivered: &BatchCounts) {
        self.coalescer.acknowledge(delivered);
    }

    pub fn discard_pending(&mut self) -> usize {
        self.coalescer.clear()
    }
}

fn build_state(
    key: WorkloadKey,
    group: WorkloadGroup,
    prev: Option<&WorkloadState>,
    now: DateTime<Utc>,
    is_baseline: bool,
) -> WorkloadState {
    let health = assess(&group);
    let basic = basic_severity(&group);
    let desired_replicas = group.desired_replicas();
    let ready_replicas = group.ready_replicas();

    let (first_seen, severity_since, persistent_alerted, score_history) = match prev {
        Some(p) if p.health.severity == health.severity => (
            p.first_seen,
            p.severity_since,
            p.persistent_alerted,
            p.score_history.clone(),
        ),
        Some(p) => (p.first_seen, now, false, p.score_history.clone()),
        None => (now, now, false, VecDeque::new()),
    };

    let mut state = WorkloadState {
        key,
        pods: group.pods,
        desired_replicas,
        ready_replicas,
        health,
        basic_severity: basic,
        is_baseline,
        first_seen,
        last_seen: now,
        severity_since,
        score_history,
        persistent_alerted,
    };
    state.push_score(health.score);
    state
}

fn event_from(transition: Transition, workload: &WorkloadState, now: DateTime<Utc>) -> AlertEvent {
    AlertEvent {
        event_type: transition.event_type,
        workload: workload.clone(),
        timestamp: now,
        reason: transition.reason,
        metadata: Some(AlertMetadata {
            previous_healthy: transition.previous_healthy,
            current_healthy: transition.current_healthy,
        }),
    }
}
