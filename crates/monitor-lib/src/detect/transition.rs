//! Workload transition classification
//!
//! Compares the previous and current observation of a workload and yields
//! at most one transition. Three variants exist:
//! - `classify`: ordered healthy-count rules
//! - `classify_from_baseline`: relaxed rules for the first comparison after
//!   the grace period, which never report pre-existing breakage
//! - `classify_enhanced`: count rules plus severity deltas and persistent
//!   critical detection

use crate::models::{AlertEventType, Severity, WorkloadState};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default time a workload must stay critical before the enhanced
/// classifier reports it
pub const DEFAULT_PERSISTENT_CRITICAL_MINUTES: i64 = 10;

/// Which classifier runs after the first post-baseline comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    #[default]
    Standard,
    Enhanced,
}

/// A classified change of workload health
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub event_type: AlertEventType,
    pub reason: String,
    pub previous_healthy: u32,
    pub current_healthy: u32,
    /// Raised by the persistent-critical rule; latches until severity changes
    pub persistent_critical: bool,
}

impl Transition {
    fn new(event_type: AlertEventType, reason: impl Into<String>, counts: &Counts) -> Self {
        Self {
            event_type,
            reason: reason.into(),
            previous_healthy: counts.prev_healthy,
            current_healthy: counts.cur_healthy,
            persistent_critical: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Counts {
    prev_healthy: u32,
    prev_total: u32,
    cur_healthy: u32,
    cur_total: u32,
}

impl Counts {
    fn of(prev: Option<&WorkloadState>, cur: &WorkloadState) -> Self {
        Self {
            prev_healthy: prev.map_or(0, WorkloadState::healthy_count),
            prev_total: prev.map_or(0, WorkloadState::total_count),
            cur_healthy: cur.healthy_count(),
            cur_total: cur.total_count(),
        }
    }
}

/// Standard classification; first matching rule wins
pub fn classify(prev: Option<&WorkloadState>, cur: &WorkloadState) -> Option<Transition> {
    classify_counts(&Counts::of(prev, cur))
}

fn classify_counts(c: &Counts) -> Option<Transition> {
    if c.prev_healthy > 0 && c.cur_total == 0 && c.prev_total > 0 {
        return Some(Transition::new(
            AlertEventType::Stopped,
            format!("all pods removed ({} were healthy)", c.prev_healthy),
            c,
        ));
    }
    if c.prev_total == 0 && c.cur_healthy > 0 {
        return Some(Transition::new(
            AlertEventType::Started,
            format!("{} healthy pod(s) came up", c.cur_healthy),
            c,
        ));
    }
    if c.cur_healthy < c.prev_healthy && c.cur_healthy > 0 {
        return Some(Transition::new(
            AlertEventType::Degraded,
            format!(
                "healthy pods dropped from {} to {}",
                c.prev_healthy, c.cur_healthy
            ),
            c,
        ));
    }
    if c.cur_total > 0 && c.cur_healthy == 0 && c.prev_healthy > 0 {
        return Some(Transition::new(
            AlertEventType::Failed,
            format!("no healthy pods left out of {}", c.cur_total),
            c,
        ));
    }
    if c.cur_healthy > c.prev_healthy {
        return Some(Transition::new(
            AlertEventType::Recovered,
            format!(
                "healthy pods increased from {} to {}",
                c.prev_healthy, c.cur_healthy
            ),
            c,
        ));
    }
    None
}

/// Relaxed classification against a baseline observation
pub fn classify_from_baseline(baseline: &WorkloadState, cur: &WorkloadState) -> Option<Transition> {
    let c = Counts::of(Some(baseline), cur);

    if c.prev_healthy == 0 && c.cur_healthy > 0 {
        return Some(Transition::new(
            AlertEventType::Recovered,
            "recovered from baseline failure",
            &c,
        ));
    }
    if c.cur_healthy > c.prev_healthy && c.prev_healthy > 0 {
        return Some(Transition::new(
            AlertEventType::Recovered,
            "improved from baseline",
            &c,
        ));
    }
    if c.cur_healthy < c.prev_healthy {
        return Some(Transition::new(
            AlertEventType::Degraded,
            format!(
                "healthy pods dropped from {} to {} since baseline",
                c.prev_healthy, c.cur_healthy
            ),
            &c,
        ));
    }
    None
}

/// Count rules, then severity deltas, then persistent-critical detection
pub fn classify_enhanced(
    prev: Option<&WorkloadState>,
    cur: &WorkloadState,
    now: DateTime<Utc>,
    persistent_after: Duration,
) -> Option<Transition> {
    let c = Counts::of(prev, cur);
    if let Some(t) = classify_counts(&c) {
        return Some(t);
    }

    let prev = prev?;
    let (before, after) = (prev.health.severity, cur.health.severity);

    if after > before && c.cur_total > 0 {
        return Some(Transition::new(
            AlertEventType::Degraded,
            format!("severity worsened from {} to {}", before, after),
            &c,
        ));
    }
    if after == Severity::Success && before >= Severity::Warning {
        return Some(Transition::new(
            AlertEventType::Recovered,
            format!("severity returned to {} from {}", after, before),
            &c,
        ));
    }

    let critical_for = now - cur.severity_since;
    if after == Severity::Critical && !cur.persistent_alerted && critical_for >= persistent_after {
        let mut t = Transition::new(
            AlertEventType::Failed,
            format!(
                "critical for {} minutes ({})",
                critical_for.num_minutes(),
                cur.health.status
            ),
            &c,
        );
        t.persistent_critical = true;
        return Some(t);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BasicSeverity, HealthAssessment, PodPhase, PodRecord, WorkloadKey, WorkloadKind,
        WorkloadStatus,
    };
    use std::collections::VecDeque;

    fn pods(healthy: usize, unhealthy: usize) -> Vec<PodRecord> {
        let make = |i: usize, ready: bool| PodRecord {
            name: format!("payments-7d9f8b6c5-p{}", i),
            namespace: "prod".to_string(),
            phase: PodPhase::Running,
            ready_containers: u32::from(ready),
            total_containers: 1,
            restart_count: 0,
            node: None,
            created_at: Utc::now(),
            deleted_at: None,
        };
        (0..healthy)
            .map(|i| make(i, true))
            .chain((0..unhealthy).map(|i| make(healthy + i, false)))
            .collect()
    }

    fn state(healthy: usize, unhealthy: usize, severity: Severity) -> WorkloadState {
        let now = Utc::now();
        let pods = pods(healthy, unhealthy);
        WorkloadState {
            key: WorkloadKey::new(WorkloadKind::Deployment, "payments", "prod"),
            desired_replicas: pods.len() as u32,
            ready_replicas: healthy as u32,
            pods,
            health: HealthAssessment {
                score: 90,
                severity,
                status: WorkloadStatus::Healthy,
            },
            basic_severity: BasicSeverity::Healthy,
            is_baseline: false,
            first_seen: now,
            last_seen: now,
            severity_since: now,
            score_history: VecDeque::new(),
            persistent_alerted: false,
        }
    }

    fn kind(t: Option<Transition>) -> Option<AlertEventType> {
        t.map(|t| t.event_type)
    }

    #[test]
    fn test_standard_rules_in_order() {
        let ok = Severity::Success;
        // stopped
        assert_eq!(
            kind(classify(Some(&state(3, 0, ok)), &state(0, 0, ok))),
            Some(AlertEventType::Stopped)
        );
        // started
        assert_eq!(
            kind(classify(None, &state(2, 0, ok))),
            Some(AlertEventType::Started)
        );
        assert_eq!(
            kind(classify(Some(&state(0, 0, ok)), &state(1, 0, ok))),
            Some(AlertEventType::Started)
        );
        // degraded
        assert_eq!(
            kind(classify(Some(&state(3, 0, ok)), &state(1, 2, ok))),
            Some(AlertEventType::Degraded)
        );
        // failed
        assert_eq!(
            kind(classify(Some(&state(3, 0, ok)), &state(0, 3, ok))),
            Some(AlertEventType::Failed)
        );
        // recovered
        assert_eq!(
            kind(classify(Some(&state(1, 2, ok)), &state(3, 0, ok))),
            Some(AlertEventType::Recovered)
        );
        // stable
        assert_eq!(kind(classify(Some(&state(3, 0, ok)), &state(3, 0, ok))), None);
        assert_eq!(kind(classify(Some(&state(0, 2, ok)), &state(0, 2, ok))), None);
    }

    #[test]
    fn test_new_workload_without_healthy_pods_is_silent() {
        assert_eq!(kind(classify(None, &state(0, 3, Severity::Critical))), None);
    }

    #[test]
    fn test_transition_metadata() {
        let t = classify(Some(&state(3, 0, Severity::Success)), &state(1, 2, Severity::Warning))
            .unwrap();
        assert_eq!(t.previous_healthy, 3);
        assert_eq!(t.current_healthy, 1);
        assert!(!t.persistent_critical);
    }

    #[test]
    fn test_baseline_broken_and_still_broken_is_silent() {
        let baseline = state(0, 3, Severity::Critical);
        assert_eq!(
            kind(classify_from_baseline(&baseline, &state(0, 3, Severity::Critical))),
            None
        );
        // The standard rules would not fire either, but a partially broken
        // baseline that stays the same must also stay quiet
        let partial = state(1, 2, Severity::Warning);
        assert_eq!(
            kind(classify_from_baseline(&partial, &state(1, 2, Severity::Warning))),
            None
        );
    }

    #[test]
    fn test_baseline_recovery_and_degradation() {
        let t = classify_from_baseline(&state(0, 3, Severity::Critical), &state(2, 1, Severity::Warning))
            .unwrap();
        assert_eq!(t.event_type, AlertEventType::Recovered);
        assert_eq!(t.reason, "recovered from baseline failure");

        let t = classify_from_baseline(&state(1, 2, Severity::Warning), &state(3, 0, Severity::Success))
            .unwrap();
        assert_eq!(t.event_type, AlertEventType::Recovered);
        assert_eq!(t.reason, "improved from baseline");

        let t = classify_from_baseline(&state(3, 0, Severity::Success), &state(0, 3, Severity::Critical))
            .unwrap();
        assert_eq!(t.event_type, AlertEventType::Degraded);
    }

    #[test]
    fn test_enhanced_severity_delta() {
        let now = Utc::now();
        let window = Duration::minutes(DEFAULT_PERSISTENT_CRITICAL_MINUTES);

        // Same healthy count, but severity got worse (e.g. crash-looping)
        let t = classify_enhanced(
            Some(&state(2, 0, Severity::Success)),
            &state(2, 0, Severity::Critical),
            now,
            window,
        )
        .unwrap();
        assert_eq!(t.event_type, AlertEventType::Degraded);

        let t = classify_enhanced(
            Some(&state(2, 0, Severity::Warning)),
            &state(2, 0, Severity::Success),
            now,
            window,
        )
        .unwrap();
        assert_eq!(t.event_type, AlertEventType::Recovered);

        // Count rules still take precedence
        let t = classify_enhanced(
            Some(&state(3, 0, Severity::Success)),
            &state(1, 2, Severity::Warning),
            now,
            window,
        )
        .unwrap();
        assert_eq!(t.event_type, AlertEventType::Degraded);
        assert!(t.reason.contains("dropped"));
    }

    #[test]
    fn test_enhanced_persistent_critical() {
        let window = Duration::minutes(DEFAULT_PERSISTENT_CRITICAL_MINUTES);
        let prev = state(0, 3, Severity::Critical);
        let mut cur = state(0, 3, Severity::Critical);
        cur.severity_since = Utc::now() - Duration::minutes(4);

        // Not long enough yet
        assert!(classify_enhanced(Some(&prev), &cur, Utc::now(), window).is_none());

        cur.severity_since = Utc::now() - Duration::minutes(11);
        let t = classify_enhanced(Some(&prev), &cur, Utc::now(), window).unwrap();
        assert_eq!(t.event_type, AlertEventType::Failed);
        assert!(t.persistent_critical);

        // Latched for the rest of the streak
        cur.persistent_alerted = true;
        assert!(classify_enhanced(Some(&prev), &cur, Utc::now(), window).is_none());
    }

    #[test]
    fn test_standard_ignores_severity_only_changes() {
        let prev = state(2, 0, Severity::Success);
        let cur = state(2, 0, Severity::Critical);
        assert!(classify(Some(&prev), &cur).is_none());
    }
}
