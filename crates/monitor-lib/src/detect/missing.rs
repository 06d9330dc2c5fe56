//! Detection of workloads that vanished between ticks
//!
//! Must run against the previous tick's map before that map is replaced,
//! otherwise a vanished workload is simply forgotten.

use crate::models::{AlertEvent, AlertEventType, AlertMetadata, WorkloadKey, WorkloadState};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

pub const MISSING_REASON: &str = "workload removed between ticks";

/// Synthesize a `Stopped` event for every previously healthy workload that
/// is absent from the current snapshot
pub fn detect_missing<V>(
    previous: &BTreeMap<WorkloadKey, WorkloadState>,
    current: &BTreeMap<WorkloadKey, V>,
    now: DateTime<Utc>,
) -> Vec<AlertEvent> {
    previous
        .iter()
        .filter(|(key, _)| !current.contains_key(*key))
        .filter_map(|(_, state)| {
            let previous_healthy = state.healthy_count();
            if previous_healthy == 0 {
                return None;
            }

            let mut snapshot = state.clone();
            snapshot.pods.clear();
            snapshot.ready_replicas = 0;
            snapshot.last_seen = now;

            Some(AlertEvent {
                event_type: AlertEventType::Stopped,
                workload: snapshot,
                timestamp: now,
                reason: MISSING_REASON.to_string(),
                metadata: Some(AlertMetadata {
                    previous_healthy,
                    current_healthy: 0,
                }),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BasicSeverity, HealthAssessment, PodPhase, PodRecord, Severity, WorkloadKind,
        WorkloadStatus,
    };
    use std::collections::VecDeque;

    fn state(name: &str, healthy: usize) -> (WorkloadKey, WorkloadState) {
        let now = Utc::now();
        let key = WorkloadKey::new(WorkloadKind::Deployment, name, "prod");
        let pods: Vec<PodRecord> = (0..3)
            .map(|i| PodRecord {
                name: format!("{}-abc12-p{}", name, i),
                namespace: "prod".to_string(),
                phase: PodPhase::Running,
                ready_containers: u32::from(i < healthy),
                total_containers: 1,
                restart_count: 0,
                node: None,
                created_at: now,
                deleted_at: None,
            })
            .collect();
        let state = WorkloadState {
            key: key.clone(),
            desired_replicas: 3,
            ready_replicas: healthy as u32,
            pods,
            health: HealthAssessment {
                score: 90,
                severity: Severity::Success,
                status: WorkloadStatus::Healthy,
            },
            basic_severity: BasicSeverity::Healthy,
            is_baseline: false,
            first_seen: now,
            last_seen: now,
            severity_since: now,
            score_history: VecDeque::new(),
            persistent_alerted: false,
        };
        (key, state)
    }

    #[test]
    fn test_vanished_healthy_workload_is_stopped() {
        let previous: BTreeMap<_, _> = [state("payments", 3), state("search", 2)].into_iter().collect();
        let current: BTreeMap<WorkloadKey, ()> = [(state("search", 2).0, ())].into_iter().collect();

        let events = detect_missing(&previous, &current, Utc::now());

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.event_type, AlertEventType::Stopped);
        assert_eq!(event.workload.key.name, "payments");
        assert_eq!(event.workload.total_count(), 0);
        assert_eq!(event.reason, MISSING_REASON);
        assert_eq!(
            event.metadata,
            Some(AlertMetadata {
                previous_healthy: 3,
                current_healthy: 0
            })
        );
    }

    #[test]
    fn test_vanished_unhealthy_workload_is_silent() {
        let previous: BTreeMap<_, _> = [state("broken", 0)].into_iter().collect();
        let current: BTreeMap<WorkloadKey, ()> = BTreeMap::new();

        assert!(detect_missing(&previous, &current, Utc::now()).is_empty());
    }

    #[test]
    fn test_nothing_missing() {
        let previous: BTreeMap<_, _> = [state("payments", 3)].into_iter().collect();
        let current: BTreeMap<WorkloadKey, ()> = [(state("payments", 1).0, ())].into_iter().collect();

        assert!(detect_missing(&previous, &current, Utc::now()).is_empty());
    }
}
