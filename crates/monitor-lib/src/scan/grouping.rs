//! Workload reconstruction from pod names
//!
//! Controllers name their pods `<owner>-<suffix>`: Deployments append a
//! replica-set hash and a pod hash, StatefulSets append an ordinal. The
//! owner is recovered by stripping those suffixes.

use crate::models::{PodRecord, WorkloadKey, WorkloadKind};
use std::collections::BTreeMap;

/// Longest numeric suffix still treated as a StatefulSet ordinal
const MAX_ORDINAL_DIGITS: usize = 4;

/// Pods belonging to one workload in the current tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkloadGroup {
    pub pods: Vec<PodRecord>,
}

impl WorkloadGroup {
    pub fn total(&self) -> u32 {
        self.pods.len() as u32
    }

    /// Observed pod count stands in for the desired replica count
    pub fn desired_replicas(&self) -> u32 {
        self.total()
    }

    pub fn ready_replicas(&self) -> u32 {
        self.count(PodRecord::is_ready)
    }

    pub fn running(&self) -> u32 {
        self.count(PodRecord::is_running)
    }

    pub fn pending(&self) -> u32 {
        self.count(PodRecord::is_pending)
    }

    pub fn healthy(&self) -> u32 {
        self.count(PodRecord::is_healthy)
    }

    pub fn crash_looping(&self) -> u32 {
        self.count(PodRecord::is_crash_looping)
    }

    fn count(&self, pred: impl Fn(&PodRecord) -> bool) -> u32 {
        self.pods.iter().filter(|p| pred(*p)).count() as u32
    }
}

/// Infer the owning workload of a pod from its name
pub fn parse_workload_key(pod_name: &str, namespace: &str) -> WorkloadKey {
    let segments: Vec<&str> = pod_name.split('-').collect();

    if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
        return WorkloadKey::new(WorkloadKind::Pod, pod_name, namespace);
    }

    let last = segments[segments.len() - 1];
    if is_ordinal(last) {
        let owner = segments[..segments.len() - 1].join("-");
        return WorkloadKey::new(WorkloadKind::StatefulSet, owner, namespace);
    }

    let keep = if segments.len() >= 3 {
        segments.len() - 2
    } else {
        segments.len() - 1
    };
    WorkloadKey::new(WorkloadKind::Deployment, segments[..keep].join("-"), namespace)
}

fn is_ordinal(segment: &str) -> bool {
    segment.len() <= MAX_ORDINAL_DIGITS && segment.chars().all(|c| c.is_ascii_digit())
}

/// Partition pods into workloads; pods mapping to the same key are merged
pub fn group_pods(pods: &[PodRecord]) -> BTreeMap<WorkloadKey, WorkloadGroup> {
    let mut groups: BTreeMap<WorkloadKey, WorkloadGroup> = BTreeMap::new();
    for pod in pods {
        let key = parse_workload_key(&pod.name, &pod.namespace);
        groups.entry(key).or_default().pods.push(pod.clone());
    }
    groups
}
