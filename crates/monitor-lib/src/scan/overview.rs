//! Cluster-wide health overview attached to every notification

use super::{assess, group_pods, WorkloadGroup};
use crate::models::{PodRecord, Severity, WorkloadKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Workload counts for one namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceOverview {
    pub healthy: usize,
    pub degraded: usize,
    pub failed: usize,
}

impl NamespaceOverview {
    pub fn total(&self) -> usize {
        self.healthy + self.degraded + self.failed
    }
}

/// Fresh health summary of every workload in the cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterOverview {
    pub generated_at: DateTime<Utc>,
    pub total_pods: usize,
    pub healthy: usize,
    pub degraded: usize,
    pub failed: usize,
    pub namespaces: BTreeMap<String, NamespaceOverview>,
}

impl ClusterOverview {
    /// Build an overview straight from a pod listing
    pub fn from_pods(pods: &[PodRecord], now: DateTime<Utc>) -> Self {
        Self::from_groups(&group_pods(pods), pods.len(), now)
    }

    pub fn from_groups(
        groups: &BTreeMap<WorkloadKey, WorkloadGroup>,
        total_pods: usize,
        now: DateTime<Utc>,
    ) -> Self {
        let mut overview = ClusterOverview {
            generated_at: now,
            total_pods,
            healthy: 0,
            degraded: 0,
            failed: 0,
            namespaces: BTreeMap::new(),
        };

        for (key, group) in groups {
            let ns = overview.namespaces.entry(key.namespace.clone()).or_default();
            match assess(group).severity {
                Severity::Success | Severity::Info => {
                    ns.healthy += 1;
                    overview.healthy += 1;
                }
                Severity::Warning => {
                    ns.degraded += 1;
                    overview.degraded += 1;
                }
                Severity::Critical => {
                    ns.failed += 1;
                    overview.failed += 1;
                }
            }
        }

        overview
    }

    pub fn total_workloads(&self) -> usize {
        self.healthy + self.degraded + self.failed
    }
}
