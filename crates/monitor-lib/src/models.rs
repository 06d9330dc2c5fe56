//! Core data models for the workload monitor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Number of recent health scores kept per workload
pub const HEALTH_HISTORY_LEN: usize = 10;

/// Restart count above which a pod is considered crash-looping
pub const CRASH_LOOP_RESTARTS: u32 = 5;

/// Pod lifecycle phase as reported by the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    /// Parse a phase/status string, falling back to `Unknown`
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => PodPhase::Pending,
            "running" => PodPhase::Running,
            "succeeded" => PodPhase::Succeeded,
            "failed" => PodPhase::Failed,
            _ => PodPhase::Unknown,
        }
    }
}

impl std::fmt::Display for PodPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PodPhase::Pending => write!(f, "Pending"),
            PodPhase::Running => write!(f, "Running"),
            PodPhase::Succeeded => write!(f, "Succeeded"),
            PodPhase::Failed => write!(f, "Failed"),
            PodPhase::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Point-in-time snapshot of a single pod
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodRecord {
    pub name: String,
    pub namespace: String,
    pub phase: PodPhase,
    pub ready_containers: u32,
    pub total_containers: u32,
    pub restart_count: u32,
    pub node: Option<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl PodRecord {
    /// All containers report ready (and there is at least one)
    pub fn is_ready(&self) -> bool {
        self.total_containers > 0 && self.ready_containers >= self.total_containers
    }

    pub fn is_running(&self) -> bool {
        self.phase == PodPhase::Running
    }

    pub fn is_pending(&self) -> bool {
        self.phase == PodPhase::Pending
    }

    /// Ready and running; the unit counted by the transition classifier
    pub fn is_healthy(&self) -> bool {
        self.is_ready() && self.is_running()
    }

    pub fn is_crash_looping(&self) -> bool {
        self.restart_count > CRASH_LOOP_RESTARTS
    }
}

/// Node readiness snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub ready: bool,
}

/// Inferred kind of the workload owning a pod
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    Pod,
}

impl std::fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkloadKind::Deployment => write!(f, "Deployment"),
            WorkloadKind::StatefulSet => write!(f, "StatefulSet"),
            WorkloadKind::Pod => write!(f, "Pod"),
        }
    }
}

/// Identity of a logical workload
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadKey {
    pub kind: WorkloadKind,
    pub name: String,
    pub namespace: String,
}

impl WorkloadKey {
    pub fn new(kind: WorkloadKind, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl std::fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.name, self.namespace)
    }
}

/// Coarse severity tier, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Success => write!(f, "success"),
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Detailed workload status label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkloadStatus {
    Healthy,
    Scaling,
    Partial,
    Degraded,
    Critical,
    NoPods,
}

impl WorkloadStatus {
    /// Severity tier for this status
    pub fn severity(&self) -> Severity {
        match self {
            WorkloadStatus::Healthy => Severity::Success,
            WorkloadStatus::Scaling => Severity::Info,
            WorkloadStatus::Partial | WorkloadStatus::Degraded | WorkloadStatus::NoPods => {
                Severity::Warning
            }
            WorkloadStatus::Critical => Severity::Critical,
        }
    }
}

impl std::fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkloadStatus::Healthy => write!(f, "healthy"),
            WorkloadStatus::Scaling => write!(f, "scaling"),
            WorkloadStatus::Partial => write!(f, "partial"),
            WorkloadStatus::Degraded => write!(f, "degraded"),
            WorkloadStatus::Critical => write!(f, "critical"),
            WorkloadStatus::NoPods => write!(f, "no-pods"),
        }
    }
}

/// Cheap severity computed from replica counts only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasicSeverity {
    Healthy,
    Warning,
    Degraded,
    Critical,
}

/// Output of the detailed health scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthAssessment {
    /// Score in [0, 100]
    pub score: u8,
    pub severity: Severity,
    pub status: WorkloadStatus,
}

/// Tracked state of one workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadState {
    pub key: WorkloadKey,
    pub pods: Vec<PodRecord>,
    pub desired_replicas: u32,
    pub ready_replicas: u32,
    pub health: HealthAssessment,
    pub basic_severity: BasicSeverity,
    pub is_baseline: bool,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    /// Start of the current severity streak
    pub severity_since: DateTime<Utc>,
    pub score_history: VecDeque<u8>,
    /// Set once a persistent-critical alert fired for the current streak
    pub persistent_alerted: bool,
}

impl WorkloadState {
    /// Pods that are both ready and running
    pub fn healthy_count(&self) -> u32 {
        self.pods.iter().filter(|p| p.is_healthy()).count() as u32
    }

    pub fn total_count(&self) -> u32 {
        self.pods.len() as u32
    }

    /// Minutes spent continuously in the current severity
    pub fn status_duration_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.severity_since).num_minutes().max(0)
    }

    /// Append a score to the bounded history
    pub fn push_score(&mut self, score: u8) {
        self.score_history.push_back(score);
        while self.score_history.len() > HEALTH_HISTORY_LEN {
            self.score_history.pop_front();
        }
    }
}

/// Kind of workload transition reported to operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertEventType {
    Failed,
    Degraded,
    Recovered,
    Stopped,
    Started,
}

impl AlertEventType {
    /// All event types in digest order
    pub const ALL: [AlertEventType; 5] = [
        AlertEventType::Failed,
        AlertEventType::Degraded,
        AlertEventType::Stopped,
        AlertEventType::Recovered,
        AlertEventType::Started,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertEventType::Failed => "failed",
            AlertEventType::Degraded => "degraded",
            AlertEventType::Recovered => "recovered",
            AlertEventType::Stopped => "stopped",
            AlertEventType::Started => "started",
        }
    }
}

impl std::fmt::Display for AlertEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Healthy pod counts around a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertMetadata {
    pub previous_healthy: u32,
    pub current_healthy: u32,
}

/// A single detected workload transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub event_type: AlertEventType,
    pub workload: WorkloadState,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AlertMetadata>,
}
