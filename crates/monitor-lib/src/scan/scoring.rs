//! Workload health scoring
//!
//! Two scoring modes:
//! - `basic_severity`: replica-count tiers, cheap enough for overviews
//! - `assess`: weighted 0-100 score plus a detailed status label

use super::WorkloadGroup;
use crate::models::{BasicSeverity, HealthAssessment, WorkloadStatus};

const READY_WEIGHT: f64 = 60.0;
const RUNNING_WEIGHT: f64 = 30.0;
const CRASH_LOOP_PENALTY: f64 = 20.0;

/// Replica-count severity
pub fn basic_severity(group: &WorkloadGroup) -> BasicSeverity {
    let total = group.total();
    let ready = group.ready_replicas();

    if total > 0 && ready == 0 {
        BasicSeverity::Critical
    } else if ready * 2 < total {
        BasicSeverity::Degraded
    } else if group.running() < total {
        BasicSeverity::Warning
    } else {
        BasicSeverity::Healthy
    }
}

/// Weighted health score in [0, 100]
pub fn health_score(group: &WorkloadGroup) -> u8 {
    let total = group.total();
    if total == 0 {
        return 0;
    }

    let total = f64::from(total);
    let score = READY_WEIGHT * f64::from(group.ready_replicas()) / total
        + RUNNING_WEIGHT * f64::from(group.running()) / total
        - CRASH_LOOP_PENALTY * f64::from(group.crash_looping()) / total;

    score.clamp(0.0, 100.0).round() as u8
}

/// Detailed status label, checked from worst to best
pub fn detailed_status(group: &WorkloadGroup) -> WorkloadStatus {
    let total = group.total();
    let ready = group.ready_replicas();

    if total == 0 {
        WorkloadStatus::NoPods
    } else if ready == 0 || group.crash_looping() > 0 {
        WorkloadStatus::Critical
    } else if ready * 2 < total {
        WorkloadStatus::Degraded
    } else if ready < total {
        WorkloadStatus::Partial
    } else if group.pending() > 0 {
        WorkloadStatus::Scaling
    } else {
        WorkloadStatus::Healthy
    }
}

/// Full detailed assessment
pub fn assess(group: &WorkloadGroup) -> HealthAssessment {
    let status = detailed_status(group);
    HealthAssessment {
        score: health_score(group),
        severity: status.severity(),
        status,
    }
}
