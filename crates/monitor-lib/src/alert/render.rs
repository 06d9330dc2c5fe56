//! Rendering of alert batches into notification text
//!
//! The engine only produces structured batches and overviews; turning them
//! into a subject and body is delegated to a `DigestRenderer`.

use super::PendingAlertBatch;
use crate::detect::RestartStormAlert;
use crate::models::{AlertEvent, AlertEventType};
use crate::scan::ClusterOverview;
use std::fmt::Write;

/// Converts structured alert data into a subject and body
pub trait DigestRenderer: Send + Sync {
    fn render_batch(&self, batch: &PendingAlertBatch, overview: &ClusterOverview) -> (String, String);

    fn render_restart_storms(&self, alerts: &[RestartStormAlert]) -> (String, String);
}

/// Plain-text renderer used by default
#[derive(Debug, Clone, Default)]
pub struct PlainTextRenderer {
    cluster_name: Option<String>,
}

impl PlainTextRenderer {
    pub fn new(cluster_name: Option<String>) -> Self {
        Self { cluster_name }
    }

    fn prefix(&self) -> String {
        match &self.cluster_name {
            Some(name) => format!("[{}] ", name),
            None => String::new(),
        }
    }
}

fn section_title(event_type: AlertEventType) -> &'static str {
    match event_type {
        AlertEventType::Failed => "FAILED",
        AlertEventType::Degraded => "DEGRADED",
        AlertEventType::Stopped => "STOPPED",
        AlertEventType::Recovered => "RECOVERED",
        AlertEventType::Started => "STARTED",
    }
}

fn event_line(out: &mut String, event: &AlertEvent) {
    let w = &event.workload;
    let _ = write!(
        out,
        "  - {} ({}/{} ready, score {}): {}",
        w.key,
        w.ready_replicas,
        w.desired_replicas,
        w.health.score,
        event.reason
    );
    if let Some(meta) = event.metadata {
        let _ = write!(
            out,
            " [healthy {} -> {}]",
            meta.previous_healthy, meta.current_healthy
        );
    }
    let _ = writeln!(out, " at {}", event.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
}

impl DigestRenderer for PlainTextRenderer {
    fn render_batch(&self, batch: &PendingAlertBatch, overview: &ClusterOverview) -> (String, String) {
        let counts = batch.counts();
        let parts: Vec<String> = AlertEventType::ALL
            .iter()
            .filter(|t| counts.get(**t) > 0)
            .map(|t| format!("{} {}", counts.get(*t), t))
            .collect();
        let subject = format!("{}Workload alerts: {}", self.prefix(), parts.join(", "));

        let mut body = String::new();
        for event_type in AlertEventType::ALL {
            let events = batch.events(event_type);
            if events.is_empty() {
                continue;
            }
            let _ = writeln!(body, "{} ({})", section_title(event_type), events.len());
            for event in events {
                event_line(&mut body, event);
            }
            body.push('\n');
        }

        let _ = writeln!(
            body,
            "Cluster overview at {}: {} workloads ({} healthy, {} degraded, {} failed), {} pods",
            overview.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            overview.total_workloads(),
            overview.healthy,
            overview.degraded,
            overview.failed,
            overview.total_pods
        );
        for (namespace, ns) in &overview.namespaces {
            let _ = writeln!(
                body,
                "  {}: {} healthy, {} degraded, {} failed",
                namespace, ns.healthy, ns.degraded, ns.failed
            );
        }

        (subject, body)
    }

    fn render_restart_storms(&self, alerts: &[RestartStormAlert]) -> (String, String) {
        let subject = format!(
            "{}Restart storm: {} pod(s) over restart threshold",
            self.prefix(),
            alerts.len()
        );

        let mut body = String::new();
        for alert in alerts {
            let _ = write!(
                body,
                "  - {}/{}: {} restarts (threshold {})",
                alert.namespace, alert.pod_name, alert.restart_count, alert.threshold
            );
            if let Some(previous) = alert.previous_restart_count {
                let _ = write!(body, ", was {}", previous);
            }
            if let Some(node) = &alert.node {
                let _ = write!(body, " on {}", node);
            }
            body.push('\n');
        }

        (subject, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertCoalescer;
    use crate::models::{
        AlertMetadata, BasicSeverity, HealthAssessment, Severity, WorkloadKey, WorkloadKind,
        WorkloadState, WorkloadStatus,
    };
    use chrono::Utc;
    use std::collections::VecDeque;

    fn event(event_type: AlertEventType, name: &str) -> AlertEvent {
        let now = Utc::now();
        AlertEvent {
            event_type,
            workload: WorkloadState {
                key: WorkloadKey::new(WorkloadKind::Deployment, name, "prod"),
                pods: vec![],
                desired_replicas: 3,
                ready_replicas: 1,
                health: HealthAssessment {
                    score: 40,
                    severity: Severity::Warning,
                    status: WorkloadStatus::Degraded,
                },
                basic_severity: BasicSeverity::Degraded,
                is_baseline: false,
                first_seen: now,
                last_seen: now,
                severity_since: now,
                score_history: VecDeque::new(),
                persistent_alerted: false,
            },
            timestamp: now,
            reason: "healthy pods dropped from 3 to 1".to_string(),
            metadata: Some(AlertMetadata {
                previous_healthy: 3,
                current_healthy: 1,
            }),
        }
    }

    #[test]
    fn test_render_batch() {
        let mut coalescer = AlertCoalescer::default();
        coalescer.add(event(AlertEventType::Degraded, "payments"), Utc::now());
        coalescer.add(event(AlertEventType::Failed, "search"), Utc::now());

        let overview = ClusterOverview::from_pods(&[], Utc::now());
        let renderer = PlainTextRenderer::new(Some("prod-eu".to_string()));
        let (subject, body) = renderer.render_batch(&coalescer.snapshot(), &overview);

        assert_eq!(subject, "[prod-eu] Workload alerts: 1 failed, 1 degraded");
        assert!(body.contains("FAILED (1)"));
        assert!(body.contains("Deployment/payments/prod (1/3 ready, score 40)"));
        assert!(body.contains("[healthy 3 -> 1]"));
        assert!(body.contains("Cluster overview"));
        // Failed section comes before degraded
        assert!(body.find("FAILED").unwrap() < body.find("DEGRADED").unwrap());
    }

    #[test]
    fn test_render_restart_storms() {
        let alerts = vec![RestartStormAlert {
            namespace: "jobs".to_string(),
            pod_name: "worker-7".to_string(),
            node: Some("node-3".to_string()),
            restart_count: 6,
            previous_restart_count: Some(2),
            threshold: 5,
            detected_at: Utc::now(),
        }];

        let (subject, body) = PlainTextRenderer::default().render_restart_storms(&alerts);
        assert_eq!(subject, "Restart storm: 1 pod(s) over restart threshold");
        assert!(body.contains("jobs/worker-7: 6 restarts (threshold 5), was 2 on node-3"));
    }
}
