//! Integration tests for the monitor API endpoints

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use monitor_lib::{
    health::components, Monitor, MonitorSettings, NodeRecord, PodPhase, PodRecord,
    PodSnapshotSource, SourceError,
};
use std::sync::Arc;
use tower::ServiceExt;
use workload_monitor::api::{create_router, AppState};

struct FixedSource {
    pods: Vec<PodRecord>,
}

#[async_trait]
impl PodSnapshotSource for FixedSource {
    async fn list_pods(&self) -> Result<Vec<PodRecord>, SourceError> {
        Ok(self.pods.clone())
    }

    async fn list_nodes(&self) -> Result<Vec<NodeRecord>, SourceError> {
        Ok(vec![NodeRecord {
            name: "worker-1".to_string(),
            ready: true,
        }])
    }
}

fn pod(name: &str, ready: bool) -> PodRecord {
    PodRecord {
        name: name.to_string(),
        namespace: "prod".to_string(),
        phase: PodPhase::Running,
        ready_containers: u32::from(ready),
        total_containers: 1,
        restart_count: 0,
        node: Some("worker-1".to_string()),
        created_at: Utc::now(),
        deleted_at: None,
    }
}

fn setup_test_app() -> (Router, Arc<AppState>) {
    let source = FixedSource {
        pods: vec![
            pod("payments-7d9f8b6c5-a1", true),
            pod("payments-7d9f8b6c5-a2", false),
            pod("redis-0", true),
        ],
    };
    let monitor = Monitor::builder()
        .settings(MonitorSettings {
            cluster_name: "test".to_string(),
            ..Default::default()
        })
        .source(Arc::new(source))
        .build()
        .unwrap();

    let state = Arc::new(AppState::new(monitor));
    let router = create_router(state.clone());
    (router, state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, state) = setup_test_app();
    state.health_registry.register(components::SCANNER).await;

    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "healthy");
}

#[tokio::test]
async fn test_healthz_returns_ok_when_degraded() {
    let (app, state) = setup_test_app();
    state
        .health_registry
        .record_failure(components::SCANNER, "connection refused", 3)
        .await;

    // Degraded still returns 200 (operational)
    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);

    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_when_unhealthy() {
    let (app, state) = setup_test_app();
    for _ in 0..3 {
        state
            .health_registry
            .record_failure(components::SCANNER, "connection refused", 3)
            .await;
    }

    let (status, body) = get(app, "/healthz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let health: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(health["status"], "unhealthy");
    assert_eq!(health["components"]["scanner"]["consecutive_failures"], 3);
}

#[tokio::test]
async fn test_readyz_waits_for_baseline() {
    let (app, state) = setup_test_app();

    let (status, body) = get(app.clone(), "/readyz").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let readiness: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], false);
    assert_eq!(readiness["reason"], "Baseline not yet captured");

    state.monitor.force_scan().await.unwrap();

    let (status, body) = get(app, "/readyz").await;
    assert_eq!(status, StatusCode::OK);
    let readiness: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_status_reports_baseline_and_workloads() {
    let (app, state) = setup_test_app();
    state.monitor.force_scan().await.unwrap();

    let (status, body) = get(app, "/status").await;
    assert_eq!(status, StatusCode::OK);

    let report: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(report["cluster"], "test");
    assert_eq!(report["configured"], true);
    assert_eq!(report["running"], false);
    assert_eq!(report["baseline"]["phase"], "grace");
    assert_eq!(report["workloads"], 2);
    assert_eq!(report["nodes_tracked"], 1);

    let unhealthy = report["unhealthy_workloads"].as_array().unwrap();
    assert_eq!(unhealthy.len(), 1);
    assert_eq!(unhealthy[0]["key"]["name"], "payments");
    assert_eq!(unhealthy[0]["status"], "partial");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, state) = setup_test_app();
    state.monitor.force_scan().await.unwrap();

    let (status, body) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("workload_monitor_scan_latency_seconds"));
    assert!(text.contains("workload_monitor_workloads_tracked"));
}
