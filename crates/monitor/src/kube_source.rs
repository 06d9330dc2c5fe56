//! Kubernetes-backed snapshot source
//!
//! Lists pods and nodes across all namespaces and maps them onto the
//! engine's plain records. API errors are classified so the engine can
//! tell an unreachable cluster from rejected credentials.

use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, ListParams};
use kube::Client;
use monitor_lib::{NodeRecord, PodPhase, PodRecord, PodSnapshotSource, SourceError};

pub struct KubeSnapshotSource {
    client: Client,
}

impl KubeSnapshotSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from in-cluster config or the local kubeconfig
    pub async fn try_default() -> anyhow::Result<Self> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl PodSnapshotSource for KubeSnapshotSource {
    async fn list_pods(&self) -> Result<Vec<PodRecord>, SourceError> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(classify_error)?;
        Ok(list.items.iter().filter_map(pod_record).collect())
    }

    async fn list_nodes(&self) -> Result<Vec<NodeRecord>, SourceError> {
        let api: Api<Node> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(classify_error)?;
        Ok(list.items.iter().filter_map(node_record).collect())
    }
}

fn classify_error(err: kube::Error) -> SourceError {
    match err {
        kube::Error::Api(resp) if resp.code == 401 || resp.code == 403 => {
            SourceError::Unauthorized(resp.message)
        }
        kube::Error::Api(resp) => SourceError::Other(format!("{} ({})", resp.message, resp.code)),
        kube::Error::Service(e) => SourceError::Unreachable(e.to_string()),
        other => SourceError::Other(other.to_string()),
    }
}

/// Map a pod object; objects without a name are skipped
pub fn pod_record(pod: &Pod) -> Option<PodRecord> {
    let meta = &pod.metadata;
    let name = meta.name.clone()?;
    let status = pod.status.as_ref();
    let containers = status.and_then(|s| s.container_statuses.as_deref());

    let declared = pod.spec.as_ref().map_or(0, |s| s.containers.len() as u32);
    let reported = containers.map_or(0, |cs| cs.len() as u32);

    Some(PodRecord {
        name,
        namespace: meta
            .namespace
            .clone()
            .unwrap_or_else(|| "default".to_string()),
        phase: status
            .and_then(|s| s.phase.as_deref())
            .map_or(PodPhase::Unknown, PodPhase::parse),
        ready_containers: containers.map_or(0, |cs| cs.iter().filter(|c| c.ready).count() as u32),
        total_containers: declared.max(reported),
        restart_count: containers.map_or(0, |cs| {
            cs.iter().map(|c| c.restart_count.max(0) as u32).sum()
        }),
        node: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
        created_at: meta
            .creation_timestamp
            .as_ref()
            .map_or_else(Utc::now, |t| t.0),
        deleted_at: meta.deletion_timestamp.as_ref().map(|t| t.0),
    })
}

/// Map a node object; ready when its `Ready` condition is `True`
pub fn node_record(node: &Node) -> Option<NodeRecord> {
    let name = node.metadata.name.clone()?;
    let ready = node
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .map_or(false, |conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        });
    Some(NodeRecord { name, ready })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod(value: serde_json::Value) -> Pod {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_pod_record_mapping() {
        let pod = pod(json!({
            "metadata": {
                "name": "payments-7d9f8b6c5-x2x9k",
                "namespace": "prod",
                "creationTimestamp": "2024-05-01T10:00:00Z"
            },
            "spec": {
                "nodeName": "worker-3",
                "containers": [{"name": "app"}, {"name": "sidecar"}]
            },
            "status": {
                "phase": "Running",
                "containerStatuses": [
                    {"name": "app", "ready": true, "restartCount": 3, "image": "app", "imageID": ""},
                    {"name": "sidecar", "ready": false, "restartCount": 1, "image": "proxy", "imageID": ""}
                ]
            }
        }));

        let record = pod_record(&pod).unwrap();
        assert_eq!(record.name, "payments-7d9f8b6c5-x2x9k");
        assert_eq!(record.namespace, "prod");
        assert_eq!(record.phase, PodPhase::Running);
        assert_eq!(record.ready_containers, 1);
        assert_eq!(record.total_containers, 2);
        assert_eq!(record.restart_count, 4);
        assert_eq!(record.node.as_deref(), Some("worker-3"));
        assert_eq!(record.created_at.to_rfc3339(), "2024-05-01T10:00:00+00:00");
        assert!(!record.is_ready());
    }

    #[test]
    fn test_pending_pod_without_statuses() {
        let pod = pod(json!({
            "metadata": {"name": "redis-0", "namespace": "cache"},
            "spec": {"containers": [{"name": "redis"}]},
            "status": {"phase": "Pending"}
        }));

        let record = pod_record(&pod).unwrap();
        assert_eq!(record.phase, PodPhase::Pending);
        assert_eq!(record.ready_containers, 0);
        assert_eq!(record.total_containers, 1);
        assert_eq!(record.node, None);
    }

    #[test]
    fn test_unnamed_pod_is_skipped() {
        let pod = pod(json!({"metadata": {}}));
        assert!(pod_record(&pod).is_none());
    }

    #[test]
    fn test_node_readiness() {
        let node: Node = serde_json::from_value(json!({
            "metadata": {"name": "worker-1"},
            "status": {"conditions": [
                {"type": "MemoryPressure", "status": "False"},
                {"type": "Ready", "status": "True"}
            ]}
        }))
        .unwrap();
        assert_eq!(
            node_record(&node),
            Some(NodeRecord {
                name: "worker-1".to_string(),
                ready: true
            })
        );

        let node: Node = serde_json::from_value(json!({
            "metadata": {"name": "worker-2"},
            "status": {"conditions": [{"type": "Ready", "status": "Unknown"}]}
        }))
        .unwrap();
        assert!(!node_record(&node).unwrap().ready);
    }
}
