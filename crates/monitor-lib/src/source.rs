//! Collaborator interfaces for the monitor engine
//!
//! The engine never talks to the cluster or a mail server directly. It is
//! handed implementations of these traits by the binary (or by tests).

use crate::error::SourceError;
use crate::models::{NodeRecord, PodRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source of cluster snapshots
#[async_trait]
pub trait PodSnapshotSource: Send + Sync {
    /// List every pod in the cluster
    async fn list_pods(&self) -> Result<Vec<PodRecord>, SourceError>;

    /// List every node in the cluster
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>, SourceError>;
}

/// A rendered notification ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

/// Best-effort notification delivery
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Resolves a recipient group identifier to addresses
pub trait GroupLookup: Send + Sync {
    fn resolve(&self, group: &str) -> Option<Vec<String>>;
}
