//! Node readiness tracking
//!
//! A lighter sibling of the workload path: compares each node's readiness
//! with the last observation and reports changes. No coalescing.

use crate::models::NodeRecord;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A node whose readiness flipped since the previous scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTransition {
    pub name: String,
    pub was_ready: bool,
    pub ready: bool,
    pub observed_at: DateTime<Utc>,
}

/// Registry of last known node readiness
#[derive(Debug, Default)]
pub struct NodeHealthMonitor {
    nodes: DashMap<String, bool>,
}

impl NodeHealthMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare against stored readiness and record the new values.
    ///
    /// Nodes seen for the first time are recorded without a transition.
    /// Nodes missing from the listing are forgotten.
    pub fn observe(&self, nodes: &[NodeRecord], now: DateTime<Utc>) -> Vec<NodeTransition> {
        let mut transitions = Vec::new();

        for node in nodes {
            match self.nodes.insert(node.name.clone(), node.ready) {
                Some(was_ready) if was_ready != node.ready => transitions.push(NodeTransition {
                    name: node.name.clone(),
                    was_ready,
                    ready: node.ready,
                    observed_at: now,
                }),
                Some(_) => {}
                None => debug!(node = %node.name, ready = node.ready, "Tracking new node"),
            }
        }

        self.nodes
            .retain(|name, _| nodes.iter().any(|n| &n.name == name));

        transitions
    }

    pub fn is_ready(&self, name: &str) -> Option<bool> {
        self.nodes.get(name).map(|r| *r)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn not_ready_count(&self) -> usize {
        self.nodes.iter().filter(|r| !*r.value()).count()
    }

    pub fn clear(&self) {
        self.nodes.clear();
    }
}
