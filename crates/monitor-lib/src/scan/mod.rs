//! Snapshot processing: grouping pods into workloads and scoring them
//!
//! Everything in this module is a pure function of the pod listing.

mod grouping;
mod overview;
mod scoring;

pub use grouping::{group_pods, parse_workload_key, WorkloadGroup};
pub use overview::{ClusterOverview, NamespaceOverview};
pub use scoring::{assess, basic_severity, detailed_status, health_score};
