//! Workload health monitoring library
//!
//! This crate provides the core functionality for:
//! - Grouping pods into workloads and scoring their health
//! - Baseline capture and transition classification
//! - Restart storm and node readiness detection
//! - Debounced alert coalescing and digest rendering
//! - Health checks and observability

pub mod alert;
pub mod detect;
pub mod engine;
pub mod error;
pub mod health;
pub mod models;
pub mod node;
pub mod observability;
pub mod scan;
pub mod source;

pub use engine::{Monitor, MonitorBuilder, MonitorSettings, MonitorStatus};
pub use error::{MonitorError, Result, SourceError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{MonitorMetrics, StructuredLogger};
pub use source::{GroupLookup, Notification, NotificationSink, PodSnapshotSource};
