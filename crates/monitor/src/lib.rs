//! Workload Monitor - process wiring for the workload health monitor
//!
//! Connects the engine in `monitor-lib` to a real cluster (kube), a webhook
//! notification endpoint (reqwest) and an HTTP surface for probes, metrics
//! and status (axum).

pub mod api;
pub mod config;
pub mod groups;
pub mod kube_source;
pub mod webhook;
