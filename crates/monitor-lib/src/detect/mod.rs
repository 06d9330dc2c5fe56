//! Change detection between consecutive snapshots
//!
//! This module provides:
//! - Missing workload detection (workloads that vanished between ticks)
//! - Transition classification (failed, degraded, recovered, stopped, started)
//! - Restart storm detection with per-pod cooldown

mod missing;
mod restart;
mod transition;

pub use missing::{detect_missing, MISSING_REASON};
pub use restart::{RestartStormAlert, RestartStormConfig, RestartStormTracker, RestartTrackEntry};
pub use transition::{
    classify, classify_enhanced, classify_from_baseline, ClassifierMode, Transition,
    DEFAULT_PERSISTENT_CRITICAL_MINUTES,
};
