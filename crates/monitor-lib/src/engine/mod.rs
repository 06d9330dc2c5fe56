//! Monitor engine
//!
//! Ties the scanners, detectors and the alert coalescer together:
//! - `MonitorState`: synchronous single-writer state, one scan at a time
//! - `Monitor`: async facade owning the loop, timers and collaborators

mod baseline;
mod r#loop;
mod monitor;
mod settings;
mod state;

pub use baseline::{BaselineManager, BaselinePhase};
pub use monitor::{
    FlushOutcome, Monitor, MonitorBuilder, MonitorStatus, ScanReport, WorkloadSummary,
};
pub use settings::{
    MonitorSettings, DEFAULT_FETCH_TIMEOUT, DEFAULT_GRACE_PERIOD, DEFAULT_SCAN_INTERVAL,
    DEFAULT_STARTUP_DELAY,
};
pub use state::{MonitorState, MonitorStats, ScanOutcome};
