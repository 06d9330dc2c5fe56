//! Monitor configuration

use anyhow::{Context, Result};
use monitor_lib::detect::{ClassifierMode, RestartStormConfig};
use monitor_lib::MonitorSettings;
use serde::Deserialize;
use std::time::Duration;

/// Process configuration, read from `MONITOR_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Cluster label used in logs and notification subjects
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// API server port for health/metrics/status
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    #[serde(default = "default_startup_delay")]
    pub startup_delay_secs: u64,

    #[serde(default = "default_grace_period")]
    pub grace_period_secs: u64,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,

    /// Quiet period before pending alerts are sent
    #[serde(default = "default_debounce")]
    pub debounce_secs: u64,

    #[serde(default = "default_max_pending")]
    pub max_pending_per_type: usize,

    #[serde(default = "default_true")]
    pub restart_storm_enabled: bool,

    #[serde(default = "default_restart_threshold")]
    pub restart_threshold: u32,

    #[serde(default = "default_restart_cooldown")]
    pub restart_cooldown_minutes: u32,

    /// `standard` or `enhanced`
    #[serde(default)]
    pub classifier: ClassifierMode,

    #[serde(default = "default_persistent_critical")]
    pub persistent_critical_minutes: u64,

    /// Group whose members receive notifications
    #[serde(default)]
    pub notification_group: Option<String>,

    /// Group table, `name=addr,addr;name=addr`
    #[serde(default)]
    pub groups: Option<String>,

    /// Endpoint receiving notifications as JSON
    #[serde(default)]
    pub webhook_url: Option<String>,

    #[serde(default)]
    pub flush_on_stop: bool,
}

fn default_cluster_name() -> String {
    std::env::var("CLUSTER_NAME").unwrap_or_else(|_| "default".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_scan_interval() -> u64 {
    120
}

fn default_startup_delay() -> u64 {
    5
}

fn default_grace_period() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_debounce() -> u64 {
    30
}

fn default_max_pending() -> usize {
    200
}

fn default_true() -> bool {
    true
}

fn default_restart_threshold() -> u32 {
    5
}

fn default_restart_cooldown() -> u32 {
    30
}

fn default_persistent_critical() -> u64 {
    10
}

impl MonitorConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("MONITOR").try_parsing(true))
            .build()?;
        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> Result<Self> {
        config
            .try_deserialize()
            .context("invalid MONITOR_* configuration")
    }

    /// Engine settings derived from this configuration
    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            cluster_name: self.cluster_name.clone(),
            scan_interval: Duration::from_secs(self.scan_interval_secs),
            startup_delay: Duration::from_secs(self.startup_delay_secs),
            grace_period: Duration::from_secs(self.grace_period_secs),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            debounce: Duration::from_secs(self.debounce_secs),
            max_pending_per_type: self.max_pending_per_type,
            restart_storm: RestartStormConfig {
                enabled: self.restart_storm_enabled,
                threshold: self.restart_threshold,
                cooldown_minutes: self.restart_cooldown_minutes,
            },
            classifier: self.classifier,
            persistent_critical_after: Duration::from_secs(self.persistent_critical_minutes * 60),
            notification_group: self.notification_group.clone(),
            flush_on_stop: self.flush_on_stop,
            ..Default::default()
        }
    }
}
