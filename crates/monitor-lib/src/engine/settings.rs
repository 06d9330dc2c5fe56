//! Engine configuration

use crate::alert::{DEFAULT_DEBOUNCE, DEFAULT_MAX_PENDING_PER_TYPE};
use crate::detect::{ClassifierMode, RestartStormConfig, DEFAULT_PERSISTENT_CRITICAL_MINUTES};
use crate::error::{MonitorError, Result};
use std::time::Duration;

/// Default scan cadence (2 minutes)
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Delay before the baseline scan so the snapshot source can warm up
pub const DEFAULT_STARTUP_DELAY: Duration = Duration::from_secs(5);

/// Window after the baseline during which no alerts are emitted
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(60);

/// Upper bound on a single listing call
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for a monitor instance
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Cluster label used in logs and notification subjects
    pub cluster_name: String,
    pub scan_interval: Duration,
    pub startup_delay: Duration,
    pub grace_period: Duration,
    pub fetch_timeout: Duration,
    /// Quiet period before a pending batch is flushed
    pub debounce: Duration,
    pub max_pending_per_type: usize,
    pub restart_storm: RestartStormConfig,
    pub classifier: ClassifierMode,
    /// Critical streak length reported by the enhanced classifier
    pub persistent_critical_after: Duration,
    /// Recipient group; `None` disables delivery but not scanning
    pub notification_group: Option<String>,
    /// Flush pending alerts on stop instead of discarding them
    pub flush_on_stop: bool,
    /// Consecutive failures before a component reports unhealthy
    pub unhealthy_after_failures: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            cluster_name: "default".to_string(),
            scan_interval: DEFAULT_SCAN_INTERVAL,
            startup_delay: DEFAULT_STARTUP_DELAY,
            grace_period: DEFAULT_GRACE_PERIOD,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            debounce: DEFAULT_DEBOUNCE,
            max_pending_per_type: DEFAULT_MAX_PENDING_PER_TYPE,
            restart_storm: RestartStormConfig::default(),
            classifier: ClassifierMode::Standard,
            persistent_critical_after: Duration::from_secs(
                DEFAULT_PERSISTENT_CRITICAL_MINUTES as u64 * 60,
            ),
            notification_group: None,
            flush_on_stop: false,
            unhealthy_after_failures: 3,
        }
    }
}

impl MonitorSettings {
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "scan interval must be positive".to_string(),
            ));
        }
        if self.fetch_timeout.is_zero() {
            return Err(MonitorError::InvalidConfig(
                "fetch timeout must be positive".to_string(),
            ));
        }
        if self.max_pending_per_type == 0 {
            return Err(MonitorError::InvalidConfig(
                "max pending alerts per type must be at least 1".to_string(),
            ));
        }
        self.restart_storm.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = MonitorSettings::default();
        assert_eq!(settings.scan_interval, Duration::from_secs(120));
        assert_eq!(settings.grace_period, Duration::from_secs(60));
        assert_eq!(settings.debounce, Duration::from_secs(30));
        assert!(!settings.flush_on_stop);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let settings = MonitorSettings {
            scan_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(settings.validate().is_err());

        let settings = MonitorSettings {
            restart_storm: RestartStormConfig {
                threshold: 500,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(settings.validate().is_err());
    }
}
