//! Restart storm detection
//!
//! Watches per-pod restart counters and alerts when a pod exceeds the
//! configured threshold, at most once per cooldown window.

use crate::error::{MonitorError, Result};
use crate::models::PodRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Entries for pods not seen for this long are dropped
const ENTRY_RETENTION_HOURS: i64 = 24;

/// Runtime-tunable restart storm settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartStormConfig {
    pub enabled: bool,
    /// Restart count above which a pod alerts (1-100)
    pub threshold: u32,
    /// Minimum minutes between alerts for one pod (1-1440)
    pub cooldown_minutes: u32,
}

impl Default for RestartStormConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 5,
            cooldown_minutes: 30,
        }
    }
}

impl RestartStormConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.threshold) {
            return Err(MonitorError::InvalidConfig(format!(
                "restart threshold must be between 1 and 100, got {}",
                self.threshold
            )));
        }
        if !(1..=1440).contains(&self.cooldown_minutes) {
            return Err(MonitorError::InvalidConfig(format!(
                "restart cooldown must be between 1 and 1440 minutes, got {}",
                self.cooldown_minutes
            )));
        }
        Ok(())
    }
}

/// Tracked restart history of one pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartTrackEntry {
    pub restart_count: u32,
    pub last_seen: DateTime<Utc>,
    pub last_alert_time: Option<DateTime<Utc>>,
}

/// Restart storm alert for a single pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartStormAlert {
    pub namespace: String,
    pub pod_name: String,
    pub node: Option<String>,
    pub restart_count: u32,
    pub previous_restart_count: Option<u32>,
    pub threshold: u32,
    pub detected_at: DateTime<Utc>,
}

/// Per-pod restart counter tracker
#[derive(Debug, Default)]
pub struct RestartStormTracker {
    config: RestartStormConfig,
    entries: HashMap<(String, String), RestartTrackEntry>,
}

impl RestartStormTracker {
    pub fn new(config: RestartStormConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
        }
    }

    pub fn config(&self) -> RestartStormConfig {
        self.config
    }

    /// Replace the configuration; applies from the next observation
    pub fn configure(&mut self, config: RestartStormConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Record a pod observation, returning an alert if it is storming
    pub fn observe(&mut self, pod: &PodRecord, now: DateTime<Utc>) -> Option<RestartStormAlert> {
        let key = (pod.namespace.clone(), pod.name.clone());
        let config = self.config;
        let previous = self.entries.get(&key).map(|e| e.restart_count);
        let entry = self.entries.entry(key).or_insert(RestartTrackEntry {
            restart_count: pod.restart_count,
            last_seen: now,
            last_alert_time: None,
        });

        entry.restart_count = pod.restart_count;
        entry.last_seen = now;

        if !config.enabled || pod.restart_count <= config.threshold {
            return None;
        }

        let cooled_down = entry.last_alert_time.map_or(true, |last| {
            now - last > Duration::minutes(i64::from(config.cooldown_minutes))
        });
        if !cooled_down {
            return None;
        }

        entry.last_alert_time = Some(now);

        Some(RestartStormAlert {
            namespace: pod.namespace.clone(),
            pod_name: pod.name.clone(),
            node: pod.node.clone(),
            restart_count: pod.restart_count,
            previous_restart_count: previous,
            threshold: config.threshold,
            detected_at: now,
        })
    }

    /// Drop entries for pods that have not been seen recently
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let cutoff = now - Duration::hours(ENTRY_RETENTION_HOURS);
        self.entries.retain(|_, e| e.last_seen >= cutoff);
        before - self.entries.len()
    }

    pub fn entry(&self, namespace: &str, pod_name: &str) -> Option<&RestartTrackEntry> {
        self.entries
            .get(&(namespace.to_string(), pod_name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PodPhase;

    fn pod(restarts: u32) -> PodRecord {
        PodRecord {
            name: "worker-7".to_string(),
            namespace: "jobs".to_string(),
            phase: PodPhase::Running,
            ready_containers: 1,
            total_containers: 1,
            restart_count: restarts,
            node: Some("node-3".to_string()),
            created_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_restart_storm_scenario() {
        let mut tracker = RestartStormTracker::new(RestartStormConfig {
            enabled: true,
            threshold: 5,
            cooldown_minutes: 10,
        });
        let t0 = Utc::now();

        assert!(tracker.observe(&pod(2), t0).is_none());

        let alert = tracker.observe(&pod(6), t0 + Duration::minutes(2)).unwrap();
        assert_eq!(alert.restart_count, 6);
        assert_eq!(alert.previous_restart_count, Some(2));
        assert_eq!(alert.threshold, 5);

        // Within cooldown
        assert!(tracker.observe(&pod(9), t0 + Duration::minutes(3)).is_none());
        assert_eq!(tracker.entry("jobs", "worker-7").unwrap().restart_count, 9);

        // 12 minutes after the first alert
        let alert = tracker.observe(&pod(12), t0 + Duration::minutes(14)).unwrap();
        assert_eq!(alert.restart_count, 12);
        assert_eq!(alert.previous_restart_count, Some(9));
    }

    #[test]
    fn test_below_threshold_never_alerts() {
        let mut tracker = RestartStormTracker::new(RestartStormConfig::default());
        let t0 = Utc::now();
        for i in 0..=5 {
            assert!(tracker.observe(&pod(i), t0 + Duration::minutes(i64::from(i))).is_none());
        }
    }

    #[test]
    fn test_first_sighting_over_threshold_alerts() {
        let mut tracker = RestartStormTracker::new(RestartStormConfig::default());
        let alert = tracker.observe(&pod(40), Utc::now()).unwrap();
        assert_eq!(alert.previous_restart_count, None);
    }

    #[test]
    fn test_stable_high_count_realerts_after_cooldown() {
        let mut tracker = RestartStormTracker::new(RestartStormConfig {
            enabled: true,
            threshold: 5,
            cooldown_minutes: 10,
        });
        let t0 = Utc::now();
        assert!(tracker.observe(&pod(8), t0).is_some());
        assert!(tracker.observe(&pod(8), t0 + Duration::minutes(5)).is_none());

        let alert = tracker.observe(&pod(8), t0 + Duration::minutes(11)).unwrap();
        assert_eq!(alert.restart_count, 8);
        assert_eq!(alert.previous_restart_count, Some(8));
    }

    #[test]
    fn test_recreated_pod_alerts_again() {
        let mut tracker = RestartStormTracker::new(RestartStormConfig {
            enabled: true,
            threshold: 5,
            cooldown_minutes: 10,
        });
        let t0 = Utc::now();
        assert!(tracker.observe(&pod(50), t0).is_some());

        // Same name, fresh counter
        assert!(tracker.observe(&pod(0), t0 + Duration::minutes(20)).is_none());
        assert_eq!(tracker.entry("jobs", "worker-7").unwrap().restart_count, 0);

        let alert = tracker.observe(&pod(12), t0 + Duration::minutes(40)).unwrap();
        assert_eq!(alert.restart_count, 12);
        assert_eq!(alert.previous_restart_count, Some(0));
    }

    #[test]
    fn test_disabled_still_tracks() {
        let mut tracker = RestartStormTracker::new(RestartStormConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(tracker.observe(&pod(50), Utc::now()).is_none());
        assert_eq!(tracker.entry("jobs", "worker-7").unwrap().restart_count, 50);
    }

    #[test]
    fn test_configure_applies_immediately() {
        let mut tracker = RestartStormTracker::new(RestartStormConfig::default());
        let t0 = Utc::now();
        assert!(tracker.observe(&pod(3), t0).is_none());

        tracker
            .configure(RestartStormConfig {
                enabled: true,
                threshold: 2,
                cooldown_minutes: 5,
            })
            .unwrap();
        assert!(tracker.observe(&pod(3), t0 + Duration::minutes(1)).is_some());
    }

    #[test]
    fn test_configure_rejects_out_of_range() {
        let mut tracker = RestartStormTracker::new(RestartStormConfig::default());
        let bad_threshold = RestartStormConfig {
            threshold: 0,
            ..Default::default()
        };
        assert!(tracker.configure(bad_threshold).is_err());

        let bad_cooldown = RestartStormConfig {
            cooldown_minutes: 1441,
            ..Default::default()
        };
        assert!(tracker.configure(bad_cooldown).is_err());
        assert_eq!(tracker.config(), RestartStormConfig::default());
    }

    #[test]
    fn test_prune_old_entries() {
        let mut tracker = RestartStormTracker::new(RestartStormConfig::default());
        let t0 = Utc::now();
        tracker.observe(&pod(1), t0);
        assert_eq!(tracker.prune(t0 + Duration::hours(1)), 0);
        assert_eq!(tracker.prune(t0 + Duration::hours(25)), 1);
        assert!(tracker.is_empty());
    }
}
