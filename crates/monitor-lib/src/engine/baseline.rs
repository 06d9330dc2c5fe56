//! Baseline capture and grace period tracking
//!
//! The first scan is stored as a non-alerting baseline. A grace timer then
//! runs; until it fires, scans only refresh state. Each capture bumps an
//! epoch so a grace timer left over from an earlier capture cannot end the
//! grace period of a newer one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where the monitor is in its startup sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum BaselinePhase {
    /// No baseline yet; the next successful scan captures one
    AwaitingBaseline,
    /// Baseline captured, alerts suppressed until the grace timer fires
    Grace {
        captured_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    },
    /// Normal classification
    Complete { since: DateTime<Utc> },
}

#[derive(Debug)]
pub struct BaselineManager {
    phase: BaselinePhase,
    grace_period: Duration,
    epoch: u64,
}

impl BaselineManager {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            phase: BaselinePhase::AwaitingBaseline,
            grace_period,
            epoch: 0,
        }
    }

    pub fn phase(&self) -> BaselinePhase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn in_grace(&self) -> bool {
        matches!(self.phase, BaselinePhase::Grace { .. })
    }

    /// The global flag gating every alert event
    pub fn is_initialization_complete(&self) -> bool {
        matches!(self.phase, BaselinePhase::Complete { .. })
    }

    /// Enter the grace period; returns the epoch the grace timer must present
    pub fn capture(&mut self, now: DateTime<Utc>) -> u64 {
        self.epoch += 1;
        let grace = chrono::Duration::from_std(self.grace_period)
            .unwrap_or_else(|_| chrono::Duration::seconds(60));
        self.phase = BaselinePhase::Grace {
            captured_at: now,
            ends_at: now + grace,
        };
        self.epoch
    }

    /// End the grace period if `epoch` matches the current capture
    pub fn complete(&mut self, epoch: u64, now: DateTime<Utc>) -> bool {
        if epoch != self.epoch || !self.in_grace() {
            return false;
        }
        self.phase = BaselinePhase::Complete { since: now };
        true
    }

    /// Drop the current baseline; the next scan captures a new one
    pub fn request_recapture(&mut self) {
        self.phase = BaselinePhase::AwaitingBaseline;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut baseline = BaselineManager::new(Duration::from_secs(60));
        assert_eq!(baseline.phase(), BaselinePhase::AwaitingBaseline);
        assert!(!baseline.is_initialization_complete());

        let now = Utc::now();
        let epoch = baseline.capture(now);
        assert!(baseline.in_grace());
        match baseline.phase() {
            BaselinePhase::Grace { ends_at, .. } => {
                assert_eq!(ends_at, now + chrono::Duration::seconds(60))
            }
            other => panic!("unexpected phase {:?}", other),
        }

        assert!(baseline.complete(epoch, now));
        assert!(baseline.is_initialization_complete());
        // Completing twice is a no-op
        assert!(!baseline.complete(epoch, now));
    }

    #[test]
    fn test_stale_grace_timer_is_ignored() {
        let mut baseline = BaselineManager::new(Duration::from_secs(60));
        let first = baseline.capture(Utc::now());
        baseline.request_recapture();
        let second = baseline.capture(Utc::now());

        assert!(!baseline.complete(first, Utc::now()));
        assert!(baseline.in_grace());
        assert!(baseline.complete(second, Utc::now()));
    }

    #[test]
    fn test_complete_requires_grace() {
        let mut baseline = BaselineManager::new(Duration::from_secs(60));
        assert!(!baseline.complete(0, Utc::now()));
        assert_eq!(baseline.phase(), BaselinePhase::AwaitingBaseline);
    }
}
