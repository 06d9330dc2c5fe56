//! Alert coalescing with a sliding debounce window
//!
//! Events are buffered per type. Every new event pushes the flush deadline
//! out to `now + debounce`, so a burst of events produces one notification
//! once the cluster has been quiet for the debounce period.

use crate::models::{AlertEvent, AlertEventType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default quiet period before a batch is flushed (30 seconds)
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(30);

/// Default cap on buffered events per type
pub const DEFAULT_MAX_PENDING_PER_TYPE: usize = 200;

/// Number of buffered events per type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCounts {
    pub failed: usize,
    pub degraded: usize,
    pub recovered: usize,
    pub stopped: usize,
    pub started: usize,
}

impl BatchCounts {
    pub fn get(&self, event_type: AlertEventType) -> usize {
        match event_type {
            AlertEventType::Failed => self.failed,
            AlertEventType::Degraded => self.degraded,
            AlertEventType::Recovered => self.recovered,
            AlertEventType::Stopped => self.stopped,
            AlertEventType::Started => self.started,
        }
    }

    pub fn total(&self) -> usize {
        self.failed + self.degraded + self.recovered + self.stopped + self.started
    }

    pub fn from_events(events: &[AlertEvent]) -> Self {
        let mut counts = Self::default();
        for event in events {
            match event.event_type {
                AlertEventType::Failed => counts.failed += 1,
                AlertEventType::Degraded => counts.degraded += 1,
                AlertEventType::Recovered => counts.recovered += 1,
                AlertEventType::Stopped => counts.stopped += 1,
                AlertEventType::Started => counts.started += 1,
            }
        }
        counts
    }
}

/// Buffered events awaiting delivery
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingAlertBatch {
    pub failed: Vec<AlertEvent>,
    pub degraded: Vec<AlertEvent>,
    pub recovered: Vec<AlertEvent>,
    pub stopped: Vec<AlertEvent>,
    pub started: Vec<AlertEvent>,
    pub flush_deadline: Option<DateTime<Utc>>,
}

impl PendingAlertBatch {
    pub fn events(&self, event_type: AlertEventType) -> &[AlertEvent] {
        match event_type {
            AlertEventType::Failed => &self.failed,
            AlertEventType::Degraded => &self.degraded,
            AlertEventType::Recovered => &self.recovered,
            AlertEventType::Stopped => &self.stopped,
            AlertEventType::Started => &self.started,
        }
    }

    fn events_mut(&mut self, event_type: AlertEventType) -> &mut Vec<AlertEvent> {
        match event_type {
            AlertEventType::Failed => &mut self.failed,
            AlertEventType::Degraded => &mut self.degraded,
            AlertEventType::Recovered => &mut self.recovered,
            AlertEventType::Stopped => &mut self.stopped,
            AlertEventType::Started => &mut self.started,
        }
    }

    pub fn counts(&self) -> BatchCounts {
        BatchCounts {
            failed: self.failed.len(),
            degraded: self.degraded.len(),
            recovered: self.recovered.len(),
            stopped: self.stopped.len(),
            started: self.started.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.counts().total()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-type alert buffer with a sliding flush deadline
#[derive(Debug)]
pub struct AlertCoalescer {
    batch: PendingAlertBatch,
    debounce: Duration,
    max_pending_per_type: usize,
    evicted: u64,
}

impl Default for AlertCoalescer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE, DEFAULT_MAX_PENDING_PER_TYPE)
    }
}

impl AlertCoalescer {
    pub fn new(debounce: Duration, max_pending_per_type: usize) -> Self {
        Self {
            batch: PendingAlertBatch::default(),
            debounce,
            max_pending_per_type: max_pending_per_type.max(1),
            evicted: 0,
        }
    }

    /// Buffer an event and slide the deadline; returns the new deadline
    pub fn add(&mut self, event: AlertEvent, now: DateTime<Utc>) -> DateTime<Utc> {
        let event_type = event.event_type;
        let cap = self.max_pending_per_type;
        let list = self.batch.events_mut(event_type);
        list.push(event);

        if list.len() > cap {
            let excess = list.len() - cap;
            list.drain(..excess);
            self.evicted += excess as u64;
            warn!(
                event_type = %event_type,
                evicted = excess,
                cap = cap,
                "Pending alert buffer full, dropped oldest events"
            );
        }

        let deadline = now
            + chrono::Duration::from_std(self.debounce).unwrap_or_else(|_| chrono::Duration::seconds(30));
        self.batch.flush_deadline = Some(deadline);
        debug!(event_type = %event_type, deadline = %deadline, "Alert buffered");
        deadline
    }

    /// Copy of the pending batch for rendering
    pub fn snapshot(&self) -> PendingAlertBatch {
        self.batch.clone()
    }

    pub fn counts(&self) -> BatchCounts {
        self.batch.counts()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.batch.flush_deadline
    }

    /// Remove the delivered prefix of each list.
    ///
    /// Events buffered after the snapshot was taken stay pending.
    pub fn acknowledge(&mut self, delivered: &BatchCounts) {
        for event_type in AlertEventType::ALL {
            let list = self.batch.events_mut(event_type);
            let n = delivered.get(event_type).min(list.len());
            list.drain(..n);
        }
        if self.batch.is_empty() {
            self.batch.flush_deadline = None;
        }
    }

    /// Drop everything; returns how many events were discarded
    pub fn clear(&mut self) -> usize {
        let discarded = self.batch.len();
        self.batch = PendingAlertBatch::default();
        discarded
    }

    /// Total events dropped because a list hit its cap
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}
