//! Alert batching and delivery formatting
//!
//! Handles:
//! - Buffering transition events per type
//! - Sliding debounce of the flush deadline
//! - Rendering batches and restart storms into notifications

mod coalescer;
mod render;
mod timer;

pub use coalescer::{
    AlertCoalescer, BatchCounts, PendingAlertBatch, DEFAULT_DEBOUNCE, DEFAULT_MAX_PENDING_PER_TYPE,
};
pub use render::{DigestRenderer, PlainTextRenderer};
pub use timer::DebounceTimer;
