//! Error types for the monitor library

use thiserror::Error;

/// Failure of an external listing call.
///
/// A failed listing is never reported as an empty result, so callers can
/// tell "the call failed" apart from "nothing is running".
#[derive(Debug, Error)]
pub enum SourceError {
    /// The cluster could not be reached
    #[error("cluster unreachable: {0}")]
    Unreachable(String),

    /// Credentials were rejected
    #[error("cluster access denied: {0}")]
    Unauthorized(String),

    /// The listing call did not complete in time
    #[error("listing timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Anything else reported by the backing client
    #[error("listing failed: {0}")]
    Other(String),
}

/// Errors raised by the monitor engine
#[derive(Debug, Error)]
pub enum MonitorError {
    /// No snapshot source is configured
    #[error("cluster access not configured")]
    NotConfigured,

    /// Pod or node listing failed; prior state was kept
    #[error("fetch failed: {0}")]
    FetchFailed(#[from] SourceError),

    /// Another scan is still in flight
    #[error("a scan is already in progress")]
    ScanInProgress,

    /// Notification delivery failed; pending alerts were kept
    #[error("notification failed: {0}")]
    NotificationFailed(String),

    /// Rejected configuration value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fetch_failed_wraps_source_error() {
        let err: MonitorError = SourceError::Timeout(Duration::from_secs(30)).into();
        assert!(matches!(err, MonitorError::FetchFailed(SourceError::Timeout(_))));
        assert_eq!(err.to_string(), "fetch failed: listing timed out after 30s");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            MonitorError::NotConfigured.to_string(),
            "cluster access not configured"
        );
        assert_eq!(
            MonitorError::InvalidConfig("threshold must be 1-100".to_string()).to_string(),
            "invalid configuration: threshold must be 1-100"
        );
    }
}
