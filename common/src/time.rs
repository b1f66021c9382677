//! Time utilities and timing constants for the exchange-rate core.

use chrono::{DateTime, Utc};

/// Timing constants shared by the lock and rate crates.
pub mod constants {
    use std::time::Duration;

    /// Age after which a held in-memory lock is considered stuck (300 seconds).
    pub const STALE_LOCK_AFTER: Duration = Duration::from_secs(300);

    /// Default wait passed to `try_acquire`. Zero means non-blocking.
    pub const DEFAULT_LOCK_WAIT: Duration = Duration::ZERO;

    /// Poll interval for backends that emulate a bounded wait.
    pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(25);

    /// Timeout applied to a single rate provider request (10 seconds).
    pub const RATE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
}

/// A timestamp, always UTC.
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
pub fn now() -> Timestamp {
    Utc::now()
}

/// Formats a timestamp the way lock diagnostics print it (`2024-01-31 12:00:00`).
pub fn log_format(timestamp: Timestamp) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}
