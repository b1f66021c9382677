//! Error accumulation for fetch and rebase attempts.
//!
//! Failures inside the rate pipeline are returned as values; the
//! [`ErrorLog`] keeps the human-readable detail so the host can surface it
//! after the fact.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ErrorKind;
use crate::time::{now, Timestamp};

/// A single recorded error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Error kind.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
    /// When the error was recorded.
    pub recorded_at: Timestamp,
}

impl ErrorRecord {
    /// Create a new record stamped with the current time.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            recorded_at: now(),
        }
    }
}

/// Append-only, ordered error sequence.
#[derive(Debug, Default)]
pub struct ErrorLog {
    records: Mutex<Vec<ErrorRecord>>,
}

impl ErrorLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an error.
    pub fn add_error(&self, kind: ErrorKind, message: impl Into<String>) {
        let record = ErrorRecord::new(kind, message);
        warn!(kind = %record.kind, message = %record.message, "Error recorded");
        self.records.lock().push(record);
    }

    /// Snapshot of all records in insertion order.
    pub fn errors(&self) -> Vec<ErrorRecord> {
        self.records.lock().clone()
    }

    /// Number of records of the given kind.
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.records.lock().iter().filter(|r| r.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Drop all records, e.g. before a new fetch attempt.
    pub fn clear(&self) {
        self.records.lock().clear();
    }
}
