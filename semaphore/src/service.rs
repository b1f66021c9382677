//! The external lock service boundary.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::SemaphoreResult;

/// A keyed lock table shared by every process that coordinates through it.
///
/// Each operation must be atomic on the service side. The semaphore never
/// holds exclusion state of its own; it only remembers whether *it* acquired.
/// Every held name records the `owner` that took it, and only that owner
/// may release it.
#[async_trait]
pub trait LockService: Send + Sync {
    /// Backend label used in log lines.
    fn backend(&self) -> &str;

    /// Non-mutating check whether `name` is currently free.
    async fn is_free(&self, name: &str) -> SemaphoreResult<bool>;

    /// Try to take `name` for `owner`, waiting at most `wait`. A zero wait
    /// must not block.
    async fn try_acquire(&self, name: &str, owner: Uuid, wait: Duration)
        -> SemaphoreResult<bool>;

    /// Release `name` if `owner` still holds it. Returns false when the name
    /// is free or held by someone else, in which case nothing changes.
    async fn release(&self, name: &str, owner: Uuid) -> SemaphoreResult<bool>;
}
