//! Named semaphore guarding single-flight operations.

use std::sync::Arc;
use std::time::Duration;

use fxswitch_common::{constants, log_format, now};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{SemaphoreError, SemaphoreResult};
use crate::service::LockService;

/// A named lock whose exclusion state lives in a [`LockService`].
///
/// `acquire` is attempted once and never retries; the caller decides whether
/// to skip, defer or fail the protected operation. `release` is idempotent,
/// and returns false when the lock was taken over by another holder.
pub struct Semaphore {
    /// Lock name shared by every contender.
    name: String,
    /// Instance ID. Also the owner token presented to the lock service.
    id: Uuid,
    /// Whether this instance holds the lock.
    held: bool,
    /// How long `try_acquire` may wait.
    wait: Duration,
    service: Arc<dyn LockService>,
}

impl Semaphore {
    /// Create a semaphore. Fails on an empty name.
    pub fn new(name: impl Into<String>, service: Arc<dyn LockService>) -> SemaphoreResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SemaphoreError::InvalidLockName);
        }

        Ok(Self {
            name,
            id: Uuid::new_v4(),
            held: false,
            wait: constants::DEFAULT_LOCK_WAIT,
            service,
        })
    }

    /// Allow `try_acquire` to wait up to `wait` for a busy lock. A non-zero
    /// wait skips the `is_free` pre-check.
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this instance currently holds the lock.
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Try to take the lock. Returns false when busy or on backend failure.
    pub async fn acquire(&mut self) -> bool {
        if self.held {
            return true;
        }

        match self.try_acquire().await {
            Ok(true) => {
                self.held = true;
                info!(
                    lock_name = %self.name,
                    semaphore_id = %self.id,
                    backend = self.service.backend(),
                    "Semaphore lock obtained at {}",
                    log_format(now())
                );
                true
            }
            Ok(false) => {
                warn!(
                    lock_name = %self.name,
                    semaphore_id = %self.id,
                    backend = self.service.backend(),
                    "Semaphore lock failed: lock is busy"
                );
                false
            }
            Err(e) => {
                warn!(
                    lock_name = %self.name,
                    semaphore_id = %self.id,
                    backend = self.service.backend(),
                    error = %e,
                    "Semaphore lock failed"
                );
                false
            }
        }
    }

    async fn try_acquire(&self) -> SemaphoreResult<bool> {
        // With a wait configured, a busy lock may still free up in time.
        if self.wait.is_zero() && !self.service.is_free(&self.name).await? {
            return Ok(false);
        }
        self.service.try_acquire(&self.name, self.id, self.wait).await
    }

    /// Release the lock. A semaphore that never acquired succeeds without
    /// touching the service.
    ///
    /// Returns false if the service no longer records this instance as the
    /// holder; the lock is then considered lost and `is_held` turns false.
    /// On a backend error the lock stays held so the release can be retried.
    pub async fn release(&mut self) -> bool {
        if !self.held {
            return true;
        }

        match self.service.release(&self.name, self.id).await {
            Ok(true) => {
                self.held = false;
                info!(
                    lock_name = %self.name,
                    semaphore_id = %self.id,
                    "Semaphore unlocked"
                );
                true
            }
            Ok(false) => {
                self.held = false;
                warn!(
                    lock_name = %self.name,
                    semaphore_id = %self.id,
                    "Semaphore lock lost before release"
                );
                false
            }
            Err(e) => {
                warn!(
                    lock_name = %self.name,
                    semaphore_id = %self.id,
                    error = %e,
                    "Semaphore release failed"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Semaphore")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("held", &self.held)
            .field("wait", &self.wait)
            .field("backend", &self.service.backend())
            .finish()
    }
}
