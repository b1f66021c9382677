//! Process-local lock service.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fxswitch_common::constants;
use tracing::warn;
use uuid::Uuid;

use crate::error::SemaphoreResult;
use crate::service::LockService;

/// A held entry in the lock table.
#[derive(Debug, Clone, Copy)]
struct LockEntry {
    owner: Uuid,
    acquired_at: Instant,
}

/// Lock table kept in process memory.
///
/// Suitable for single-process hosts and tests. Entries older than the
/// stale-lock lease are considered free and are broken by the next acquire.
/// A broken entry changes owner, so the previous holder's late release is
/// refused.
pub struct InMemoryLockService {
    locks: DashMap<String, LockEntry>,
    stale_after: Option<Duration>,
    poll_interval: Duration,
}

impl InMemoryLockService {
    /// Create a lock table with the default stale-lock lease.
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
            stale_after: Some(constants::STALE_LOCK_AFTER),
            poll_interval: constants::LOCK_POLL_INTERVAL,
        }
    }

    /// Set the stale-lock lease. `None` keeps locks until released.
    pub fn with_stale_after(mut self, stale_after: Option<Duration>) -> Self {
        self.stale_after = stale_after;
        self
    }

    /// Set the poll interval used while waiting for a busy lock.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Number of entries currently in the table, stale ones included.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    fn is_stale(&self, entry: &LockEntry) -> bool {
        self.stale_after
            .is_some_and(|lease| entry.acquired_at.elapsed() >= lease)
    }

    fn try_take(&self, name: &str, owner: Uuid) -> bool {
        match self.locks.entry(name.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(LockEntry {
                    owner,
                    acquired_at: Instant::now(),
                });
                true
            }
            Entry::Occupied(mut occupied) => {
                if !self.is_stale(occupied.get()) {
                    return false;
                }
                let previous = *occupied.get();
                occupied.insert(LockEntry {
                    owner,
                    acquired_at: Instant::now(),
                });
                let held_for = previous.acquired_at.elapsed();
                warn!(
                    lock_name = %name,
                    previous_owner = %previous.owner,
                    held_for_ms = held_for.as_millis() as u64,
                    "Stale lock broken"
                );
                true
            }
        }
    }
}

impl Default for InMemoryLockService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LockService for InMemoryLockService {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn is_free(&self, name: &str) -> SemaphoreResult<bool> {
        Ok(self
            .locks
            .get(name)
            .map_or(true, |entry| self.is_stale(&entry)))
    }

    async fn try_acquire(
        &self,
        name: &str,
        owner: Uuid,
        wait: Duration,
    ) -> SemaphoreResult<bool> {
        let deadline = Instant::now() + wait;
        loop {
            if self.try_take(name, owner) {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn release(&self, name: &str, owner: Uuid) -> SemaphoreResult<bool> {
        Ok(self
            .locks
            .remove_if(name, |_, entry| entry.owner == owner)
            .is_some())
    }
}
