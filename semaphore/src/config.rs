//! Lock configuration.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use fxswitch_common::constants;

use crate::error::{SemaphoreError, SemaphoreResult};
use crate::memory::InMemoryLockService;
use crate::mysql::MySqlLockService;
use crate::service::LockService;

/// Which lock service backs the semaphores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockBackend {
    /// Process-local lock table. Only excludes within one process.
    Memory,
    /// MySQL named locks shared by every process using the same server.
    MySql,
}

impl FromStr for LockBackend {
    type Err = SemaphoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(LockBackend::Memory),
            "mysql" => Ok(LockBackend::MySql),
            other => Err(SemaphoreError::Configuration(format!(
                "Unknown lock backend: {other}"
            ))),
        }
    }
}

/// Semaphore configuration.
#[derive(Debug, Clone)]
pub struct SemaphoreConfig {
    /// Lock backend.
    pub backend: LockBackend,
    /// Database URL, required for the MySQL backend.
    pub database_url: Option<String>,
    /// Maximum pooled connections for the MySQL backend.
    pub max_connections: u32,
    /// Age after which an in-memory lock is treated as stuck and broken.
    pub stale_after: Option<Duration>,
    /// Wait passed to `try_acquire`.
    pub acquire_wait: Duration,
    /// Poll interval used when the in-memory backend emulates a wait.
    pub poll_interval: Duration,
}

impl Default for SemaphoreConfig {
    fn default() -> Self {
        Self {
            backend: LockBackend::Memory,
            database_url: None,
            max_connections: 5,
            stale_after: Some(constants::STALE_LOCK_AFTER),
            acquire_wait: constants::DEFAULT_LOCK_WAIT,
            poll_interval: constants::LOCK_POLL_INTERVAL,
        }
    }
}

impl SemaphoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> SemaphoreResult<Self> {
        let mut config = Self::default();

        if let Ok(backend) = std::env::var("LOCK_BACKEND") {
            config.backend = backend.parse()?;
        }

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = Some(url);
        }

        if let Ok(secs) = std::env::var("LOCK_STALE_AFTER_SECS") {
            if let Ok(secs) = secs.parse::<u64>() {
                config.stale_after = (secs > 0).then(|| Duration::from_secs(secs));
            }
        }

        if let Ok(secs) = std::env::var("LOCK_WAIT_SECS") {
            if let Ok(secs) = secs.parse() {
                config.acquire_wait = Duration::from_secs(secs);
            }
        }

        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.backend == LockBackend::MySql
            && self.database_url.as_deref().map_or(true, str::is_empty)
        {
            return Err("Database URL is required for the MySQL lock backend".to_string());
        }

        if self.max_connections == 0 {
            return Err("Max connections cannot be 0".to_string());
        }

        if self.poll_interval.is_zero() {
            return Err("Poll interval cannot be 0".to_string());
        }

        Ok(())
    }

    /// Build the configured lock service.
    pub async fn connect(&self) -> SemaphoreResult<Arc<dyn LockService>> {
        self.validate().map_err(SemaphoreError::Configuration)?;

        match self.backend {
            LockBackend::Memory => Ok(Arc::new(
                InMemoryLockService::new()
                    .with_stale_after(self.stale_after)
                    .with_poll_interval(self.poll_interval),
            )),
            LockBackend::MySql => {
                let url = self.database_url.as_deref().unwrap_or_default();
                let service = MySqlLockService::connect(url, self.max_connections).await?;
                Ok(Arc::new(service))
            }
        }
    }
}
