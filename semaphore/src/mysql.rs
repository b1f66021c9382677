//! MySQL named-lock service.
//!
//! `GET_LOCK` is scoped to the session that took it, so the pooled
//! connection that acquired a name is pinned until the matching release.
//! If the process dies the session ends and MySQL frees the lock.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::MySql;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{SemaphoreError, SemaphoreResult};
use crate::service::LockService;

/// Connections pinned to the lock names they hold.
struct Sessions<C> {
    pinned: HashMap<String, (Uuid, C)>,
}

impl<C> Sessions<C> {
    fn new() -> Self {
        Self {
            pinned: HashMap::new(),
        }
    }

    fn contains(&self, name: &str) -> bool {
        self.pinned.contains_key(name)
    }

    fn pin(&mut self, name: &str, owner: Uuid, conn: C) {
        self.pinned.insert(name.to_string(), (owner, conn));
    }

    /// Take the connection for `name` only if `owner` pinned it.
    fn unpin(&mut self, name: &str, owner: Uuid) -> Option<C> {
        match self.pinned.get(name) {
            Some((holder, _)) if *holder == owner => {
                self.pinned.remove(name).map(|(_, conn)| conn)
            }
            _ => None,
        }
    }

    fn len(&self) -> usize {
        self.pinned.len()
    }
}

/// Lock service backed by MySQL `IS_FREE_LOCK` / `GET_LOCK` / `RELEASE_LOCK`.
pub struct MySqlLockService {
    pool: MySqlPool,
    sessions: Mutex<Sessions<PoolConnection<MySql>>>,
}

impl MySqlLockService {
    /// Wrap an existing pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            sessions: Mutex::new(Sessions::new()),
        }
    }

    /// Connect a new pool to `url`.
    pub async fn connect(url: &str, max_connections: u32) -> SemaphoreResult<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Number of names currently held through this service.
    pub async fn held_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// MySQL lock functions return 1, 0 or NULL.
fn flag(name: &str, function: &str, value: Option<i64>) -> SemaphoreResult<bool> {
    match value {
        Some(1) => Ok(true),
        Some(0) => Ok(false),
        Some(other) => Err(SemaphoreError::Backend(format!(
            "{function}('{name}') returned {other}"
        ))),
        None => Err(SemaphoreError::Backend(format!(
            "{function}('{name}') returned NULL"
        ))),
    }
}

/// `GET_LOCK` timeout in whole seconds, rounded up so a sub-second wait
/// still waits.
fn lock_timeout(wait: Duration) -> i64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    i64::try_from(secs).unwrap_or(i64::MAX)
}

#[async_trait]
impl LockService for MySqlLockService {
    fn backend(&self) -> &str {
        "mysql"
    }

    async fn is_free(&self, name: &str) -> SemaphoreResult<bool> {
        let value: Option<i64> = sqlx::query_scalar("SELECT IS_FREE_LOCK(?)")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        flag(name, "IS_FREE_LOCK", value)
    }

    async fn try_acquire(
        &self,
        name: &str,
        owner: Uuid,
        wait: Duration,
    ) -> SemaphoreResult<bool> {
        if self.sessions.lock().await.contains(name) {
            // Re-entrant GET_LOCK on the same session would succeed; treat as busy.
            return Ok(false);
        }

        let mut conn = self.pool.acquire().await?;
        let value: Option<i64> = sqlx::query_scalar("SELECT GET_LOCK(?, ?)")
            .bind(name)
            .bind(lock_timeout(wait))
            .fetch_one(&mut *conn)
            .await?;

        let acquired = flag(name, "GET_LOCK", value)?;
        if acquired {
            debug!(lock_name = %name, owner = %owner, "Pinned session for named lock");
            self.sessions.lock().await.pin(name, owner, conn);
        }
        Ok(acquired)
    }

    async fn release(&self, name: &str, owner: Uuid) -> SemaphoreResult<bool> {
        let Some(mut conn) = self.sessions.lock().await.unpin(name, owner) else {
            warn!(lock_name = %name, owner = %owner, "Release requested for a lock this owner does not hold");
            return Ok(false);
        };

        let released: Result<Option<i64>, sqlx::Error> =
            sqlx::query_scalar("SELECT RELEASE_LOCK(?)")
                .bind(name)
                .fetch_one(&mut *conn)
                .await;

        match released {
            Ok(Some(1)) => Ok(true),
            // 0: held by another session, NULL: no such lock
            Ok(_) => Ok(false),
            Err(e) => {
                // The session must not go back to the pool still holding the
                // lock. Ending it makes the server drop its named locks.
                warn!(lock_name = %name, error = %e, "RELEASE_LOCK failed, closing session");
                match conn.close().await {
                    Ok(()) => Ok(true),
                    Err(_) => Err(e.into()),
                }
            }
        }
    }
}
