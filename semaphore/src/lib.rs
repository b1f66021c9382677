//! fxswitch Semaphore
//!
//! Named, process-external mutual exclusion for single-flight background
//! jobs such as exchange-rate refresh.
//!
//! A [`Semaphore`] only remembers whether it acquired; the exclusion itself
//! lives in a [`LockService`] shared by every contending process.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use fxswitch_semaphore::{InMemoryLockService, Semaphore};
//!
//! let service = Arc::new(InMemoryLockService::new());
//! let mut lock = Semaphore::new("exchange_rates_refresh", service)?;
//! if lock.acquire().await {
//!     // protected work
//!     lock.release().await;
//! }
//! ```

pub mod config;
pub mod error;
pub mod memory;
pub mod mysql;
pub mod semaphore;
pub mod service;

pub use config::{LockBackend, SemaphoreConfig};
pub use error::{SemaphoreError, SemaphoreResult};
pub use memory::InMemoryLockService;
pub use mysql::MySqlLockService;
pub use semaphore::Semaphore;
pub use service::LockService;
