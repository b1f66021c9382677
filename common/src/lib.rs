//! fxswitch Common Types
//!
//! Shared types used by the lock and exchange-rate crates: currency codes,
//! the closed set of error kinds, the error accumulator and timing constants.

pub mod currency;
pub mod diagnostics;
pub mod error;
pub mod time;

pub use currency::*;
pub use diagnostics::*;
pub use error::*;
pub use time::*;
