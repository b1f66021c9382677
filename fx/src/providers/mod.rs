//! Concrete rate providers.

mod http;
pub mod open_exchange;
pub mod yahoo;

pub use open_exchange::OpenExchangeRatesProvider;
pub use yahoo::YahooFinanceProvider;
