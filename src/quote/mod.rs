//! Quote model
//!
//! Currency pairs, per-source quotes and the fetch failure taxonomy

mod types;

pub use types::{CurrencyPair, FetchError, Quote, TradeSide};
