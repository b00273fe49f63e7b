//! Rate synthesis engine
//!
//! Derives fiat-to-fiat cross-rates from two bridge-asset P2P quotes and
//! applies markup/markdown, with an optional independent reference rate.

mod engine;
mod types;

pub use engine::{calculate_cross_rate, reference_rate, synthesize};
pub use types::{CrossRateResult, DirectionalRate, RateCalculation, ReferenceRate, SynthesisConfig};

pub(crate) use engine::round_dp;
