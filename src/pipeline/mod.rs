//! Rate pipeline
//!
//! Turns the report and synthesis configuration into one deduplicated fetch
//! fan-out, and each run into a [`RateSnapshot`] shared by every subscriber.

mod registry;
mod runner;
mod types;

pub use registry::{SourceKey, SourceRegistry};
pub use runner::RatePipeline;
pub use types::{CrossRateEntry, RateSnapshot};
