//! Rate fetch orchestration
//!
//! Fans a batch of (source, pair) tasks out concurrently and collects exactly
//! one quote per task.

mod orchestrator;

pub use orchestrator::{FetchOrchestrator, OrchestratorConfig};

use crate::quote::CurrencyPair;
use crate::source::Adapter;

/// One source queried for one pair
#[derive(Debug, Clone)]
pub struct FetchTask {
    pub adapter: Adapter,
    pub pair: CurrencyPair,
}

impl FetchTask {
    pub fn new(adapter: Adapter, pair: CurrencyPair) -> Self {
        Self { adapter, pair }
    }
}
