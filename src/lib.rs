//! p2p-rates: P2P and fiat exchange-rate aggregator
//!
//! This library provides the core components for:
//! - Quote sources: Binance P2P API, fiat rate APIs, rendered marketplace pages
//! - Concurrent fetch fan-out with a bounded blocking worker pool
//! - Cross-rate synthesis through a bridge asset with markup and markdown
//! - Report formatting for chat delivery
//! - Subscriber management and the periodic Telegram delivery loop
//! - Logging and metrics

pub mod cli;
pub mod config;
pub mod delivery;
pub mod fetch;
pub mod pipeline;
pub mod quote;
pub mod report;
pub mod source;
pub mod synthesis;
pub mod telemetry;
