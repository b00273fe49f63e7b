//! CLI interface for p2p-rates
//!
//! Provides subcommands for:
//! - `run`: Start the bot and the periodic delivery loop
//! - `snapshot`: Fetch once and print the report
//! - `config`: Show the effective configuration

mod run;
mod snapshot;

pub use run::RunArgs;
pub use snapshot::SnapshotArgs;

use crate::config::Config;
use crate::fetch::{FetchOrchestrator, OrchestratorConfig};
use crate::pipeline::{RatePipeline, SourceRegistry};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "p2p-rates")]
#[command(about = "P2P and fiat exchange-rate aggregator with Telegram delivery")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the bot and the refresh loop
    Run(RunArgs),
    /// Fetch rates once and print the report
    Snapshot(SnapshotArgs),
    /// Show configuration
    Config,
}

/// Build the rate pipeline with every built-in source
pub(crate) fn build_pipeline(config: &Config, api_key: Option<String>) -> anyhow::Result<RatePipeline> {
    let registry = SourceRegistry::from_config(&config.sources, api_key)?;
    let orchestrator = FetchOrchestrator::new(OrchestratorConfig {
        timeout: config.sources.fetch_timeout(),
        blocking_workers: config.sources.blocking_workers,
    });
    RatePipeline::new(orchestrator, &registry, &config.report, &config.synthesis)
}

/// Human-readable configuration summary
pub fn config_summary(config: &Config) -> String {
    let currencies: Vec<String> = config
        .synthesis
        .currencies
        .iter()
        .map(|c| format!("{} ({})", c.fiat, c.source))
        .collect();
    let fiat_pairs: Vec<String> = config.report.fiat_pairs.iter().map(|p| p.to_string()).collect();
    let p2p_rows: Vec<String> = config
        .report
        .p2p
        .iter()
        .map(|row| format!("{} {}", row.source, row.pair))
        .collect();

    let percent = |v: rust_decimal::Decimal| (v * rust_decimal_macros::dec!(100)).normalize();

    let mut lines = vec!["Current configuration:".to_string()];
    lines.push(format!("  Fiat pairs: {}", fiat_pairs.join(", ")));
    lines.push(format!("  P2P rows: {}", p2p_rows.join(", ")));
    lines.push(format!(
        "  Cross-rates: {} -> {} via {} ({})",
        currencies.join(", "),
        config.synthesis.target,
        config.synthesis.bridge,
        config.synthesis.target_source
    ));
    lines.push(format!(
        "  Markup: +{}% / -{}%, reference ±{}%",
        percent(config.synthesis.markup),
        percent(config.synthesis.markdown),
        percent(config.synthesis.reference_markup)
    ));
    lines.push(format!(
        "  Delivery: {:?}, every {}s (retry from {}s up to {}s)",
        config.delivery.mode,
        config.delivery.refresh_interval_secs,
        config.delivery.fallback_interval_secs,
        config.delivery.max_backoff_secs
    ));
    lines.push(format!(
        "  Sources: timeout {}s, {} rendering workers, {} offers",
        config.sources.fetch_timeout_secs, config.sources.blocking_workers, config.sources.max_offers
    ));
    lines.join("\n")
}
