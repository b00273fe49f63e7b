//! Snapshot command implementation

use crate::config::{Config, Secrets};
use crate::report::{format_report, Markup};
use clap::Args;

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Print Telegram HTML instead of plain text
    #[arg(long)]
    pub html: bool,
}

impl SnapshotArgs {
    pub async fn execute(&self, config: Config, secrets: Secrets) -> anyhow::Result<()> {
        let pipeline = super::build_pipeline(&config, secrets.exchange_rate_api_key)?;
        tracing::info!(tasks = pipeline.task_count(), "Fetching snapshot");

        let snapshot = pipeline.fetch_snapshot().await;
        let markup = if self.html { Markup::Html } else { Markup::Plain };
        println!("{}", format_report(&snapshot, markup));
        Ok(())
    }
}
