//! Run command implementation

use crate::config::{Config, Secrets};
use crate::delivery::{BotPoller, DeliveryService, JsonFileStore, SubscriberRegistry, TelegramTransport};
use clap::Args;
use frankenstein::AsyncApi;
use std::sync::Arc;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Skip registering the bot command menu
    #[arg(long)]
    pub no_menu: bool,
}

impl RunArgs {
    pub async fn execute(&self, config: Config, secrets: Secrets) -> anyhow::Result<()> {
        let token = secrets.require_bot_token()?;
        let api = AsyncApi::new(token);

        let pipeline = Arc::new(super::build_pipeline(&config, secrets.exchange_rate_api_key.clone())?);
        let store = Arc::new(JsonFileStore::new(&config.delivery.subscribers_file));
        let service = Arc::new(DeliveryService::new(
            pipeline,
            Arc::new(TelegramTransport::new(api.clone())),
            SubscriberRegistry::load(store),
            &config.delivery,
        ));

        let poller = BotPoller::new(api, Arc::clone(&service), config.delivery.poll_timeout_secs);
        if !self.no_menu {
            if let Err(e) = poller.register_commands().await {
                tracing::warn!(error = %e, "Continuing without command menu");
            }
        }

        let refresh = tokio::spawn(Arc::clone(&service).run());
        let polling = tokio::spawn(poller.run());

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
            }
            result = refresh => {
                anyhow::bail!("delivery loop exited: {:?}", result);
            }
            result = polling => {
                anyhow::bail!("update polling exited: {:?}", result);
            }
        }

        Ok(())
    }
}
