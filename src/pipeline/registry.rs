//! Adapter lookup for the pipeline

use crate::config::SourcesConfig;
use crate::source::{
    Adapter, BinanceConfig, BinanceP2pSource, FiatRateConfig, FiatRateSource, HttpPageRenderer,
    Marketplace, MarketplaceProfile, PageRenderer, RenderedP2pSource,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Which adapter a fetch slot is served by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKey {
    Fiat,
    Market(Marketplace),
}

/// Adapters available to the pipeline
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    fiat: Option<Adapter>,
    marketplaces: HashMap<Marketplace, Adapter>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the fiat rate adapter
    pub fn with_fiat(mut self, adapter: Adapter) -> Self {
        self.fiat = Some(adapter);
        self
    }

    /// Register a marketplace adapter, replacing any previous one
    pub fn with_marketplace(mut self, marketplace: Marketplace, adapter: Adapter) -> Self {
        self.marketplaces.insert(marketplace, adapter);
        self
    }

    /// Build every built-in adapter from configuration
    ///
    /// Must be called inside a tokio runtime; the page renderer binds to it.
    pub fn from_config(config: &SourcesConfig, api_key: Option<String>) -> anyhow::Result<Self> {
        let binance = BinanceP2pSource::with_config(BinanceConfig {
            url: config.binance_url.clone(),
            timeout: config.request_timeout(),
            rows: config.max_offers,
        })?;

        let fiat = FiatRateSource::with_config(FiatRateConfig {
            primary_url: config.exchange_rate_api_url.clone(),
            api_key,
            fallback_url: config.frankfurter_url.clone(),
            timeout: config.request_timeout(),
        })?;

        let renderer: Arc<dyn PageRenderer> =
            Arc::new(HttpPageRenderer::new(config.request_timeout())?);
        let rendered = |profile: MarketplaceProfile| {
            Adapter::Blocking(Arc::new(RenderedP2pSource::new(
                profile,
                Arc::clone(&renderer),
                config.max_offers,
            )))
        };

        Ok(Self::new()
            .with_fiat(Adapter::Async(Arc::new(fiat)))
            .with_marketplace(Marketplace::Binance, Adapter::Async(Arc::new(binance)))
            .with_marketplace(Marketplace::Bybit, rendered(MarketplaceProfile::bybit()))
            .with_marketplace(Marketplace::Okx, rendered(MarketplaceProfile::okx())))
    }

    pub fn get(&self, key: SourceKey) -> Option<&Adapter> {
        match key {
            SourceKey::Fiat => self.fiat.as_ref(),
            SourceKey::Market(marketplace) => self.marketplaces.get(&marketplace),
        }
    }

    /// Adapter for `key`, or a configuration error naming it
    pub fn require(&self, key: SourceKey) -> anyhow::Result<&Adapter> {
        self.get(key).ok_or_else(|| match key {
            SourceKey::Fiat => anyhow::anyhow!("no fiat rate source registered"),
            SourceKey::Market(m) => anyhow::anyhow!("marketplace '{}' has no registered source", m),
        })
    }

    pub fn has_fiat(&self) -> bool {
        self.fiat.is_some()
    }
}
