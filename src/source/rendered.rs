//! Rendered-page P2P sources (Bybit, OKX)
//!
//! These marketplaces have no public API. A [`PageRenderer`] produces the page
//! markup and prices are pulled out of known DOM selectors. Rendering blocks the
//! calling thread, so these sources implement [`BlockingQuoteSource`] and are
//! driven from the fetch orchestrator's worker pool.

use super::{average_prices, settle_sides, BlockingQuoteSource, USER_AGENT};
use crate::quote::{CurrencyPair, FetchError, Quote, TradeSide};
use reqwest::Client;
use rust_decimal::Decimal;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

/// Produces the rendered markup of a page
pub trait PageRenderer: Send + Sync {
    /// Render `url` and return its HTML. Blocks the calling thread.
    fn render(&self, url: &str) -> Result<String, FetchError>;
}

/// Renderer that downloads the served markup over HTTP
///
/// Runs the async client on the captured runtime handle, so it must be called
/// from a blocking-pool thread, never from inside a task.
pub struct HttpPageRenderer {
    client: Client,
    handle: Handle,
    timeout: Duration,
}

impl HttpPageRenderer {
    /// Create a renderer bound to the current tokio runtime
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            handle: Handle::try_current()?,
            timeout,
        })
    }
}

impl PageRenderer for HttpPageRenderer {
    fn render(&self, url: &str) -> Result<String, FetchError> {
        let timeout = self.timeout;
        self.handle.block_on(async {
            let response = self
                .client
                .get(url)
                .header("Accept-Language", "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7")
                .send()
                .await
                .map_err(|e| super::request_error(e, timeout))?;

            if !response.status().is_success() {
                return Err(FetchError::SourceUnavailable(format!(
                    "{} returned {}",
                    url,
                    response.status()
                )));
            }

            response
                .text()
                .await
                .map_err(|e| super::request_error(e, timeout))
        })
    }
}

/// Where a marketplace lists its offers and how to find prices on the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceProfile {
    /// Source identifier
    pub name: String,
    /// Listing URL with `{side}`, `{asset}`, `{fiat}`, `{asset_lower}`, `{fiat_lower}`
    pub url_template: String,
    /// CSS selector matching one price element per offer
    pub price_selector: String,
}

impl MarketplaceProfile {
    /// Bybit P2P listing
    pub fn bybit() -> Self {
        Self {
            name: "bybit".to_string(),
            url_template: "https://www.bybit.com/ru-RU/fiat/trade/otc/{side}/{asset}/{fiat}"
                .to_string(),
            price_selector: "span.price-amount".to_string(),
        }
    }

    /// OKX P2P listing
    pub fn okx() -> Self {
        Self {
            name: "okx".to_string(),
            url_template: "https://www.okx.com/ru/p2p-markets/{fiat_lower}/{side}-{asset_lower}"
                .to_string(),
            price_selector: "span.price".to_string(),
        }
    }

    /// Listing URL for one side of a pair
    pub fn page_url(&self, pair: &CurrencyPair, side: TradeSide) -> String {
        self.url_template
            .replace("{side}", side.as_str())
            .replace("{asset_lower}", &pair.base().to_lowercase())
            .replace("{fiat_lower}", &pair.quote().to_lowercase())
            .replace("{asset}", pair.base())
            .replace("{fiat}", pair.quote())
    }
}

/// P2P source backed by a rendered listing page
pub struct RenderedP2pSource {
    profile: MarketplaceProfile,
    renderer: Arc<dyn PageRenderer>,
    max_offers: usize,
}

impl RenderedP2pSource {
    pub fn new(profile: MarketplaceProfile, renderer: Arc<dyn PageRenderer>, max_offers: usize) -> Self {
        Self {
            profile,
            renderer,
            max_offers,
        }
    }

    pub fn profile(&self) -> &MarketplaceProfile {
        &self.profile
    }

    fn fetch_side(&self, pair: &CurrencyPair, side: TradeSide) -> Result<Decimal, FetchError> {
        let url = self.profile.page_url(pair, side);
        tracing::debug!(source = %self.profile.name, url = %url, "Rendering P2P listing");

        let html = self.renderer.render(&url)?;
        let texts = extract_price_texts(&html, &self.profile.price_selector)?;

        if texts.is_empty() {
            return Err(FetchError::NoData(format!(
                "selector '{}' matched nothing",
                self.profile.price_selector
            )));
        }

        // Currency code next to the number is dropped before parsing
        let cleaned = texts.iter().map(|t| t.replace(pair.quote(), ""));

        average_prices(cleaned, self.max_offers).ok_or_else(|| {
            FetchError::Malformed(format!("{} price elements, none parsable", texts.len()))
        })
    }
}

impl BlockingQuoteSource for RenderedP2pSource {
    fn name(&self) -> &str {
        &self.profile.name
    }

    fn fetch_blocking(&self, pair: &CurrencyPair) -> Quote {
        let buy = self.fetch_side(pair, TradeSide::Buy);
        let sell = self.fetch_side(pair, TradeSide::Sell);
        settle_sides(self.name(), pair, buy, sell)
    }
}

/// Text content of every element matching `selector`
fn extract_price_texts(html: &str, selector: &str) -> Result<Vec<String>, FetchError> {
    let selector = Selector::parse(selector)
        .map_err(|e| FetchError::Malformed(format!("invalid selector '{}': {:?}", selector, e)))?;

    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}
