//! Full pipeline against local providers

use crate::common::{serve_json, StaticRenderer};
use p2p_rates::config::Config;
use p2p_rates::fetch::{FetchOrchestrator, OrchestratorConfig};
use p2p_rates::pipeline::{RatePipeline, SourceRegistry};
use p2p_rates::report::{format_report, Markup};
use p2p_rates::source::{
    Adapter, BinanceConfig, BinanceP2pSource, FiatRateConfig, FiatRateSource, Marketplace,
    MarketplaceProfile, RenderedP2pSource,
};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

const BINANCE_BODY: &str =
    r#"{"code":"000000","data":[{"adv":{"price":"92.00"}},{"adv":{"price":"94.00"}},{"adv":{"price":"n/a"}}]}"#;

const FRANKFURTER_BODY: &str =
    r#"{"amount":1.0,"base":"AED","date":"2024-05-17","rates":{"RUB":25.0,"KZT":130.0}}"#;

const CONFIG: &str = r#"
    [report]
    fiat_pairs = ["AED/RUB"]

    [[report.p2p]]
    source = "binance"
    pair = "USDT/RUB"

    [[report.p2p]]
    source = "bybit"
    pair = "USDT/RUB"

    [synthesis]
    target = "AED"
    target_source = "bybit"

    [[synthesis.currencies]]
    fiat = "RUB"
    source = "bybit"

    [[synthesis.currencies]]
    fiat = "KZT"
    source = "binance"

    [[synthesis.currencies]]
    fiat = "KGS"
    source = "bybit"
"#;

async fn pipeline() -> RatePipeline {
    let config: Config = toml::from_str(CONFIG).unwrap();
    let binance_url = serve_json(BINANCE_BODY).await;
    let fiat_url = serve_json(FRANKFURTER_BODY).await;

    let binance = BinanceP2pSource::with_config(BinanceConfig {
        url: binance_url,
        timeout: Duration::from_secs(5),
        rows: 20,
    })
    .unwrap();
    let fiat = FiatRateSource::with_config(FiatRateConfig {
        api_key: None,
        fallback_url: fiat_url,
        timeout: Duration::from_secs(5),
        ..FiatRateConfig::default()
    })
    .unwrap();
    let renderer = Arc::new(StaticRenderer {
        pages: vec![
            ("/USDT/AED", r#"<div><span class="price-amount">3.60 AED</span><span class="price-amount">3.80 AED</span></div>"#),
            ("/USDT/RUB", r#"<div><span class="price-amount">95,00 RUB</span></div>"#),
            // Layout changed: no price elements
            ("/USDT/KGS", r#"<div><span class="amount">88</span></div>"#),
        ],
    });
    let bybit = RenderedP2pSource::new(MarketplaceProfile::bybit(), renderer, 20);

    let registry = SourceRegistry::new()
        .with_fiat(Adapter::Async(Arc::new(fiat)))
        .with_marketplace(Marketplace::Binance, Adapter::Async(Arc::new(binance)))
        .with_marketplace(Marketplace::Bybit, Adapter::Blocking(Arc::new(bybit)));

    let orchestrator = FetchOrchestrator::new(OrchestratorConfig {
        timeout: Duration::from_secs(10),
        blocking_workers: 2,
    });

    RatePipeline::new(orchestrator, &registry, &config.report, &config.synthesis).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_snapshot_from_all_source_kinds() {
    let snapshot = pipeline().await.fetch_snapshot().await;

    assert_eq!(snapshot.fiat_rates.len(), 1);
    assert_eq!(snapshot.fiat_rates[0].source(), "frankfurter");
    assert_eq!(snapshot.fiat_rates[0].buy(), Some(dec!(25)));

    assert_eq!(snapshot.p2p_rates[0].source(), "binance");
    assert_eq!(snapshot.p2p_rates[0].buy(), Some(dec!(93)));
    assert_eq!(snapshot.p2p_rates[1].source(), "bybit");
    assert_eq!(snapshot.p2p_rates[1].sell(), Some(dec!(95)));

    assert_eq!(snapshot.cross_rates.len(), 3);

    let rub = snapshot.cross_rates[0].result.as_ref().unwrap();
    assert_eq!(rub.customer_buys.raw, dec!(25.6757));
    assert_eq!(rub.customer_buys.adjusted, dec!(26.57));
    assert_eq!(rub.customer_sells.adjusted, dec!(24.777));
    let reference = rub.reference.as_ref().unwrap();
    assert_eq!(reference.up, dec!(25.75));
    assert_eq!(reference.down, dec!(24.25));

    let kzt = snapshot.cross_rates[1].result.as_ref().unwrap();
    assert_eq!(kzt.source, "binance");
    assert_eq!(kzt.customer_buys.raw, dec!(25.1351));
    assert_eq!(kzt.reference.as_ref().unwrap().up, dec!(133.9));

    // Selector drift on one page fails only that cross-rate
    assert!(snapshot.cross_rates[2].result.is_none());
    assert_eq!(
        snapshot.cross_rates[2].missing.as_ref().map(|p| p.to_string()),
        Some("USDT/KGS".to_string())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_report_has_one_entry_per_configured_row() {
    let snapshot = pipeline().await.fetch_snapshot().await;
    let text = format_report(&snapshot, Markup::Plain);

    assert!(text.contains("AED   → RUB      25.000000"));
    assert!(text.contains("binance       93.00      93.00"));
    assert!(text.contains("bybit         95.00      95.00"));
    assert!(text.contains("RUB ↔ AED (bybit)"));
    assert!(text.contains("Buy AED for RUB: 25.6757 +3.5% = 26.57"));
    assert!(text.contains("KZT ↔ AED (binance)"));
    assert!(text.contains("KGS ↔ AED (bybit)\nCould not get prices for USDT/KGS"));
}
