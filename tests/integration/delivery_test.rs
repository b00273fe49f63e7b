//! Delivery flow with a recording transport and a file-backed store

use crate::common::{RecordingTransport, Sent, StaticRenderer};
use p2p_rates::config::{CrossRateConfig, DeliveryConfig, ReportConfig};
use p2p_rates::delivery::{
    Command, DeliveryService, JsonFileStore, SubscriberRegistry, SubscriberStore, TransportError,
};
use p2p_rates::fetch::{FetchOrchestrator, OrchestratorConfig};
use p2p_rates::pipeline::{RatePipeline, SourceRegistry};
use p2p_rates::source::{Adapter, Marketplace, MarketplaceProfile, RenderedP2pSource};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_test::assert_ok;

fn pipeline() -> Arc<RatePipeline> {
    let renderer = Arc::new(StaticRenderer {
        pages: vec![
            ("/USDT/AED", r#"<span class="price-amount">3.70</span>"#),
            ("/USDT/RUB", r#"<span class="price-amount">95.00</span>"#),
        ],
    });
    let bybit = RenderedP2pSource::new(MarketplaceProfile::bybit(), renderer, 20);
    let registry = SourceRegistry::new()
        .with_marketplace(Marketplace::Bybit, Adapter::Blocking(Arc::new(bybit)));

    let synthesis: CrossRateConfig = toml::from_str(
        r#"
        target = "AED"
        target_source = "bybit"
        currencies = [{ fiat = "RUB", source = "bybit" }]
        "#,
    )
    .unwrap();
    let report = ReportConfig {
        fiat_pairs: vec![],
        p2p: vec![],
    };

    let orchestrator = FetchOrchestrator::new(OrchestratorConfig::default());
    Arc::new(RatePipeline::new(orchestrator, &registry, &report, &synthesis).unwrap())
}

fn service(store: Arc<JsonFileStore>, transport: Arc<RecordingTransport>) -> DeliveryService {
    DeliveryService::new(
        pipeline(),
        transport,
        SubscriberRegistry::load(store),
        &DeliveryConfig::default(),
    )
}

#[tokio::test]
async fn test_start_then_periodic_edit() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("user_data.json")));
    let transport = Arc::new(RecordingTransport::default());
    let service = service(store.clone(), transport.clone());

    service.handle_command(Command::Start { chat_id: 42 }).await.unwrap();
    assert_eq!(store.load(), BTreeSet::from([42]));

    let log = transport.log();
    assert_eq!(log.len(), 2);
    match &log[1] {
        Sent::Message { chat_id, text, button } => {
            assert_eq!(*chat_id, 42);
            assert!(*button);
            assert!(text.contains("RUB ↔ AED (bybit)"));
            assert!(text.contains("25.6757"));
        }
        other => panic!("expected report message, got {:?}", other),
    }

    let summary = service.run_cycle().await.unwrap();
    assert_eq!(summary.edited, 1);
    assert!(matches!(
        transport.log().last(),
        Some(Sent::Edit { chat_id: 42, message_id: 2, .. })
    ));
}

#[tokio::test]
async fn test_missing_message_recovers_on_next_cycle() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::new(dir.path().join("user_data.json")));
    let transport = Arc::new(RecordingTransport::default());
    let service = service(store.clone(), transport.clone());

    service.subscribers().subscribe(42).await.unwrap();
    service.run_cycle().await.unwrap();

    *transport.edit_error.lock().unwrap() = Some(TransportError::MessageGone);
    let summary = service.run_cycle().await.unwrap();
    assert_eq!(summary.reset, 1);
    assert_eq!(store.load(), BTreeSet::from([42]));

    *transport.edit_error.lock().unwrap() = None;
    let summary = service.run_cycle().await.unwrap();
    assert_eq!(summary.sent, 1);
    assert!(matches!(
        transport.log().last(),
        Some(Sent::Message { chat_id: 42, button: true, .. })
    ));
}

#[tokio::test]
async fn test_subscribers_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("user_data.json");

    {
        let transport = Arc::new(RecordingTransport::default());
        let service = service(Arc::new(JsonFileStore::new(&path)), transport);
        assert_ok!(service.handle_command(Command::Start { chat_id: 1 }).await);
        assert_ok!(service.handle_command(Command::Start { chat_id: 2 }).await);
        assert_ok!(service.handle_command(Command::Stop { chat_id: 1 }).await);
    }

    let transport = Arc::new(RecordingTransport::default());
    let service = service(Arc::new(JsonFileStore::new(&path)), transport.clone());
    assert_eq!(service.subscribers().len().await, 1);

    let summary = service.run_cycle().await.unwrap();
    assert_eq!(summary.subscribers, 1);
    assert_eq!(summary.sent, 1);
}
