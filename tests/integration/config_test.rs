//! Configuration loading

use p2p_rates::cli::config_summary;
use p2p_rates::config::{Config, DeliveryMode};
use p2p_rates::source::Marketplace;
use std::io::Write;

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        [report]
        fiat_pairs = ["KZT/AED"]

        [synthesis]
        target = "AED"
        target_source = "okx"
        markup = 0.05

        [delivery]
        mode = "push"
        subscribers_file = "/tmp/subscribers.json"
        "#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert_eq!(config.synthesis.target_source, Marketplace::Okx);
    assert_eq!(config.delivery.mode, DeliveryMode::Push);
    assert_eq!(config.sources.max_offers, 20);
    assert!(config_summary(&config).contains("+5%"));
}

#[test]
fn test_invalid_values_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
        [report]
        [synthesis]
        target = "AED"
        target_source = "bybit"
        markdown = 1.2
        "#
    )
    .unwrap();

    assert!(Config::load(file.path()).is_err());
}

#[test]
fn test_bundled_matches_example_file() {
    let bundled = Config::bundled().unwrap();
    let example = Config::load(concat!(env!("CARGO_MANIFEST_DIR"), "/config.toml.example")).unwrap();

    assert_eq!(bundled.report.fiat_pairs, example.report.fiat_pairs);
    assert_eq!(bundled.synthesis.currencies, example.synthesis.currencies);
    assert_eq!(bundled.report.p2p.len(), 3);
}
