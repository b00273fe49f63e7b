//! Configuration types for p2p-rates

use crate::quote::CurrencyPair;
use crate::source::{Marketplace, BINANCE_P2P_URL, EXCHANGE_RATE_API_URL, FRANKFURTER_URL};
use crate::synthesis::SynthesisConfig;
use crate::telemetry::LogFormat;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration bundled into the binary
pub const BUNDLED_CONFIG: &str = include_str!("../config.toml.example");

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    pub report: ReportConfig,
    pub synthesis: CrossRateConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Quote source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SourcesConfig {
    /// Timeout of a single HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Bound on one (source, pair) fetch, covering both trade sides
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Rendered-page fetches allowed to run at once
    #[serde(default = "default_blocking_workers")]
    pub blocking_workers: usize,

    /// Offers averaged per side
    #[serde(default = "default_max_offers")]
    pub max_offers: usize,

    #[serde(default = "default_binance_url")]
    pub binance_url: String,

    #[serde(default = "default_exchange_rate_api_url")]
    pub exchange_rate_api_url: String,

    #[serde(default = "default_frankfurter_url")]
    pub frankfurter_url: String,
}

fn default_request_timeout_secs() -> u64 {
    20
}
fn default_fetch_timeout_secs() -> u64 {
    60
}
fn default_blocking_workers() -> usize {
    2
}
fn default_max_offers() -> usize {
    20
}
fn default_binance_url() -> String {
    BINANCE_P2P_URL.to_string()
}
fn default_exchange_rate_api_url() -> String {
    EXCHANGE_RATE_API_URL.to_string()
}
fn default_frankfurter_url() -> String {
    FRANKFURTER_URL.to_string()
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            blocking_workers: default_blocking_workers(),
            max_offers: default_max_offers(),
            binance_url: default_binance_url(),
            exchange_rate_api_url: default_exchange_rate_api_url(),
            frankfurter_url: default_frankfurter_url(),
        }
    }
}

impl SourcesConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Summary tables at the top of the report
#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Fiat pairs quoted by the fiat rate API
    #[serde(default)]
    pub fiat_pairs: Vec<CurrencyPair>,

    /// P2P rows: one marketplace and pair each
    #[serde(default)]
    pub p2p: Vec<P2pRow>,
}

/// One row of the P2P summary table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct P2pRow {
    pub source: Marketplace,
    pub pair: CurrencyPair,
}

/// Cross-rate synthesis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrossRateConfig {
    /// Bridge asset
    #[serde(default = "default_bridge")]
    pub bridge: String,

    /// Fiat every listed currency is converted to
    pub target: String,

    /// Marketplace quoting the target fiat
    pub target_source: Marketplace,

    /// Currencies converted to the target
    #[serde(default)]
    pub currencies: Vec<CrossCurrency>,

    #[serde(default = "default_markup")]
    pub markup: Decimal,

    #[serde(default = "default_markup")]
    pub markdown: Decimal,

    #[serde(default = "default_reference_markup")]
    pub reference_markup: Decimal,

    #[serde(default = "default_p2p_correction")]
    pub p2p_correction: Decimal,
}

/// A fiat converted through the bridge, and where its quote comes from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CrossCurrency {
    pub fiat: String,
    pub source: Marketplace,
}

fn default_bridge() -> String {
    "USDT".to_string()
}
fn default_markup() -> Decimal {
    Decimal::new(35, 3) // 3.5%
}
fn default_reference_markup() -> Decimal {
    Decimal::new(3, 2) // 3%
}
fn default_p2p_correction() -> Decimal {
    Decimal::ONE
}

impl CrossRateConfig {
    /// Markup settings for the synthesis engine
    pub fn rates(&self) -> SynthesisConfig {
        SynthesisConfig {
            markup: self.markup,
            markdown: self.markdown,
            reference_markup: self.reference_markup,
            p2p_correction: self.p2p_correction,
        }
    }
}

/// How reports reach subscribers
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// One message per subscriber, edited in place, with a refresh button
    #[default]
    Live,
    /// A fresh message every cycle
    Push,
}

/// Delivery loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub mode: DeliveryMode,

    /// Seconds between refresh cycles
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// First sleep after a failed cycle
    #[serde(default = "default_fallback_interval_secs")]
    pub fallback_interval_secs: u64,

    /// Ceiling for the failure backoff
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Long-poll timeout for chat updates
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u32,

    /// Persisted subscriber list
    #[serde(default = "default_subscribers_file")]
    pub subscribers_file: PathBuf,
}

fn default_refresh_interval_secs() -> u64 {
    300
}
fn default_fallback_interval_secs() -> u64 {
    60
}
fn default_max_backoff_secs() -> u64 {
    600
}
fn default_poll_timeout_secs() -> u32 {
    30
}
fn default_subscribers_file() -> PathBuf {
    PathBuf::from("user_data.json")
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            mode: DeliveryMode::Live,
            refresh_interval_secs: default_refresh_interval_secs(),
            fallback_interval_secs: default_fallback_interval_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
            subscribers_file: default_subscribers_file(),
        }
    }
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    /// Prometheus exporter port; disabled when absent
    pub metrics_port: Option<u16>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
            metrics_port: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Configuration shipped with the binary
    pub fn bundled() -> anyhow::Result<Self> {
        Self::parse(BUNDLED_CONFIG)
    }

    fn parse(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sources.blocking_workers == 0 {
            anyhow::bail!("sources.blocking_workers must be at least 1");
        }
        if self.sources.max_offers == 0 {
            anyhow::bail!("sources.max_offers must be at least 1");
        }
        if self.delivery.refresh_interval_secs == 0 || self.delivery.fallback_interval_secs == 0 {
            anyhow::bail!("delivery intervals must be positive");
        }
        for (name, value) in [
            ("markup", self.synthesis.markup),
            ("markdown", self.synthesis.markdown),
            ("reference_markup", self.synthesis.reference_markup),
        ] {
            if value.is_sign_negative() || value >= Decimal::ONE {
                anyhow::bail!("synthesis.{} must be in [0, 1), got {}", name, value);
            }
        }
        if self.synthesis.p2p_correction <= Decimal::ZERO {
            anyhow::bail!(
                "synthesis.p2p_correction must be positive, got {}",
                self.synthesis.p2p_correction
            );
        }
        if self.synthesis.target.trim().is_empty() || self.synthesis.bridge.trim().is_empty() {
            anyhow::bail!("synthesis.target and synthesis.bridge must be set");
        }
        Ok(())
    }
}

/// Secrets read from the environment (optionally via `.env`)
#[derive(Clone, Default)]
pub struct Secrets {
    /// Telegram bot token (`BOT_TOKEN`)
    pub bot_token: Option<String>,
    /// exchangerate-api.com key (`EXCHANGE_RATE_API_KEY`)
    pub exchange_rate_api_key: Option<String>,
}

impl Secrets {
    /// Read secrets, loading `.env` first if present
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env");
        }

        Self {
            bot_token: non_empty_var("BOT_TOKEN"),
            exchange_rate_api_key: non_empty_var("EXCHANGE_RATE_API_KEY"),
        }
    }

    /// Bot token, or a fatal startup error
    pub fn require_bot_token(&self) -> anyhow::Result<&str> {
        self.bot_token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("BOT_TOKEN environment variable is not set"))
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("bot_token", &self.bot_token.as_ref().map(|_| "<redacted>"))
            .field(
                "exchange_rate_api_key",
                &self.exchange_rate_api_key.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const MINIMAL: &str = r#"
        [report]
        fiat_pairs = ["KZT/AED", "aed/rub"]

        [[report.p2p]]
        source = "binance"
        pair = "USDT/RUB"

        [synthesis]
        target = "AED"
        target_source = "bybit"

        [[synthesis.currencies]]
        fiat = "KZT"
        source = "binance"
    "#;

    #[test]
    fn test_config_deserialize_minimal() {
        let config: Config = toml::from_str(MINIMAL).unwrap();

        assert_eq!(config.report.fiat_pairs.len(), 2);
        assert_eq!(config.report.fiat_pairs[1].to_string(), "AED/RUB");
        assert_eq!(config.report.p2p[0].source, Marketplace::Binance);
        assert_eq!(config.synthesis.target_source, Marketplace::Bybit);
        assert_eq!(config.synthesis.bridge, "USDT");
        assert_eq!(config.synthesis.markup, dec!(0.035));
        assert_eq!(config.synthesis.reference_markup, dec!(0.03));
        assert_eq!(config.delivery.mode, DeliveryMode::Live);
        assert_eq!(config.delivery.refresh_interval_secs, 300);
        assert_eq!(config.delivery.fallback_interval_secs, 60);
        assert_eq!(config.sources.blocking_workers, 2);
        assert_eq!(config.sources.request_timeout(), Duration::from_secs(20));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_push_mode_and_overrides() {
        let toml = format!(
            "{}\n[delivery]\nmode = \"push\"\nrefresh_interval_secs = 120\n\n[telemetry]\nlog_level = \"debug\"\nlog_format = \"json\"\nmetrics_port = 9090\n",
            MINIMAL
        );
        let config: Config = toml::from_str(&toml).unwrap();

        assert_eq!(config.delivery.mode, DeliveryMode::Push);
        assert_eq!(config.delivery.refresh_interval_secs, 120);
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        assert_eq!(config.telemetry.metrics_port, Some(9090));
    }

    #[test]
    fn test_config_rejects_bad_pair() {
        let toml = MINIMAL.replace("KZT/AED", "KZTAED");
        assert!(toml::from_str::<Config>(&toml).is_err());
    }

    #[test]
    fn test_config_rejects_unknown_marketplace() {
        let toml = MINIMAL.replace("source = \"binance\"\n        pair", "source = \"kraken\"\n        pair");
        assert!(toml::from_str::<Config>(&toml).is_err());
    }

    #[test]
    fn test_validate_rejects_markup_out_of_range() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.synthesis.markup = dec!(1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_positive_correction() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.synthesis.p2p_correction = dec!(0);
        assert!(config.validate().is_err());
        config.synthesis.p2p_correction = dec!(-1);
        assert!(config.validate().is_err());
        config.synthesis.p2p_correction = dec!(1.02);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config: Config = toml::from_str(MINIMAL).unwrap();
        config.sources.blocking_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rates_from_config() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        let rates = config.synthesis.rates();
        assert_eq!(rates, SynthesisConfig::default());
    }

    #[test]
    fn test_bundled_config_is_valid() {
        let config = Config::bundled().unwrap();
        assert!(!config.synthesis.currencies.is_empty());
        assert!(!config.report.fiat_pairs.is_empty());
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_bot_token_is_error() {
        let secrets = Secrets::default();
        assert!(secrets.require_bot_token().is_err());

        let secrets = Secrets {
            bot_token: Some("123:abc".to_string()),
            exchange_rate_api_key: None,
        };
        assert_eq!(secrets.require_bot_token().unwrap(), "123:abc");
    }

    #[test]
    fn test_secrets_debug_redacts() {
        let secrets = Secrets {
            bot_token: Some("123:abc".to_string()),
            exchange_rate_api_key: Some("key".to_string()),
        };
        let debug = format!("{:?}", secrets);
        assert!(!debug.contains("123:abc"));
        assert!(!debug.contains("key\""));
    }
}
