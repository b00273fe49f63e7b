//! Prometheus metrics

use crate::quote::Quote;
use std::time::Duration;

/// Latency metric types
#[derive(Debug, Clone, Copy)]
pub enum LatencyMetric {
    /// One full fetch + synthesis cycle
    Cycle,
    /// Sending or editing one subscriber message
    Delivery,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Subscribed chats
    Subscribers,
    /// Quotes that came back with a price in the last cycle
    AvailableQuotes,
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    let metric_name = match metric {
        LatencyMetric::Cycle => "p2prates_cycle_latency_ms",
        LatencyMetric::Delivery => "p2prates_delivery_latency_ms",
    };

    ::metrics::histogram!(metric_name).record(duration.as_secs_f64() * 1000.0);
    tracing::debug!(
        metric = metric_name,
        value_ms = duration.as_millis(),
        "Recording latency"
    );
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::Subscribers => "p2prates_subscribers",
        GaugeMetric::AvailableQuotes => "p2prates_available_quotes",
    };

    ::metrics::gauge!(metric_name).set(value);
    tracing::debug!(metric = metric_name, value = value, "Setting gauge");
}

/// Count one source fetch and its latency
pub fn record_fetch(source: &str, quote: &Quote, duration: Duration) {
    let outcome = quote.failure().map(|f| f.kind()).unwrap_or("ok");

    ::metrics::counter!(
        "p2prates_fetch_total",
        "source" => source.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    ::metrics::histogram!("p2prates_fetch_latency_ms", "source" => source.to_string())
        .record(duration.as_secs_f64() * 1000.0);
}

/// Count one delivery cycle
pub fn record_cycle(succeeded: bool) {
    let outcome = if succeeded { "ok" } else { "error" };
    ::metrics::counter!("p2prates_cycle_total", "outcome" => outcome).increment(1);
}
