//! Delivery service: fetch once, broadcast to every subscriber

use super::retry::RetryPolicy;
use super::subscribers::{Subscriber, SubscriberRegistry};
use super::transport::{ChatTransport, TransportError};
use crate::config::{DeliveryConfig, DeliveryMode};
use crate::pipeline::RatePipeline;
use crate::report::{format_report, format_unavailable, Markup};
use crate::telemetry::{self, LatencyMetric};
use std::sync::Arc;
use std::time::{Duration, Instant};

const LOADING_TEXT: &str = "Fetching rates...";
const REFRESHING_TEXT: &str = "Refreshing...";
const STOPPED_TEXT: &str = "Updates stopped. Send /start to subscribe again.";

/// Inbound chat action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Subscribe and get a report right away
    Start { chat_id: i64 },
    /// Unsubscribe
    Stop { chat_id: i64 },
    /// Refresh button pressed
    Refresh { chat_id: i64, callback_id: String },
}

/// What happened to one subscriber in a delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Sent,
    Edited,
    /// Live message gone; a fresh one goes out next time
    Reset,
    /// Chat unreachable; subscription dropped
    Removed,
    Failed,
}

/// Per-cycle delivery counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub subscribers: usize,
    pub sent: usize,
    pub edited: usize,
    pub reset: usize,
    pub removed: usize,
    pub failed: usize,
}

impl CycleSummary {
    fn record(&mut self, outcome: DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Sent => self.sent += 1,
            DeliveryOutcome::Edited => self.edited += 1,
            DeliveryOutcome::Reset => self.reset += 1,
            DeliveryOutcome::Removed => self.removed += 1,
            DeliveryOutcome::Failed => self.failed += 1,
        }
    }
}

/// Owns the subscriber set and drives report delivery
pub struct DeliveryService {
    pipeline: Arc<RatePipeline>,
    transport: Arc<dyn ChatTransport>,
    subscribers: SubscriberRegistry,
    mode: DeliveryMode,
    refresh_interval: Duration,
    retry: RetryPolicy,
}

impl DeliveryService {
    pub fn new(
        pipeline: Arc<RatePipeline>,
        transport: Arc<dyn ChatTransport>,
        subscribers: SubscriberRegistry,
        config: &DeliveryConfig,
    ) -> Self {
        Self {
            pipeline,
            transport,
            subscribers,
            mode: config.mode,
            refresh_interval: Duration::from_secs(config.refresh_interval_secs),
            retry: RetryPolicy::from_config(config),
        }
    }

    pub fn subscribers(&self) -> &SubscriberRegistry {
        &self.subscribers
    }

    /// Fetch and render one report
    ///
    /// Runs on its own task; a panic anywhere in fetch or formatting comes
    /// back as an error instead of unwinding into the caller.
    pub async fn build_report(&self) -> anyhow::Result<String> {
        let pipeline = Arc::clone(&self.pipeline);
        let started = Instant::now();

        let report = tokio::spawn(async move {
            let snapshot = pipeline.fetch_snapshot().await;
            format_report(&snapshot, Markup::Html)
        })
        .await
        .map_err(|e| anyhow::anyhow!("rate cycle aborted: {}", e))?;

        telemetry::record_latency(LatencyMetric::Cycle, started.elapsed());
        Ok(report)
    }

    /// Push `text` to one subscriber
    ///
    /// Live mode edits the recorded message, or sends a new one with the
    /// refresh button when none is recorded. Push mode always sends.
    pub async fn deliver(&self, subscriber: Subscriber, text: &str) -> DeliveryOutcome {
        let chat_id = subscriber.chat_id;
        let started = Instant::now();

        let result = match (self.mode, subscriber.message_id) {
            (DeliveryMode::Live, Some(message_id)) => self
                .transport
                .edit(chat_id, message_id, text)
                .await
                .map(|_| DeliveryOutcome::Edited),
            (DeliveryMode::Live, None) => match self.transport.send(chat_id, text, true).await {
                Ok(message_id) => {
                    self.subscribers.set_message(chat_id, Some(message_id)).await;
                    Ok(DeliveryOutcome::Sent)
                }
                Err(e) => Err(e),
            },
            (DeliveryMode::Push, _) => self
                .transport
                .send(chat_id, text, false)
                .await
                .map(|_| DeliveryOutcome::Sent),
        };
        telemetry::record_latency(LatencyMetric::Delivery, started.elapsed());

        match result {
            Ok(outcome) => outcome,
            Err(TransportError::MessageGone) => {
                tracing::warn!(chat_id, "Live message gone, will send a new one");
                self.subscribers.set_message(chat_id, None).await;
                DeliveryOutcome::Reset
            }
            Err(TransportError::Blocked(reason)) => {
                tracing::warn!(chat_id, %reason, "Chat unreachable, removing subscriber");
                if let Err(e) = self.subscribers.unsubscribe(chat_id).await {
                    tracing::error!(chat_id, error = %e, "Failed to persist subscriber removal");
                }
                DeliveryOutcome::Removed
            }
            Err(TransportError::Api(reason)) => {
                tracing::warn!(chat_id, %reason, "Delivery failed");
                DeliveryOutcome::Failed
            }
        }
    }

    /// One refresh cycle: fetch once, deliver the same report to everyone
    ///
    /// A failed fetch still reaches subscribers as the unavailable notice and
    /// is returned as an error so the loop backs off.
    pub async fn run_cycle(&self) -> anyhow::Result<CycleSummary> {
        let subscribers = self.subscribers.snapshot().await;
        let mut summary = CycleSummary {
            subscribers: subscribers.len(),
            ..CycleSummary::default()
        };

        if subscribers.is_empty() {
            tracing::debug!("No subscribers, skipping fetch");
            return Ok(summary);
        }

        let report = self.build_report().await;
        let text = match &report {
            Ok(text) => text.clone(),
            Err(e) => {
                tracing::error!(error = %e, "Rate cycle failed");
                format_unavailable(Markup::Html)
            }
        };

        for subscriber in subscribers {
            summary.record(self.deliver(subscriber, &text).await);
        }

        tracing::info!(
            subscribers = summary.subscribers,
            sent = summary.sent,
            edited = summary.edited,
            reset = summary.reset,
            removed = summary.removed,
            failed = summary.failed,
            "Delivery cycle complete"
        );

        report.map(|_| summary)
    }

    /// Fetch and deliver to a single chat outside the periodic cadence
    pub async fn refresh_chat(&self, chat_id: i64) -> DeliveryOutcome {
        let text = match self.build_report().await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(chat_id, error = %e, "On-demand refresh failed");
                format_unavailable(Markup::Html)
            }
        };

        let subscriber = Subscriber {
            chat_id,
            message_id: self.subscribers.message_id(chat_id).await,
        };
        self.deliver(subscriber, &text).await
    }

    /// React to a chat command
    pub async fn handle_command(&self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Start { chat_id } => {
                match self.subscribers.subscribe(chat_id).await {
                    Ok(true) => tracing::info!(chat_id, "Subscribed"),
                    Ok(false) => {}
                    Err(e) => tracing::error!(chat_id, error = %e, "Failed to persist subscription"),
                }
                if let Err(e) = self.transport.send(chat_id, LOADING_TEXT, false).await {
                    tracing::warn!(chat_id, error = %e, "Failed to send loading notice");
                }
                self.refresh_chat(chat_id).await;
            }
            Command::Stop { chat_id } => {
                if self.subscribers.unsubscribe(chat_id).await? {
                    tracing::info!(chat_id, "Unsubscribed");
                }
                if let Err(e) = self.transport.send(chat_id, STOPPED_TEXT, false).await {
                    tracing::warn!(chat_id, error = %e, "Failed to confirm unsubscribe");
                }
            }
            Command::Refresh { chat_id, callback_id } => {
                if let Err(e) = self.transport.answer_callback(&callback_id, REFRESHING_TEXT).await {
                    tracing::debug!(chat_id, error = %e, "Callback answer failed");
                }
                self.refresh_chat(chat_id).await;
            }
        }
        Ok(())
    }

    /// Periodic refresh loop; never returns
    ///
    /// Successful cycles sleep the refresh interval. Failed cycles sleep
    /// according to the retry policy, growing with consecutive failures.
    pub async fn run(self: Arc<Self>) {
        tracing::info!(
            mode = ?self.mode,
            interval_secs = self.refresh_interval.as_secs(),
            "Starting delivery loop"
        );
        let mut failures = 0u32;

        loop {
            let delay = match self.run_cycle().await {
                Ok(_) => {
                    failures = 0;
                    telemetry::record_cycle(true);
                    self.refresh_interval
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    telemetry::record_cycle(false);
                    let delay = self.retry.delay(failures);
                    tracing::warn!(
                        error = %e,
                        failures,
                        retry_in_secs = delay.as_secs(),
                        "Delivery cycle failed"
                    );
                    delay
                }
            };
            tokio::time::sleep(delay).await;
        }
    }
}
