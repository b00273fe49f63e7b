//! Concurrent fan-out over quote sources

use super::FetchTask;
use crate::quote::{FetchError, Quote};
use crate::source::Adapter;
use crate::telemetry;
use futures_util::future::join_all;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Per-task time bound
    pub timeout: Duration,
    /// Blocking fetches allowed to run at once
    pub blocking_workers: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            blocking_workers: 2,
        }
    }
}

/// Runs fetch tasks concurrently with per-task timeouts
///
/// Async sources are polled directly on the scheduler; a panicking source
/// yields a failed quote for its own slot only. Blocking sources go to
/// `spawn_blocking`, gated by a semaphore so at most `blocking_workers` of them
/// execute at once. The timeout of a blocking task starts once it holds a
/// permit; a timed-out blocking call keeps its permit until the thread returns.
pub struct FetchOrchestrator {
    config: OrchestratorConfig,
    permits: Arc<Semaphore>,
}

impl FetchOrchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        let workers = config.blocking_workers.max(1);
        Self {
            config,
            permits: Arc::new(Semaphore::new(workers)),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run every task and return one quote per task, in task order
    pub async fn run(&self, tasks: &[FetchTask]) -> Vec<Quote> {
        tracing::debug!(tasks = tasks.len(), "Starting fetch fan-out");
        join_all(tasks.iter().map(|task| self.run_task(task))).await
    }

    async fn run_task(&self, task: &FetchTask) -> Quote {
        let started = Instant::now();

        let quote = match &task.adapter {
            Adapter::Async(source) => {
                let fetch = AssertUnwindSafe(source.fetch(&task.pair)).catch_unwind();
                match timeout(self.config.timeout, fetch).await {
                    Ok(Ok(quote)) => quote,
                    Ok(Err(panic)) => self.panicked(task, panic_message(panic.as_ref())),
                    Err(_) => self.timed_out(task),
                }
            }
            Adapter::Blocking(source) => {
                let permit = match Arc::clone(&self.permits).acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return Quote::failed(
                            source.name(),
                            task.pair.clone(),
                            FetchError::SourceUnavailable("worker pool closed".to_string()),
                        )
                    }
                };

                let source = Arc::clone(source);
                let pair = task.pair.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    source.fetch_blocking(&pair)
                });

                match timeout(self.config.timeout, handle).await {
                    Ok(Ok(quote)) => quote,
                    Ok(Err(e)) => self.panicked(task, e.to_string()),
                    Err(_) => self.timed_out(task),
                }
            }
        };

        telemetry::record_fetch(task.adapter.name(), &quote, started.elapsed());
        quote
    }

    fn panicked(&self, task: &FetchTask, reason: String) -> Quote {
        tracing::error!(source = task.adapter.name(), pair = %task.pair, %reason, "Fetch panicked");
        Quote::failed(
            task.adapter.name(),
            task.pair.clone(),
            FetchError::SourceUnavailable(format!("worker failed: {}", reason)),
        )
    }

    fn timed_out(&self, task: &FetchTask) -> Quote {
        tracing::warn!(
            source = task.adapter.name(),
            pair = %task.pair,
            timeout_secs = self.config.timeout.as_secs(),
            "Fetch timed out"
        );
        Quote::failed(
            task.adapter.name(),
            task.pair.clone(),
            FetchError::Timeout(self.config.timeout.as_secs()),
        )
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic".to_string())
}
