//! One fetch-and-synthesize cycle

use super::registry::{SourceKey, SourceRegistry};
use super::types::{CrossRateEntry, RateSnapshot};
use crate::config::{CrossRateConfig, ReportConfig};
use crate::fetch::{FetchOrchestrator, FetchTask};
use crate::quote::{CurrencyPair, Quote};
use crate::source::Marketplace;
use crate::synthesis::{synthesize, SynthesisConfig};
use crate::telemetry::{self, GaugeMetric};
use chrono::Local;
use std::collections::HashMap;

/// Fetch slots of one cross-rate
#[derive(Debug, Clone)]
struct CrossSlots {
    source: Marketplace,
    from: usize,
    reference: Option<usize>,
}

/// Task list plus where each report row finds its quote
///
/// A (source, pair) requested by several rows is fetched once.
#[derive(Debug, Default)]
struct FetchPlan {
    tasks: Vec<FetchTask>,
    index: HashMap<(SourceKey, CurrencyPair), usize>,
    fiat: Vec<usize>,
    p2p: Vec<usize>,
    target: usize,
    cross: Vec<CrossSlots>,
}

impl FetchPlan {
    fn slot(
        &mut self,
        registry: &SourceRegistry,
        key: SourceKey,
        pair: CurrencyPair,
    ) -> anyhow::Result<usize> {
        if let Some(&slot) = self.index.get(&(key, pair.clone())) {
            return Ok(slot);
        }

        let adapter = registry.require(key)?.clone();
        let slot = self.tasks.len();
        self.tasks.push(FetchTask::new(adapter, pair.clone()));
        self.index.insert((key, pair), slot);
        Ok(slot)
    }
}

/// Fetches every configured quote in one fan-out and derives the report data
pub struct RatePipeline {
    orchestrator: FetchOrchestrator,
    plan: FetchPlan,
    rates: SynthesisConfig,
}

impl RatePipeline {
    /// Resolve every configured row against the registry
    ///
    /// Fails when a row names a source that is not registered.
    pub fn new(
        orchestrator: FetchOrchestrator,
        registry: &SourceRegistry,
        report: &ReportConfig,
        synthesis: &CrossRateConfig,
    ) -> anyhow::Result<Self> {
        let mut plan = FetchPlan::default();

        for pair in &report.fiat_pairs {
            let slot = plan.slot(registry, SourceKey::Fiat, pair.clone())?;
            plan.fiat.push(slot);
        }

        for row in &report.p2p {
            let slot = plan.slot(registry, SourceKey::Market(row.source), row.pair.clone())?;
            plan.p2p.push(slot);
        }

        let target_pair = CurrencyPair::new(&synthesis.bridge, &synthesis.target)?;
        plan.target = plan.slot(registry, SourceKey::Market(synthesis.target_source), target_pair)?;

        for currency in &synthesis.currencies {
            let from_pair = CurrencyPair::new(&synthesis.bridge, &currency.fiat)?;
            let from = plan.slot(registry, SourceKey::Market(currency.source), from_pair)?;

            // Reference is quoted target -> fiat, the same direction as the cross-rate
            let reference = if registry.has_fiat() {
                let pair = CurrencyPair::new(&synthesis.target, &currency.fiat)?;
                Some(plan.slot(registry, SourceKey::Fiat, pair)?)
            } else {
                None
            };

            plan.cross.push(CrossSlots {
                source: currency.source,
                from,
                reference,
            });
        }

        tracing::info!(
            tasks = plan.tasks.len(),
            fiat_rows = plan.fiat.len(),
            p2p_rows = plan.p2p.len(),
            cross_rates = plan.cross.len(),
            "Rate pipeline ready"
        );

        Ok(Self {
            orchestrator,
            plan,
            rates: synthesis.rates(),
        })
    }

    /// Distinct fetches per cycle
    pub fn task_count(&self) -> usize {
        self.plan.tasks.len()
    }

    /// Run one full fan-out and synthesize every cross-rate
    ///
    /// Synthesis starts only after every fetch has finished or timed out.
    pub async fn fetch_snapshot(&self) -> RateSnapshot {
        let quotes = self.orchestrator.run(&self.plan.tasks).await;
        let pick = |slots: &[usize]| -> Vec<Quote> {
            slots.iter().map(|&slot| quotes[slot].clone()).collect()
        };

        let target = &quotes[self.plan.target];
        let cross_rates = self
            .plan
            .cross
            .iter()
            .map(|slots| {
                let from = &quotes[slots.from];
                let reference = slots.reference.map(|slot| &quotes[slot]);
                let result = synthesize(from, target, &self.rates, reference);
                if result.is_none() {
                    tracing::warn!(from = %from.pair(), to = %target.pair(), "Cross-rate unavailable");
                }
                CrossRateEntry::new(slots.source, from, target, result)
            })
            .collect();

        let available = quotes.iter().filter(|q| q.is_available()).count();
        telemetry::set_gauge(GaugeMetric::AvailableQuotes, available as f64);
        tracing::info!(available, total = quotes.len(), "Fetch cycle complete");

        RateSnapshot {
            fetched_at: Local::now(),
            fiat_rates: pick(&self.plan.fiat),
            p2p_rates: pick(&self.plan.p2p),
            cross_rates,
        }
    }
}
