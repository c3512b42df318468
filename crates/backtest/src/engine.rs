//! Prediction tracking engine.
//!
//! One engine owns one prediction log. Construct it once at startup and pass
//! it to whatever records, resolves, or reports predictions.
//!
//! # Example
//!
//! ```ignore
//! let engine = BacktestingEngine::from_config(&config);
//! engine.record_opportunity(&opportunity, None)?;
//! // ... market closes ...
//! engine.update_outcome(&market_id, MarketOutcome::Yes, None, Some(0.99))?;
//! let metrics = engine.run_backtest(&BacktestFilter::new().with_model_version("v2"))?;
//! println!("{}", format_backtest_report(&metrics));
//! ```

use anyhow::Result;
use chrono::{DateTime, Utc};
use forecast_core::{
    AppConfig, MarketOutcome, MarketSource, Opportunity, PredictionRecord, ResolverConfig,
    TrackingConfig,
};
use forecast_data::PredictionStore;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::metrics::{BacktestFilter, BacktestMetrics, MetricsAggregator};
use crate::performance::PerformanceMetrics;
use crate::resolver::OutcomeResolver;

/// Counts from one sweep over pending predictions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSweep {
    /// Distinct markets looked up.
    pub checked: usize,
    pub resolved: usize,
    /// Markets still open, unknown to the source, or without final prices.
    pub unresolved: usize,
    /// Lookups that failed or timed out.
    pub errors: usize,
}

#[derive(Debug, Clone)]
pub struct BacktestingEngine {
    store: Arc<PredictionStore>,
    resolver: OutcomeResolver,
    tracking: TrackingConfig,
    lookup_timeout: Duration,
}

impl BacktestingEngine {
    #[must_use]
    pub fn new(
        store: Arc<PredictionStore>,
        resolver: OutcomeResolver,
        tracking: TrackingConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            tracking,
            lookup_timeout: Duration::from_secs(ResolverConfig::default().lookup_timeout_secs),
        }
    }

    /// Bounds each market lookup made by [`resolve_pending`](Self::resolve_pending).
    #[must_use]
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Engine over the live prediction log named by `config`.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::at_path(config.storage.predictions_path(), config)
    }

    /// Engine over an explicit log path, with the other settings from `config`.
    #[must_use]
    pub fn at_path(path: impl Into<PathBuf>, config: &AppConfig) -> Self {
        Self::new(
            Arc::new(PredictionStore::new(path)),
            OutcomeResolver::from_config(&config.resolver),
            config.tracking.clone(),
        )
        .with_lookup_timeout(Duration::from_secs(config.resolver.lookup_timeout_secs))
    }

    #[must_use]
    pub fn store(&self) -> &PredictionStore {
        &self.store
    }

    #[must_use]
    pub fn resolver(&self) -> &OutcomeResolver {
        &self.resolver
    }

    /// Records analyzer output as a pending prediction made now.
    ///
    /// Returns `None` when the opportunity is below the configured confidence
    /// floor or its market already has a pending prediction.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be written.
    pub fn record_opportunity(
        &self,
        opportunity: &Opportunity,
        model_version: Option<&str>,
    ) -> Result<Option<PredictionRecord>> {
        if opportunity.confidence < self.tracking.min_confidence_to_record {
            debug!(
                market_id = %opportunity.market_id,
                confidence = opportunity.confidence,
                "Skipping low-confidence prediction"
            );
            return Ok(None);
        }

        let version = model_version.unwrap_or(&self.tracking.default_model_version);
        let record = PredictionRecord::from_opportunity(opportunity, Utc::now(), version);
        Ok(self.record(&record)?.then_some(record))
    }

    /// Appends a prepared record. `false` if refused as a duplicate pending prediction.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be written.
    pub fn record(&self, record: &PredictionRecord) -> Result<bool> {
        Ok(self.store.append(record)?)
    }

    /// Resolves the oldest pending prediction for `market_id`.
    ///
    /// `resolved_at` defaults to now. Returns `false` if nothing was pending.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or rewritten.
    pub fn update_outcome(
        &self,
        market_id: &str,
        outcome: MarketOutcome,
        resolved_at: Option<DateTime<Utc>>,
        final_price: Option<f64>,
    ) -> Result<bool> {
        Ok(self.store.update_outcome(
            market_id,
            outcome,
            resolved_at.unwrap_or_else(Utc::now),
            final_price,
        )?)
    }

    /// Summarizes resolved predictions matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn run_backtest(&self, filter: &BacktestFilter) -> Result<BacktestMetrics> {
        self.run_backtest_at(filter, Utc::now())
    }

    /// Same as [`run_backtest`](Self::run_backtest) with an explicit "now"
    /// for the minimum-age filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn run_backtest_at(
        &self,
        filter: &BacktestFilter,
        now: DateTime<Utc>,
    ) -> Result<BacktestMetrics> {
        let records = self.store.load_all()?;
        Ok(MetricsAggregator::new(filter.clone()).summarize_at(&records, now))
    }

    /// Tracker-style summary over the whole log.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn performance(&self) -> Result<PerformanceMetrics> {
        Ok(PerformanceMetrics::from_records(&self.store.load_all()?))
    }

    /// Looks up every market with a pending prediction and resolves those
    /// that have settled.
    ///
    /// Lookup failures and lookups exceeding the configured timeout are
    /// counted and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the log cannot be read or rewritten.
    pub async fn resolve_pending(&self, source: &dyn MarketSource) -> Result<ResolutionSweep> {
        let pending = self.store.pending()?;
        let mut seen = HashSet::new();
        let market_ids: Vec<String> = pending
            .into_iter()
            .map(|r| r.market_id)
            .filter(|id| seen.insert(id.clone()))
            .collect();

        let mut sweep = ResolutionSweep::default();
        for market_id in market_ids {
            sweep.checked += 1;

            let lookup = tokio::time::timeout(self.lookup_timeout, source.market(&market_id));
            let market = match lookup.await {
                Ok(Ok(Some(market))) => market,
                Ok(Ok(None)) => {
                    debug!(market_id = %market_id, "Market not found in source");
                    sweep.unresolved += 1;
                    continue;
                }
                Ok(Err(e)) => {
                    warn!(market_id = %market_id, error = %e, "Failed to fetch market");
                    sweep.errors += 1;
                    continue;
                }
                Err(_) => {
                    warn!(
                        market_id = %market_id,
                        timeout_secs = self.lookup_timeout.as_secs(),
                        "Market lookup timed out"
                    );
                    sweep.errors += 1;
                    continue;
                }
            };

            let Some(resolution) = self.resolver.resolve(&market) else {
                sweep.unresolved += 1;
                continue;
            };

            let now = Utc::now();
            let resolved_at = market.end_date.filter(|end| *end <= now).unwrap_or(now);
            if self.store.update_outcome(
                &market_id,
                resolution.outcome,
                resolved_at,
                Some(resolution.final_price),
            )? {
                sweep.resolved += 1;
            }
        }

        info!(
            checked = sweep.checked,
            resolved = sweep.resolved,
            unresolved = sweep.unresolved,
            errors = sweep.errors,
            "Pending prediction sweep complete"
        );
        Ok(sweep)
    }
}
