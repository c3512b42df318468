//! Replay of the prediction pipeline against markets that already closed.
//!
//! For each closed market the simulator picks a prediction instant a fixed
//! number of days before the close, gathers the context that was knowable
//! then, asks the analyzer for a recommendation, and records it together
//! with the known outcome. The replayed records then go through the same
//! metrics as live predictions.
//!
//! # Context fidelity
//!
//! Market sources rarely keep price history and news APIs rarely behave as
//! archives. When the simulator has to fall back to final prices, or the
//! news source is not point-in-time, the record is marked
//! `best_effort_context` and the run reports how many such records it made.
//! News published after the prediction instant is always discarded.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use forecast_core::{
    Analyzer, HistoricalConfig, Market, MarketSource, NewsArticle, NewsSource, PredictionRecord,
    PriceQuote,
};
use futures_util::stream::{self, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::engine::BacktestingEngine;
use crate::metrics::{BacktestFilter, BacktestMetrics};

const STOP_WORDS: &[&str] = &[
    "will", "would", "should", "could", "may", "might", "the", "a", "an", "by", "before", "after",
    "during", "in", "on", "at", "to", "for", "and", "or", "but", "if", "then", "than", "as", "be",
    "is", "are", "was", "were", "been", "being", "have", "has", "had", "do", "does", "did", "get",
    "go", "make", "take", "come", "see", "know", "think", "say", "tell", "ask", "work", "seem",
    "feel", "try", "leave", "call",
];

/// Maximum number of words in a news query.
const MAX_SEARCH_TERMS: usize = 5;

/// Builds a news query from a market question.
///
/// Lowercases, strips question marks, drops stop words and words of two
/// characters or fewer, and keeps the first five remaining words.
#[must_use]
pub fn extract_search_terms(question: &str) -> String {
    question
        .to_lowercase()
        .replace('?', "")
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .take(MAX_SEARCH_TERMS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Why a candidate market was not replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    NotClosed,
    NotBinary,
    MissingEndDate,
    OutsideWindow,
    InsufficientVolume,
    CategoryMismatch,
}

impl fmt::Display for GateRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NotClosed => "market not closed",
            Self::NotBinary => "market does not have exactly two outcomes",
            Self::MissingEndDate => "market has no end date",
            Self::OutsideWindow => "market closed outside the look-back window",
            Self::InsufficientVolume => "market volume below minimum",
            Self::CategoryMismatch => "market category not selected",
        };
        f.write_str(reason)
    }
}

/// Checks a candidate against the selection gates.
///
/// Markets without a category pass a category allow-list.
///
/// # Errors
///
/// Returns the first gate the market fails.
pub fn check_gates(
    market: &Market,
    config: &HistoricalConfig,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<(), GateRejection> {
    if !market.closed {
        return Err(GateRejection::NotClosed);
    }
    let Some(end_date) = market.end_date else {
        return Err(GateRejection::MissingEndDate);
    };
    if end_date < from || end_date > to {
        return Err(GateRejection::OutsideWindow);
    }
    if !config.categories.is_empty() {
        if let Some(category) = &market.category {
            if !config
                .categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(category))
            {
                return Err(GateRejection::CategoryMismatch);
            }
        }
    }
    if !market.is_binary() {
        return Err(GateRejection::NotBinary);
    }
    match market.volume {
        Some(volume) if volume >= config.min_volume_usd && volume > Decimal::ZERO => Ok(()),
        _ => Err(GateRejection::InsufficientVolume),
    }
}

/// Summary of one historical replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalBacktestResult {
    /// Markets that passed the gates and were run through the analyzer.
    pub markets_tested: usize,
    pub successful_predictions: usize,
    /// Analyzer errors, timeouts, undeterminable outcomes, and failed writes.
    pub failed_predictions: usize,
    /// Markets rejected by a gate or for which the analyzer found nothing.
    pub filtered_markets: usize,
    /// Successful predictions made with context not limited to the prediction instant.
    pub best_effort_predictions: usize,
    pub metrics: BacktestMetrics,
    pub markets_by_category: BTreeMap<String, usize>,
    /// `"<N>d_before"` → number of predictions made N days before close.
    pub prediction_timeframes: BTreeMap<String, usize>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl HistoricalBacktestResult {
    /// Successful predictions over markets tested.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.markets_tested == 0 {
            return 0.0;
        }
        self.successful_predictions as f64 / self.markets_tested as f64
    }
}

/// What happened to one market that passed the gates.
#[derive(Debug)]
enum MarketRun {
    Predicted {
        record: Box<PredictionRecord>,
        category: String,
    },
    NoOpportunity,
    Failed(anyhow::Error),
}

/// Context reconstructed for a simulated prediction instant.
struct PredictionContext {
    quote: PriceQuote,
    news: Vec<NewsArticle>,
    best_effort: bool,
}

/// Replays the analyzer over closed markets and records the results.
pub struct HistoricalSimulator {
    engine: BacktestingEngine,
    markets: Arc<dyn MarketSource>,
    news: Option<Arc<dyn NewsSource>>,
    analyzer: Arc<dyn Analyzer>,
    config: HistoricalConfig,
}

impl HistoricalSimulator {
    /// `engine` should own a log dedicated to replayed predictions.
    #[must_use]
    pub fn new(
        engine: BacktestingEngine,
        markets: Arc<dyn MarketSource>,
        analyzer: Arc<dyn Analyzer>,
        config: HistoricalConfig,
    ) -> Self {
        Self {
            engine,
            markets,
            news: None,
            analyzer,
            config,
        }
    }

    /// Adds a news collaborator. Without one, the analyzer gets no articles.
    #[must_use]
    pub fn with_news(mut self, news: Arc<dyn NewsSource>) -> Self {
        self.news = Some(news);
        self
    }

    #[must_use]
    pub fn config(&self) -> &HistoricalConfig {
        &self.config
    }

    #[must_use]
    pub fn engine(&self) -> &BacktestingEngine {
        &self.engine
    }

    /// Runs the replay over markets that closed in the last `days_back` days.
    ///
    /// # Errors
    ///
    /// Returns an error only if the prediction log cannot be read for the
    /// final metrics. Collaborator failures are counted per market.
    pub async fn run(&self) -> Result<HistoricalBacktestResult> {
        self.run_at(Utc::now()).await
    }

    /// Same as [`run`](Self::run) with an explicit "now".
    ///
    /// # Errors
    ///
    /// Returns an error only if the prediction log cannot be read.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<HistoricalBacktestResult> {
        let started_at = Utc::now();
        let from = now - Duration::days(self.config.days_back);
        info!(
            days_back = self.config.days_back,
            max_markets = self.config.max_markets,
            window_days = self.config.prediction_window_days,
            analyzer = self.analyzer.name(),
            "Starting historical backtest"
        );

        let candidates = match self
            .call("closed market fetch", self.markets.closed_markets(from, now))
            .await
        {
            Ok(markets) => markets,
            Err(e) => {
                error!(error = %e, "Failed to fetch closed markets");
                Vec::new()
            }
        };

        let mut filtered_markets = 0;
        let mut selected = Vec::new();
        for market in candidates {
            if selected.len() >= self.config.max_markets {
                break;
            }
            match check_gates(&market, &self.config, from, now) {
                Ok(()) => selected.push(market),
                Err(reason) => {
                    debug!(market_id = %market.market_id, %reason, "Market filtered out");
                    filtered_markets += 1;
                }
            }
        }
        info!(selected = selected.len(), filtered = filtered_markets, "Selected closed markets");

        let markets_tested = selected.len();
        let concurrency = self.config.concurrency.max(1);
        let mut runs = stream::iter(selected.iter())
            .map(|market| self.replay_market(market))
            .buffered(concurrency);

        let mut successful_predictions = 0;
        let mut failed_predictions = 0;
        let mut best_effort_predictions = 0;
        let mut markets_by_category = BTreeMap::new();
        let mut prediction_timeframes = BTreeMap::new();
        let timeframe = format!("{}d_before", self.config.prediction_window_days);

        // writes happen here, one at a time, in market order
        while let Some(run) = runs.next().await {
            match run {
                MarketRun::Predicted { record, category } => match self.engine.record(&record) {
                    Ok(_) => {
                        successful_predictions += 1;
                        if record.best_effort_context {
                            best_effort_predictions += 1;
                        }
                        *markets_by_category.entry(category).or_insert(0) += 1;
                        *prediction_timeframes.entry(timeframe.clone()).or_insert(0) += 1;
                    }
                    Err(e) => {
                        error!(
                            market_id = %record.market_id,
                            error = %e,
                            "Failed to record prediction"
                        );
                        failed_predictions += 1;
                    }
                },
                MarketRun::NoOpportunity => filtered_markets += 1,
                MarketRun::Failed(e) => {
                    warn!(error = %e, "Historical prediction failed");
                    failed_predictions += 1;
                }
            }
        }

        let filter = BacktestFilter::new().with_model_version(&self.config.model_version);
        let metrics = self.engine.run_backtest_at(&filter, now)?;

        info!(
            tested = markets_tested,
            successful = successful_predictions,
            failed = failed_predictions,
            filtered = filtered_markets,
            best_effort = best_effort_predictions,
            accuracy = metrics.accuracy,
            "Historical backtest complete"
        );

        Ok(HistoricalBacktestResult {
            markets_tested,
            successful_predictions,
            failed_predictions,
            filtered_markets,
            best_effort_predictions,
            metrics,
            markets_by_category,
            prediction_timeframes,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn replay_market(&self, market: &Market) -> MarketRun {
        let Some(end_date) = market.end_date else {
            return MarketRun::Failed(anyhow!("market {} has no end date", market.market_id));
        };
        let prediction_time = end_date - Duration::days(self.config.prediction_window_days);
        info!(
            market_id = %market.market_id,
            question = %market.question,
            %prediction_time,
            "Backtesting market"
        );

        let context = self.gather_context(market, prediction_time).await;

        let opportunity = match self
            .call(
                "analyzer",
                self.analyzer.analyze(market, &context.quote, &context.news),
            )
            .await
        {
            Ok(Some(opportunity)) => opportunity,
            Ok(None) => {
                debug!(market_id = %market.market_id, "Analyzer found no opportunity");
                return MarketRun::NoOpportunity;
            }
            Err(e) => {
                let context = format!("analyzing market {}", market.market_id);
                return MarketRun::Failed(e.context(context));
            }
        };

        let Some(resolution) = self.engine.resolver().resolve(market) else {
            return MarketRun::Failed(anyhow!(
                "could not determine outcome for market {}",
                market.market_id
            ));
        };

        let mut record = PredictionRecord::from_opportunity(
            &opportunity,
            prediction_time,
            self.config.model_version.as_str(),
        );
        if record.category.is_none() {
            record.category = market.category.clone();
        }
        if record.market_end_date.is_none() {
            record.market_end_date = Some(end_date);
        }
        record.best_effort_context = context.best_effort;
        record.resolve(resolution.outcome, end_date, Some(resolution.final_price));

        MarketRun::Predicted {
            category: market.category_label().to_string(),
            record: Box::new(record),
        }
    }

    async fn gather_context(
        &self,
        market: &Market,
        prediction_time: DateTime<Utc>,
    ) -> PredictionContext {
        let mut best_effort = false;

        let historical_quote = match self
            .call("price history", self.markets.price_at(market, prediction_time))
            .await
        {
            Ok(quote) => quote,
            Err(e) => {
                warn!(
                    market_id = %market.market_id,
                    error = %e,
                    "Failed to fetch historical prices"
                );
                None
            }
        };
        let quote = historical_quote.unwrap_or_else(|| {
            best_effort = true;
            let yes_price = market.yes_price().unwrap_or(0.5);
            PriceQuote {
                yes_price,
                no_price: market.no_price().unwrap_or(1.0 - yes_price),
                timestamp: prediction_time,
            }
        });

        let news = match &self.news {
            None => Vec::new(),
            Some(source) => {
                if !source.is_point_in_time() {
                    best_effort = true;
                }
                let query = extract_search_terms(&market.question);
                let from = prediction_time - Duration::days(self.config.news_lookback_days);
                match self
                    .call("news search", source.search(&query, from, prediction_time))
                    .await
                {
                    Ok(articles) => articles
                        .into_iter()
                        .filter(|a| a.published_at <= prediction_time)
                        .collect(),
                    Err(e) => {
                        warn!(
                            market_id = %market.market_id,
                            error = %e,
                            "Failed to get historical news"
                        );
                        Vec::new()
                    }
                }
            }
        };

        PredictionContext {
            quote,
            news,
            best_effort,
        }
    }

    async fn call<T>(&self, what: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let secs = self.config.collaborator_timeout_secs;
        match tokio::time::timeout(std::time::Duration::from_secs(secs), fut).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("{what} timed out after {secs}s")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::Token;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-06-30T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn market() -> Market {
        Market {
            market_id: "0x1".to_string(),
            question: "Will it rain?".to_string(),
            category: Some("Weather".to_string()),
            end_date: Some(now() - Duration::days(3)),
            closed: true,
            tokens: vec![
                Token {
                    token_id: "y".to_string(),
                    outcome: "Yes".to_string(),
                    price: Some(1.0),
                },
                Token {
                    token_id: "n".to_string(),
                    outcome: "No".to_string(),
                    price: Some(0.0),
                },
            ],
            volume: Some(dec!(5000)),
        }
    }

    fn gate(market: &Market, config: &HistoricalConfig) -> Result<(), GateRejection> {
        check_gates(market, config, now() - Duration::days(30), now())
    }

    #[test]
    fn search_terms_drop_stop_words_and_short_words() {
        assert_eq!(
            extract_search_terms("Will the Fed cut interest rates before the July meeting?"),
            "fed cut interest rates july"
        );
        assert_eq!(extract_search_terms("Will it be?"), "");
    }

    #[test]
    fn search_terms_keep_first_five() {
        assert_eq!(
            extract_search_terms("Bitcoin Ethereum Solana Cardano Polkadot Avalanche"),
            "bitcoin ethereum solana cardano polkadot"
        );
    }

    #[test]
    fn suitable_market_passes_gates() {
        assert_eq!(gate(&market(), &HistoricalConfig::default()), Ok(()));
    }

    #[test]
    fn each_gate_rejects() {
        let config = HistoricalConfig::default();

        let mut m = market();
        m.volume = Some(dec!(999));
        assert_eq!(gate(&m, &config), Err(GateRejection::InsufficientVolume));

        let mut m = market();
        m.volume = None;
        assert_eq!(gate(&m, &config), Err(GateRejection::InsufficientVolume));

        let mut m = market();
        m.tokens.pop();
        assert_eq!(gate(&m, &config), Err(GateRejection::NotBinary));

        let mut m = market();
        m.end_date = None;
        assert_eq!(gate(&m, &config), Err(GateRejection::MissingEndDate));

        let mut m = market();
        m.end_date = Some(now() - Duration::days(45));
        assert_eq!(gate(&m, &config), Err(GateRejection::OutsideWindow));

        let mut m = market();
        m.closed = false;
        assert_eq!(gate(&m, &config), Err(GateRejection::NotClosed));
    }

    #[test]
    fn category_allow_list_is_case_insensitive() {
        let config = HistoricalConfig {
            categories: vec!["weather".to_string()],
            ..HistoricalConfig::default()
        };
        assert_eq!(gate(&market(), &config), Ok(()));

        let mut sports = market();
        sports.category = Some("Sports".to_string());
        assert_eq!(gate(&sports, &config), Err(GateRejection::CategoryMismatch));

        let mut uncategorised = market();
        uncategorised.category = None;
        assert_eq!(gate(&uncategorised, &config), Ok(()));
    }
}
