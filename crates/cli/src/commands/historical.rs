//! Historical backtest CLI command.
//!
//! Replays pre-computed opportunities over a snapshot of closed markets and
//! writes the results to the historical prediction log.

use anyhow::{anyhow, Result};
use clap::Args;
use forecast_backtest::{format_historical_report, BacktestingEngine, HistoricalSimulator};
use forecast_core::{AppConfig, HistoricalConfig};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;

use super::OutputFormat;
use crate::sources::{ReplayAnalyzer, SnapshotMarketSource, SnapshotNewsSource};

/// Arguments for the historical command.
#[derive(Args, Debug, Clone)]
pub struct HistoricalArgs {
    /// JSON file holding an array of closed markets with final prices
    #[arg(long)]
    pub markets: PathBuf,

    /// JSON file holding an array of opportunities keyed by market id
    #[arg(long)]
    pub opportunities: PathBuf,

    /// Optional JSON file holding an array of news articles
    #[arg(long)]
    pub news: Option<PathBuf>,

    /// Look-back window for closed markets, in days
    #[arg(long)]
    pub days_back: Option<i64>,

    /// Maximum number of markets to replay
    #[arg(long)]
    pub max_markets: Option<usize>,

    /// Days before close at which predictions are simulated
    #[arg(long)]
    pub window_days: Option<i64>,

    /// Minimum lifetime volume in USD
    #[arg(long)]
    pub min_volume: Option<f64>,

    /// Restrict to these categories (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<String>,

    /// Write replayed predictions here instead of the configured historical log
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

impl HistoricalArgs {
    /// Applies command-line overrides on top of the configured section.
    fn apply(&self, base: &HistoricalConfig) -> Result<HistoricalConfig> {
        let mut config = base.clone();
        if let Some(days) = self.days_back {
            config.days_back = days;
        }
        if let Some(max) = self.max_markets {
            config.max_markets = max;
        }
        if let Some(days) = self.window_days {
            config.prediction_window_days = days;
        }
        if let Some(volume) = self.min_volume {
            config.min_volume_usd = Decimal::try_from(volume)
                .map_err(|_| anyhow!("Invalid minimum volume: {}", volume))?;
        }
        if !self.categories.is_empty() {
            config.categories = self.categories.clone();
        }
        if config.days_back <= 0 || config.prediction_window_days < 0 {
            return Err(anyhow!(
                "days_back must be positive and window_days non-negative (got {} and {})",
                config.days_back,
                config.prediction_window_days
            ));
        }
        Ok(config)
    }
}

/// Runs the historical command.
///
/// # Errors
/// Returns an error if an input file cannot be parsed or the log cannot be read.
pub async fn run_historical(config: &AppConfig, args: HistoricalArgs) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let historical = args.apply(&config.historical)?;

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| config.storage.historical_predictions_path());
    tracing::info!(path = %path.display(), "Writing replayed predictions");

    let engine = BacktestingEngine::at_path(path, config);
    let markets = Arc::new(SnapshotMarketSource::from_file(&args.markets)?);
    let analyzer = Arc::new(ReplayAnalyzer::from_file(&args.opportunities)?);

    let mut simulator = HistoricalSimulator::new(engine, markets, analyzer, historical);
    if let Some(news) = &args.news {
        simulator = simulator.with_news(Arc::new(SnapshotNewsSource::from_file(news)?));
    }

    let result = simulator.run().await?;
    match format {
        OutputFormat::Text => println!("{}", format_historical_report(&result)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, SecondsFormat, Utc};
    use tempfile::TempDir;

    fn args(dir: &TempDir) -> HistoricalArgs {
        HistoricalArgs {
            markets: dir.path().join("markets.json"),
            opportunities: dir.path().join("opportunities.json"),
            news: None,
            days_back: None,
            max_markets: None,
            window_days: None,
            min_volume: None,
            categories: Vec::new(),
            output: Some(dir.path().join("historical.jsonl")),
            format: "json".to_string(),
        }
    }

    #[test]
    fn overrides_apply_on_top_of_config() {
        let dir = TempDir::new().unwrap();
        let config = HistoricalArgs {
            days_back: Some(90),
            window_days: Some(3),
            min_volume: Some(250.0),
            categories: vec!["Crypto".to_string()],
            ..args(&dir)
        }
        .apply(&HistoricalConfig::default())
        .unwrap();

        assert_eq!(config.days_back, 90);
        assert_eq!(config.prediction_window_days, 3);
        assert_eq!(config.min_volume_usd, Decimal::from(250));
        assert_eq!(config.categories, vec!["Crypto".to_string()]);
        assert_eq!(config.max_markets, 50);
    }

    #[test]
    fn rejects_non_positive_window() {
        let dir = TempDir::new().unwrap();
        let result = HistoricalArgs {
            days_back: Some(0),
            ..args(&dir)
        }
        .apply(&HistoricalConfig::default());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn replays_snapshot_into_output_log() {
        let dir = TempDir::new().unwrap();
        let end = (Utc::now() - Duration::days(5)).to_rfc3339_opts(SecondsFormat::Secs, true);
        std::fs::write(
            dir.path().join("markets.json"),
            format!(
                r#"[{{
                    "market_id": "0x1",
                    "question": "Will the launch happen on schedule?",
                    "category": "Science",
                    "end_date": "{end}",
                    "closed": true,
                    "volume": "50000",
                    "tokens": [
                        {{"outcome": "Yes", "price": 0.99}},
                        {{"outcome": "No", "price": 0.01}}
                    ]
                }}]"#
            ),
        )
        .unwrap();
        std::fs::write(
            dir.path().join("opportunities.json"),
            r#"[{
                "market_id": "0x1",
                "question": "Will the launch happen on schedule?",
                "recommended_position": "YES",
                "fair_yes_price": 0.75,
                "fair_no_price": 0.25,
                "current_yes_price": 0.5,
                "current_no_price": 0.5,
                "confidence": 0.9
            }]"#,
        )
        .unwrap();

        let args = args(&dir);
        let output = args.output.clone().unwrap();
        run_historical(&AppConfig::default(), args).await.unwrap();

        let engine = BacktestingEngine::at_path(output, &AppConfig::default());
        let records = engine.store().load_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].was_correct(), Some(true));
        assert!(records[0].best_effort_context);
    }
}
