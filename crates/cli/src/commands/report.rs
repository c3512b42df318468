//! Report CLI command.
//!
//! Summarizes the live prediction log: either the backtest metrics over
//! resolved predictions or the tracker-style performance view.

use anyhow::Result;
use clap::Args;
use forecast_backtest::{
    format_backtest_report, format_performance_report, BacktestFilter, BacktestingEngine,
};
use forecast_core::AppConfig;

use super::OutputFormat;

/// Arguments for the report command.
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Only include predictions tagged with this model version
    #[arg(long)]
    pub model_version: Option<String>,

    /// Only include predictions made at least this many days ago
    #[arg(long)]
    pub min_days: Option<i64>,

    /// Only include predictions in this category
    #[arg(long)]
    pub category: Option<String>,

    /// Show the tracker view (risk and confidence bands) instead
    #[arg(long)]
    pub performance: bool,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

impl ReportArgs {
    fn filter(&self) -> BacktestFilter {
        let mut filter = BacktestFilter::new();
        if let Some(version) = &self.model_version {
            filter = filter.with_model_version(version);
        }
        if let Some(days) = self.min_days {
            filter = filter.with_min_days(days);
        }
        if let Some(category) = &self.category {
            filter = filter.with_category(category);
        }
        filter
    }
}

/// Runs the report command.
///
/// # Errors
/// Returns an error if the prediction log cannot be read.
pub fn run_report(config: &AppConfig, args: ReportArgs) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let engine = BacktestingEngine::from_config(config);
    tracing::debug!(path = %engine.store().path().display(), "Reading prediction log");

    let rendered = if args.performance {
        let metrics = engine.performance()?;
        match format {
            OutputFormat::Text => format_performance_report(&metrics),
            OutputFormat::Json => serde_json::to_string_pretty(&metrics)?,
        }
    } else {
        let metrics = engine.run_backtest(&args.filter())?;
        match format {
            OutputFormat::Text => format_backtest_report(&metrics),
            OutputFormat::Json => serde_json::to_string_pretty(&metrics)?,
        }
    };

    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use forecast_core::{MarketOutcome, Position, PredictionRecord};

    fn args() -> ReportArgs {
        ReportArgs {
            model_version: None,
            min_days: None,
            category: None,
            performance: false,
            format: "text".to_string(),
        }
    }

    #[test]
    fn filter_built_from_flags() {
        let filter = ReportArgs {
            model_version: Some("v2".to_string()),
            min_days: Some(3),
            ..args()
        }
        .filter();

        let now = Utc::now();
        let mut fresh = PredictionRecord::new("M", "Q?", Position::Yes, 0.7, 0.8, 0.5, now, "v2");
        fresh.resolve(MarketOutcome::Yes, now, None);
        let mut old = fresh.clone();
        old.prediction_timestamp = now - Duration::days(10);
        let mut other_version = old.clone();
        other_version.model_version = "v1".to_string();

        assert!(!filter.matches(&fresh, now));
        assert!(filter.matches(&old, now));
        assert!(!filter.matches(&other_version, now));
    }

    #[test]
    fn rejects_unknown_format() {
        let config = AppConfig::default();
        let result = run_report(
            &config,
            ReportArgs {
                format: "yaml".to_string(),
                ..args()
            },
        );
        assert!(result.is_err());
    }
}
