//! Recent predictions CLI command.

use anyhow::Result;
use clap::Args;
use forecast_backtest::BacktestingEngine;
use forecast_core::{AppConfig, PredictionRecord};

use super::OutputFormat;

/// Arguments for the recent command.
#[derive(Args, Debug, Clone)]
pub struct RecentArgs {
    /// Show predictions made within this many days
    #[arg(long, default_value = "7")]
    pub days: i64,

    /// Output format: text, json (default: text)
    #[arg(long, default_value = "text")]
    pub format: String,
}

fn status_label(record: &PredictionRecord) -> String {
    match (record.outcome(), record.was_correct()) {
        (None, _) => "PENDING".to_string(),
        (Some(outcome), Some(true)) => format!("{outcome} (correct)"),
        (Some(outcome), Some(false)) => format!("{outcome} (wrong)"),
        (Some(outcome), None) => outcome.to_string(),
    }
}

fn format_line(record: &PredictionRecord) -> String {
    format!(
        "{}  {:<20} {:<3} p={:.2} conf={:.2} price={:.2}  {}",
        record.prediction_timestamp.format("%Y-%m-%d %H:%M"),
        record.market_id,
        record.recommended_position.as_str(),
        record.predicted_probability,
        record.confidence,
        record.market_price_at_prediction,
        status_label(record)
    )
}

/// Runs the recent command.
///
/// # Errors
/// Returns an error if the log cannot be read.
pub fn run_recent(config: &AppConfig, args: RecentArgs) -> Result<()> {
    let format = OutputFormat::parse(&args.format)?;
    let engine = BacktestingEngine::from_config(config);
    let records = engine.store().records_since(args.days)?;

    match format {
        OutputFormat::Text => {
            if records.is_empty() {
                println!("No predictions in the last {} days", args.days);
            }
            for record in &records {
                println!("{}", format_line(record));
            }
        }
        OutputFormat::Json => {
            let rows: Vec<_> = records
                .iter()
                .map(forecast_data::PersistedPrediction::from_record)
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forecast_core::{MarketOutcome, Position};

    #[test]
    fn status_labels() {
        let now = Utc::now();
        let mut record = PredictionRecord::new("0x1", "Q?", Position::No, 0.6, 0.7, 0.4, now, "v1");
        assert_eq!(status_label(&record), "PENDING");

        record.resolve(MarketOutcome::No, now, None);
        assert_eq!(status_label(&record), "NO (correct)");

        let mut void = PredictionRecord::new("0x2", "Q?", Position::No, 0.6, 0.7, 0.4, now, "v1");
        void.resolve(MarketOutcome::Invalid, now, None);
        assert_eq!(status_label(&void), "INVALID");
        assert!(format_line(&void).contains("0x2"));
    }
}
