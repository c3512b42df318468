//! Record CLI command.
//!
//! Appends analyzer opportunities from a JSON file to the live log.

use anyhow::Result;
use clap::Args;
use forecast_backtest::BacktestingEngine;
use forecast_core::AppConfig;
use std::path::PathBuf;

use crate::sources::load_opportunities;

/// Arguments for the record command.
#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    /// JSON file holding an array of opportunities
    #[arg(long)]
    pub opportunities: PathBuf,

    /// Model version tag (defaults to tracking.default_model_version)
    #[arg(long)]
    pub model_version: Option<String>,
}

/// Runs the record command.
///
/// # Errors
/// Returns an error if the input cannot be parsed or the log cannot be written.
pub fn run_record(config: &AppConfig, args: RecordArgs) -> Result<()> {
    let opportunities = load_opportunities(&args.opportunities)?;
    let engine = BacktestingEngine::from_config(config);

    let mut recorded = 0;
    for opportunity in &opportunities {
        if engine
            .record_opportunity(opportunity, args.model_version.as_deref())?
            .is_some()
        {
            recorded += 1;
        }
    }

    tracing::info!(
        recorded,
        skipped = opportunities.len() - recorded,
        "Finished recording opportunities"
    );
    println!("Recorded {recorded} of {} opportunities", opportunities.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn records_each_market_once() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.storage.data_dir = dir.path().to_path_buf();

        let input = dir.path().join("opportunities.json");
        let opportunity = r#"{
            "market_id": "0xabc",
            "question": "Will it rain?",
            "recommended_position": "YES",
            "fair_yes_price": 0.7,
            "fair_no_price": 0.3,
            "current_yes_price": 0.5,
            "current_no_price": 0.5,
            "confidence_score": 0.8
        }"#;
        std::fs::write(&input, format!("[{opportunity}, {opportunity}]")).unwrap();

        run_record(
            &config,
            RecordArgs {
                opportunities: input,
                model_version: Some("v3".to_string()),
            },
        )
        .unwrap();

        let records = BacktestingEngine::from_config(&config)
            .store()
            .load_all()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].model_version, "v3");
    }
}
