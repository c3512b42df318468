//! Resolution CLI commands.
//!
//! `resolve` overrides the outcome of one market by hand; `resolve-pending`
//! sweeps every pending prediction against a market snapshot.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Args;
use forecast_backtest::BacktestingEngine;
use forecast_core::{AppConfig, MarketOutcome};
use std::path::PathBuf;

use crate::sources::SnapshotMarketSource;

/// Arguments for the resolve command.
#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Market whose oldest pending prediction is resolved
    #[arg(long)]
    pub market_id: String,

    /// Outcome: yes, no, invalid
    #[arg(long)]
    pub outcome: MarketOutcome,

    /// Final price of the winning side
    #[arg(long)]
    pub final_price: Option<f64>,

    /// Resolution time in RFC 3339 format (defaults to now)
    #[arg(long)]
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Arguments for the resolve-pending command.
#[derive(Args, Debug, Clone)]
pub struct ResolvePendingArgs {
    /// JSON file holding an array of markets with their current prices
    #[arg(long)]
    pub markets: PathBuf,
}

/// Runs the resolve command.
///
/// # Errors
/// Returns an error if the log cannot be read or rewritten.
pub fn run_resolve(config: &AppConfig, args: ResolveArgs) -> Result<()> {
    let engine = BacktestingEngine::from_config(config);
    let updated =
        engine.update_outcome(&args.market_id, args.outcome, args.resolved_at, args.final_price)?;

    if updated {
        println!("Resolved {} as {}", args.market_id, args.outcome);
    } else {
        println!("No pending prediction for {}", args.market_id);
    }
    Ok(())
}

/// Runs the resolve-pending command.
///
/// # Errors
/// Returns an error if the snapshot cannot be parsed or the log cannot be rewritten.
pub async fn run_resolve_pending(config: &AppConfig, args: ResolvePendingArgs) -> Result<()> {
    let source = SnapshotMarketSource::from_file(&args.markets)?;
    let engine = BacktestingEngine::from_config(config);

    let sweep = engine.resolve_pending(&source).await?;
    println!(
        "Checked {} markets: {} resolved, {} unresolved, {} errors",
        sweep.checked, sweep.resolved, sweep.unresolved, sweep.errors
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::{Position, PredictionRecord};
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.data_dir = dir.path().to_path_buf();
        config
    }

    fn seed(config: &AppConfig, market_id: &str) {
        let record = PredictionRecord::new(
            market_id,
            "Will it rain?",
            Position::Yes,
            0.7,
            0.8,
            0.5,
            Utc::now(),
            "v1",
        );
        BacktestingEngine::from_config(config).record(&record).unwrap();
    }

    #[test]
    fn manual_resolution_scores_record() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        seed(&config, "0x1");

        run_resolve(
            &config,
            ResolveArgs {
                market_id: "0x1".to_string(),
                outcome: MarketOutcome::No,
                final_price: Some(0.98),
                resolved_at: None,
            },
        )
        .unwrap();

        let records = BacktestingEngine::from_config(&config)
            .store()
            .load_all()
            .unwrap();
        assert_eq!(records[0].was_correct(), Some(false));
    }

    #[tokio::test]
    async fn sweep_reads_snapshot() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        seed(&config, "0x1");

        let snapshot = dir.path().join("markets.json");
        std::fs::write(
            &snapshot,
            r#"[{
                "condition_id": "0x1",
                "question": "Will it rain?",
                "closed": true,
                "tokens": [{"outcome": "Yes", "price": 0.99}, {"outcome": "No", "price": 0.01}]
            }]"#,
        )
        .unwrap();

        run_resolve_pending(&config, ResolvePendingArgs { markets: snapshot })
            .await
            .unwrap();

        let engine = BacktestingEngine::from_config(&config);
        assert!(engine.store().pending().unwrap().is_empty());
    }
}
