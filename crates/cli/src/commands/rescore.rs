//! Rescore CLI command.
//!
//! Re-derives correctness and scores of every resolved record, e.g. after
//! a scoring fix or a hand edit of the log.

use anyhow::Result;
use forecast_backtest::BacktestingEngine;
use forecast_core::AppConfig;

/// Runs the rescore command.
///
/// # Errors
/// Returns an error if the log cannot be read or rewritten.
pub fn run_rescore(config: &AppConfig) -> Result<()> {
    let engine = BacktestingEngine::from_config(config);
    let rescored = engine.store().rescore_all()?;
    println!("Rescored {rescored} resolved predictions");
    Ok(())
}
