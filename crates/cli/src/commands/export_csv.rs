//! CSV export CLI command.

use anyhow::Result;
use clap::Args;
use forecast_backtest::BacktestingEngine;
use forecast_core::AppConfig;
use forecast_data::CsvStorage;
use std::path::PathBuf;

/// Arguments for the export-csv command.
#[derive(Args, Debug, Clone)]
pub struct ExportCsvArgs {
    /// Output CSV file path
    #[arg(short, long)]
    pub output: PathBuf,

    /// Export the historical log instead of the live one
    #[arg(long)]
    pub historical: bool,
}

/// Runs the export-csv command.
///
/// # Errors
/// Returns an error if the log cannot be read or the CSV cannot be written.
pub fn run_export_csv(config: &AppConfig, args: ExportCsvArgs) -> Result<()> {
    let path = if args.historical {
        config.storage.historical_predictions_path()
    } else {
        config.storage.predictions_path()
    };
    let engine = BacktestingEngine::at_path(path, config);
    let records = engine.store().load_all()?;

    let written = CsvStorage::write_predictions(&args.output, &records)?;
    println!("Exported {written} predictions to {}", args.output.display());
    Ok(())
}
