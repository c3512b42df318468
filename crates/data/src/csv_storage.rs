use anyhow::{Context, Result};
use csv::Writer;
use forecast_core::PredictionRecord;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

use crate::persisted::PersistedPrediction;

/// Columns of the CSV export, matching the persisted row fields.
pub const PREDICTION_COLUMNS: [&str; 22] = [
    "prediction_id",
    "market_id",
    "question",
    "predicted_probability",
    "confidence",
    "recommended_position",
    "market_price_at_prediction",
    "prediction_timestamp",
    "model_version",
    "risk_level",
    "expected_return",
    "category",
    "market_end_date",
    "reasoning",
    "best_effort_context",
    "actual_outcome",
    "resolution_timestamp",
    "final_price",
    "was_correct",
    "brier_score",
    "log_score",
    "calibration_error",
];

pub struct CsvStorage;

impl CsvStorage {
    /// Writes prediction records to a CSV file, one row per record in log order.
    ///
    /// Unset optional fields are written as empty cells. Returns the number
    /// of rows written; an empty input writes nothing and returns 0.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_predictions(path: &Path, records: &[PredictionRecord]) -> Result<usize> {
        if records.is_empty() {
            warn!("No predictions to export");
            return Ok(0);
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        writer.write_record(PREDICTION_COLUMNS)?;

        for record in records {
            let row = PersistedPrediction::from_record(record);
            writer.write_record(&[
                row.prediction_id.to_string(),
                row.market_id,
                row.question,
                row.predicted_probability.to_string(),
                row.confidence.to_string(),
                row.recommended_position.to_string(),
                row.market_price_at_prediction.to_string(),
                row.prediction_timestamp.to_rfc3339(),
                row.model_version,
                opt(row.risk_level),
                opt(row.expected_return),
                row.category.unwrap_or_default(),
                opt(row.market_end_date.map(|d| d.to_rfc3339())),
                row.reasoning.unwrap_or_default(),
                row.best_effort_context.to_string(),
                opt(row.actual_outcome),
                opt(row.resolution_timestamp.map(|d| d.to_rfc3339())),
                opt(row.final_price),
                opt(row.was_correct),
                opt(row.brier_score),
                opt(row.log_score),
                opt(row.calibration_error),
            ])?;
        }

        writer.flush()?;
        info!(path = %path.display(), rows = records.len(), "Exported predictions to CSV");
        Ok(records.len())
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
