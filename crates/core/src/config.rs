use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub tracking: TrackingConfig,
    pub resolver: ResolverConfig,
    pub historical: HistoricalConfig,
}

/// Where prediction logs live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the live prediction log.
    pub data_dir: PathBuf,
    /// Directory holding predictions produced by historical replays.
    pub historical_dir: PathBuf,
    /// File name of the JSONL log inside either directory.
    pub predictions_file: String,
}

impl StorageConfig {
    #[must_use]
    pub fn predictions_path(&self) -> PathBuf {
        self.data_dir.join(&self.predictions_file)
    }

    #[must_use]
    pub fn historical_predictions_path(&self) -> PathBuf {
        self.historical_dir.join(&self.predictions_file)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Tag stamped on records when the caller does not supply one.
    pub default_model_version: String,
    /// Opportunities below this confidence are not recorded.
    pub min_confidence_to_record: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Final token price a side must exceed to be treated as the winner.
    pub certainty_threshold: f64,
    /// Timeout for each market lookup in a pending-resolution sweep.
    pub lookup_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalConfig {
    /// Look-back window for closed markets, in days.
    pub days_back: i64,
    /// Maximum number of markets replayed per run.
    pub max_markets: usize,
    /// How many days before close the simulated prediction is made.
    pub prediction_window_days: i64,
    /// Markets with less lifetime volume are filtered out.
    pub min_volume_usd: Decimal,
    /// Category allow-list (case-insensitive). Empty means all categories.
    pub categories: Vec<String>,
    /// Width of the news window that ends at the simulated prediction time.
    pub news_lookback_days: i64,
    /// Timeout applied to every collaborator call.
    pub collaborator_timeout_secs: u64,
    /// Number of markets whose context is gathered concurrently.
    pub concurrency: usize,
    /// Tag stamped on every replayed record.
    pub model_version: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/backtests"),
            historical_dir: PathBuf::from("data/historical_backtests"),
            predictions_file: "predictions.jsonl".to_string(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            default_model_version: "current".to_string(),
            min_confidence_to_record: 0.0,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            certainty_threshold: 0.9,
            lookup_timeout_secs: 30,
        }
    }
}

impl Default for HistoricalConfig {
    fn default() -> Self {
        Self {
            days_back: 30,
            max_markets: 50,
            prediction_window_days: 7,
            min_volume_usd: Decimal::from(1000),
            categories: Vec::new(),
            news_lookback_days: 7,
            collaborator_timeout_secs: 30,
            concurrency: 4,
            model_version: "historical_backtest".to_string(),
        }
    }
}
