//! Aggregate scoring metrics over resolved predictions.
//!
//! Records resolved to INVALID appear in the raw counts only. Every accuracy
//! figure is computed over records resolved to YES or NO, and every empty
//! subset reports `0.0`.

use chrono::{DateTime, Duration, Utc};
use forecast_core::stats::{binomial_test, mean_by, pearson_correlation, wilson_ci, Z_95};
use forecast_core::{MarketOutcome, PredictionRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Confidence above which a prediction counts as high confidence.
pub const HIGH_CONFIDENCE: f64 = 0.8;
/// Confidence below which a prediction counts as low confidence.
pub const LOW_CONFIDENCE: f64 = 0.5;
/// Scoring probabilities outside `[EXTREME_LOW, EXTREME_HIGH]` are extreme.
pub const EXTREME_LOW: f64 = 0.1;
pub const EXTREME_HIGH: f64 = 0.9;
/// Category used for records that carry none.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Selects which resolved records enter a backtest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BacktestFilter {
    pub model_version: Option<String>,
    /// Only predictions made at least this many days ago.
    pub min_days_since_prediction: i64,
    /// Case-insensitive category match; `"Unknown"` selects uncategorised records.
    pub category: Option<String>,
}

impl BacktestFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_model_version(mut self, model_version: impl Into<String>) -> Self {
        self.model_version = Some(model_version.into());
        self
    }

    #[must_use]
    pub fn with_min_days(mut self, days: i64) -> Self {
        self.min_days_since_prediction = days;
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// True for resolved records passing every configured filter.
    #[must_use]
    pub fn matches(&self, record: &PredictionRecord, now: DateTime<Utc>) -> bool {
        if !record.is_resolved() {
            return false;
        }
        if let Some(version) = &self.model_version {
            if &record.model_version != version {
                return false;
            }
        }
        if record.prediction_timestamp > now - Duration::days(self.min_days_since_prediction) {
            return false;
        }
        if let Some(category) = &self.category {
            if !category_of(record).eq_ignore_ascii_case(category) {
                return false;
            }
        }
        true
    }
}

pub(crate) fn category_of(record: &PredictionRecord) -> &str {
    record.category.as_deref().unwrap_or(UNKNOWN_CATEGORY)
}

/// Accuracy of one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub accuracy: f64,
    pub sample_size: usize,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    total: usize,
    correct: usize,
}

impl Tally {
    fn add(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    fn stats(&self) -> BucketStats {
        BucketStats {
            accuracy: self.rate(),
            sample_size: self.total,
        }
    }
}

/// Accuracy by the ratio of scoring probability to market price.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviationBreakdown {
    /// Ratio below 2x.
    pub small: BucketStats,
    /// Ratio from 2x up to 5x.
    pub medium: BucketStats,
    /// Ratio of 5x or more.
    pub large: BucketStats,
}

impl DeviationBreakdown {
    #[must_use]
    pub fn entries(&self) -> [(&'static str, BucketStats); 3] {
        [
            ("Small Deviation (<2x)", self.small),
            ("Medium Deviation (2x-5x)", self.medium),
            ("Large Deviation (>5x)", self.large),
        ]
    }
}

/// Accuracy by whole days between prediction and resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionTimeBreakdown {
    /// Up to 7 days.
    pub within_week: BucketStats,
    /// 8 to 30 days.
    pub within_month: BucketStats,
    /// More than 30 days.
    pub beyond_month: BucketStats,
}

impl ResolutionTimeBreakdown {
    #[must_use]
    pub fn entries(&self) -> [(&'static str, BucketStats); 3] {
        [
            ("0-7d", self.within_week),
            ("7-30d", self.within_month),
            ("30d+", self.beyond_month),
        ]
    }
}

/// Summary of a backtest. Recomputed on demand, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestMetrics {
    // Raw counts
    /// Resolved records considered, INVALID included.
    pub resolved_records: usize,
    pub invalid_predictions: usize,

    // Accuracy (YES/NO outcomes only)
    pub total_predictions: usize,
    pub correct_predictions: usize,
    pub accuracy: f64,
    pub wilson_ci_lower: f64,
    pub wilson_ci_upper: f64,
    /// Two-sided p-value against a 50% hit rate.
    pub binomial_p_value: f64,
    pub is_significant: bool,

    // Calibration
    pub mean_predicted_probability: f64,
    pub actual_success_rate: f64,
    /// `|mean(p) - mean(y)|` over the population.
    pub calibration_error: f64,

    // Scoring rules
    pub mean_brier_score: f64,
    pub mean_log_score: f64,

    // Confidence
    pub high_confidence_accuracy: f64,
    pub low_confidence_accuracy: f64,
    pub confidence_correlation: f64,

    // Edge cases
    pub extreme_predictions_accuracy: f64,
    pub market_deviation_analysis: DeviationBreakdown,

    // Breakdowns
    pub accuracy_by_category: BTreeMap<String, f64>,
    pub sample_sizes_by_category: BTreeMap<String, usize>,
    pub accuracy_by_time_to_resolution: ResolutionTimeBreakdown,
}

impl BacktestMetrics {
    /// Computes metrics over resolved records. Pending records are ignored.
    #[must_use]
    pub fn from_records(records: &[PredictionRecord]) -> Self {
        let resolved: Vec<&PredictionRecord> = records.iter().filter(|r| r.is_resolved()).collect();
        let invalid_predictions = resolved
            .iter()
            .filter(|r| r.outcome() == Some(MarketOutcome::Invalid))
            .count();

        // (record, p, correct) for every scored record
        let scored: Vec<(&PredictionRecord, f64, bool)> = resolved
            .iter()
            .filter_map(|r| r.was_correct().map(|c| (*r, r.scoring_probability(), c)))
            .collect();

        if scored.is_empty() {
            return Self {
                resolved_records: resolved.len(),
                invalid_predictions,
                ..Self::empty()
            };
        }

        let total = scored.len();
        let correct = scored.iter().filter(|(_, _, c)| *c).count();
        let accuracy = correct as f64 / total as f64;
        let (wilson_ci_lower, wilson_ci_upper) = wilson_ci(correct, total, Z_95);
        let binomial_p_value = binomial_test(correct, total, 0.5);

        let mean_predicted_probability = mean_by(&scored, |(_, p, _)| *p);
        let actual_success_rate = mean_by(&scored, |(_, _, c)| indicator(*c));

        let mean_brier_score = mean_by(&scored, |(r, _, _)| {
            r.score().map_or(0.0, |s| s.brier_score)
        });
        let mean_log_score = mean_by(&scored, |(r, _, _)| r.score().map_or(0.0, |s| s.log_score));

        let mut high = Tally::default();
        let mut low = Tally::default();
        let mut extreme = Tally::default();
        let mut deviation = [Tally::default(); 3];
        let mut timing = [Tally::default(); 3];
        let mut categories: BTreeMap<String, Tally> = BTreeMap::new();

        for &(record, p, c) in &scored {
            if record.confidence > HIGH_CONFIDENCE {
                high.add(c);
            }
            if record.confidence < LOW_CONFIDENCE {
                low.add(c);
            }
            if !(EXTREME_LOW..=EXTREME_HIGH).contains(&p) {
                extreme.add(c);
            }
            if record.market_price_at_prediction > 0.0 {
                let ratio = p / record.market_price_at_prediction;
                let bucket = if ratio < 2.0 {
                    0
                } else if ratio < 5.0 {
                    1
                } else {
                    2
                };
                deviation[bucket].add(c);
            }
            if let Some(days) = record.days_to_resolution() {
                let bucket = if days <= 7 {
                    0
                } else if days <= 30 {
                    1
                } else {
                    2
                };
                timing[bucket].add(c);
            }
            categories
                .entry(category_of(record).to_string())
                .or_default()
                .add(c);
        }

        let confidences: Vec<f64> = scored.iter().map(|(r, _, _)| r.confidence).collect();
        let outcomes: Vec<f64> = scored.iter().map(|(_, _, c)| indicator(*c)).collect();

        Self {
            resolved_records: resolved.len(),
            invalid_predictions,
            total_predictions: total,
            correct_predictions: correct,
            accuracy,
            wilson_ci_lower,
            wilson_ci_upper,
            binomial_p_value,
            is_significant: binomial_p_value < 0.05,
            mean_predicted_probability,
            actual_success_rate,
            calibration_error: (mean_predicted_probability - actual_success_rate).abs(),
            mean_brier_score,
            mean_log_score,
            high_confidence_accuracy: high.rate(),
            low_confidence_accuracy: low.rate(),
            confidence_correlation: pearson_correlation(&confidences, &outcomes),
            extreme_predictions_accuracy: extreme.rate(),
            market_deviation_analysis: DeviationBreakdown {
                small: deviation[0].stats(),
                medium: deviation[1].stats(),
                large: deviation[2].stats(),
            },
            accuracy_by_category: categories
                .iter()
                .map(|(k, t)| (k.clone(), t.rate()))
                .collect(),
            sample_sizes_by_category: categories
                .iter()
                .map(|(k, t)| (k.clone(), t.total))
                .collect(),
            accuracy_by_time_to_resolution: ResolutionTimeBreakdown {
                within_week: timing[0].stats(),
                within_month: timing[1].stats(),
                beyond_month: timing[2].stats(),
            },
        }
    }

    /// Metrics for an empty record set.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            resolved_records: 0,
            invalid_predictions: 0,
            total_predictions: 0,
            correct_predictions: 0,
            accuracy: 0.0,
            wilson_ci_lower: 0.0,
            wilson_ci_upper: 0.0,
            binomial_p_value: 1.0,
            is_significant: false,
            mean_predicted_probability: 0.0,
            actual_success_rate: 0.0,
            calibration_error: 0.0,
            mean_brier_score: 0.0,
            mean_log_score: 0.0,
            high_confidence_accuracy: 0.0,
            low_confidence_accuracy: 0.0,
            confidence_correlation: 0.0,
            extreme_predictions_accuracy: 0.0,
            market_deviation_analysis: DeviationBreakdown::default(),
            accuracy_by_category: BTreeMap::new(),
            sample_sizes_by_category: BTreeMap::new(),
            accuracy_by_time_to_resolution: ResolutionTimeBreakdown::default(),
        }
    }
}

fn indicator(correct: bool) -> f64 {
    if correct {
        1.0
    } else {
        0.0
    }
}

/// Filters records and summarizes them into [`BacktestMetrics`].
#[derive(Debug, Clone, Default)]
pub struct MetricsAggregator {
    filter: BacktestFilter,
}

impl MetricsAggregator {
    #[must_use]
    pub fn new(filter: BacktestFilter) -> Self {
        Self { filter }
    }

    #[must_use]
    pub fn filter(&self) -> &BacktestFilter {
        &self.filter
    }

    /// Summarizes the records matching the filter as of now.
    #[must_use]
    pub fn summarize(&self, records: &[PredictionRecord]) -> BacktestMetrics {
        self.summarize_at(records, Utc::now())
    }

    /// Summarizes the records matching the filter as of `now`.
    #[must_use]
    pub fn summarize_at(
        &self,
        records: &[PredictionRecord],
        now: DateTime<Utc>,
    ) -> BacktestMetrics {
        let selected: Vec<PredictionRecord> = records
            .iter()
            .filter(|r| self.filter.matches(r, now))
            .cloned()
            .collect();

        if selected.is_empty() {
            warn!(filter = ?self.filter, "No predictions found matching criteria");
            return BacktestMetrics::empty();
        }

        info!(count = selected.len(), "Analyzing predictions");
        BacktestMetrics::from_records(&selected)
    }
}
