//! Tracker-style performance summary over every recorded prediction.
//!
//! Unlike [`crate::metrics::BacktestMetrics`], pending records count here:
//! totals and averages cover the whole log, while hit rates and returns use
//! records resolved to YES or NO.

use chrono::{DateTime, Utc};
use forecast_core::stats::mean_by;
use forecast_core::{MarketOutcome, PredictionRecord, RiskLevel};
use serde::{Deserialize, Serialize};

/// Confidence bands reported in the breakdown, as `[lower, upper)`.
/// The last band also includes a confidence of exactly 1.0.
pub const CONFIDENCE_BANDS: [(&str, f64, f64); 4] = [
    ("0.6-0.7", 0.6, 0.7),
    ("0.7-0.8", 0.7, 0.8),
    ("0.8-0.9", 0.8, 0.9),
    ("0.9-1.0", 0.9, 1.0),
];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmentStats {
    pub label: String,
    pub total: usize,
    /// Resolved to YES or NO.
    pub resolved: usize,
    pub correct: usize,
    pub hit_rate: f64,
}

impl SegmentStats {
    fn collect<'a>(label: &str, records: impl Iterator<Item = &'a PredictionRecord>) -> Self {
        let mut stats = Self {
            label: label.to_string(),
            ..Self::default()
        };
        for record in records {
            stats.total += 1;
            if let Some(correct) = record.was_correct() {
                stats.resolved += 1;
                if correct {
                    stats.correct += 1;
                }
            }
        }
        stats.hit_rate = if stats.resolved == 0 {
            0.0
        } else {
            stats.correct as f64 / stats.resolved as f64
        };
        stats
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_predictions: usize,
    /// Resolved to YES or NO.
    pub resolved_predictions: usize,
    pub invalid_predictions: usize,
    pub correct_predictions: usize,
    pub hit_rate: f64,

    pub average_confidence: f64,
    /// Mean analyzer expected return (percent) over records that carry one.
    pub average_expected_return: f64,
    /// Mean realized return (percent) over resolved records.
    pub average_actual_return: f64,
    /// Sum of realized returns, one unit staked per prediction.
    pub total_roi: f64,

    pub by_risk: Vec<SegmentStats>,
    pub by_confidence: Vec<SegmentStats>,

    pub generated_at: DateTime<Utc>,
}

impl PerformanceMetrics {
    #[must_use]
    pub fn from_records(records: &[PredictionRecord]) -> Self {
        let scored: Vec<&PredictionRecord> =
            records.iter().filter(|r| r.was_correct().is_some()).collect();
        let correct_predictions = scored
            .iter()
            .filter(|r| r.was_correct() == Some(true))
            .count();
        let invalid_predictions = records
            .iter()
            .filter(|r| r.outcome() == Some(MarketOutcome::Invalid))
            .count();

        let returns: Vec<f64> = scored.iter().filter_map(|r| r.realized_return_pct()).collect();

        let by_risk = RiskLevel::ALL
            .iter()
            .map(|level| {
                SegmentStats::collect(
                    level.as_str(),
                    records.iter().filter(|r| r.risk_level == Some(*level)),
                )
            })
            .collect();

        let by_confidence = CONFIDENCE_BANDS
            .iter()
            .enumerate()
            .map(|(i, (label, lower, upper))| {
                let last = i == CONFIDENCE_BANDS.len() - 1;
                SegmentStats::collect(
                    label,
                    records.iter().filter(|r| {
                        r.confidence >= *lower
                            && (r.confidence < *upper || (last && r.confidence <= *upper))
                    }),
                )
            })
            .collect();

        Self {
            total_predictions: records.len(),
            resolved_predictions: scored.len(),
            invalid_predictions,
            correct_predictions,
            hit_rate: if scored.is_empty() {
                0.0
            } else {
                correct_predictions as f64 / scored.len() as f64
            },
            average_confidence: mean_by(records, |r| r.confidence),
            average_expected_return: mean_by(
                records.iter().filter_map(|r| r.expected_return),
                |v| v,
            ),
            average_actual_return: mean_by(&returns, |v| *v),
            total_roi: returns.iter().sum(),
            by_risk,
            by_confidence,
            generated_at: Utc::now(),
        }
    }
}
