//! Plain-text renderings of backtest summaries.
//!
//! Section order is fixed so reports diff cleanly between runs.

use std::fmt::Write;

use crate::historical::HistoricalBacktestResult;
use crate::metrics::BacktestMetrics;
use crate::performance::PerformanceMetrics;

const RULE: &str = "===============================================================";
const LINE: &str = "---------------------------------------------------------------";

fn header(out: &mut String, title: &str) {
    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
    let _ = writeln!(out, "{title:^63}");
    out.push_str(RULE);
    out.push('\n');
}

fn section(out: &mut String, title: &str) {
    out.push('\n');
    out.push_str(title);
    out.push('\n');
    out.push_str(LINE);
    out.push('\n');
}

fn pct(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Renders backtest metrics: overview, calibration, scoring rules,
/// confidence, edge cases, then the breakdowns.
#[must_use]
pub fn format_backtest_report(metrics: &BacktestMetrics) -> String {
    let mut out = String::new();
    header(&mut out, "BACKTEST PERFORMANCE REPORT");

    if metrics.total_predictions == 0 {
        let _ = writeln!(out, "No resolved predictions available for analysis.");
        if metrics.invalid_predictions > 0 {
            let _ = writeln!(out, "INVALID outcomes: {}", metrics.invalid_predictions);
        }
        return out;
    }

    section(&mut out, "OVERVIEW");
    let _ = writeln!(out, "Total Predictions:   {}", metrics.total_predictions);
    let _ = writeln!(out, "Correct Predictions: {}", metrics.correct_predictions);
    let _ = writeln!(out, "Accuracy:            {}", pct(metrics.accuracy));
    let _ = writeln!(
        out,
        "Wilson 95% CI:       [{}, {}]",
        pct(metrics.wilson_ci_lower),
        pct(metrics.wilson_ci_upper)
    );
    let significance = if metrics.is_significant {
        "SIGNIFICANT"
    } else {
        "NOT SIGNIFICANT"
    };
    let _ = writeln!(
        out,
        "Binomial p:          {:.4} ({significance})",
        metrics.binomial_p_value
    );
    let _ = writeln!(
        out,
        "Resolved Records:    {} ({} INVALID)",
        metrics.resolved_records, metrics.invalid_predictions
    );

    section(&mut out, "CALIBRATION");
    let _ = writeln!(
        out,
        "Mean Predicted Probability: {}",
        pct(metrics.mean_predicted_probability)
    );
    let _ = writeln!(out, "Actual Success Rate:        {}", pct(metrics.actual_success_rate));
    let _ = writeln!(out, "Calibration Error:          {}", pct(metrics.calibration_error));

    section(&mut out, "SCORING RULES");
    let _ = writeln!(out, "Brier Score: {:.3} (lower is better)", metrics.mean_brier_score);
    let _ = writeln!(out, "Log Score:   {:.3} (closer to 0 is better)", metrics.mean_log_score);

    section(&mut out, "CONFIDENCE ANALYSIS");
    let _ = writeln!(
        out,
        "High Confidence Accuracy (>80%): {}",
        pct(metrics.high_confidence_accuracy)
    );
    let _ = writeln!(
        out,
        "Low Confidence Accuracy (<50%):  {}",
        pct(metrics.low_confidence_accuracy)
    );
    let _ = writeln!(out, "Confidence-Accuracy Correlation: {:.3}", metrics.confidence_correlation);

    section(&mut out, "EDGE CASES");
    let _ = writeln!(
        out,
        "Extreme Predictions Accuracy: {}",
        pct(metrics.extreme_predictions_accuracy)
    );

    section(&mut out, "MARKET DEVIATION");
    for (label, stats) in metrics.market_deviation_analysis.entries() {
        let _ = writeln!(out, "{label:<26} {:>6}  (n={})", pct(stats.accuracy), stats.sample_size);
    }

    section(&mut out, "TIME TO RESOLUTION");
    for (label, stats) in metrics.accuracy_by_time_to_resolution.entries() {
        let _ = writeln!(out, "{label:<26} {:>6}  (n={})", pct(stats.accuracy), stats.sample_size);
    }

    if !metrics.accuracy_by_category.is_empty() {
        section(&mut out, "BY CATEGORY");
        for (category, accuracy) in &metrics.accuracy_by_category {
            let n = metrics.sample_sizes_by_category.get(category).copied().unwrap_or(0);
            let _ = writeln!(out, "{category:<26} {:>6}  (n={n})", pct(*accuracy));
        }
    }

    out
}

/// Renders the tracker-style performance summary.
#[must_use]
pub fn format_performance_report(metrics: &PerformanceMetrics) -> String {
    let mut out = String::new();
    header(&mut out, "PREDICTION TRACKER PERFORMANCE");

    section(&mut out, "OVERVIEW");
    let _ = writeln!(out, "Total Predictions:    {}", metrics.total_predictions);
    let _ = writeln!(out, "Resolved Predictions: {}", metrics.resolved_predictions);
    let _ = writeln!(out, "INVALID Outcomes:     {}", metrics.invalid_predictions);
    let _ = writeln!(out, "Correct Predictions:  {}", metrics.correct_predictions);
    let _ = writeln!(out, "Hit Rate:             {}", pct(metrics.hit_rate));

    section(&mut out, "RETURNS");
    let _ = writeln!(out, "Average Confidence:      {}", pct(metrics.average_confidence));
    let _ = writeln!(out, "Average Expected Return: {:.1}%", metrics.average_expected_return);
    let _ = writeln!(out, "Average Actual Return:   {:.1}%", metrics.average_actual_return);
    let _ = writeln!(out, "Total ROI:               {:.1}%", metrics.total_roi);

    for (title, segments) in [
        ("BY RISK LEVEL", &metrics.by_risk),
        ("BY CONFIDENCE", &metrics.by_confidence),
    ] {
        section(&mut out, title);
        for s in segments {
            let _ = writeln!(
                out,
                "{:<8} total={:<4} resolved={:<4} correct={:<4} hit rate={}",
                s.label,
                s.total,
                s.resolved,
                s.correct,
                pct(s.hit_rate)
            );
        }
    }

    out
}

/// Renders a historical replay: overview, model performance, confidence,
/// categories, then market deviation.
#[must_use]
pub fn format_historical_report(result: &HistoricalBacktestResult) -> String {
    let mut out = String::new();
    header(&mut out, "HISTORICAL BACKTEST REPORT");

    section(&mut out, "OVERVIEW");
    let _ = writeln!(out, "Markets Tested:         {}", result.markets_tested);
    let _ = writeln!(out, "Successful Predictions: {}", result.successful_predictions);
    let _ = writeln!(out, "Failed Predictions:     {}", result.failed_predictions);
    let _ = writeln!(out, "Filtered Markets:       {}", result.filtered_markets);
    if result.markets_tested > 0 {
        let _ = writeln!(out, "Success Rate:           {}", pct(result.success_rate()));
    }
    if result.best_effort_predictions > 0 {
        let _ = writeln!(
            out,
            "Best-effort Context:    {} of {} predictions used data not limited \
             to the prediction time",
            result.best_effort_predictions, result.successful_predictions
        );
    }
    for (timeframe, count) in &result.prediction_timeframes {
        let _ = writeln!(out, "Predicted {timeframe}: {count}");
    }

    let metrics = &result.metrics;
    if metrics.total_predictions > 0 {
        section(&mut out, "MODEL PERFORMANCE");
        let _ = writeln!(out, "Accuracy:          {}", pct(metrics.accuracy));
        let _ = writeln!(out, "Calibration Error: {}", pct(metrics.calibration_error));
        let _ = writeln!(out, "Brier Score:       {:.3}", metrics.mean_brier_score);
        let _ = writeln!(out, "Log Score:         {:.3}", metrics.mean_log_score);

        section(&mut out, "CONFIDENCE ANALYSIS");
        let _ = writeln!(out, "High Confidence (>80%): {}", pct(metrics.high_confidence_accuracy));
        let _ = writeln!(out, "Low Confidence (<50%):  {}", pct(metrics.low_confidence_accuracy));
    }

    if !result.markets_by_category.is_empty() {
        section(&mut out, "MARKETS BY CATEGORY");
        for (category, count) in &result.markets_by_category {
            let accuracy = metrics
                .accuracy_by_category
                .get(category)
                .map_or_else(|| "-".to_string(), |a| pct(*a));
            let _ = writeln!(out, "{category:<26} {count:>4} markets  accuracy {accuracy}");
        }
    }

    if metrics.total_predictions > 0 {
        section(&mut out, "MARKET DEVIATION");
        for (label, stats) in metrics.market_deviation_analysis.entries() {
            let _ = writeln!(
                out,
                "{label:<26} {:>6}  (n={})",
                pct(stats.accuracy),
                stats.sample_size
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use forecast_core::{MarketOutcome, Position, PredictionRecord};

    fn metrics() -> BacktestMetrics {
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut r = PredictionRecord::new("M", "Q?", Position::Yes, 0.8, 0.9, 0.4, at, "v1");
        r.resolve(MarketOutcome::Yes, at, None);
        BacktestMetrics::from_records(&[r])
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let report = format_backtest_report(&metrics());

        let order = [
            "OVERVIEW",
            "CALIBRATION",
            "SCORING RULES",
            "CONFIDENCE ANALYSIS",
            "EDGE CASES",
            "MARKET DEVIATION",
            "TIME TO RESOLUTION",
        ];
        let positions: Vec<usize> = order.iter().map(|s| report.find(s).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{report}");
        assert!(report.contains("Accuracy:            100.0%"));
    }

    #[test]
    fn report_is_deterministic() {
        let m = metrics();
        assert_eq!(format_backtest_report(&m), format_backtest_report(&m));
    }

    #[test]
    fn empty_metrics_render_without_sections() {
        let report = format_backtest_report(&BacktestMetrics::empty());
        assert!(report.contains("No resolved predictions"));
        assert!(!report.contains("CALIBRATION"));
    }

    #[test]
    fn performance_report_lists_segments() {
        let report = format_performance_report(&PerformanceMetrics::from_records(&[]));
        assert!(report.contains("BY RISK LEVEL"));
        assert!(report.contains("MEDIUM"));
        assert!(report.contains("0.9-1.0"));
    }
}
