//! Proper scoring rules for resolved predictions.
//!
//! Every formula here uses the *scoring probability*: the predicted
//! probability oriented by the recommended side, i.e. `p` for a YES
//! recommendation and `1 - p` for NO. `y` is 1 when the market resolved to
//! the recommended side and 0 otherwise. INVALID markets are never scored.

use serde::{Deserialize, Serialize};

use crate::opportunity::Position;
use crate::prediction::MarketOutcome;

/// Lower clamp applied before taking logarithms.
pub const PROBABILITY_FLOOR: f64 = 0.001;

/// Upper clamp applied before taking logarithms.
pub const PROBABILITY_CEILING: f64 = 0.999;

/// Per-record scores, present only once a record resolved to YES or NO.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionScore {
    pub was_correct: bool,
    /// `(p - y)^2`, in `[0, 1]`; lower is better.
    pub brier_score: f64,
    /// `ln(p)` when correct, `ln(1 - p)` otherwise, on the clamped `p`. Always negative.
    pub log_score: f64,
    /// `|p - y|` for this record alone.
    pub calibration_error: f64,
}

impl PredictionScore {
    /// Scores a prediction against a market outcome.
    ///
    /// Returns `None` for [`MarketOutcome::Invalid`].
    #[must_use]
    pub fn evaluate(
        predicted_probability: f64,
        position: Position,
        outcome: MarketOutcome,
    ) -> Option<Self> {
        let correct = outcome.matches(position)?;
        Some(Self::from_probability(
            scoring_probability(predicted_probability, position),
            correct,
        ))
    }

    /// Scores an already-oriented probability.
    #[must_use]
    pub fn from_probability(p: f64, correct: bool) -> Self {
        let y = if correct { 1.0 } else { 0.0 };
        Self {
            was_correct: correct,
            brier_score: brier_score(p, y),
            log_score: log_score(p, correct),
            calibration_error: (p - y).abs(),
        }
    }
}

/// Orients a predicted probability by the recommended side.
#[must_use]
pub fn scoring_probability(predicted_probability: f64, position: Position) -> f64 {
    match position {
        Position::Yes => predicted_probability,
        Position::No => 1.0 - predicted_probability,
    }
}

#[must_use]
pub fn brier_score(p: f64, y: f64) -> f64 {
    (p - y).powi(2)
}

#[must_use]
pub fn log_score(p: f64, correct: bool) -> f64 {
    let clamped = p.clamp(PROBABILITY_FLOOR, PROBABILITY_CEILING);
    if correct {
        clamped.ln()
    } else {
        (1.0 - clamped).ln()
    }
}
