//! Prediction records and their resolution lifecycle.
//!
//! A record is created *pending* when the analyzer recommends a side and is
//! resolved exactly once when the market settles. Scores live inside the
//! resolution, so an unresolved record has no scores to read.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::opportunity::{Opportunity, Position, RiskLevel};
use crate::scoring::{scoring_probability, PredictionScore};

/// How a market actually settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketOutcome {
    Yes,
    No,
    /// Settlement could not be determined; excluded from accuracy statistics.
    Invalid,
}

impl MarketOutcome {
    /// Whether this outcome vindicates `position`. `None` for INVALID.
    #[must_use]
    pub fn matches(&self, position: Position) -> Option<bool> {
        match (self, position) {
            (Self::Invalid, _) => None,
            (Self::Yes, Position::Yes) | (Self::No, Position::No) => Some(true),
            _ => Some(false),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
            Self::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for MarketOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarketOutcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "YES" => Ok(Self::Yes),
            "NO" => Ok(Self::No),
            "INVALID" => Ok(Self::Invalid),
            _ => Err(anyhow!(
                "Unknown outcome: '{}'. Valid outcomes: YES, NO, INVALID",
                s
            )),
        }
    }
}

/// Outcome data attached to a record when its market settles.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    outcome: MarketOutcome,
    resolved_at: DateTime<Utc>,
    final_price: Option<f64>,
    score: Option<PredictionScore>,
}

impl Resolution {
    /// Builds a resolution, deriving the scores from the prediction inputs.
    #[must_use]
    pub fn scored(
        predicted_probability: f64,
        position: Position,
        outcome: MarketOutcome,
        resolved_at: DateTime<Utc>,
        final_price: Option<f64>,
    ) -> Self {
        Self {
            outcome,
            resolved_at,
            final_price,
            score: PredictionScore::evaluate(predicted_probability, position, outcome),
        }
    }

    /// Rebuilds a resolution from previously persisted values.
    ///
    /// Any score supplied for an INVALID outcome is discarded.
    #[must_use]
    pub fn restored(
        outcome: MarketOutcome,
        resolved_at: DateTime<Utc>,
        final_price: Option<f64>,
        score: Option<PredictionScore>,
    ) -> Self {
        let score = match outcome {
            MarketOutcome::Invalid => None,
            _ => score,
        };
        Self {
            outcome,
            resolved_at,
            final_price,
            score,
        }
    }

    #[must_use]
    pub fn outcome(&self) -> MarketOutcome {
        self.outcome
    }

    #[must_use]
    pub fn resolved_at(&self) -> DateTime<Utc> {
        self.resolved_at
    }

    #[must_use]
    pub fn final_price(&self) -> Option<f64> {
        self.final_price
    }

    /// Scores; `None` when the outcome is INVALID.
    #[must_use]
    pub fn score(&self) -> Option<&PredictionScore> {
        self.score.as_ref()
    }
}

/// Lifecycle state of a prediction record.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PredictionStatus {
    #[default]
    Pending,
    Resolved(Resolution),
}

/// A recommendation made by the analyzer, tracked until its market settles.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    /// Row identity; several resolved rows may share a market id.
    pub prediction_id: Uuid,
    pub market_id: String,
    pub question: String,
    /// Probability attached to the recommended side, in `[0, 1]`.
    pub predicted_probability: f64,
    pub confidence: f64,
    pub recommended_position: Position,
    /// Market price of the recommended side when the prediction was made.
    pub market_price_at_prediction: f64,
    pub prediction_timestamp: DateTime<Utc>,
    pub model_version: String,
    pub risk_level: Option<RiskLevel>,
    pub expected_return: Option<f64>,
    /// Market category captured at prediction time.
    pub category: Option<String>,
    pub market_end_date: Option<DateTime<Utc>>,
    pub reasoning: Option<String>,
    /// Set when the inputs only approximate what was knowable at prediction time.
    pub best_effort_context: bool,
    status: PredictionStatus,
}

impl PredictionRecord {
    /// Creates a pending record.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        market_id: impl Into<String>,
        question: impl Into<String>,
        recommended_position: Position,
        predicted_probability: f64,
        confidence: f64,
        market_price_at_prediction: f64,
        prediction_timestamp: DateTime<Utc>,
        model_version: impl Into<String>,
    ) -> Self {
        Self {
            prediction_id: Uuid::new_v4(),
            market_id: market_id.into(),
            question: question.into(),
            predicted_probability: predicted_probability.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
            recommended_position,
            market_price_at_prediction: market_price_at_prediction.clamp(0.0, 1.0),
            prediction_timestamp,
            model_version: model_version.into(),
            risk_level: None,
            expected_return: None,
            category: None,
            market_end_date: None,
            reasoning: None,
            best_effort_context: false,
            status: PredictionStatus::Pending,
        }
    }

    /// Creates a pending record from analyzer output.
    ///
    /// Probability and market price are taken from the recommended side.
    #[must_use]
    pub fn from_opportunity(
        opportunity: &Opportunity,
        prediction_timestamp: DateTime<Utc>,
        model_version: impl Into<String>,
    ) -> Self {
        let mut record = Self::new(
            opportunity.market_id.clone(),
            opportunity.question.clone(),
            opportunity.recommended_position,
            opportunity.recommended_fair_price(),
            opportunity.confidence,
            opportunity.recommended_market_price(),
            prediction_timestamp,
            model_version,
        );
        record.risk_level = opportunity.risk_level;
        record.expected_return = opportunity.expected_return;
        record.category = opportunity.category.clone();
        record.market_end_date = opportunity.end_date;
        record.reasoning = opportunity.reasoning.clone();
        record
    }

    /// Replaces the lifecycle state, e.g. when loading from storage.
    #[must_use]
    pub fn with_status(mut self, status: PredictionStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn status(&self) -> &PredictionStatus {
        &self.status
    }

    #[must_use]
    pub fn resolution(&self) -> Option<&Resolution> {
        match &self.status {
            PredictionStatus::Resolved(resolution) => Some(resolution),
            PredictionStatus::Pending => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolution().is_some()
    }

    #[must_use]
    pub fn outcome(&self) -> Option<MarketOutcome> {
        self.resolution().map(Resolution::outcome)
    }

    #[must_use]
    pub fn score(&self) -> Option<&PredictionScore> {
        self.resolution().and_then(Resolution::score)
    }

    /// `Some(correct)` for records resolved to YES or NO.
    #[must_use]
    pub fn was_correct(&self) -> Option<bool> {
        self.score().map(|s| s.was_correct)
    }

    /// Predicted probability oriented by the recommended side.
    #[must_use]
    pub fn scoring_probability(&self) -> f64 {
        scoring_probability(self.predicted_probability, self.recommended_position)
    }

    /// Whole days between prediction and resolution.
    #[must_use]
    pub fn days_to_resolution(&self) -> Option<i64> {
        self.resolution()
            .map(|r| (r.resolved_at() - self.prediction_timestamp).num_days())
    }

    /// Percent return of a unit stake on the recommended side.
    ///
    /// `None` while pending, for INVALID outcomes, or when the entry price was zero.
    #[must_use]
    pub fn realized_return_pct(&self) -> Option<f64> {
        let correct = self.was_correct()?;
        let price = self.market_price_at_prediction;
        if price <= 0.0 {
            return None;
        }
        if correct {
            Some((1.0 - price) / price * 100.0)
        } else {
            Some(-100.0)
        }
    }

    /// Moves a pending record to resolved, computing its scores.
    ///
    /// Returns `false` and leaves the record untouched if it was already resolved.
    pub fn resolve(
        &mut self,
        outcome: MarketOutcome,
        resolved_at: DateTime<Utc>,
        final_price: Option<f64>,
    ) -> bool {
        if self.is_resolved() {
            return false;
        }
        self.status = PredictionStatus::Resolved(Resolution::scored(
            self.predicted_probability,
            self.recommended_position,
            outcome,
            resolved_at,
            final_price,
        ));
        true
    }

    /// Recomputes every derived field from the inputs. No-op while pending.
    pub fn rescore(&mut self) {
        if let PredictionStatus::Resolved(resolution) = &self.status {
            let rescored = Resolution::scored(
                self.predicted_probability,
                self.recommended_position,
                resolution.outcome(),
                resolution.resolved_at(),
                resolution.final_price(),
            );
            self.status = PredictionStatus::Resolved(rescored);
        }
    }
}
