//! Analyzer output consumed by the tracking engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Side of a binary market that a prediction recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "YES", alias = "Yes", alias = "yes")]
    Yes,
    #[serde(rename = "NO", alias = "No", alias = "no")]
    No,
}

impl Position {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "YES",
            Self::No => "NO",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse risk tier assigned by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mispricing identified by the analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    #[serde(alias = "condition_id")]
    pub market_id: String,
    pub question: String,
    pub recommended_position: Position,
    /// Analyzer's fair value of the YES side.
    pub fair_yes_price: f64,
    /// Analyzer's fair value of the NO side.
    pub fair_no_price: f64,
    /// Market YES price at analysis time.
    pub current_yes_price: f64,
    /// Market NO price at analysis time.
    pub current_no_price: f64,
    /// Analyzer confidence in `[0, 1]`.
    #[serde(alias = "confidence_score")]
    pub confidence: f64,
    /// Expected return of the recommended side, in percent.
    #[serde(default)]
    pub expected_return: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl Opportunity {
    /// Fair value of the recommended side.
    #[must_use]
    pub fn recommended_fair_price(&self) -> f64 {
        match self.recommended_position {
            Position::Yes => self.fair_yes_price,
            Position::No => self.fair_no_price,
        }
    }

    /// Market price of the recommended side.
    #[must_use]
    pub fn recommended_market_price(&self) -> f64 {
        match self.recommended_position {
            Position::Yes => self.current_yes_price,
            Position::No => self.current_no_price,
        }
    }
}
