//! Market and news types supplied by the external data collaborators.
//!
//! These mirror the shape of the market-data API closely enough for the
//! tracking engine: a binary market with two outcome tokens, each carrying
//! a price in `[0, 1]` once trading has settled.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A binary prediction market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    /// Stable condition id; the key every prediction record refers to.
    #[serde(alias = "condition_id")]
    pub market_id: String,
    /// Market question/title.
    pub question: String,
    /// Optional market category (e.g. "Politics", "Crypto").
    #[serde(default)]
    pub category: Option<String>,
    /// Market end/resolution date.
    #[serde(default, alias = "end_date_iso")]
    pub end_date: Option<DateTime<Utc>>,
    /// Whether trading has closed.
    #[serde(default)]
    pub closed: bool,
    /// Outcome tokens; binary markets carry exactly two.
    #[serde(default)]
    pub tokens: Vec<Token>,
    /// Lifetime volume in USD.
    #[serde(default)]
    pub volume: Option<Decimal>,
}

/// An outcome token of a market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Unique token id.
    #[serde(default)]
    pub token_id: String,
    /// Outcome label ("Yes" or "No").
    pub outcome: String,
    /// Last (or final, once settled) price.
    #[serde(default)]
    pub price: Option<f64>,
}

impl Market {
    /// Returns the YES token.
    ///
    /// Matched by label first, falling back to the first token when labels
    /// are not the conventional Yes/No pair.
    #[must_use]
    pub fn yes_token(&self) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.outcome.eq_ignore_ascii_case("yes"))
            .or_else(|| self.tokens.first())
    }

    /// Returns the NO token, matched by label with a positional fallback.
    #[must_use]
    pub fn no_token(&self) -> Option<&Token> {
        self.tokens
            .iter()
            .find(|t| t.outcome.eq_ignore_ascii_case("no"))
            .or_else(|| self.tokens.get(1))
    }

    #[must_use]
    pub fn yes_price(&self) -> Option<f64> {
        self.yes_token().and_then(|t| t.price)
    }

    #[must_use]
    pub fn no_price(&self) -> Option<f64> {
        self.no_token().and_then(|t| t.price)
    }

    /// True for markets with exactly two outcome tokens.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        self.tokens.len() == 2
    }

    /// Category label used in breakdowns.
    #[must_use]
    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or("Unknown")
    }
}

/// YES/NO prices of a market at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub yes_price: f64,
    pub no_price: f64,
    pub timestamp: DateTime<Utc>,
}

impl PriceQuote {
    /// Absolute gap between the two sides.
    #[must_use]
    pub fn spread(&self) -> f64 {
        (self.yes_price - self.no_price).abs()
    }
}

/// A news article summary returned by the news collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    pub published_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(outcome: &str, price: Option<f64>) -> Token {
        Token {
            token_id: format!("{outcome}-token"),
            outcome: outcome.to_string(),
            price,
        }
    }

    fn market(tokens: Vec<Token>) -> Market {
        Market {
            market_id: "0xabc".to_string(),
            question: "Will it rain?".to_string(),
            category: None,
            end_date: None,
            closed: true,
            tokens,
            volume: None,
        }
    }

    #[test]
    fn tokens_found_by_label_regardless_of_order() {
        let m = market(vec![token("No", Some(0.02)), token("Yes", Some(0.98))]);

        assert_eq!(m.yes_price(), Some(0.98));
        assert_eq!(m.no_price(), Some(0.02));
    }

    #[test]
    fn unlabelled_tokens_fall_back_to_position() {
        let m = market(vec![token("Trump", Some(0.97)), token("Harris", Some(0.03))]);

        assert_eq!(m.yes_price(), Some(0.97));
        assert_eq!(m.no_price(), Some(0.03));
    }

    #[test]
    fn category_label_defaults_to_unknown() {
        let mut m = market(vec![]);
        assert_eq!(m.category_label(), "Unknown");
        m.category = Some("Sports".to_string());
        assert_eq!(m.category_label(), "Sports");
    }

    #[test]
    fn accepts_api_field_names() {
        let json = r#"{
            "condition_id": "0x1",
            "question": "Q?",
            "end_date_iso": "2025-03-01T00:00:00Z",
            "closed": true,
            "tokens": [{"outcome": "Yes", "price": 1.0}, {"outcome": "No", "price": 0.0}]
        }"#;
        let m: Market = serde_json::from_str(json).unwrap();

        assert_eq!(m.market_id, "0x1");
        assert!(m.end_date.is_some());
        assert!(m.is_binary());
    }
}
