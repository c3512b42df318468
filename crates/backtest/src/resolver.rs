//! Settlement-price heuristic for closed markets.
//!
//! The market operator's real resolution is not available, so the outcome is
//! inferred from final token prices: a side trading above the certainty
//! threshold is taken as the winner. Markets that settle close to the
//! threshold, or that were voided and re-priced, can be misclassified.

use forecast_core::{Market, MarketOutcome, ResolverConfig};
use tracing::debug;

/// Default certainty threshold for the winning side's final price.
pub const DEFAULT_CERTAINTY_THRESHOLD: f64 = 0.9;

/// Outcome inferred for a closed market.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedMarket {
    pub outcome: MarketOutcome,
    /// Final price of the winning side; the YES price for INVALID outcomes.
    pub final_price: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct OutcomeResolver {
    certainty_threshold: f64,
}

impl Default for OutcomeResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CERTAINTY_THRESHOLD)
    }
}

impl OutcomeResolver {
    #[must_use]
    pub fn new(certainty_threshold: f64) -> Self {
        Self {
            certainty_threshold,
        }
    }

    #[must_use]
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.certainty_threshold)
    }

    #[must_use]
    pub fn certainty_threshold(&self) -> f64 {
        self.certainty_threshold
    }

    /// Infers the outcome of `market`.
    ///
    /// `None` when the market is still open, is not binary, or lacks a final
    /// price on either side.
    #[must_use]
    pub fn determine(&self, market: &Market) -> Option<MarketOutcome> {
        self.resolve(market).map(|r| r.outcome)
    }

    /// Infers the outcome of `market` together with the winning side's price.
    #[must_use]
    pub fn resolve(&self, market: &Market) -> Option<ResolvedMarket> {
        if !market.closed || !market.is_binary() {
            debug!(market_id = %market.market_id, closed = market.closed, "Market not resolvable");
            return None;
        }

        let (Some(yes), Some(no)) = (market.yes_price(), market.no_price()) else {
            debug!(market_id = %market.market_id, "Missing final token prices");
            return None;
        };

        let resolved = if yes > self.certainty_threshold {
            ResolvedMarket {
                outcome: MarketOutcome::Yes,
                final_price: yes,
            }
        } else if no > self.certainty_threshold {
            ResolvedMarket {
                outcome: MarketOutcome::No,
                final_price: no,
            }
        } else {
            ResolvedMarket {
                outcome: MarketOutcome::Invalid,
                final_price: yes,
            }
        };
        Some(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::Token;

    fn market(closed: bool, yes: Option<f64>, no: Option<f64>) -> Market {
        Market {
            market_id: "0x1".to_string(),
            question: "Q?".to_string(),
            category: None,
            end_date: None,
            closed,
            tokens: vec![
                Token {
                    token_id: "y".to_string(),
                    outcome: "Yes".to_string(),
                    price: yes,
                },
                Token {
                    token_id: "n".to_string(),
                    outcome: "No".to_string(),
                    price: no,
                },
            ],
            volume: None,
        }
    }

    #[test]
    fn clear_winners() {
        let resolver = OutcomeResolver::default();

        let yes = resolver.resolve(&market(true, Some(0.99), Some(0.01))).unwrap();
        assert_eq!(yes.outcome, MarketOutcome::Yes);
        assert!((yes.final_price - 0.99).abs() < f64::EPSILON);

        let no = resolver.resolve(&market(true, Some(0.02), Some(0.98))).unwrap();
        assert_eq!(no.outcome, MarketOutcome::No);
        assert!((no.final_price - 0.98).abs() < f64::EPSILON);
    }

    #[test]
    fn threshold_is_strict() {
        let resolver = OutcomeResolver::default();
        assert_eq!(
            resolver.determine(&market(true, Some(0.9), Some(0.1))),
            Some(MarketOutcome::Invalid)
        );
    }

    #[test]
    fn ambiguous_settlement_is_invalid() {
        let resolver = OutcomeResolver::default();
        assert_eq!(
            resolver.determine(&market(true, Some(0.5), Some(0.5))),
            Some(MarketOutcome::Invalid)
        );
    }

    #[test]
    fn unresolvable_markets() {
        let resolver = OutcomeResolver::default();

        assert_eq!(resolver.determine(&market(false, Some(1.0), Some(0.0))), None);
        assert_eq!(resolver.determine(&market(true, None, Some(0.99))), None);

        let mut three_way = market(true, Some(0.95), Some(0.03));
        three_way.tokens.push(Token {
            token_id: "x".to_string(),
            outcome: "Other".to_string(),
            price: Some(0.02),
        });
        assert_eq!(resolver.determine(&three_way), None);
    }

    #[test]
    fn zero_price_is_a_real_price() {
        let resolver = OutcomeResolver::default();
        assert_eq!(
            resolver.determine(&market(true, Some(0.0), Some(1.0))),
            Some(MarketOutcome::No)
        );
    }

    #[test]
    fn custom_threshold() {
        let resolver = OutcomeResolver::new(0.97);
        assert_eq!(
            resolver.determine(&market(true, Some(0.95), Some(0.05))),
            Some(MarketOutcome::Invalid)
        );
    }
}
