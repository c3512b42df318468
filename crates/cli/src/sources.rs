//! File-backed collaborators.
//!
//! The tracking engine only sees the [`MarketSource`], [`NewsSource`], and
//! [`Analyzer`] traits. These implementations read JSON snapshots so the
//! command line can drive it without network clients.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use forecast_core::{
    Analyzer, Market, MarketSource, NewsArticle, NewsSource, Opportunity, PriceQuote,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::Path;

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Markets loaded from a JSON array.
#[derive(Debug, Clone, Default)]
pub struct SnapshotMarketSource {
    markets: Vec<Market>,
}

impl SnapshotMarketSource {
    pub fn new(markets: Vec<Market>) -> Self {
        Self { markets }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(read_json(path)?))
    }
}

#[async_trait]
impl MarketSource for SnapshotMarketSource {
    async fn closed_markets(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Market>> {
        Ok(self
            .markets
            .iter()
            .filter(|m| m.closed)
            .filter(|m| m.end_date.map_or(true, |end| end >= from && end <= to))
            .cloned()
            .collect())
    }

    async fn market(&self, market_id: &str) -> Result<Option<Market>> {
        Ok(self.markets.iter().find(|m| m.market_id == market_id).cloned())
    }
}

/// Articles loaded from a JSON array. A snapshot is not an archive, so
/// results are never treated as point-in-time.
#[derive(Debug, Clone, Default)]
pub struct SnapshotNewsSource {
    articles: Vec<NewsArticle>,
}

impl SnapshotNewsSource {
    pub fn new(articles: Vec<NewsArticle>) -> Self {
        Self { articles }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(read_json(path)?))
    }
}

#[async_trait]
impl NewsSource for SnapshotNewsSource {
    async fn search(
        &self,
        query: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<NewsArticle>> {
        let terms: Vec<&str> = query.split_whitespace().collect();
        Ok(self
            .articles
            .iter()
            .filter(|a| a.published_at >= from && a.published_at <= to)
            .filter(|a| {
                let text = format!(
                    "{} {}",
                    a.title.to_lowercase(),
                    a.description.as_deref().unwrap_or_default().to_lowercase()
                );
                terms.is_empty() || terms.iter().any(|t| text.contains(t))
            })
            .cloned()
            .collect())
    }
}

/// Replays opportunities computed ahead of time, keyed by market id.
///
/// Current prices are taken from the quote the simulator supplies, so the
/// recorded market price reflects the simulated prediction instant.
#[derive(Debug, Clone, Default)]
pub struct ReplayAnalyzer {
    opportunities: HashMap<String, Opportunity>,
}

impl ReplayAnalyzer {
    pub fn new(opportunities: Vec<Opportunity>) -> Self {
        Self {
            opportunities: opportunities
                .into_iter()
                .map(|o| (o.market_id.clone(), o))
                .collect(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(read_json(path)?))
    }
}

#[async_trait]
impl Analyzer for ReplayAnalyzer {
    async fn analyze(
        &self,
        market: &Market,
        quote: &PriceQuote,
        _news: &[NewsArticle],
    ) -> Result<Option<Opportunity>> {
        Ok(self.opportunities.get(&market.market_id).map(|o| Opportunity {
            current_yes_price: quote.yes_price,
            current_no_price: quote.no_price,
            ..o.clone()
        }))
    }

    fn name(&self) -> &str {
        "replay"
    }
}

/// Reads a JSON array of opportunities.
pub fn load_opportunities(path: &Path) -> Result<Vec<Opportunity>> {
    read_json(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use forecast_core::{Position, Token};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, day, 0, 0, 0).unwrap()
    }

    fn market(id: &str, closed: bool, end: DateTime<Utc>) -> Market {
        Market {
            market_id: id.to_string(),
            question: "Will the bill pass?".to_string(),
            category: None,
            end_date: Some(end),
            closed,
            tokens: vec![
                Token {
                    token_id: "y".to_string(),
                    outcome: "Yes".to_string(),
                    price: Some(1.0),
                },
                Token {
                    token_id: "n".to_string(),
                    outcome: "No".to_string(),
                    price: Some(0.0),
                },
            ],
            volume: None,
        }
    }

    fn article(title: &str, published_at: DateTime<Utc>) -> NewsArticle {
        NewsArticle {
            title: title.to_string(),
            description: None,
            source: None,
            url: None,
            published_at,
        }
    }

    #[tokio::test]
    async fn closed_markets_filtered_by_window() {
        let source = SnapshotMarketSource::new(vec![
            market("in", true, at(10)),
            market("open", false, at(10)),
            market("late", true, at(25)),
        ]);

        let closed = source.closed_markets(at(1), at(20)).await.unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].market_id, "in");
        assert!(source.market("late").await.unwrap().is_some());
        assert!(source.price_at(&closed[0], at(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn news_matches_terms_within_window() {
        let source = SnapshotNewsSource::new(vec![
            article("Senate bill advances", at(5)),
            article("Weather update", at(5)),
            article("Bill signed", at(20)),
        ]);

        let found = source.search("bill pass", at(1), at(10)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Senate bill advances");
        assert!(!source.is_point_in_time());
    }

    #[tokio::test]
    async fn replay_uses_supplied_quote() {
        let analyzer = ReplayAnalyzer::new(vec![Opportunity {
            market_id: "m".to_string(),
            question: "Will the bill pass?".to_string(),
            recommended_position: Position::Yes,
            fair_yes_price: 0.7,
            fair_no_price: 0.3,
            current_yes_price: 0.99,
            current_no_price: 0.01,
            confidence: 0.8,
            expected_return: None,
            risk_level: None,
            category: None,
            end_date: None,
            reasoning: None,
        }]);
        let quote = PriceQuote {
            yes_price: 0.4,
            no_price: 0.6,
            timestamp: at(3),
        };

        let m = market("m", true, at(10));
        let opportunity = analyzer.analyze(&m, &quote, &[]).await.unwrap().unwrap();
        assert!((opportunity.current_yes_price - 0.4).abs() < 1e-9);

        let other = market("other", true, at(10) + Duration::days(1));
        assert!(analyzer.analyze(&other, &quote, &[]).await.unwrap().is_none());
    }
}
