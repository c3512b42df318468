use crate::market::{Market, NewsArticle, PriceQuote};
use crate::opportunity::Opportunity;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Market-data collaborator.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Markets that closed inside `[from, to]`.
    async fn closed_markets(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<Market>>;

    /// Current state of one market, `None` if unknown.
    async fn market(&self, market_id: &str) -> Result<Option<Market>>;

    /// Prices of `market` as they stood at `at`.
    ///
    /// Sources without price history return `None`.
    async fn price_at(&self, _market: &Market, _at: DateTime<Utc>) -> Result<Option<PriceQuote>> {
        Ok(None)
    }
}

/// News collaborator.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn search(
        &self,
        query: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<NewsArticle>>;

    /// True when `search` only returns what was published inside the window,
    /// as an archive would.
    fn is_point_in_time(&self) -> bool {
        false
    }
}

/// Opportunity-detection collaborator.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyzes `market` at the quoted prices. `None` when no mispricing is found.
    async fn analyze(
        &self,
        market: &Market,
        quote: &PriceQuote,
        news: &[NewsArticle],
    ) -> Result<Option<Opportunity>>;

    fn name(&self) -> &str;
}
