pub mod config;
pub mod config_loader;
pub mod market;
pub mod opportunity;
pub mod prediction;
pub mod scoring;
pub mod stats;
pub mod traits;

pub use config::{AppConfig, HistoricalConfig, ResolverConfig, StorageConfig, TrackingConfig};
pub use config_loader::ConfigLoader;
pub use market::{Market, NewsArticle, PriceQuote, Token};
pub use opportunity::{Opportunity, Position, RiskLevel};
pub use prediction::{MarketOutcome, PredictionRecord, PredictionStatus, Resolution};
pub use scoring::PredictionScore;
pub use traits::{Analyzer, MarketSource, NewsSource};
