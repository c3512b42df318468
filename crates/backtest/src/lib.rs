pub mod engine;
pub mod historical;
pub mod metrics;
pub mod performance;
pub mod report;
pub mod resolver;

pub use engine::{BacktestingEngine, ResolutionSweep};
pub use historical::{
    check_gates, extract_search_terms, GateRejection, HistoricalBacktestResult, HistoricalSimulator,
};
pub use metrics::{
    BacktestFilter, BacktestMetrics, BucketStats, DeviationBreakdown, MetricsAggregator,
    ResolutionTimeBreakdown,
};
pub use performance::{PerformanceMetrics, SegmentStats};
pub use report::{format_backtest_report, format_historical_report, format_performance_report};
pub use resolver::{OutcomeResolver, ResolvedMarket};
