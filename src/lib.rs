// Branch Insights - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod logging;
pub mod records;      // Boundary types + JSON/CSV loaders
pub mod config;       // TOML thresholds for every engine
pub mod stats;        // Numeric helpers shared by the engines
pub mod period;       // Period-over-period comparison
pub mod health;       // Weighted business health score
pub mod anomaly;      // Z-score anomaly detection
pub mod forecast;     // Moving-average + monthly trend forecasting
pub mod segmentation; // RFM customer segments
pub mod aggregate;    // Leaderboards
pub mod inventory;    // Reorder alerts
pub mod marketing;    // Campaign and targeting suggestions

// Re-export commonly used types
pub use error::{InsightsError, Result};
pub use records::{
    BookingRecord, BookingStatus, Dataset, LineItem, PaymentStatus, ProductStock,
    TransactionRecord,
    load_bookings_csv, load_products_csv, load_transactions_csv,
};
pub use config::{
    AnalyticsConfig, AnomalyConfig, ForecastConfig, HealthConfig, InventoryConfig,
    MarketingConfig, ReportConfig, SegmentationConfig,
};
pub use period::{
    BranchComparison, PeriodSummary, RevenueBreakdown,
    compare_branches, compare_periods, declining_branches, parse_instant, resolve_bounds,
};
pub use health::{HealthEngine, HealthReport, HealthStatus};
pub use anomaly::{AnomalyDetector, AnomalyReport};
pub use forecast::{Forecaster, MonthlyProjection, SalesForecast};
pub use segmentation::{CustomerSegmenter, Segment, SegmentationReport};
pub use aggregate::{GroupKey, LeaderboardEntry, ReportAggregator, leaderboard};
pub use inventory::{ReorderPlanner, ReorderReport};
pub use marketing::{MarketingPlanner, MarketingReport};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
