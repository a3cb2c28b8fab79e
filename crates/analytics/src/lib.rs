//! Campaign metrics aggregation: grouped counter totals with derived ratios,
//! ISO-week bucketing, rolling averages, and the enriched daily export.

pub mod aggregate;
pub mod prepared;
pub mod rolling;

pub use aggregate::{
    aggregate, daily_metrics, overall_summary, GroupBy, GroupKey, MetricRecord, OverallSummary,
    Totals,
};
pub use prepared::{prepare_rows, PreparedRow};
pub use rolling::{rolling_average, RollingPoint};
