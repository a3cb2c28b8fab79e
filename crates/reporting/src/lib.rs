//! Tabular input/output and chart rendering, the external edge of the
//! pipeline. Everything between load and write is pure computation in
//! lens-analytics / lens-stats.

pub mod charts;
pub mod summary;
pub mod tables;

pub use charts::{box_plot, correlation_heatmap, time_series, write_chart};
pub use summary::{display_value, RunSummary};
pub use tables::{
    load_events, write_events, write_json, write_metric_table, write_overall_summary,
    write_prepared_table, write_significance_json, write_significance_table, LoadOutcome,
    LoadSummary,
};
