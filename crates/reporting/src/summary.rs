//! End-of-run accounting: what was read, what was dropped, what was written.

use lens_core::types::MetricValue;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::tables::LoadSummary;

/// Summary of one pipeline run, logged at the end so no dropped row or
/// skipped pair goes unreported.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub rows_loaded: usize,
    pub rows_dropped: usize,
    pub pairs_tested: usize,
    pub pairs_skipped: usize,
    pub tables_written: Vec<PathBuf>,
    pub charts_written: Vec<PathBuf>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_load(&mut self, load: &LoadSummary) {
        self.rows_loaded = load.loaded;
        self.rows_dropped = load.dropped_count();
    }

    pub fn record_table(&mut self, path: impl Into<PathBuf>) {
        self.tables_written.push(path.into());
    }

    pub fn record_chart(&mut self, path: impl Into<PathBuf>) {
        self.charts_written.push(path.into());
    }

    pub fn log(&self) {
        info!(
            rows_loaded = self.rows_loaded,
            rows_dropped = self.rows_dropped,
            pairs_tested = self.pairs_tested,
            pairs_skipped = self.pairs_skipped,
            tables = self.tables_written.len(),
            charts = self.charts_written.len(),
            "run complete"
        );
        if self.rows_dropped > 0 {
            warn!(
                dropped = self.rows_dropped,
                "malformed input rows were excluded; see the load log above"
            );
        }
    }
}

/// Render a metric cell for stdout tables: undefined prints as a dash.
pub fn display_value(value: MetricValue, precision: usize) -> String {
    match value.as_f64() {
        Some(v) => format!("{v:.precision$}"),
        None => "-".to_string(),
    }
}
