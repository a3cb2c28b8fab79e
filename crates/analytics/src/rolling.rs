//! Trailing-window averages over one campaign's own time series.
//!
//! The scan is an explicit partition-per-campaign followed by a window walk
//! over that partition's chronologically sorted rows, so a value can never
//! mix observations from another campaign.

use chrono::NaiveDate;
use lens_core::types::{Metric, MetricValue};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::aggregate::MetricRecord;

/// One point of a campaign's rolling series.
#[derive(Debug, Clone, Serialize)]
pub struct RollingPoint {
    pub campaign: String,
    pub date: NaiveDate,
    pub metric: Metric,
    /// The raw per-day observation.
    pub value: MetricValue,
    /// Mean of the trailing `window` observations, fewer at the series start.
    pub rolling_mean: MetricValue,
}

/// Compute the trailing-`window` mean of `metric` per campaign.
///
/// Input records must be daily (carry a date); records without one are
/// ignored. A window of 0 is treated as 1. Undefined observations contribute
/// nothing to a window mean; a window with no defined observation yields an
/// undefined rolling value.
pub fn rolling_average(
    records: &[MetricRecord],
    metric: Metric,
    window: usize,
) -> Vec<RollingPoint> {
    let window = window.max(1);

    let mut partitions: BTreeMap<&str, Vec<(NaiveDate, MetricValue)>> = BTreeMap::new();
    for record in records {
        if let Some(date) = record.key.date {
            partitions
                .entry(record.key.campaign.as_str())
                .or_default()
                .push((date, record.metric(metric)));
        }
    }

    let mut points = Vec::new();
    for (campaign, mut series) in partitions {
        series.sort_by_key(|(date, _)| *date);

        for i in 0..series.len() {
            let start = i + 1 - window.min(i + 1);
            let defined: Vec<f64> = series[start..=i]
                .iter()
                .filter_map(|(_, v)| v.as_f64())
                .collect();
            let rolling_mean = if defined.is_empty() {
                MetricValue::Undefined
            } else {
                MetricValue::Defined(defined.iter().sum::<f64>() / defined.len() as f64)
            };

            points.push(RollingPoint {
                campaign: campaign.to_string(),
                date: series[i].0,
                metric,
                value: series[i].1,
                rolling_mean,
            });
        }
    }
    points
}
