//! Enriched daily export: per-day metrics joined with calendar dimensions and
//! per-campaign rolling averages, shaped for BI-tool import.

use chrono::{Datelike, NaiveDate};
use lens_core::types::{CampaignDay, Metric, MetricValue};
use serde::Serialize;
use std::collections::HashMap;

use crate::aggregate::daily_metrics;
use crate::rolling::rolling_average;

/// One row of the prepared export table.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedRow {
    pub date: NaiveDate,
    pub campaign: String,
    pub month: u32,
    pub month_name: &'static str,
    pub iso_week: u32,
    pub day_of_week: &'static str,
    pub quarter: u32,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub revenue: f64,
    pub cost: f64,
    pub profit: f64,
    pub ctr: MetricValue,
    pub cac: MetricValue,
    pub ltv: MetricValue,
    pub roi: MetricValue,
    pub conversion_rate: MetricValue,
    pub ctr_rolling: MetricValue,
    pub cac_rolling: MetricValue,
    pub ltv_rolling: MetricValue,
    pub roi_rolling: MetricValue,
}

const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

/// Build the prepared export from raw event rows.
///
/// Duplicated (date, campaign) rows are first summed into one daily record,
/// then rolling averages run per campaign over the daily series with the
/// given trailing window.
pub fn prepare_rows(rows: &[CampaignDay], rolling_window: usize) -> Vec<PreparedRow> {
    let daily = daily_metrics(rows);

    let mut rolling: HashMap<(String, NaiveDate, Metric), MetricValue> = HashMap::new();
    for metric in [Metric::Ctr, Metric::Cac, Metric::Ltv, Metric::Roi] {
        for point in rolling_average(&daily, metric, rolling_window) {
            rolling.insert((point.campaign, point.date, metric), point.rolling_mean);
        }
    }

    daily
        .into_iter()
        .filter_map(|record| {
            let date = record.key.date?;
            let campaign = record.key.campaign;
            let lookup = |metric: Metric| {
                rolling
                    .get(&(campaign.clone(), date, metric))
                    .copied()
                    .unwrap_or(MetricValue::Undefined)
            };
            Some(PreparedRow {
                month: date.month(),
                month_name: MONTH_NAMES[date.month0() as usize],
                iso_week: date.iso_week().week(),
                day_of_week: WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize],
                quarter: (date.month0() / 3) + 1,
                impressions: record.totals.impressions,
                clicks: record.totals.clicks,
                conversions: record.totals.conversions,
                revenue: record.totals.revenue,
                cost: record.totals.cost,
                profit: record.totals.revenue - record.totals.cost,
                ctr: record.ctr,
                cac: record.cac,
                ltv: record.ltv,
                roi: record.roi,
                conversion_rate: record.conversion_rate,
                ctr_rolling: lookup(Metric::Ctr),
                cac_rolling: lookup(Metric::Cac),
                ltv_rolling: lookup(Metric::Ltv),
                roi_rolling: lookup(Metric::Roi),
                date,
                campaign,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(date: &str, campaign: &str) -> CampaignDay {
        CampaignDay {
            date: date.parse().unwrap(),
            campaign: campaign.to_string(),
            impressions: 1000,
            clicks: 50,
            conversions: 5,
            revenue: 500.0,
            cost: 100.0,
        }
    }

    #[test]
    fn test_calendar_dimensions() {
        let rows = vec![day("2025-08-06", "spring_sale")];
        let prepared = prepare_rows(&rows, 7);
        let row = &prepared[0];
        assert_eq!(row.month, 8);
        assert_eq!(row.month_name, "August");
        assert_eq!(row.day_of_week, "Wednesday");
        assert_eq!(row.quarter, 3);
        assert_eq!(row.iso_week, 32);
        assert_eq!(row.profit, 400.0);
    }

    #[test]
    fn test_rolling_columns_join_per_campaign() {
        let rows = vec![
            day("2025-08-04", "a"),
            day("2025-08-05", "a"),
            day("2025-08-04", "b"),
        ];
        let prepared = prepare_rows(&rows, 7);
        assert_eq!(prepared.len(), 3);
        for row in &prepared {
            // Constant series: rolling mean equals the per-day value.
            assert_eq!(row.ctr_rolling, row.ctr);
            assert_eq!(row.roi_rolling, row.roi);
        }
    }
}
