//! Grouped aggregation: sum base counters per group, then derive every ratio
//! from the summed counters. Ratios are never averaged across rows, since
//! a mean-of-ratios would let a small low-volume day distort the group.

use chrono::{Datelike, NaiveDate};
use lens_core::types::{CampaignDay, Metric, MetricValue};
use serde::Serialize;
use std::collections::BTreeMap;

/// Grouping key set for aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// One record per campaign across the whole input.
    Campaign,
    /// One record per (campaign, date).
    CampaignDate,
    /// One record per (campaign, ISO year, ISO week). Rows are summed into
    /// the weekly bucket before ratios are recomputed.
    CampaignWeek,
}

/// Concrete key of one aggregated group. Unused parts stay `None` and are
/// omitted from serialized output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct GroupKey {
    pub campaign: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso_week: Option<u32>,
}

impl GroupKey {
    fn for_row(row: &CampaignDay, group_by: GroupBy) -> Self {
        match group_by {
            GroupBy::Campaign => Self {
                campaign: row.campaign.clone(),
                date: None,
                iso_year: None,
                iso_week: None,
            },
            GroupBy::CampaignDate => Self {
                campaign: row.campaign.clone(),
                date: Some(row.date),
                iso_year: None,
                iso_week: None,
            },
            GroupBy::CampaignWeek => {
                // Keyed by (ISO year, ISO week): late-December dates that fall
                // into week 1 of the next ISO year must not collide with the
                // same week number a year earlier.
                let iso = row.date.iso_week();
                Self {
                    campaign: row.campaign.clone(),
                    date: None,
                    iso_year: Some(iso.year()),
                    iso_week: Some(iso.week()),
                }
            }
        }
    }
}

/// Summed base counters for one group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub revenue: f64,
    pub cost: f64,
}

impl Totals {
    pub fn absorb(&mut self, row: &CampaignDay) {
        self.impressions += row.impressions;
        self.clicks += row.clicks;
        self.conversions += row.conversions;
        self.revenue += row.revenue;
        self.cost += row.cost;
    }

    pub fn ctr(&self) -> MetricValue {
        MetricValue::ratio(self.clicks as f64, self.impressions as f64)
    }

    pub fn cac(&self) -> MetricValue {
        MetricValue::ratio(self.cost, self.conversions as f64)
    }

    pub fn ltv(&self) -> MetricValue {
        MetricValue::ratio(self.revenue, self.conversions as f64)
    }

    /// ROI in percent: (revenue - cost) / cost * 100.
    pub fn roi(&self) -> MetricValue {
        MetricValue::ratio(self.revenue - self.cost, self.cost).map(|v| v * 100.0)
    }

    pub fn conversion_rate(&self) -> MetricValue {
        MetricValue::ratio(self.conversions as f64, self.clicks as f64)
    }
}

/// One aggregated group with its derived ratios.
#[derive(Debug, Clone, Serialize)]
pub struct MetricRecord {
    #[serde(flatten)]
    pub key: GroupKey,
    #[serde(flatten)]
    pub totals: Totals,
    pub ctr: MetricValue,
    pub cac: MetricValue,
    pub ltv: MetricValue,
    pub roi: MetricValue,
    pub conversion_rate: MetricValue,
}

impl MetricRecord {
    fn from_totals(key: GroupKey, totals: Totals) -> Self {
        Self {
            ctr: totals.ctr(),
            cac: totals.cac(),
            ltv: totals.ltv(),
            roi: totals.roi(),
            conversion_rate: totals.conversion_rate(),
            key,
            totals,
        }
    }

    /// Look up one of the derived ratios by metric name.
    pub fn metric(&self, metric: Metric) -> MetricValue {
        match metric {
            Metric::Ctr => self.ctr,
            Metric::Cac => self.cac,
            Metric::Ltv => self.ltv,
            Metric::Roi => self.roi,
            Metric::ConversionRate => self.conversion_rate,
        }
    }
}

/// Aggregate event rows into one derived-metric record per group.
///
/// Output order is the key order (campaign, then date/week), independent of
/// input order: shuffling the input yields an identical table.
pub fn aggregate(rows: &[CampaignDay], group_by: GroupBy) -> Vec<MetricRecord> {
    let mut groups: BTreeMap<GroupKey, Totals> = BTreeMap::new();
    for row in rows {
        groups
            .entry(GroupKey::for_row(row, group_by))
            .or_default()
            .absorb(row);
    }

    groups
        .into_iter()
        .map(|(key, totals)| MetricRecord::from_totals(key, totals))
        .collect()
}

/// Per-day, per-campaign metric records: the sample rows the significance
/// tester and the rolling-average scan both consume.
pub fn daily_metrics(rows: &[CampaignDay]) -> Vec<MetricRecord> {
    aggregate(rows, GroupBy::CampaignDate)
}

/// Totals and overall ratios across every input row.
#[derive(Debug, Clone, Serialize)]
pub struct OverallSummary {
    #[serde(flatten)]
    pub totals: Totals,
    pub ctr: MetricValue,
    pub cac: MetricValue,
    pub ltv: MetricValue,
    pub roi: MetricValue,
    pub conversion_rate: MetricValue,
}

pub fn overall_summary(rows: &[CampaignDay]) -> OverallSummary {
    let mut totals = Totals::default();
    for row in rows {
        totals.absorb(row);
    }
    OverallSummary {
        ctr: totals.ctr(),
        cac: totals.cac(),
        ltv: totals.ltv(),
        roi: totals.roi(),
        conversion_rate: totals.conversion_rate(),
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(date: &str, campaign: &str, imp: u64, clk: u64, conv: u64, rev: f64, cost: f64) -> CampaignDay {
        CampaignDay {
            date: date.parse().unwrap(),
            campaign: campaign.to_string(),
            impressions: imp,
            clicks: clk,
            conversions: conv,
            revenue: rev,
            cost,
        }
    }

    fn sample_rows() -> Vec<CampaignDay> {
        vec![
            day("2025-03-03", "spring_sale", 1000, 50, 5, 500.0, 100.0),
            day("2025-03-04", "spring_sale", 2000, 80, 8, 640.0, 150.0),
            day("2025-03-03", "retargeting", 500, 40, 10, 900.0, 200.0),
            day("2025-03-10", "retargeting", 700, 35, 7, 630.0, 140.0),
        ]
    }

    #[test]
    fn test_campaign_totals_sum_then_ratio() {
        let records = aggregate(&sample_rows(), GroupBy::Campaign);
        assert_eq!(records.len(), 2);

        // BTreeMap ordering: "retargeting" < "spring_sale"
        let spring = &records[1];
        assert_eq!(spring.key.campaign, "spring_sale");
        assert_eq!(spring.totals.impressions, 3000);
        assert_eq!(spring.totals.clicks, 130);
        // 130/3000 from summed counters, not mean(50/1000, 80/2000)
        assert_eq!(spring.ctr, MetricValue::Defined(130.0 / 3000.0));
        assert_eq!(spring.cac, MetricValue::Defined(250.0 / 13.0));
    }

    #[test]
    fn test_order_independence() {
        let rows = sample_rows();
        let mut reversed = rows.clone();
        reversed.reverse();

        for group_by in [GroupBy::Campaign, GroupBy::CampaignDate, GroupBy::CampaignWeek] {
            let a = aggregate(&rows, group_by);
            let b = aggregate(&reversed, group_by);
            assert_eq!(a.len(), b.len());
            for (x, y) in a.iter().zip(&b) {
                assert_eq!(x.key, y.key);
                assert_eq!(x.totals, y.totals);
            }
        }
    }

    #[test]
    fn test_weekly_bucketing_sums_before_ratio() {
        // 2025-03-03 and 2025-03-04 share ISO week 10; 2025-03-10 is week 11.
        let records = aggregate(&sample_rows(), GroupBy::CampaignWeek);
        let spring_w10 = records
            .iter()
            .find(|r| r.key.campaign == "spring_sale" && r.key.iso_week == Some(10))
            .unwrap();
        assert_eq!(spring_w10.totals.impressions, 3000);
        assert_eq!(spring_w10.ctr, MetricValue::Defined(130.0 / 3000.0));

        let retarget_weeks: Vec<u32> = records
            .iter()
            .filter(|r| r.key.campaign == "retargeting")
            .filter_map(|r| r.key.iso_week)
            .collect();
        assert_eq!(retarget_weeks, vec![10, 11]);
    }

    #[test]
    fn test_iso_year_boundary_does_not_collide() {
        // 2024-12-30 belongs to ISO week 1 of 2025; 2025-12-29 to week 1 of 2026.
        let rows = vec![
            day("2024-12-30", "evergreen", 100, 10, 1, 10.0, 5.0),
            day("2025-12-29", "evergreen", 200, 20, 2, 20.0, 10.0),
        ];
        let records = aggregate(&rows, GroupBy::CampaignWeek);
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.key.iso_week == Some(1)));
        assert_ne!(records[0].key.iso_year, records[1].key.iso_year);
    }

    #[test]
    fn test_zero_denominators_flagged_undefined() {
        let rows = vec![day("2025-03-03", "dead_campaign", 0, 0, 0, 0.0, 0.0)];
        let records = aggregate(&rows, GroupBy::Campaign);
        let r = &records[0];
        assert_eq!(r.ctr, MetricValue::Undefined);
        assert_eq!(r.cac, MetricValue::Undefined);
        assert_eq!(r.ltv, MetricValue::Undefined);
        assert_eq!(r.roi, MetricValue::Undefined);
        assert_eq!(r.conversion_rate, MetricValue::Undefined);
    }

    #[test]
    fn test_overall_summary_matches_direct_totals() {
        let rows = sample_rows();
        let summary = overall_summary(&rows);
        assert_eq!(summary.totals.impressions, 4200);
        assert_eq!(summary.totals.clicks, 205);
        assert_eq!(summary.ctr, MetricValue::Defined(205.0 / 4200.0));
        assert_eq!(
            summary.roi,
            MetricValue::Defined((2670.0 - 590.0) / 590.0 * 100.0)
        );
    }
}
