//! Full pipeline tests: generated CSV in, tables and charts out.

use lens_analytics::{aggregate, daily_metrics, overall_summary, prepare_rows, GroupBy};
use lens_core::types::{CampaignDay, Metric, MetricValue};
use lens_reporting::{
    box_plot, correlation_heatmap, load_events, time_series, write_events, write_metric_table,
    write_significance_table,
};
use lens_stats::run_batch;
use std::path::PathBuf;

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("campaign-lens-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn day(date: &str, campaign: &str, scale: u64) -> CampaignDay {
    CampaignDay {
        date: date.parse().unwrap(),
        campaign: campaign.to_string(),
        impressions: 1000 * scale,
        clicks: 50 * scale,
        conversions: 5 * scale,
        revenue: 500.0 * scale as f64,
        cost: 100.0 * scale as f64,
    }
}

/// Two campaigns over three days, campaign B doubling every count of A.
/// Ratios must come out identical and no metric difference significant.
#[test]
fn doubled_counts_same_ratios_no_significance() {
    let mut rows = Vec::new();
    for date in ["2025-03-03", "2025-03-04", "2025-03-05"] {
        rows.push(day(date, "alpha", 1));
        rows.push(day(date, "bravo", 2));
    }

    let by_campaign = aggregate(&rows, GroupBy::Campaign);
    assert_eq!(by_campaign.len(), 2);
    for record in &by_campaign {
        assert_eq!(record.ctr, MetricValue::Defined(0.05));
        assert_eq!(record.cac, MetricValue::Defined(20.0));
        assert_eq!(record.ltv, MetricValue::Defined(100.0));
        assert_eq!(record.roi, MetricValue::Defined(400.0));
        assert_eq!(record.conversion_rate, MetricValue::Defined(0.1));
    }

    let daily = daily_metrics(&rows);
    let report = run_batch(
        &daily,
        &[Metric::Ctr, Metric::Cac, Metric::Ltv, Metric::Roi],
        0.95,
    );
    assert_eq!(report.results.len(), 4);
    assert!(report.skipped.is_empty());
    for result in &report.results {
        assert_eq!(result.p_value, 1.0, "metric {} differed", result.metric);
        assert!(!result.significant);
    }
}

#[test]
fn generated_data_survives_round_trip_and_analysis() {
    let dir = temp_dir("roundtrip");
    let events_path = dir.join("events.csv");

    let start = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let generated = lens_datagen::generate(28, 4, start, 42);
    write_events(&events_path, &generated).unwrap();

    let outcome = load_events(&events_path).unwrap();
    assert_eq!(outcome.rows, generated);
    assert_eq!(outcome.summary.dropped_count(), 0);

    let rows = outcome.rows;
    let daily = daily_metrics(&rows);
    assert_eq!(daily.len(), 28 * 4);

    let overall = overall_summary(&rows);
    assert!(overall.ctr.is_defined());

    let prepared = prepare_rows(&rows, 7);
    assert_eq!(prepared.len(), daily.len());

    let metrics_path = dir.join("campaign_metrics.csv");
    write_metric_table(&metrics_path, &aggregate(&rows, GroupBy::Campaign)).unwrap();
    let written = std::fs::read_to_string(&metrics_path).unwrap();
    assert!(written.starts_with("campaign,"));
    assert_eq!(written.lines().count(), 5); // header + 4 campaigns

    let report = run_batch(&daily, &[Metric::Ctr, Metric::Cac, Metric::Ltv], 0.95);
    // 4 campaigns -> 6 pairs per metric, none skipped with 28 samples each.
    assert_eq!(report.results.len(), 18);
    assert!(report.skipped.is_empty());

    let results_path = dir.join("ab_test_results.csv");
    write_significance_table(&results_path, &report).unwrap();
    let results = std::fs::read_to_string(&results_path).unwrap();
    assert_eq!(results.lines().count(), 19);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn charts_render_from_generated_data() {
    let start = chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let rows = lens_datagen::generate(21, 3, start, 7);
    let daily = daily_metrics(&rows);

    for metric in [Metric::Ctr, Metric::Cac, Metric::Ltv, Metric::Roi] {
        let svg = box_plot(&daily, metric, 960, 540);
        assert!(svg.starts_with("<svg") && svg.len() > 200);
        let svg = time_series(&daily, metric, 960, 540);
        assert!(svg.starts_with("<svg") && svg.len() > 200);
    }
    let svg = correlation_heatmap(&daily, 960, 720);
    assert!(svg.starts_with("<svg") && svg.len() > 200);
}

/// A campaign with zero conversions flows through the whole pipeline as
/// undefined, never as a crash or a zero.
#[test]
fn zero_conversion_campaign_stays_undefined() {
    let rows = vec![
        CampaignDay {
            date: "2025-03-03".parse().unwrap(),
            campaign: "no_conversions".to_string(),
            impressions: 1000,
            clicks: 50,
            conversions: 0,
            revenue: 0.0,
            cost: 100.0,
        },
        day("2025-03-03", "healthy", 1),
        day("2025-03-04", "healthy", 1),
    ];

    let by_campaign = aggregate(&rows, GroupBy::Campaign);
    let broken = by_campaign
        .iter()
        .find(|r| r.key.campaign == "no_conversions")
        .unwrap();
    assert_eq!(broken.cac, MetricValue::Undefined);
    assert_eq!(broken.ltv, MetricValue::Undefined);
    assert!(broken.ctr.is_defined());

    // CAC samples: the broken campaign has one row and it is undefined, so
    // the pair is skipped with an explicit reason.
    let report = run_batch(&daily_metrics(&rows), &[Metric::Cac], 0.95);
    assert!(report.results.is_empty());
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.undefined_samples_excluded, 1);
}
