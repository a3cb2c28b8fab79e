//! SVG chart rendering: box plot, time series, correlation heatmap.
//!
//! Charts are a reporting sink, not an analysis step. They consume the
//! derived tables and only promise a well-formed, non-empty image.

use lens_analytics::MetricRecord;
use lens_core::error::{LensError, LensResult};
use lens_core::types::Metric;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;
use tracing::info;

const PALETTE: [&str; 8] = [
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#9c755f",
];

const MARGIN: f64 = 60.0;

fn svg_open(width: u32, height: u32) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" \
         viewBox=\"0 0 {width} {height}\" font-family=\"sans-serif\" font-size=\"12\">\n\
         <rect width=\"{width}\" height=\"{height}\" fill=\"white\"/>\n"
    )
}

fn empty_chart(width: u32, height: u32, title: &str) -> String {
    let mut svg = svg_open(width, height);
    let _ = write!(
        svg,
        "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\">{title}: no data</text>\n</svg>\n",
        width / 2,
        height / 2
    );
    svg
}

/// Per-campaign samples of one metric, defined values only, campaign order
/// fixed by the BTreeMap.
fn samples_by_campaign(records: &[MetricRecord], metric: Metric) -> BTreeMap<&str, Vec<f64>> {
    let mut samples: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let Some(value) = record.metric(metric).as_f64() {
            samples
                .entry(record.key.campaign.as_str())
                .or_default()
                .push(value);
        }
    }
    samples.retain(|_, v| !v.is_empty());
    samples
}

fn quartiles(sorted: &[f64]) -> (f64, f64, f64) {
    let median = |xs: &[f64]| -> f64 {
        let n = xs.len();
        if n % 2 == 1 {
            xs[n / 2]
        } else {
            (xs[n / 2 - 1] + xs[n / 2]) / 2.0
        }
    };
    let n = sorted.len();
    let mid = median(sorted);
    if n < 2 {
        return (mid, mid, mid);
    }
    // Tukey hinges: the median row is shared by both halves when n is odd.
    let lower = &sorted[..n.div_ceil(2)];
    let upper = &sorted[n / 2..];
    (median(lower), mid, median(upper))
}

/// Distribution of one metric per campaign: whiskers at min/max, box at the
/// quartiles, line at the median.
pub fn box_plot(records: &[MetricRecord], metric: Metric, width: u32, height: u32) -> String {
    let samples = samples_by_campaign(records, metric);
    if samples.is_empty() {
        return empty_chart(width, height, &format!("{metric} by campaign"));
    }

    let global_min = samples
        .values()
        .flatten()
        .copied()
        .fold(f64::INFINITY, f64::min);
    let global_max = samples
        .values()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let span = if global_max > global_min {
        global_max - global_min
    } else {
        1.0
    };

    let plot_h = height as f64 - 2.0 * MARGIN;
    let y_of = |v: f64| MARGIN + plot_h * (1.0 - (v - global_min) / span);
    let slot_w = (width as f64 - 2.0 * MARGIN) / samples.len() as f64;
    let box_w = (slot_w * 0.5).min(80.0);

    let mut svg = svg_open(width, height);
    let _ = write!(
        svg,
        "<text x=\"{}\" y=\"24\" text-anchor=\"middle\" font-size=\"16\">{metric} distribution by campaign</text>\n",
        width / 2
    );

    for (i, (campaign, values)) in samples.iter().enumerate() {
        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let (q1, median, q3) = quartiles(&sorted);
        let (min, max) = (sorted[0], sorted[sorted.len() - 1]);

        let cx = MARGIN + slot_w * (i as f64 + 0.5);
        let color = PALETTE[i % PALETTE.len()];

        let _ = write!(
            svg,
            "<line x1=\"{cx}\" y1=\"{}\" x2=\"{cx}\" y2=\"{}\" stroke=\"{color}\"/>\n",
            y_of(max),
            y_of(min)
        );
        let _ = write!(
            svg,
            "<rect x=\"{}\" y=\"{}\" width=\"{box_w}\" height=\"{}\" fill=\"{color}\" \
             fill-opacity=\"0.4\" stroke=\"{color}\"/>\n",
            cx - box_w / 2.0,
            y_of(q3),
            (y_of(q1) - y_of(q3)).max(1.0)
        );
        let _ = write!(
            svg,
            "<line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"{color}\" stroke-width=\"2\"/>\n",
            cx - box_w / 2.0,
            y_of(median),
            cx + box_w / 2.0,
            y_of(median)
        );
        let _ = write!(
            svg,
            "<text x=\"{cx}\" y=\"{}\" text-anchor=\"middle\">{campaign}</text>\n",
            height as f64 - MARGIN / 2.0
        );
    }

    svg.push_str("</svg>\n");
    svg
}

/// One line per campaign, x ordered by date, gaps where the metric is
/// undefined.
pub fn time_series(records: &[MetricRecord], metric: Metric, width: u32, height: u32) -> String {
    let mut series: BTreeMap<&str, Vec<(chrono::NaiveDate, Option<f64>)>> = BTreeMap::new();
    for record in records {
        if let Some(date) = record.key.date {
            series
                .entry(record.key.campaign.as_str())
                .or_default()
                .push((date, record.metric(metric).as_f64()));
        }
    }
    series.values_mut().for_each(|s| s.sort_by_key(|(d, _)| *d));

    let dates: Vec<chrono::NaiveDate> = series
        .values()
        .flatten()
        .map(|(d, _)| *d)
        .collect();
    let values: Vec<f64> = series
        .values()
        .flatten()
        .filter_map(|(_, v)| *v)
        .collect();
    if dates.is_empty() || values.is_empty() {
        return empty_chart(width, height, &format!("{metric} over time"));
    }

    let (first, last) = (
        *dates.iter().min().unwrap(),
        *dates.iter().max().unwrap(),
    );
    let day_span = (last - first).num_days().max(1) as f64;
    let v_min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let v_max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let v_span = if v_max > v_min { v_max - v_min } else { 1.0 };

    let plot_w = width as f64 - 2.0 * MARGIN;
    let plot_h = height as f64 - 2.0 * MARGIN;
    let x_of = |d: chrono::NaiveDate| MARGIN + plot_w * ((d - first).num_days() as f64 / day_span);
    let y_of = |v: f64| MARGIN + plot_h * (1.0 - (v - v_min) / v_span);

    let mut svg = svg_open(width, height);
    let _ = write!(
        svg,
        "<text x=\"{}\" y=\"24\" text-anchor=\"middle\" font-size=\"16\">{metric} over time by campaign</text>\n",
        width / 2
    );

    for (i, (campaign, points)) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];

        // Undefined days split the polyline into segments.
        let mut segment: Vec<String> = Vec::new();
        let mut flush = |seg: &mut Vec<String>, svg: &mut String| {
            if seg.len() > 1 {
                let _ = write!(
                    svg,
                    "<polyline points=\"{}\" fill=\"none\" stroke=\"{color}\" stroke-width=\"1.5\"/>\n",
                    seg.join(" ")
                );
            }
            seg.clear();
        };
        for (date, value) in points {
            match value {
                Some(v) => segment.push(format!("{:.1},{:.1}", x_of(*date), y_of(*v))),
                None => flush(&mut segment, &mut svg),
            }
        }
        flush(&mut segment, &mut svg);

        let _ = write!(
            svg,
            "<text x=\"{}\" y=\"{}\" fill=\"{color}\">{campaign}</text>\n",
            MARGIN + (i as f64) * 140.0,
            height as f64 - MARGIN / 3.0
        );
    }

    svg.push_str("</svg>\n");
    svg
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}

/// Blue (-1) through white (0) to red (+1).
fn heat_color(r: f64) -> String {
    let t = r.clamp(-1.0, 1.0);
    let lerp = |a: f64, b: f64, t: f64| (a + (b - a) * t).round() as u8;
    let (red, green, blue) = if t < 0.0 {
        let t = -t;
        (lerp(255.0, 69.0, t), lerp(255.0, 117.0, t), lerp(255.0, 180.0, t))
    } else {
        (lerp(255.0, 215.0, t), lerp(255.0, 48.0, t), lerp(255.0, 39.0, t))
    };
    format!("#{red:02x}{green:02x}{blue:02x}")
}

const HEATMAP_COLUMNS: [&str; 9] = [
    "impressions",
    "clicks",
    "conversions",
    "revenue",
    "cost",
    "ctr",
    "cac",
    "ltv",
    "roi",
];

fn heatmap_value(record: &MetricRecord, column: &str) -> Option<f64> {
    match column {
        "impressions" => Some(record.totals.impressions as f64),
        "clicks" => Some(record.totals.clicks as f64),
        "conversions" => Some(record.totals.conversions as f64),
        "revenue" => Some(record.totals.revenue),
        "cost" => Some(record.totals.cost),
        "ctr" => record.ctr.as_f64(),
        "cac" => record.cac.as_f64(),
        "ltv" => record.ltv.as_f64(),
        "roi" => record.roi.as_f64(),
        _ => None,
    }
}

/// Pairwise Pearson correlation across the numeric columns of the daily
/// table. Rows where either value is undefined are excluded pairwise.
pub fn correlation_heatmap(records: &[MetricRecord], width: u32, height: u32) -> String {
    if records.is_empty() {
        return empty_chart(width, height, "metric correlation");
    }

    let n = HEATMAP_COLUMNS.len();
    let cell_w = (width as f64 - 2.0 * MARGIN) / n as f64;
    let cell_h = (height as f64 - 2.0 * MARGIN) / n as f64;

    let mut svg = svg_open(width, height);
    let _ = write!(
        svg,
        "<text x=\"{}\" y=\"24\" text-anchor=\"middle\" font-size=\"16\">Metric correlation</text>\n",
        width / 2
    );

    for (row, row_name) in HEATMAP_COLUMNS.iter().enumerate() {
        let _ = write!(
            svg,
            "<text x=\"{}\" y=\"{}\" text-anchor=\"end\">{row_name}</text>\n",
            MARGIN - 6.0,
            MARGIN + cell_h * (row as f64 + 0.6)
        );
        let _ = write!(
            svg,
            "<text x=\"{}\" y=\"{}\" text-anchor=\"middle\" transform=\"rotate(-45 {} {})\">{row_name}</text>\n",
            MARGIN + cell_w * (row as f64 + 0.5),
            MARGIN - 8.0,
            MARGIN + cell_w * (row as f64 + 0.5),
            MARGIN - 8.0
        );

        for (col, col_name) in HEATMAP_COLUMNS.iter().enumerate() {
            let pairs: (Vec<f64>, Vec<f64>) = records
                .iter()
                .filter_map(|r| {
                    Some((heatmap_value(r, row_name)?, heatmap_value(r, col_name)?))
                })
                .unzip();
            let r = pearson(&pairs.0, &pairs.1);

            let x = MARGIN + cell_w * col as f64;
            let y = MARGIN + cell_h * row as f64;
            let fill = r.map_or_else(|| "#dddddd".to_string(), heat_color);
            let _ = write!(
                svg,
                "<rect x=\"{x:.1}\" y=\"{y:.1}\" width=\"{cell_w:.1}\" height=\"{cell_h:.1}\" \
                 fill=\"{fill}\" stroke=\"white\"/>\n"
            );
            if let Some(r) = r {
                let _ = write!(
                    svg,
                    "<text x=\"{:.1}\" y=\"{:.1}\" text-anchor=\"middle\">{r:.2}</text>\n",
                    x + cell_w / 2.0,
                    y + cell_h / 2.0 + 4.0
                );
            }
        }
    }

    svg.push_str("</svg>\n");
    svg
}

/// Write a rendered chart to disk.
pub fn write_chart(path: &Path, svg: &str) -> LensResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LensError::io(parent, e))?;
    }
    std::fs::write(path, svg).map_err(|e| LensError::io(path, e))?;
    info!(path = %path.display(), bytes = svg.len(), "chart written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lens_analytics::daily_metrics;
    use lens_core::types::CampaignDay;

    fn rows() -> Vec<CampaignDay> {
        (0..10)
            .flat_map(|i| {
                ["a", "b"].into_iter().map(move |campaign| CampaignDay {
                    date: chrono::NaiveDate::from_ymd_opt(2025, 3, 1 + i).unwrap(),
                    campaign: campaign.to_string(),
                    impressions: 1000 + i as u64 * 37,
                    clicks: 40 + i as u64,
                    conversions: 4,
                    revenue: 400.0 + i as f64 * 10.0,
                    cost: 100.0 + i as f64,
                })
            })
            .collect()
    }

    #[test]
    fn test_box_plot_non_empty_svg() {
        let records = daily_metrics(&rows());
        let svg = box_plot(&records, Metric::Ctr, 960, 540);
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("</svg>"));
        assert!(svg.contains("<rect"));
    }

    #[test]
    fn test_time_series_non_empty_svg() {
        let records = daily_metrics(&rows());
        let svg = time_series(&records, Metric::Roi, 960, 540);
        assert!(svg.contains("<polyline"));
    }

    #[test]
    fn test_heatmap_non_empty_svg() {
        let records = daily_metrics(&rows());
        let svg = correlation_heatmap(&records, 960, 720);
        assert!(svg.contains("<rect"));
        assert!(svg.contains("ctr"));
    }

    #[test]
    fn test_empty_input_does_not_crash() {
        let svg = box_plot(&[], Metric::Ctr, 960, 540);
        assert!(svg.contains("no data"));
        let svg = time_series(&[], Metric::Ctr, 960, 540);
        assert!(svg.contains("no data"));
        let svg = correlation_heatmap(&[], 960, 720);
        assert!(svg.contains("no data"));
    }

    #[test]
    fn test_pearson_perfect_correlation() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson(&xs, &ys).unwrap() - 1.0).abs() < 1e-12);
        let neg = [8.0, 6.0, 4.0, 2.0];
        assert!((pearson(&xs, &neg).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_quartiles_odd_and_even() {
        assert_eq!(quartiles(&[1.0, 2.0, 3.0, 4.0, 5.0]), (2.0, 3.0, 4.0));
        assert_eq!(quartiles(&[1.0, 2.0, 3.0, 4.0]), (1.5, 2.5, 3.5));
    }
}
