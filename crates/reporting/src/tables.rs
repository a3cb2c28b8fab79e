//! CSV/JSON tabular I/O.
//!
//! The loader maps columns by header name, rejects a missing required column
//! before any computation, and drops malformed rows with a counted reason,
//! never silently. Writers build each table's columns explicitly and format
//! cells from JSON values, so an undefined ratio becomes an empty CSV cell
//! or a JSON null rather than a fake zero.

use chrono::{DateTime, NaiveDate, Utc};
use lens_analytics::{MetricRecord, OverallSummary, PreparedRow};
use lens_core::error::{LensError, LensResult};
use lens_core::types::CampaignDay;
use lens_stats::SignificanceReport;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

pub const REQUIRED_COLUMNS: [&str; 7] = [
    "date",
    "campaign",
    "impressions",
    "clicks",
    "conversions",
    "revenue",
    "cost",
];

/// Result of loading one input file.
#[derive(Debug)]
pub struct LoadOutcome {
    pub rows: Vec<CampaignDay>,
    pub summary: LoadSummary,
}

/// Accounting for every input line: loaded or dropped-with-reason.
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub path: PathBuf,
    pub loaded: usize,
    pub dropped: Vec<DroppedRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DroppedRow {
    /// 1-based line number in the input file (the header is line 1).
    pub line: usize,
    pub reason: String,
}

impl LoadSummary {
    pub fn dropped_count(&self) -> usize {
        self.dropped.len()
    }
}

/// Load event rows from a CSV file.
///
/// The `date` column accepts `YYYY-MM-DD`, an RFC 3339 timestamp, or
/// `YYYY-MM-DD HH:MM:SS`; extra columns are ignored.
pub fn load_events(path: &Path) -> LensResult<LoadOutcome> {
    let content = std::fs::read_to_string(path).map_err(|e| LensError::io(path, e))?;
    let mut lines = content.lines().enumerate();

    let (_, header) = lines
        .next()
        .ok_or_else(|| LensError::EmptyInput(path.display().to_string()))?;
    let columns = split_csv_line(header);
    let index_of = |name: &str| -> LensResult<usize> {
        columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| LensError::MissingColumn {
                column: name.to_string(),
            })
    };

    // Resolve every required column up front: a malformed header is fatal
    // before any row is parsed.
    let date_idx = index_of("date")?;
    let campaign_idx = index_of("campaign")?;
    let impressions_idx = index_of("impressions")?;
    let clicks_idx = index_of("clicks")?;
    let conversions_idx = index_of("conversions")?;
    let revenue_idx = index_of("revenue")?;
    let cost_idx = index_of("cost")?;

    let mut rows = Vec::new();
    let mut dropped = Vec::new();

    for (line_idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = line_idx + 1;
        let fields = split_csv_line(line);

        match parse_row(
            &fields,
            date_idx,
            campaign_idx,
            impressions_idx,
            clicks_idx,
            conversions_idx,
            revenue_idx,
            cost_idx,
        ) {
            Ok(row) => rows.push(row),
            Err(reason) => {
                warn!(line = line_no, reason = %reason, "dropping malformed row");
                dropped.push(DroppedRow {
                    line: line_no,
                    reason,
                });
            }
        }
    }

    info!(
        path = %path.display(),
        loaded = rows.len(),
        dropped = dropped.len(),
        "input loaded"
    );

    Ok(LoadOutcome {
        summary: LoadSummary {
            path: path.to_path_buf(),
            loaded: rows.len(),
            dropped,
        },
        rows,
    })
}

#[allow(clippy::too_many_arguments)]
fn parse_row(
    fields: &[String],
    date_idx: usize,
    campaign_idx: usize,
    impressions_idx: usize,
    clicks_idx: usize,
    conversions_idx: usize,
    revenue_idx: usize,
    cost_idx: usize,
) -> Result<CampaignDay, String> {
    let field = |idx: usize, name: &str| -> Result<&str, String> {
        fields
            .get(idx)
            .map(|s| s.as_str())
            .ok_or_else(|| format!("row too short, no {name} field"))
    };

    let date = parse_date(field(date_idx, "date")?)?;
    let campaign = field(campaign_idx, "campaign")?.to_string();
    if campaign.is_empty() {
        return Err("empty campaign identifier".to_string());
    }

    let impressions = parse_count(field(impressions_idx, "impressions")?, "impressions")?;
    let clicks = parse_count(field(clicks_idx, "clicks")?, "clicks")?;
    let conversions = parse_count(field(conversions_idx, "conversions")?, "conversions")?;
    let revenue = parse_amount(field(revenue_idx, "revenue")?, "revenue")?;
    let cost = parse_amount(field(cost_idx, "cost")?, "cost")?;

    if clicks > impressions {
        return Err(format!("clicks ({clicks}) exceed impressions ({impressions})"));
    }
    if conversions > clicks {
        return Err(format!(
            "conversions ({conversions}) exceed clicks ({clicks})"
        ));
    }

    Ok(CampaignDay {
        date,
        campaign,
        impressions,
        clicks,
        conversions,
        revenue,
        cost,
    })
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.date_naive());
    }
    if let Ok(ts) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(ts.date());
    }
    Err(format!("unparseable date {raw:?}"))
}

fn parse_count(raw: &str, name: &str) -> Result<u64, String> {
    if let Ok(n) = raw.parse::<u64>() {
        return Ok(n);
    }
    // Tolerate "1234.0"-style exports as long as the value is a whole number.
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Ok(v as u64),
        _ => Err(format!("invalid {name} count {raw:?}")),
    }
}

fn parse_amount(raw: &str, name: &str) -> Result<f64, String> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(format!("invalid {name} amount {raw:?}")),
    }
}

/// Split one CSV line into fields, honoring double-quoted cells with `""`
/// escapes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

// ─── Writers ────────────────────────────────────────────────────────────────

/// JSON export envelope, one per written report file.
#[derive(Debug, Serialize)]
struct ReportEnvelope<T: Serialize> {
    report_id: Uuid,
    generated_at: DateTime<Utc>,
    row_count: usize,
    rows: T,
}

fn format_cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => format!("\"{}\"", s.replace('"', "\"\"")),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn write_file(path: &Path, content: &str) -> LensResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LensError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| LensError::io(path, e))?;
    info!(path = %path.display(), "table written");
    Ok(())
}

fn write_csv(path: &Path, columns: &[&str], rows: &[Vec<serde_json::Value>]) -> LensResult<()> {
    let mut csv = columns.join(",");
    csv.push('\n');
    for row in rows {
        let cells: Vec<String> = row.iter().map(format_cell).collect();
        csv.push_str(&cells.join(","));
        csv.push('\n');
    }
    write_file(path, &csv)
}

/// Write any serializable row set as pretty JSON inside a report envelope.
pub fn write_json<T: Serialize>(path: &Path, rows: &[T]) -> LensResult<()> {
    let envelope = ReportEnvelope {
        report_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        row_count: rows.len(),
        rows,
    };
    write_file(path, &serde_json::to_string_pretty(&envelope)?)
}

fn metric_value_cell(value: lens_core::types::MetricValue) -> serde_json::Value {
    match value.as_f64() {
        Some(v) => serde_json::json!(v),
        None => serde_json::Value::Null,
    }
}

/// Write an aggregated metric table. Key columns adapt to the grouping that
/// produced the records (date and week columns appear only when present).
pub fn write_metric_table(path: &Path, records: &[MetricRecord]) -> LensResult<()> {
    let has_date = records.iter().any(|r| r.key.date.is_some());
    let has_week = records.iter().any(|r| r.key.iso_week.is_some());

    let mut columns = vec!["campaign"];
    if has_date {
        columns.push("date");
    }
    if has_week {
        columns.extend(["iso_year", "iso_week"]);
    }
    columns.extend([
        "impressions",
        "clicks",
        "conversions",
        "revenue",
        "cost",
        "ctr",
        "cac",
        "ltv",
        "roi",
        "conversion_rate",
    ]);

    let rows: Vec<Vec<serde_json::Value>> = records
        .iter()
        .map(|r| {
            let mut row = vec![serde_json::json!(r.key.campaign)];
            if has_date {
                row.push(match r.key.date {
                    Some(d) => serde_json::json!(d.to_string()),
                    None => serde_json::Value::Null,
                });
            }
            if has_week {
                row.push(serde_json::json!(r.key.iso_year));
                row.push(serde_json::json!(r.key.iso_week));
            }
            row.extend([
                serde_json::json!(r.totals.impressions),
                serde_json::json!(r.totals.clicks),
                serde_json::json!(r.totals.conversions),
                serde_json::json!(r.totals.revenue),
                serde_json::json!(r.totals.cost),
                metric_value_cell(r.ctr),
                metric_value_cell(r.cac),
                metric_value_cell(r.ltv),
                metric_value_cell(r.roi),
                metric_value_cell(r.conversion_rate),
            ]);
            row
        })
        .collect();

    write_csv(path, &columns, &rows)
}

/// Write the enriched daily export.
pub fn write_prepared_table(path: &Path, rows: &[PreparedRow]) -> LensResult<()> {
    let columns = [
        "date",
        "campaign",
        "month",
        "month_name",
        "iso_week",
        "day_of_week",
        "quarter",
        "impressions",
        "clicks",
        "conversions",
        "revenue",
        "cost",
        "profit",
        "ctr",
        "cac",
        "ltv",
        "roi",
        "conversion_rate",
        "ctr_rolling",
        "cac_rolling",
        "ltv_rolling",
        "roi_rolling",
    ];

    let table: Vec<Vec<serde_json::Value>> = rows
        .iter()
        .map(|r| {
            vec![
                serde_json::json!(r.date.to_string()),
                serde_json::json!(r.campaign),
                serde_json::json!(r.month),
                serde_json::json!(r.month_name),
                serde_json::json!(r.iso_week),
                serde_json::json!(r.day_of_week),
                serde_json::json!(r.quarter),
                serde_json::json!(r.impressions),
                serde_json::json!(r.clicks),
                serde_json::json!(r.conversions),
                serde_json::json!(r.revenue),
                serde_json::json!(r.cost),
                serde_json::json!(r.profit),
                metric_value_cell(r.ctr),
                metric_value_cell(r.cac),
                metric_value_cell(r.ltv),
                metric_value_cell(r.roi),
                metric_value_cell(r.conversion_rate),
                metric_value_cell(r.ctr_rolling),
                metric_value_cell(r.cac_rolling),
                metric_value_cell(r.ltv_rolling),
                metric_value_cell(r.roi_rolling),
            ]
        })
        .collect();

    write_csv(path, &columns, &table)
}

/// Write the overall summary as a one-row table.
pub fn write_overall_summary(path: &Path, summary: &OverallSummary) -> LensResult<()> {
    let columns = [
        "impressions",
        "clicks",
        "conversions",
        "revenue",
        "cost",
        "ctr",
        "cac",
        "ltv",
        "roi",
        "conversion_rate",
    ];
    let row = vec![
        serde_json::json!(summary.totals.impressions),
        serde_json::json!(summary.totals.clicks),
        serde_json::json!(summary.totals.conversions),
        serde_json::json!(summary.totals.revenue),
        serde_json::json!(summary.totals.cost),
        metric_value_cell(summary.ctr),
        metric_value_cell(summary.cac),
        metric_value_cell(summary.ltv),
        metric_value_cell(summary.roi),
        metric_value_cell(summary.conversion_rate),
    ];
    write_csv(path, &columns, &[row])
}

/// Write significance results and skipped pairs into one table. Skipped
/// pairs carry empty statistic cells and an explicit note.
pub fn write_significance_table(path: &Path, report: &SignificanceReport) -> LensResult<()> {
    let columns = [
        "campaign_a",
        "campaign_b",
        "metric",
        "t_statistic",
        "p_value",
        "significant",
        "effect_size_percent",
        "note",
    ];

    let mut rows: Vec<Vec<serde_json::Value>> = report
        .results
        .iter()
        .map(|r| {
            vec![
                serde_json::json!(r.campaign_a),
                serde_json::json!(r.campaign_b),
                serde_json::json!(r.metric.as_str()),
                serde_json::json!(r.t_statistic),
                serde_json::json!(r.p_value),
                serde_json::json!(r.significant),
                metric_value_cell(r.effect_size_percent),
                serde_json::Value::Null,
            ]
        })
        .collect();

    for skip in &report.skipped {
        rows.push(vec![
            serde_json::json!(skip.campaign_a),
            serde_json::json!(skip.campaign_b),
            serde_json::json!(skip.metric.as_str()),
            serde_json::Value::Null,
            serde_json::Value::Null,
            serde_json::Value::Null,
            serde_json::Value::Null,
            serde_json::json!(skip.reason.to_string()),
        ]);
    }

    write_csv(path, &columns, &rows)
}

/// Write the full significance report (tested and skipped pairs) as JSON.
pub fn write_significance_json(path: &Path, report: &SignificanceReport) -> LensResult<()> {
    let envelope = ReportEnvelope {
        report_id: Uuid::new_v4(),
        generated_at: Utc::now(),
        row_count: report.results.len() + report.skipped.len(),
        rows: report,
    };
    write_file(path, &serde_json::to_string_pretty(&envelope)?)
}

/// Write raw event rows back out as CSV (used by the synthetic generator).
pub fn write_events(path: &Path, rows: &[CampaignDay]) -> LensResult<()> {
    let columns = REQUIRED_COLUMNS;
    let table: Vec<Vec<serde_json::Value>> = rows
        .iter()
        .map(|r| {
            vec![
                serde_json::json!(r.date.to_string()),
                serde_json::json!(r.campaign),
                serde_json::json!(r.impressions),
                serde_json::json!(r.clicks),
                serde_json::json!(r.conversions),
                serde_json::json!(r.revenue),
                serde_json::json!(r.cost),
            ]
        })
        .collect();
    write_csv(path, &columns, &table)
}
