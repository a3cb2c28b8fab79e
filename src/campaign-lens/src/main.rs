//! Campaign Lens: batch marketing-campaign analytics.
//!
//! Loads per-day campaign event rows, derives performance metrics, runs
//! pairwise significance tests, and writes tables and charts for reporting.

use chrono::{Days, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use lens_analytics::{aggregate, daily_metrics, overall_summary, prepare_rows, GroupBy};
use lens_core::config::AppConfig;
use lens_core::types::Metric;
use lens_reporting::{
    box_plot, correlation_heatmap, display_value, load_events, time_series, write_chart,
    write_events, write_json, write_metric_table, write_overall_summary, write_prepared_table,
    write_significance_json, write_significance_table, RunSummary,
};
use lens_stats::run_batch;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "campaign-lens")]
#[command(about = "Batch marketing-campaign metrics and A/B significance testing")]
#[command(version)]
struct Cli {
    /// Directory for output tables and charts (overrides config)
    #[arg(long, env = "CAMPAIGN_LENS__OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a synthetic event CSV for demos and pipeline testing
    Generate {
        /// Number of consecutive days to generate
        #[arg(long)]
        days: Option<u32>,

        /// Number of campaigns
        #[arg(long)]
        campaigns: Option<u32>,

        /// Random seed; identical seeds reproduce identical files
        #[arg(long)]
        seed: Option<u64>,

        /// First date of the range (defaults to `days` ago)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Output CSV path (overrides config input_path)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Full pipeline: aggregate metrics, write tables and charts
    Analyze {
        /// Input event CSV (overrides config)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Rolling-average window in days (overrides config)
        #[arg(long)]
        window: Option<usize>,

        /// Skip chart rendering
        #[arg(long, default_value_t = false)]
        no_charts: bool,
    },
    /// Pairwise campaign significance tests on the chosen metrics
    AbTest {
        /// Input event CSV (overrides config)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Metrics to test, comma separated
        #[arg(long, value_delimiter = ',', default_values_t = [Metric::Ctr, Metric::Cac, Metric::Ltv])]
        metrics: Vec<Metric>,

        /// Confidence level, e.g. 0.95 (overrides config)
        #[arg(long)]
        confidence: Option<f64>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_lens=info,lens_reporting=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir.display().to_string();
    }

    match cli.command {
        Command::Generate {
            days,
            campaigns,
            seed,
            start_date,
            out,
        } => run_generate(&config, days, campaigns, seed, start_date, out),
        Command::Analyze {
            input,
            window,
            no_charts,
        } => run_analyze(&config, input, window, no_charts),
        Command::AbTest {
            input,
            metrics,
            confidence,
        } => run_ab_test(&config, input, &metrics, confidence),
    }
}

fn run_generate(
    config: &AppConfig,
    days: Option<u32>,
    campaigns: Option<u32>,
    seed: Option<u64>,
    start_date: Option<NaiveDate>,
    out: Option<PathBuf>,
) -> anyhow::Result<()> {
    let days = days.unwrap_or(config.datagen.num_days);
    let campaigns = campaigns.unwrap_or(config.datagen.num_campaigns);
    let seed = seed.unwrap_or(config.datagen.seed);
    let start = start_date.unwrap_or_else(|| {
        Utc::now()
            .date_naive()
            .checked_sub_days(Days::new(days as u64))
            .unwrap_or_else(|| Utc::now().date_naive())
    });
    let out = out.unwrap_or_else(|| PathBuf::from(&config.input_path));

    let rows = lens_datagen::generate(days, campaigns, start, seed);
    write_events(&out, &rows)?;

    info!(path = %out.display(), rows = rows.len(), "event file written");
    Ok(())
}

fn run_analyze(
    config: &AppConfig,
    input: Option<PathBuf>,
    window: Option<usize>,
    no_charts: bool,
) -> anyhow::Result<()> {
    let input = input.unwrap_or_else(|| PathBuf::from(&config.input_path));
    let window = window.unwrap_or(config.rolling_window);
    let out_dir = PathBuf::from(&config.output_dir);

    let outcome = load_events(&input)?;
    let mut summary = RunSummary::new();
    summary.record_load(&outcome.summary);
    let rows = outcome.rows;

    let daily = daily_metrics(&rows);
    let weekly = aggregate(&rows, GroupBy::CampaignWeek);
    let by_campaign = aggregate(&rows, GroupBy::Campaign);
    let overall = overall_summary(&rows);
    let prepared = prepare_rows(&rows, window);

    let path = out_dir.join("daily_metrics.csv");
    write_metric_table(&path, &daily)?;
    summary.record_table(path);

    let path = out_dir.join("weekly_metrics.csv");
    write_metric_table(&path, &weekly)?;
    summary.record_table(path);

    let path = out_dir.join("campaign_metrics.csv");
    write_metric_table(&path, &by_campaign)?;
    summary.record_table(path);

    let path = out_dir.join("overall_metrics.csv");
    write_overall_summary(&path, &overall)?;
    summary.record_table(path);

    let path = out_dir.join("prepared_marketing_data.csv");
    write_prepared_table(&path, &prepared)?;
    summary.record_table(path);

    let path = out_dir.join("campaign_metrics.json");
    write_json(&path, &by_campaign)?;
    summary.record_table(path);

    if config.charts.enabled && !no_charts {
        let (w, h) = (config.charts.width, config.charts.height);
        for metric in [Metric::Ctr, Metric::Cac, Metric::Ltv, Metric::Roi] {
            let path = out_dir.join(format!("{metric}_by_campaign_boxplot.svg"));
            write_chart(&path, &box_plot(&daily, metric, w, h))?;
            summary.record_chart(path);

            let path = out_dir.join(format!("{metric}_timeseries.svg"));
            write_chart(&path, &time_series(&daily, metric, w, h))?;
            summary.record_chart(path);
        }
        let path = out_dir.join("metrics_correlation.svg");
        write_chart(&path, &correlation_heatmap(&daily, w, w.min(h).max(540)))?;
        summary.record_chart(path);
    }

    summary.log();

    println!("\nKey marketing metrics");
    println!("---------------------");
    println!("Total impressions: {}", overall.totals.impressions);
    println!("Total clicks:      {}", overall.totals.clicks);
    println!("Total conversions: {}", overall.totals.conversions);
    println!("Total revenue:     {:.2}", overall.totals.revenue);
    println!("Total cost:        {:.2}", overall.totals.cost);
    println!("Overall CTR:       {}", display_value(overall.ctr, 4));
    println!("Overall CAC:       {}", display_value(overall.cac, 2));
    println!("Overall LTV:       {}", display_value(overall.ltv, 2));
    println!("Overall ROI %:     {}", display_value(overall.roi, 2));

    Ok(())
}

fn run_ab_test(
    config: &AppConfig,
    input: Option<PathBuf>,
    metrics: &[Metric],
    confidence: Option<f64>,
) -> anyhow::Result<()> {
    let input = input.unwrap_or_else(|| PathBuf::from(&config.input_path));
    let confidence = confidence.unwrap_or(config.confidence_level);
    anyhow::ensure!(
        confidence > 0.0 && confidence < 1.0,
        "confidence level must be in (0, 1), got {confidence}"
    );
    let out_dir = PathBuf::from(&config.output_dir);

    let outcome = load_events(&input)?;
    let mut summary = RunSummary::new();
    summary.record_load(&outcome.summary);

    let daily = daily_metrics(&outcome.rows);
    let report = run_batch(&daily, metrics, confidence);
    summary.pairs_tested = report.results.len();
    summary.pairs_skipped = report.skipped.len();

    let csv_path = out_dir.join("ab_test_results.csv");
    write_significance_table(&csv_path, &report)?;
    summary.record_table(csv_path);

    let json_path = out_dir.join("ab_test_results.json");
    write_significance_json(&json_path, &report)?;
    summary.record_table(json_path);

    summary.log();

    let significant = report.significant_findings();
    if significant.is_empty() {
        println!("\nNo significant differences at confidence {confidence}");
    } else {
        println!("\nSignificant A/B test results (confidence {confidence})");
        println!("{:<16} {:<16} {:<16} {:>10} {:>12}", "campaign_a", "campaign_b", "metric", "p_value", "effect_%");
        for result in significant {
            println!(
                "{:<16} {:<16} {:<16} {:>10.4} {:>12}",
                result.campaign_a,
                result.campaign_b,
                result.metric,
                result.p_value,
                display_value(result.effect_size_percent, 2),
            );
        }
    }
    for skip in &report.skipped {
        warn!(
            campaign_a = %skip.campaign_a,
            campaign_b = %skip.campaign_b,
            metric = %skip.metric,
            reason = %skip.reason,
            "pair skipped"
        );
    }

    Ok(())
}
