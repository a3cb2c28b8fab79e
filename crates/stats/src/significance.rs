//! Pairwise significance engine: partition per-day metric records by
//! campaign, test every campaign pair at a configurable confidence level,
//! and record skipped pairs instead of dropping them silently.

use lens_analytics::MetricRecord;
use lens_core::types::{Metric, MetricValue};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::welch::welch_t_test;

/// Outcome of one tested (campaign, campaign, metric) combination.
#[derive(Debug, Clone, Serialize)]
pub struct PairResult {
    pub campaign_a: String,
    pub campaign_b: String,
    pub metric: Metric,
    pub t_statistic: f64,
    pub p_value: f64,
    pub significant: bool,
    /// Relative change of B's mean versus A's mean, in percent. Undefined
    /// when A's mean is zero.
    pub effect_size_percent: MetricValue,
}

/// A pair that could not be tested, with the reason it was skipped.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedPair {
    pub campaign_a: String,
    pub campaign_b: String,
    pub metric: Metric,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SkipReason {
    /// Fewer than 2 usable observations for the named campaign.
    InsufficientSample { campaign: String, samples: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientSample { campaign, samples } => {
                write!(f, "insufficient data: {campaign} has {samples} sample(s)")
            }
        }
    }
}

/// Full output of a significance run.
#[derive(Debug, Clone, Serialize)]
pub struct SignificanceReport {
    pub confidence_level: f64,
    pub results: Vec<PairResult>,
    pub skipped: Vec<SkippedPair>,
    /// Undefined per-day metric values excluded from the samples.
    pub undefined_samples_excluded: usize,
}

impl SignificanceReport {
    fn empty(confidence_level: f64) -> Self {
        Self {
            confidence_level,
            results: Vec::new(),
            skipped: Vec::new(),
            undefined_samples_excluded: 0,
        }
    }

    fn merge(&mut self, other: SignificanceReport) {
        self.results.extend(other.results);
        self.skipped.extend(other.skipped);
        self.undefined_samples_excluded += other.undefined_samples_excluded;
    }

    /// The pairs where the null hypothesis was rejected.
    pub fn significant_findings(&self) -> Vec<&PairResult> {
        self.results.iter().filter(|r| r.significant).collect()
    }
}

/// Test every campaign pair on one metric.
///
/// Campaigns are enumerated in lexicographic order and each unordered pair
/// is tested once with A before B; the output preserves that enumeration
/// order. `records` are per-day metric records (`daily_metrics`), so each
/// campaign's sample is its series of daily ratio values.
pub fn pairwise_test(
    records: &[MetricRecord],
    metric: Metric,
    confidence_level: f64,
) -> SignificanceReport {
    let alpha = 1.0 - confidence_level;
    let mut report = SignificanceReport::empty(confidence_level);

    // BTreeMap keys give the canonical campaign ordering.
    let mut samples: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        let entry = samples.entry(record.key.campaign.as_str()).or_default();
        match record.metric(metric).as_f64() {
            Some(value) => entry.push(value),
            None => report.undefined_samples_excluded += 1,
        }
    }

    let campaigns: Vec<&str> = samples.keys().copied().collect();
    for i in 0..campaigns.len() {
        for j in (i + 1)..campaigns.len() {
            let (name_a, name_b) = (campaigns[i], campaigns[j]);
            let (sample_a, sample_b) = (&samples[name_a], &samples[name_b]);

            let undersized = [(name_a, sample_a.len()), (name_b, sample_b.len())]
                .into_iter()
                .find(|(_, n)| *n < 2);
            if let Some((campaign, n)) = undersized {
                debug!(metric = %metric, campaign, samples = n, "skipping pair");
                report.skipped.push(SkippedPair {
                    campaign_a: name_a.to_string(),
                    campaign_b: name_b.to_string(),
                    metric,
                    reason: SkipReason::InsufficientSample {
                        campaign: campaign.to_string(),
                        samples: n,
                    },
                });
                continue;
            }

            // Guarded by the undersized check above.
            let Some(test) = welch_t_test(sample_a, sample_b) else {
                continue;
            };

            let mean_a = sample_a.iter().sum::<f64>() / sample_a.len() as f64;
            let mean_b = sample_b.iter().sum::<f64>() / sample_b.len() as f64;
            let effect_size_percent =
                MetricValue::ratio(mean_b - mean_a, mean_a).map(|v| v * 100.0);

            report.results.push(PairResult {
                campaign_a: name_a.to_string(),
                campaign_b: name_b.to_string(),
                metric,
                t_statistic: test.t_statistic,
                p_value: test.p_value,
                significant: test.p_value < alpha,
                effect_size_percent,
            });
        }
    }

    report
}

/// Run the pairwise test for several metrics and concatenate the results.
pub fn run_batch(
    records: &[MetricRecord],
    metrics: &[Metric],
    confidence_level: f64,
) -> SignificanceReport {
    let mut combined = SignificanceReport::empty(confidence_level);
    for metric in metrics {
        combined.merge(pairwise_test(records, *metric, confidence_level));
    }
    combined
}
