use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One day of delivery activity for a single campaign.
///
/// Rows are expected once per (date, campaign) but duplicates are tolerated:
/// aggregation sums counters, so a duplicate simply contributes twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignDay {
    pub date: NaiveDate,
    pub campaign: String,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub revenue: f64,
    pub cost: f64,
}

impl CampaignDay {
    pub fn profit(&self) -> f64 {
        self.revenue - self.cost
    }
}

/// A derived ratio that may have had a zero denominator.
///
/// `Undefined` means "no data", not "zero performance": a campaign with zero
/// conversions has no CAC, and downstream consumers must not read 0 or NaN
/// in its place. Serializes as a nullable number (JSON `null`, blank CSV cell).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum MetricValue {
    Defined(f64),
    Undefined,
}

impl MetricValue {
    /// Compute `numerator / denominator`, flagging a zero denominator.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            MetricValue::Undefined
        } else {
            MetricValue::Defined(numerator / denominator)
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, MetricValue::Defined(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Defined(v) => Some(*v),
            MetricValue::Undefined => None,
        }
    }

    /// Apply `f` to the inner value, keeping `Undefined` as-is.
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            MetricValue::Defined(v) => MetricValue::Defined(f(v)),
            MetricValue::Undefined => MetricValue::Undefined,
        }
    }
}

impl From<Option<f64>> for MetricValue {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => MetricValue::Defined(v),
            _ => MetricValue::Undefined,
        }
    }
}

impl From<MetricValue> for Option<f64> {
    fn from(value: MetricValue) -> Self {
        value.as_f64()
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Defined(v) => write!(f, "{v}"),
            MetricValue::Undefined => write!(f, "undefined"),
        }
    }
}

/// The derived metrics this pipeline knows how to compute and test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Ctr,
    Cac,
    Ltv,
    Roi,
    ConversionRate,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Ctr,
        Metric::Cac,
        Metric::Ltv,
        Metric::Roi,
        Metric::ConversionRate,
    ];

    /// Column name used in tables and CLI arguments.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Ctr => "ctr",
            Metric::Cac => "cac",
            Metric::Ltv => "ltv",
            Metric::Roi => "roi",
            Metric::ConversionRate => "conversion_rate",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = crate::error::LensError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ctr" => Ok(Metric::Ctr),
            "cac" => Ok(Metric::Cac),
            "ltv" => Ok(Metric::Ltv),
            "roi" => Ok(Metric::Roi),
            "conversion_rate" => Ok(Metric::ConversionRate),
            other => Err(crate::error::LensError::UnknownMetric(other.to_string())),
        }
    }
}
