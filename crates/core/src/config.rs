use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CAMPAIGN_LENS__`; every field has a default so the
/// tool runs with no configuration at all.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_input_path")]
    pub input_path: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,
    #[serde(default)]
    pub charts: ChartConfig,
    #[serde(default)]
    pub datagen: DatagenConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_charts_enabled")]
    pub enabled: bool,
    #[serde(default = "default_chart_width")]
    pub width: u32,
    #[serde(default = "default_chart_height")]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatagenConfig {
    #[serde(default = "default_num_days")]
    pub num_days: u32,
    #[serde(default = "default_num_campaigns")]
    pub num_campaigns: u32,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

// Default functions
fn default_input_path() -> String {
    "data/marketing_metrics.csv".to_string()
}
fn default_output_dir() -> String {
    "analysis".to_string()
}
fn default_confidence_level() -> f64 {
    0.95
}
fn default_rolling_window() -> usize {
    7
}
fn default_charts_enabled() -> bool {
    true
}
fn default_chart_width() -> u32 {
    960
}
fn default_chart_height() -> u32 {
    540
}
fn default_num_days() -> u32 {
    90
}
fn default_num_campaigns() -> u32 {
    5
}
fn default_seed() -> u64 {
    42
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            enabled: default_charts_enabled(),
            width: default_chart_width(),
            height: default_chart_height(),
        }
    }
}

impl Default for DatagenConfig {
    fn default() -> Self {
        Self {
            num_days: default_num_days(),
            num_campaigns: default_num_campaigns(),
            seed: default_seed(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_path: default_input_path(),
            output_dir: default_output_dir(),
            confidence_level: default_confidence_level(),
            rolling_window: default_rolling_window(),
            charts: ChartConfig::default(),
            datagen: DatagenConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("CAMPAIGN_LENS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
