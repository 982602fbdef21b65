//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::analytics::{
    CorrelationEngine, PeriodWindows, TrendAnalyzer, DEFAULT_MIN_SAMPLES, DEFAULT_TREND_EPSILON,
};
use crate::passive::{
    BucketAggregator, BulkIngestValidator, CombineRule, DataType, RuleTable,
    DEFAULT_DUPLICATE_WINDOW_SECS, DEFAULT_MAX_BATCH_SIZE, DEFAULT_MAX_BUCKETS,
    DEFAULT_QUALITY_THRESHOLD,
};

/// Upper bound for `ingest.max_past_days` (about a century)
pub const MAX_PAST_DAYS_LIMIT: i64 = 36_500;

/// Upper bound for `ingest.max_future_skew_secs` and `ingest.duplicate_window_secs`
pub const MAX_WINDOW_SECS_LIMIT: i64 = 86_400;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub aggregation: AggregationConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Check-in analytics configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Minimum difference in half-window means to call a trend
    #[serde(default = "default_trend_epsilon")]
    pub trend_epsilon: f64,

    #[serde(default = "default_min_correlation_samples")]
    pub min_correlation_samples: usize,

    #[serde(default = "default_daily_days")]
    pub daily_days: u32,

    #[serde(default = "default_weekly_days")]
    pub weekly_days: u32,

    #[serde(default = "default_monthly_days")]
    pub monthly_days: u32,

    /// Fixed offset applied to the UTC clock to derive "today"
    #[serde(default)]
    pub today_utc_offset_minutes: i32,
}

fn default_trend_epsilon() -> f64 {
    DEFAULT_TREND_EPSILON
}

fn default_min_correlation_samples() -> usize {
    DEFAULT_MIN_SAMPLES
}

fn default_daily_days() -> u32 {
    7
}

fn default_weekly_days() -> u32 {
    28
}

fn default_monthly_days() -> u32 {
    90
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            trend_epsilon: default_trend_epsilon(),
            min_correlation_samples: default_min_correlation_samples(),
            daily_days: default_daily_days(),
            weekly_days: default_weekly_days(),
            monthly_days: default_monthly_days(),
            today_utc_offset_minutes: 0,
        }
    }
}

impl AnalyticsConfig {
    pub fn windows(&self) -> PeriodWindows {
        PeriodWindows {
            daily_days: self.daily_days,
            weekly_days: self.weekly_days,
            monthly_days: self.monthly_days,
        }
    }

    pub fn trend_analyzer(&self) -> TrendAnalyzer {
        TrendAnalyzer::new(
            self.trend_epsilon,
            self.windows(),
            CorrelationEngine::new(self.min_correlation_samples),
        )
    }

    /// Calendar day for `now` under the configured offset
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        (now + Duration::minutes(i64::from(self.today_utc_offset_minutes))).date_naive()
    }
}

/// Passive data aggregation configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,

    /// Most buckets a single aggregation may produce
    #[serde(default = "default_max_buckets")]
    pub max_buckets: usize,

    /// Per-type overrides of the default combination rules
    #[serde(default)]
    pub rules: BTreeMap<DataType, CombineRule>,
}

fn default_max_buckets() -> usize {
    DEFAULT_MAX_BUCKETS
}

fn default_quality_threshold() -> f64 {
    DEFAULT_QUALITY_THRESHOLD
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            quality_threshold: default_quality_threshold(),
            max_buckets: default_max_buckets(),
            rules: BTreeMap::new(),
        }
    }
}

impl AggregationConfig {
    pub fn aggregator(&self) -> BucketAggregator {
        let rules = RuleTable::default().with_overrides(self.rules.iter().map(|(t, r)| (*t, *r)));
        BucketAggregator::new(self.quality_threshold, rules).with_max_buckets(self.max_buckets)
    }
}

/// Bulk ingest limits
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(default = "default_max_past_days")]
    pub max_past_days: i64,

    #[serde(default = "default_max_future_skew")]
    pub max_future_skew_secs: i64,

    /// Identical readings closer than this are stored once; 0 disables
    #[serde(default = "default_duplicate_window")]
    pub duplicate_window_secs: i64,
}

fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

fn default_max_past_days() -> i64 {
    365
}

fn default_max_future_skew() -> i64 {
    300 // 5 minutes
}

fn default_duplicate_window() -> i64 {
    DEFAULT_DUPLICATE_WINDOW_SECS
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_past_days: default_max_past_days(),
            max_future_skew_secs: default_max_future_skew(),
            duplicate_window_secs: default_duplicate_window(),
        }
    }
}

impl IngestConfig {
    pub fn validator(&self) -> BulkIngestValidator {
        BulkIngestValidator::new(
            self.max_batch_size,
            self.max_past_days,
            self.max_future_skew_secs,
        )
        .with_duplicate_window(self.duplicate_window_secs)
    }
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8090
}

fn default_request_timeout() -> u64 {
    30
}

impl ApiConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Base URL clients use to reach this server
    pub fn base_url(&self) -> String {
        let host = if self.host == "0.0.0.0" { "127.0.0.1" } else { self.host.as_str() };
        format!("http://{}:{}", host, self.port)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,

    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("mindbridge").join("config.toml")),
            Some(PathBuf::from("/etc/mindbridge/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| {
            Err(ConfigError::Invalid {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        };

        if !self.analytics.trend_epsilon.is_finite() || self.analytics.trend_epsilon < 0.0 {
            return invalid("analytics.trend_epsilon", "must be a non-negative number");
        }
        if self.analytics.min_correlation_samples < 2 {
            return invalid("analytics.min_correlation_samples", "must be at least 2");
        }
        let windows = [
            ("analytics.daily_days", self.analytics.daily_days),
            ("analytics.weekly_days", self.analytics.weekly_days),
            ("analytics.monthly_days", self.analytics.monthly_days),
        ];
        for (field, days) in windows {
            if days == 0 {
                return invalid(field, "must be at least 1");
            }
        }
        if self.analytics.today_utc_offset_minutes.abs() > 14 * 60 {
            return invalid("analytics.today_utc_offset_minutes", "must be within ±14 hours");
        }
        if !(0.0..=1.0).contains(&self.aggregation.quality_threshold) {
            return invalid("aggregation.quality_threshold", "must be within [0, 1]");
        }
        if self.ingest.max_batch_size == 0 {
            return invalid("ingest.max_batch_size", "must be at least 1");
        }
        if self.aggregation.max_buckets == 0 {
            return invalid("aggregation.max_buckets", "must be at least 1");
        }
        if !(1..=MAX_PAST_DAYS_LIMIT).contains(&self.ingest.max_past_days) {
            return invalid("ingest.max_past_days", "must be between 1 and 36500");
        }
        if !(0..=MAX_WINDOW_SECS_LIMIT).contains(&self.ingest.max_future_skew_secs) {
            return invalid("ingest.max_future_skew_secs", "must be between 0 and 86400");
        }
        if !(0..=MAX_WINDOW_SECS_LIMIT).contains(&self.ingest.duplicate_window_secs) {
            return invalid("ingest.duplicate_window_secs", "must be between 0 and 86400");
        }
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // API overrides
        if let Some(host) = lookup("MINDBRIDGE_API_HOST") {
            self.api.host = host;
        }
        if let Some(p) = lookup("MINDBRIDGE_API_PORT").and_then(|v| v.parse().ok()) {
            self.api.port = p;
        }

        // Analytics overrides
        if let Some(eps) = lookup("MINDBRIDGE_TREND_EPSILON").and_then(|v| v.parse().ok()) {
            self.analytics.trend_epsilon = eps;
        }
        if let Some(offset) = lookup("MINDBRIDGE_UTC_OFFSET_MINUTES").and_then(|v| v.parse().ok()) {
            self.analytics.today_utc_offset_minutes = offset;
        }

        // Aggregation overrides
        if let Some(q) = lookup("MINDBRIDGE_QUALITY_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.aggregation.quality_threshold = q;
        }

        // Logging overrides
        if let Some(level) = lookup("MINDBRIDGE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("MINDBRIDGE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid config value {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# MindBridge Analytics Configuration
#
# Environment variables override these settings:
# - MINDBRIDGE_API_HOST
# - MINDBRIDGE_API_PORT
# - MINDBRIDGE_TREND_EPSILON
# - MINDBRIDGE_UTC_OFFSET_MINUTES
# - MINDBRIDGE_QUALITY_THRESHOLD
# - MINDBRIDGE_LOG_LEVEL
# - MINDBRIDGE_LOG_FORMAT

[analytics]
# Minimum change between half-window mood means to report a trend
trend_epsilon = 0.5

# Paired samples required before a correlation is reported
min_correlation_samples = 5

# Lookback (days, inclusive of today) for each analytics period
daily_days = 7
weekly_days = 28
monthly_days = 90

# Offset from UTC used to decide which calendar day is "today"
today_utc_offset_minutes = 0

[aggregation]
# Points with a lower quality score are left out of aggregates
quality_threshold = 0.3

# Most buckets a single aggregation query may produce
max_buckets = 5000

# Override how a data type combines within a bucket: sum, average, latest
[aggregation.rules]
# screen_time = "sum"

[ingest]
# Maximum candidates per bulk request
max_batch_size = 1000

# Oldest accepted reading (days before now)
max_past_days = 365

# Allowed clock skew for readings stamped in the future (seconds)
max_future_skew_secs = 300

# Identical readings (same type, source and value) closer than this are
# rejected as duplicates; 0 disables the check
duplicate_window_secs = 300

[api]
# API server host
host = "0.0.0.0"

# API server port
port = 8090

# Allowed CORS origins (empty allows any)
cors_origins = []

# Request timeout in seconds
request_timeout_secs = 30

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/mindbridge/analytics.log"
"#
    .to_string()
}
