//! Core data types for passive (sensor and platform) data
//!
//! - `DataType`: what a reading measures, and which value shape it allows
//! - `PassiveValue`: the tagged value union
//! - `PassiveDataPoint`: one stored reading
//! - `DataAggregation`: one bucket of aggregated readings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::analytics::UserId;
use crate::time::Granularity;

/// Kinds of passive data the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    // Sleep
    SleepDuration,
    SleepQuality,
    SleepEfficiency,
    // Activity
    StepCount,
    ExerciseDuration,
    ActiveMinutes,
    CaloriesBurned,
    // Health metrics
    HeartRate,
    HeartRateVariability,
    BloodPressure,
    Weight,
    // Screen time and usage
    ScreenTime,
    AppUsage,
    NotificationCount,
    // Environment
    LocationSummary,
    WeatherExposure,
    AmbientLight,
    NoiseLevel,
    // Social
    SocialInteraction,
    CallDuration,
    MessageCount,
}

/// Shape a `DataType` accepts for its value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueShape {
    /// Non-negative integer
    Count,
    /// Finite number within an inclusive range
    Measure { min: f64, max: f64 },
    /// Map that must contain the given numeric keys
    Structured { required: &'static [&'static str] },
    /// Free text or a map
    Categorical,
}

impl DataType {
    /// Get all data types for iteration
    pub fn all() -> &'static [DataType] {
        use DataType::*;
        &[
            SleepDuration,
            SleepQuality,
            SleepEfficiency,
            StepCount,
            ExerciseDuration,
            ActiveMinutes,
            CaloriesBurned,
            HeartRate,
            HeartRateVariability,
            BloodPressure,
            Weight,
            ScreenTime,
            AppUsage,
            NotificationCount,
            LocationSummary,
            WeatherExposure,
            AmbientLight,
            NoiseLevel,
            SocialInteraction,
            CallDuration,
            MessageCount,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SleepDuration => "sleep_duration",
            Self::SleepQuality => "sleep_quality",
            Self::SleepEfficiency => "sleep_efficiency",
            Self::StepCount => "step_count",
            Self::ExerciseDuration => "exercise_duration",
            Self::ActiveMinutes => "active_minutes",
            Self::CaloriesBurned => "calories_burned",
            Self::HeartRate => "heart_rate",
            Self::HeartRateVariability => "heart_rate_variability",
            Self::BloodPressure => "blood_pressure",
            Self::Weight => "weight",
            Self::ScreenTime => "screen_time",
            Self::AppUsage => "app_usage",
            Self::NotificationCount => "notification_count",
            Self::LocationSummary => "location_summary",
            Self::WeatherExposure => "weather_exposure",
            Self::AmbientLight => "ambient_light",
            Self::NoiseLevel => "noise_level",
            Self::SocialInteraction => "social_interaction",
            Self::CallDuration => "call_duration",
            Self::MessageCount => "message_count",
        }
    }

    /// The value shape and range this type accepts
    pub fn value_shape(&self) -> ValueShape {
        const UNBOUNDED: f64 = f64::MAX;
        match self {
            Self::StepCount | Self::NotificationCount | Self::MessageCount => ValueShape::Count,
            Self::SleepDuration | Self::ScreenTime => ValueShape::Measure { min: 0.0, max: 24.0 },
            Self::SleepQuality => ValueShape::Measure { min: 1.0, max: 10.0 },
            Self::SleepEfficiency => ValueShape::Measure { min: 0.0, max: 100.0 },
            Self::HeartRate => ValueShape::Measure { min: 30.0, max: 250.0 },
            Self::Weight => ValueShape::Measure { min: 0.0, max: 1000.0 },
            Self::ExerciseDuration
            | Self::ActiveMinutes
            | Self::CaloriesBurned
            | Self::HeartRateVariability
            | Self::AmbientLight
            | Self::NoiseLevel
            | Self::SocialInteraction
            | Self::CallDuration => ValueShape::Measure {
                min: 0.0,
                max: UNBOUNDED,
            },
            Self::BloodPressure => ValueShape::Structured {
                required: &["systolic", "diastolic"],
            },
            Self::AppUsage | Self::LocationSummary | Self::WeatherExposure => {
                ValueShape::Categorical
            }
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == needle)
            .ok_or_else(|| format!("unknown data type: {}", s))
    }
}

/// A passive reading's value
///
/// Serialized without a tag: counts and measures as JSON numbers, text as a
/// string, structured values as an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PassiveValue {
    Count(u64),
    Measure(f64),
    Text(String),
    Structured(BTreeMap<String, serde_json::Value>),
}

impl PassiveValue {
    /// Numeric reading of this value, if it has one
    ///
    /// Structured values expose a numeric `value` key when present.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Count(n) => Some(*n as f64),
            Self::Measure(v) => Some(*v),
            Self::Text(_) => None,
            Self::Structured(map) => map.get("value").and_then(|v| v.as_f64()),
        }
    }
}

/// One stored passive reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassiveDataPoint {
    /// Identifier assigned by persistence
    pub id: u64,
    pub user_id: UserId,
    /// Reading time, normalized to UTC
    pub timestamp: DateTime<Utc>,
    pub data_type: DataType,
    pub value: PassiveValue,
    /// Originating platform or device (e.g. "HealthKit")
    pub source: String,
    /// Confidence in [0, 1]
    pub quality_score: f64,
    /// Set by the aggregation job once the point has been aggregated
    #[serde(default)]
    pub processed: bool,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl PassiveDataPoint {
    /// Create an unsaved point (id 0) with full quality
    pub fn new(
        user_id: UserId,
        timestamp: DateTime<Utc>,
        data_type: DataType,
        value: PassiveValue,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            user_id,
            timestamp,
            data_type,
            value,
            source: source.into(),
            quality_score: 1.0,
            processed: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Builder: set quality score
    pub fn quality(mut self, score: f64) -> Self {
        self.quality_score = score;
        self
    }
}

/// Aggregated readings for one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAggregation {
    pub data_type: DataType,
    pub period: Granularity,
    pub bucket_start: DateTime<Utc>,
    pub bucket_end: DateTime<Utc>,
    /// None for a bucket with no qualifying points
    pub aggregated_value: Option<PassiveValue>,
    pub count: usize,
    pub source_breakdown: BTreeMap<String, usize>,
}
