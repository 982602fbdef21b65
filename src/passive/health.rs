//! Daily health summary
//!
//! Reduces one UTC day of sleep, activity, heart rate and screen time
//! readings to a single record. Each field is that type's daily bucket value,
//! so quality filtering and combine rules match regular aggregation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::bucket::BucketAggregator;
use super::error::AggregationError;
use super::types::{DataType, PassiveDataPoint, PassiveValue};
use crate::time::{Granularity, TimeRange};

/// Data types that feed the daily summary
pub const HEALTH_METRIC_TYPES: [DataType; 6] = [
    DataType::SleepDuration,
    DataType::SleepQuality,
    DataType::StepCount,
    DataType::ExerciseDuration,
    DataType::HeartRate,
    DataType::ScreenTime,
];

/// Health metrics for one day; a field is None without qualifying readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyHealthMetrics {
    pub date: NaiveDate,
    /// Hours
    pub sleep_duration: Option<f64>,
    pub sleep_quality: Option<f64>,
    pub step_count: Option<u64>,
    pub exercise_duration: Option<f64>,
    pub heart_rate_avg: Option<f64>,
    /// Hours
    pub screen_time: Option<f64>,
}

/// Summarize `date` from points grouped by data type
///
/// Types missing from `points` simply yield None.
pub fn summarize_day(
    aggregator: &BucketAggregator,
    date: NaiveDate,
    points: &BTreeMap<DataType, Vec<PassiveDataPoint>>,
) -> Result<DailyHealthMetrics, AggregationError> {
    let day = TimeRange::day(date);
    let mut values: BTreeMap<DataType, PassiveValue> = BTreeMap::new();

    for data_type in HEALTH_METRIC_TYPES {
        let Some(points) = points.get(&data_type) else {
            continue;
        };
        let report = aggregator.aggregate_range(data_type, Granularity::Daily, day, points)?;
        if let Some(value) = report.buckets.into_iter().next().and_then(|b| b.aggregated_value) {
            values.insert(data_type, value);
        }
    }

    let measure = |t: DataType| values.get(&t).and_then(PassiveValue::as_f64);

    Ok(DailyHealthMetrics {
        date,
        sleep_duration: measure(DataType::SleepDuration),
        sleep_quality: measure(DataType::SleepQuality),
        step_count: values.get(&DataType::StepCount).and_then(|v| match v {
            PassiveValue::Count(n) => Some(*n),
            // An averaging override yields a measure
            other => other.as_f64().map(|steps| steps.round() as u64),
        }),
        exercise_duration: measure(DataType::ExerciseDuration),
        heart_rate_avg: measure(DataType::HeartRate),
        screen_time: measure(DataType::ScreenTime),
    })
}
