//! Combination rules for bucket aggregation
//!
//! Each `DataType` maps to exactly one `CombineRule` through a `RuleTable`.
//! The default table is declared once below; callers extend or override it
//! (for example from configuration) rather than choosing rules per call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::types::{DataType, PassiveValue};

/// How to combine the values that land in one bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineRule {
    /// Add values (step counts, message counts)
    Sum,
    /// Arithmetic mean (heart rate, sleep quality)
    Average,
    /// Most recent value in the bucket (blood pressure, location)
    Latest,
}

impl CombineRule {
    /// Combine timestamp-ordered values according to this rule
    ///
    /// `Sum` and `Average` only consider values with a numeric reading;
    /// a bucket without any yields None. A sum over counts stays a count.
    pub fn combine(&self, values: &[&PassiveValue]) -> Option<PassiveValue> {
        match self {
            CombineRule::Latest => values.last().map(|v| (*v).clone()),
            CombineRule::Sum => {
                if !values.is_empty() && values.iter().all(|v| matches!(v, PassiveValue::Count(_))) {
                    let total = values
                        .iter()
                        .map(|v| match v {
                            PassiveValue::Count(n) => *n,
                            _ => 0,
                        })
                        .fold(0u64, u64::saturating_add);
                    return Some(PassiveValue::Count(total));
                }
                let numeric: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
                if numeric.is_empty() {
                    None
                } else {
                    Some(PassiveValue::Measure(numeric.iter().sum()))
                }
            }
            CombineRule::Average => {
                let numeric: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
                if numeric.is_empty() {
                    None
                } else {
                    Some(PassiveValue::Measure(
                        numeric.iter().sum::<f64>() / numeric.len() as f64,
                    ))
                }
            }
        }
    }
}

/// Lookup table from data type to combination rule
#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    rules: HashMap<DataType, CombineRule>,
}

impl Default for RuleTable {
    fn default() -> Self {
        use CombineRule::*;
        use DataType::*;

        let rules = HashMap::from([
            // Counting metrics
            (StepCount, Sum),
            (NotificationCount, Sum),
            (MessageCount, Sum),
            // Rate / physiological / duration readings
            (SleepDuration, Average),
            (SleepQuality, Average),
            (SleepEfficiency, Average),
            (ExerciseDuration, Average),
            (ActiveMinutes, Average),
            (CaloriesBurned, Average),
            (HeartRate, Average),
            (HeartRateVariability, Average),
            (Weight, Average),
            (ScreenTime, Average),
            (AmbientLight, Average),
            (NoiseLevel, Average),
            (SocialInteraction, Average),
            (CallDuration, Average),
            // Categorical / structured
            (BloodPressure, Latest),
            (AppUsage, Latest),
            (LocationSummary, Latest),
            (WeatherExposure, Latest),
        ]);

        Self { rules }
    }
}

impl RuleTable {
    /// Builder: override the rule for one data type
    pub fn with_rule(mut self, data_type: DataType, rule: CombineRule) -> Self {
        self.rules.insert(data_type, rule);
        self
    }

    /// Apply a set of overrides
    pub fn with_overrides<I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (DataType, CombineRule)>,
    {
        self.rules.extend(overrides);
        self
    }

    /// Rule for a data type; types missing from the table keep the latest value
    pub fn rule_for(&self, data_type: DataType) -> CombineRule {
        self.rules
            .get(&data_type)
            .copied()
            .unwrap_or(CombineRule::Latest)
    }
}
