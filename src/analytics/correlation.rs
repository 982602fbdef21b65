//! Correlation Engine
//!
//! Pearson correlation between two metric series with minimum-sample gating.
//! Samples are paired by index; an index only counts when both series have a
//! value there. Too few pairs or a flat series produce an explicit marker
//! rather than a coefficient.

use serde::Serialize;

use super::types::WellnessMetric;

/// Default minimum number of paired samples before a coefficient is reported
pub const DEFAULT_MIN_SAMPLES: usize = 5;

/// Outcome of correlating two series
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CorrelationResult {
    /// Enough paired samples and non-zero variance in both series
    Computed {
        /// Pearson coefficient in [-1, 1]
        coefficient: f64,
        sample_size: usize,
        /// "strong", "moderate", "weak" or "negligible"
        strength: &'static str,
        /// "positive" or "negative"
        direction: &'static str,
    },
    /// Fewer paired samples than the configured minimum
    InsufficientData { sample_size: usize, required: usize },
    /// At least one series has zero variance
    Undefined { sample_size: usize },
}

impl CorrelationResult {
    pub fn coefficient(&self) -> Option<f64> {
        match self {
            Self::Computed { coefficient, .. } => Some(*coefficient),
            _ => None,
        }
    }

    pub fn sample_size(&self) -> usize {
        match self {
            Self::Computed { sample_size, .. }
            | Self::InsufficientData { sample_size, .. }
            | Self::Undefined { sample_size } => *sample_size,
        }
    }
}

/// A correlation between mood and one secondary check-in metric
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationInsight {
    pub metric_a: WellnessMetric,
    pub metric_b: WellnessMetric,
    #[serde(flatten)]
    pub result: CorrelationResult,
    /// Plain-language reading of a meaningful correlation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Computes gated Pearson correlations
#[derive(Debug, Clone, Copy)]
pub struct CorrelationEngine {
    min_samples: usize,
}

impl Default for CorrelationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SAMPLES)
    }
}

impl CorrelationEngine {
    /// Create an engine; `min_samples` below 2 is raised to 2
    pub fn new(min_samples: usize) -> Self {
        Self {
            min_samples: min_samples.max(2),
        }
    }

    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Correlate two index-aligned series of optional values
    pub fn correlate(&self, x: &[Option<f64>], y: &[Option<f64>]) -> CorrelationResult {
        if x.len() != y.len() {
            tracing::warn!(
                left = x.len(),
                right = y.len(),
                "Correlation series differ in length; pairing over the shorter one"
            );
        }

        let (xs, ys) = paired_samples(x, y);
        let sample_size = xs.len();

        if sample_size < self.min_samples {
            return CorrelationResult::InsufficientData {
                sample_size,
                required: self.min_samples,
            };
        }

        match pearson_correlation(&xs, &ys) {
            Some(r) => CorrelationResult::Computed {
                coefficient: r,
                sample_size,
                strength: correlation_strength(r),
                direction: if r >= 0.0 { "positive" } else { "negative" },
            },
            None => CorrelationResult::Undefined { sample_size },
        }
    }

    /// Correlate two check-in metrics and attach a plain-language summary
    pub fn insight(
        &self,
        metric_a: WellnessMetric,
        metric_b: WellnessMetric,
        x: &[Option<f64>],
        y: &[Option<f64>],
    ) -> CorrelationInsight {
        let result = self.correlate(x, y);
        let summary = result
            .coefficient()
            .and_then(|r| summarize(metric_a, metric_b, r));

        CorrelationInsight {
            metric_a,
            metric_b,
            result,
            summary,
        }
    }
}

/// Keep only indices where both series have a finite value
fn paired_samples(x: &[Option<f64>], y: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    x.iter()
        .zip(y.iter())
        .filter_map(|(a, b)| match (a, b) {
            (Some(a), Some(b)) if a.is_finite() && b.is_finite() => Some((*a, *b)),
            _ => None,
        })
        .unzip()
}

/// Calculate the Pearson correlation coefficient
///
/// Returns None for mismatched or empty input and when either series has zero
/// variance. The result is clamped to [-1, 1] against rounding drift.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.is_empty() {
        return None;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (a, b) in x.iter().zip(y.iter()) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    let r = covariance / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Convert a coefficient to a human-readable strength
fn correlation_strength(r: f64) -> &'static str {
    let abs_r = r.abs();
    if abs_r > 0.7 {
        "strong"
    } else if abs_r > 0.5 {
        "moderate"
    } else if abs_r > 0.3 {
        "weak"
    } else {
        "negligible"
    }
}

fn summarize(a: WellnessMetric, b: WellnessMetric, r: f64) -> Option<String> {
    if a != WellnessMetric::Mood || r.abs() <= 0.3 {
        return None;
    }

    let text = match (b, r > 0.0) {
        (WellnessMetric::Energy, true) => {
            "Your mood tends to be higher when your energy levels are good"
        }
        (WellnessMetric::Energy, false) => {
            "Your mood tends to be lower on days your energy is higher"
        }
        (WellnessMetric::Stress, false) => {
            "Higher stress levels appear to negatively impact your mood"
        }
        (WellnessMetric::Stress, true) => "Your mood and stress levels tend to rise together",
        (WellnessMetric::SleepQuality, true) => {
            "Good sleep quality seems to positively influence your mood"
        }
        (WellnessMetric::SleepQuality, false) => {
            "Your mood tends to be lower after nights you rate as better sleep"
        }
        (WellnessMetric::SocialInteraction, true) => {
            "Days with more social interaction tend to come with a better mood"
        }
        (WellnessMetric::SocialInteraction, false) => {
            "Your mood tends to dip on days with more social interaction"
        }
        (WellnessMetric::Mood, _) => return None,
    };

    Some(text.to_string())
}
