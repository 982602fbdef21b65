//! Trend Analyzer
//!
//! Builds `MoodAnalytics` for one user over a period window: mean and range
//! of the mood series, the dominant mood category, keyword counts, a
//! first-half/second-half trend classification, and mood correlations
//! against the secondary check-in metrics.

use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};

use super::correlation::CorrelationEngine;
use super::types::{
    CheckIn, MoodAnalytics, MoodCategory, MoodRange, MoodTrendPoint, Period, TrendDirection,
    WellnessMetric,
};

/// Default dead band for trend classification on the 1-10 scale
pub const DEFAULT_TREND_EPSILON: f64 = 0.5;

/// Secondary metrics correlated against mood, with their insight keys
const MOOD_PAIRS: [(WellnessMetric, &str); 4] = [
    (WellnessMetric::Energy, "mood_energy"),
    (WellnessMetric::Stress, "mood_stress"),
    (WellnessMetric::SleepQuality, "mood_sleep"),
    (WellnessMetric::SocialInteraction, "mood_social"),
];

/// Lookback lengths in days for each period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindows {
    pub daily_days: u32,
    pub weekly_days: u32,
    pub monthly_days: u32,
}

impl Default for PeriodWindows {
    fn default() -> Self {
        Self {
            daily_days: 7,
            weekly_days: 28,
            monthly_days: 90,
        }
    }
}

impl PeriodWindows {
    pub fn lookback_days(&self, period: Period) -> u32 {
        match period {
            Period::Daily => self.daily_days,
            Period::Weekly => self.weekly_days,
            Period::Monthly => self.monthly_days,
        }
    }

    /// Inclusive date window `[first, today]` spanning `lookback_days` days
    pub fn window(&self, period: Period, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let days = self.lookback_days(period).max(1) as i64;
        (today - Duration::days(days - 1), today)
    }
}

/// Classifies mood trends and summarizes a window of check-ins
#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    epsilon: f64,
    windows: PeriodWindows,
    correlations: CorrelationEngine,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(
            DEFAULT_TREND_EPSILON,
            PeriodWindows::default(),
            CorrelationEngine::default(),
        )
    }
}

impl TrendAnalyzer {
    pub fn new(epsilon: f64, windows: PeriodWindows, correlations: CorrelationEngine) -> Self {
        Self {
            epsilon: epsilon.abs(),
            windows,
            correlations,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn windows(&self) -> &PeriodWindows {
        &self.windows
    }

    /// Restrict `checkins` to the window of `period` ending on `today`
    pub fn restrict<'a>(
        &self,
        checkins: &'a [CheckIn],
        period: Period,
        today: NaiveDate,
    ) -> Vec<&'a CheckIn> {
        let (first, last) = self.windows.window(period, today);
        checkins
            .iter()
            .filter(|c| c.date >= first && c.date <= last)
            .collect()
    }

    /// Window `checkins` to `period` ending on `today` and analyze them
    pub fn analyze_period(&self, checkins: &[CheckIn], period: Period, today: NaiveDate) -> MoodAnalytics {
        let windowed = self.restrict(checkins, period, today);
        self.analyze(period, windowed)
    }

    /// Analyze check-ins that already belong to one period window
    pub fn analyze<'a, I>(&self, period: Period, checkins: I) -> MoodAnalytics
    where
        I: IntoIterator<Item = &'a CheckIn>,
    {
        let checkins = order_by_date(checkins);
        let moods: Vec<f64> = checkins.iter().map(|c| c.mood_rating).collect();

        let average_mood = mean(&moods).unwrap_or(0.0);
        let mood_range = if moods.len() < 2 {
            MoodRange {
                min: average_mood,
                max: average_mood,
            }
        } else {
            MoodRange {
                min: moods.iter().cloned().fold(f64::INFINITY, f64::min),
                max: moods.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            }
        };

        let correlation_insights = if checkins.len() < 2 {
            BTreeMap::new()
        } else {
            self.correlation_insights(&checkins)
        };

        MoodAnalytics {
            period,
            average_mood,
            mood_range,
            most_common_category: most_common_category(&checkins),
            trend_direction: self.trend_direction(&moods),
            trend_data: checkins.iter().map(|c| MoodTrendPoint::from(*c)).collect(),
            keyword_frequency: keyword_frequency(&checkins),
            correlation_insights,
        }
    }

    /// Compare the means of the first and second half of an ordered series
    ///
    /// With an odd count the middle element belongs to neither half.
    pub fn trend_direction(&self, series: &[f64]) -> TrendDirection {
        if series.len() < 2 {
            return TrendDirection::Stable;
        }

        let half = series.len() / 2;
        let first = &series[..half];
        let second = &series[series.len() - half..];

        let (Some(first_mean), Some(second_mean)) = (mean(first), mean(second)) else {
            return TrendDirection::Stable;
        };

        let delta = second_mean - first_mean;
        if delta > self.epsilon {
            TrendDirection::Improving
        } else if delta < -self.epsilon {
            TrendDirection::Declining
        } else {
            TrendDirection::Stable
        }
    }

    fn correlation_insights(
        &self,
        checkins: &[&CheckIn],
    ) -> BTreeMap<String, super::correlation::CorrelationInsight> {
        let mood: Vec<Option<f64>> = checkins.iter().map(|c| Some(c.mood_rating)).collect();
        let mut insights = BTreeMap::new();

        for (metric, key) in MOOD_PAIRS {
            let other: Vec<Option<f64>> = checkins.iter().map(|c| c.value_of(metric)).collect();
            if other.iter().all(Option::is_none) {
                continue;
            }

            let insight = self
                .correlations
                .insight(WellnessMetric::Mood, metric, &mood, &other);
            insights.insert(key.to_string(), insight);
        }

        insights
    }
}

/// Sort by date and keep the first record for any repeated date
fn order_by_date<'a, I>(checkins: I) -> Vec<&'a CheckIn>
where
    I: IntoIterator<Item = &'a CheckIn>,
{
    let mut ordered: Vec<&CheckIn> = checkins.into_iter().collect();
    ordered.sort_by_key(|c| c.date);

    let before = ordered.len();
    ordered.dedup_by_key(|c| c.date);
    if ordered.len() != before {
        tracing::warn!(
            duplicates = before - ordered.len(),
            "Multiple check-ins on the same day; keeping the first of each"
        );
    }

    ordered
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Mode of the categories; ties go to the lexically smallest label
fn most_common_category(checkins: &[&CheckIn]) -> Option<MoodCategory> {
    let mut counts: HashMap<MoodCategory, u32> = HashMap::new();
    for category in checkins.iter().filter_map(|c| c.mood_category) {
        *counts.entry(category).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(a, count_a), (b, count_b)| {
            count_a
                .cmp(count_b)
                .then_with(|| b.label().cmp(a.label()))
        })
        .map(|(category, _)| category)
}

fn keyword_frequency(checkins: &[&CheckIn]) -> BTreeMap<String, u32> {
    let mut frequency = BTreeMap::new();
    for checkin in checkins {
        for keyword in &checkin.keywords {
            *frequency.entry(keyword.clone()).or_default() += 1;
        }
    }
    frequency
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn series(moods: &[f64]) -> Vec<CheckIn> {
        moods
            .iter()
            .enumerate()
            .map(|(i, &m)| CheckIn::new(1, d(i as u32 + 1), m))
            .collect()
    }

    #[test]
    fn test_improving_trend() {
        let checkins = series(&[4.0, 4.0, 5.0, 7.0, 8.0, 8.0]);
        let analytics = TrendAnalyzer::default().analyze(Period::Weekly, &checkins);

        assert_eq!(analytics.trend_direction, TrendDirection::Improving);
        assert_eq!(analytics.mood_range, MoodRange { min: 4.0, max: 8.0 });
        assert!((analytics.average_mood - 6.0).abs() < 1e-9);
        assert_eq!(analytics.trend_data.len(), 6);
    }

    #[test]
    fn test_declining_and_stable_trends() {
        let analyzer = TrendAnalyzer::default();
        assert_eq!(
            analyzer.trend_direction(&[8.0, 8.0, 7.0, 5.0, 4.0, 4.0]),
            TrendDirection::Declining
        );
        assert_eq!(
            analyzer.trend_direction(&[6.0, 6.2, 6.4, 6.5]),
            TrendDirection::Stable
        );
    }

    #[test]
    fn test_odd_count_excludes_middle() {
        let analyzer = TrendAnalyzer::default();
        // Halves are [5] and [5]; the 10 in the middle is ignored
        assert_eq!(analyzer.trend_direction(&[5.0, 10.0, 5.0]), TrendDirection::Stable);
        assert_eq!(analyzer.trend_direction(&[5.0, 1.0, 6.0]), TrendDirection::Improving);
    }

    #[test]
    fn test_epsilon_is_configurable() {
        let strict = TrendAnalyzer::new(2.0, PeriodWindows::default(), CorrelationEngine::default());
        assert_eq!(strict.trend_direction(&[5.0, 5.0, 6.5, 6.5]), TrendDirection::Stable);

        let loose = TrendAnalyzer::new(0.1, PeriodWindows::default(), CorrelationEngine::default());
        assert_eq!(loose.trend_direction(&[5.0, 5.0, 5.5, 5.5]), TrendDirection::Improving);
    }

    #[test]
    fn test_single_checkin() {
        let checkins = series(&[6.0]);
        let analytics = TrendAnalyzer::default().analyze(Period::Daily, &checkins);

        assert_eq!(analytics.trend_direction, TrendDirection::Stable);
        assert_eq!(analytics.mood_range, MoodRange { min: 6.0, max: 6.0 });
        assert!(analytics.correlation_insights.is_empty());
    }

    #[test]
    fn test_empty_window() {
        let analytics = TrendAnalyzer::default().analyze(Period::Monthly, &[]);
        assert_eq!(analytics.average_mood, 0.0);
        assert_eq!(analytics.most_common_category, None);
        assert!(analytics.trend_data.is_empty());
    }

    #[test]
    fn test_most_common_category_tie_breaks_lexically() {
        let checkins = vec![
            CheckIn::new(1, d(1), 5.0).category(MoodCategory::Tired),
            CheckIn::new(1, d(2), 5.0).category(MoodCategory::Calm),
            CheckIn::new(1, d(3), 5.0).category(MoodCategory::Tired),
            CheckIn::new(1, d(4), 5.0).category(MoodCategory::Calm),
            CheckIn::new(1, d(5), 5.0),
        ];

        let analytics = TrendAnalyzer::default().analyze(Period::Weekly, &checkins);
        assert_eq!(analytics.most_common_category, Some(MoodCategory::Calm));
    }

    #[test]
    fn test_keyword_frequency_counts_once_per_checkin() {
        let checkins = vec![
            CheckIn::new(1, d(1), 5.0).keyword("work").keyword("work").keyword("gym"),
            CheckIn::new(1, d(2), 6.0).keyword("work"),
        ];

        let analytics = TrendAnalyzer::default().analyze(Period::Weekly, &checkins);
        assert_eq!(analytics.keyword_frequency.get("work"), Some(&2));
        assert_eq!(analytics.keyword_frequency.get("gym"), Some(&1));
    }

    #[test]
    fn test_correlations_only_for_present_metrics() {
        let checkins: Vec<CheckIn> = (1..=6)
            .map(|day| {
                CheckIn::new(1, d(day), day as f64)
                    .metric(WellnessMetric::SleepQuality, day as f64 + 1.0)
            })
            .collect();

        let analytics = TrendAnalyzer::default().analyze(Period::Weekly, &checkins);
        assert_eq!(analytics.correlation_insights.len(), 1);

        let sleep = &analytics.correlation_insights["mood_sleep"];
        assert_eq!(sleep.result.sample_size(), 6);
        assert!(sleep.result.coefficient().unwrap() > 0.99);
    }

    #[test]
    fn test_sparse_metric_reports_insufficient_data() {
        let checkins: Vec<CheckIn> = (1..=8)
            .map(|day| {
                let c = CheckIn::new(1, d(day), 5.0 + (day % 3) as f64);
                if day % 3 == 0 {
                    c.metric(WellnessMetric::Energy, 7.0)
                } else {
                    c
                }
            })
            .collect();

        let analytics = TrendAnalyzer::default().analyze(Period::Weekly, &checkins);
        let energy = &analytics.correlation_insights["mood_energy"];
        assert!(energy.result.coefficient().is_none());
        assert_eq!(energy.result.sample_size(), 2);
    }

    #[test]
    fn test_input_is_reordered_by_date() {
        let mut checkins = series(&[4.0, 4.0, 5.0, 7.0, 8.0, 8.0]);
        checkins.reverse();

        let analytics = TrendAnalyzer::default().analyze(Period::Weekly, &checkins);
        assert_eq!(analytics.trend_direction, TrendDirection::Improving);
        assert_eq!(analytics.trend_data[0].date, d(1));
    }

    #[test]
    fn test_repeated_date_keeps_first_checkin() {
        let checkins = vec![
            CheckIn::new(1, d(3), 6.0),
            CheckIn::new(1, d(2), 3.0),
            CheckIn::new(1, d(2), 9.0),
        ];

        let analytics = TrendAnalyzer::default().analyze(Period::Weekly, &checkins);
        assert_eq!(analytics.trend_data.len(), 2);
        assert_eq!(analytics.trend_data[0].date, d(2));
        assert_eq!(analytics.trend_data[0].mood_rating, 3.0);
        assert_eq!(analytics.average_mood, 4.5);
        assert_eq!(analytics.mood_range.max, 6.0);
    }

    #[test]
    fn test_period_window_restricts_checkins() {
        let checkins = series(&[5.0; 20]);
        let analyzer = TrendAnalyzer::default();

        let analytics = analyzer.analyze_period(&checkins, Period::Daily, d(20));
        assert_eq!(analytics.trend_data.len(), 7);
        assert_eq!(analytics.trend_data[0].date, d(14));
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let checkins: Vec<CheckIn> = (1..=10)
            .map(|day| {
                CheckIn::new(1, d(day), (day % 7) as f64 + 2.0)
                    .metric(WellnessMetric::Energy, (day % 5) as f64 + 3.0)
                    .metric(WellnessMetric::Stress, 10.0 - (day % 4) as f64)
                    .keyword(if day % 2 == 0 { "work" } else { "family" })
                    .category(if day % 3 == 0 { MoodCategory::Happy } else { MoodCategory::Sad })
            })
            .collect();

        let analyzer = TrendAnalyzer::default();
        let first = analyzer.analyze(Period::Weekly, &checkins);
        let second = analyzer.analyze(Period::Weekly, &checkins);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
