//! Check-in records and the derived analytics shapes
//!
//! - `CheckIn`: one daily mood check-in as read from persistence
//! - `MoodCategory`: the fixed set of mood labels
//! - `WellnessMetric`: the numeric series a check-in carries
//! - `CheckinStreak`, `MoodAnalytics`: derived, never persisted

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use super::correlation::CorrelationInsight;

/// User identifier as assigned by the persistence layer
pub type UserId = u64;

/// One daily check-in
///
/// The persistence layer guarantees at most one check-in per user per
/// calendar day; the engine treats records as immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub user_id: UserId,
    /// Calendar day (UTC) the check-in belongs to
    pub date: NaiveDate,
    /// Mood rating on the 1-10 scale
    pub mood_rating: f64,
    #[serde(default)]
    pub mood_category: Option<MoodCategory>,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default)]
    pub energy_level: Option<f64>,
    #[serde(default)]
    pub stress_level: Option<f64>,
    #[serde(default)]
    pub sleep_quality: Option<f64>,
    #[serde(default)]
    pub social_interaction: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckIn {
    /// Create a check-in with only the required fields
    pub fn new(user_id: UserId, date: NaiveDate, mood_rating: f64) -> Self {
        Self {
            user_id,
            date,
            mood_rating,
            mood_category: None,
            keywords: BTreeSet::new(),
            energy_level: None,
            stress_level: None,
            sleep_quality: None,
            social_interaction: None,
            notes: None,
        }
    }

    /// Builder: set mood category
    pub fn category(mut self, category: MoodCategory) -> Self {
        self.mood_category = Some(category);
        self
    }

    /// Builder: add a keyword
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.insert(keyword.into());
        self
    }

    /// Builder: set a secondary metric
    pub fn metric(mut self, metric: WellnessMetric, value: f64) -> Self {
        match metric {
            WellnessMetric::Mood => self.mood_rating = value,
            WellnessMetric::Energy => self.energy_level = Some(value),
            WellnessMetric::Stress => self.stress_level = Some(value),
            WellnessMetric::SleepQuality => self.sleep_quality = Some(value),
            WellnessMetric::SocialInteraction => self.social_interaction = Some(value),
        }
        self
    }

    /// Read one of the numeric series
    pub fn value_of(&self, metric: WellnessMetric) -> Option<f64> {
        match metric {
            WellnessMetric::Mood => Some(self.mood_rating),
            WellnessMetric::Energy => self.energy_level,
            WellnessMetric::Stress => self.stress_level,
            WellnessMetric::SleepQuality => self.sleep_quality,
            WellnessMetric::SocialInteraction => self.social_interaction,
        }
    }
}

/// Mood labels a check-in may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodCategory {
    Happy,
    Content,
    Calm,
    Excited,
    Optimistic,
    Sad,
    Anxious,
    Stressed,
    Angry,
    Frustrated,
    Tired,
    Energetic,
    Focused,
    Confused,
    Lonely,
    Grateful,
    Hopeful,
    Overwhelmed,
    Peaceful,
    Neutral,
}

impl MoodCategory {
    /// Get all categories for iteration
    pub fn all() -> &'static [MoodCategory] {
        &[
            Self::Happy,
            Self::Content,
            Self::Calm,
            Self::Excited,
            Self::Optimistic,
            Self::Sad,
            Self::Anxious,
            Self::Stressed,
            Self::Angry,
            Self::Frustrated,
            Self::Tired,
            Self::Energetic,
            Self::Focused,
            Self::Confused,
            Self::Lonely,
            Self::Grateful,
            Self::Hopeful,
            Self::Overwhelmed,
            Self::Peaceful,
            Self::Neutral,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Content => "content",
            Self::Calm => "calm",
            Self::Excited => "excited",
            Self::Optimistic => "optimistic",
            Self::Sad => "sad",
            Self::Anxious => "anxious",
            Self::Stressed => "stressed",
            Self::Angry => "angry",
            Self::Frustrated => "frustrated",
            Self::Tired => "tired",
            Self::Energetic => "energetic",
            Self::Focused => "focused",
            Self::Confused => "confused",
            Self::Lonely => "lonely",
            Self::Grateful => "grateful",
            Self::Hopeful => "hopeful",
            Self::Overwhelmed => "overwhelmed",
            Self::Peaceful => "peaceful",
            Self::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for MoodCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MoodCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|c| c.label() == needle)
            .ok_or_else(|| format!("unknown mood category: {}", s))
    }
}

/// Numeric series carried by a check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellnessMetric {
    Mood,
    Energy,
    Stress,
    SleepQuality,
    SocialInteraction,
}

impl WellnessMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mood => "mood",
            Self::Energy => "energy",
            Self::Stress => "stress",
            Self::SleepQuality => "sleep_quality",
            Self::SocialInteraction => "social_interaction",
        }
    }
}

/// Analysis window selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(format!("unknown period: {}", other)),
        }
    }
}

/// Check-in streak summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckinStreak {
    pub current_streak: u32,
    pub longest_streak: u32,
    pub total_checkins: u32,
    /// First day of the current run, None when there is no current run
    pub streak_start_date: Option<NaiveDate>,
    /// None when the user has never checked in
    pub days_since_last_checkin: Option<i64>,
}

impl CheckinStreak {
    pub fn empty() -> Self {
        Self {
            current_streak: 0,
            longest_streak: 0,
            total_checkins: 0,
            streak_start_date: None,
            days_since_last_checkin: None,
        }
    }
}

/// Direction of the mood trend across a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
}

/// Min/max of the mood series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoodRange {
    pub min: f64,
    pub max: f64,
}

/// One per-day point of the trend series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodTrendPoint {
    pub date: NaiveDate,
    pub mood_rating: f64,
    pub energy_level: Option<f64>,
    pub stress_level: Option<f64>,
    pub sleep_quality: Option<f64>,
}

impl From<&CheckIn> for MoodTrendPoint {
    fn from(checkin: &CheckIn) -> Self {
        Self {
            date: checkin.date,
            mood_rating: checkin.mood_rating,
            energy_level: checkin.energy_level,
            stress_level: checkin.stress_level,
            sleep_quality: checkin.sleep_quality,
        }
    }
}

/// Mood analytics over a period window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodAnalytics {
    pub period: Period,
    pub average_mood: f64,
    pub mood_range: MoodRange,
    pub most_common_category: Option<MoodCategory>,
    pub trend_direction: TrendDirection,
    pub trend_data: Vec<MoodTrendPoint>,
    pub keyword_frequency: BTreeMap<String, u32>,
    pub correlation_insights: BTreeMap<String, CorrelationInsight>,
}
