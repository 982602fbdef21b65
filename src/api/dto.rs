//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::{CheckIn, MoodCategory, Period, UserId};
use crate::passive::{DataType, IngestCandidate};
use crate::service::AggregateQuery;
use crate::time::{Granularity, TimeRange};

pub const MAX_KEYWORDS: usize = 20;
pub const MAX_KEYWORD_LEN: usize = 50;
pub const MAX_NOTES_LEN: usize = 2000;

// ============================================
// CHECK-IN DTOs
// ============================================

/// Daily check-in submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckinRequest {
    /// Defaults to today
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub mood_rating: f64,
    #[serde(default)]
    pub mood_category: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
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

impl CreateCheckinRequest {
    /// Validate ranges and build the stored record
    ///
    /// Keywords are trimmed and deduplicated; only the first 20 are kept.
    pub fn into_checkin(self, user_id: UserId, today: NaiveDate) -> Result<CheckIn, String> {
        let date = self.date.unwrap_or(today);
        if date > today {
            return Err(format!("Check-in date {} is in the future", date));
        }

        check_scale("mood_rating", Some(self.mood_rating))?;
        check_scale("energy_level", self.energy_level)?;
        check_scale("stress_level", self.stress_level)?;
        check_scale("sleep_quality", self.sleep_quality)?;
        check_scale("social_interaction", self.social_interaction)?;

        let mood_category = self
            .mood_category
            .as_deref()
            .map(str::parse::<MoodCategory>)
            .transpose()?;

        if let Some(notes) = &self.notes {
            if notes.chars().count() > MAX_NOTES_LEN {
                return Err(format!("Notes exceed maximum length of {} characters", MAX_NOTES_LEN));
            }
        }

        let mut checkin = CheckIn::new(user_id, date, self.mood_rating);
        for keyword in self.keywords.iter().map(|k| k.trim()).filter(|k| !k.is_empty()) {
            if keyword.chars().count() > MAX_KEYWORD_LEN {
                return Err(format!("Keywords must be {} characters or less", MAX_KEYWORD_LEN));
            }
            if checkin.keywords.len() == MAX_KEYWORDS {
                break;
            }
            checkin.keywords.insert(keyword.to_string());
        }

        checkin.mood_category = mood_category;
        checkin.energy_level = self.energy_level;
        checkin.stress_level = self.stress_level;
        checkin.sleep_quality = self.sleep_quality;
        checkin.social_interaction = self.social_interaction;
        checkin.notes = self.notes;
        Ok(checkin)
    }
}

impl From<&CheckIn> for CreateCheckinRequest {
    fn from(checkin: &CheckIn) -> Self {
        Self {
            date: Some(checkin.date),
            mood_rating: checkin.mood_rating,
            mood_category: checkin.mood_category.map(|c| c.label().to_string()),
            keywords: checkin.keywords.iter().cloned().collect(),
            energy_level: checkin.energy_level,
            stress_level: checkin.stress_level,
            sleep_quality: checkin.sleep_quality,
            social_interaction: checkin.social_interaction,
            notes: checkin.notes.clone(),
        }
    }
}

fn check_scale(field: &str, value: Option<f64>) -> Result<(), String> {
    match value {
        Some(v) if !(1.0..=10.0).contains(&v) => {
            Err(format!("{} must be between 1 and 10", field))
        }
        _ => Ok(()),
    }
}

/// Check-in creation response
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckinCreatedResponse {
    pub status: String,
    pub user_id: UserId,
    pub date: NaiveDate,
}

/// Query string for mood analytics
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsParams {
    /// daily, weekly or monthly (default)
    #[serde(default)]
    pub period: Option<String>,
}

impl AnalyticsParams {
    pub fn period(&self) -> Result<Period, String> {
        self.period
            .as_deref()
            .map(str::parse)
            .transpose()
            .map(Option::unwrap_or_default)
    }
}

// ============================================
// PASSIVE DATA DTOs
// ============================================

/// Bulk passive data submission
#[derive(Debug, Serialize, Deserialize)]
pub struct BulkIngestRequest {
    pub data_points: Vec<IngestCandidate>,
    /// Defer bucket recomputation to a background task
    #[serde(default)]
    pub process_async: bool,
}

/// Query string for passive aggregation
#[derive(Debug, Deserialize)]
pub struct AggregateParams {
    pub data_type: String,
    /// hourly, daily (default), weekly or monthly
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
}

impl AggregateParams {
    pub fn into_query(self) -> Result<AggregateQuery, String> {
        let data_type: DataType = self.data_type.parse()?;
        let period: Granularity = match self.period.as_deref() {
            Some(p) => p.parse()?,
            None => Granularity::Daily,
        };

        let range = match (self.start, self.end) {
            (None, None) => None,
            (Some(start), Some(end)) => Some(
                TimeRange::try_new(start, end)
                    .ok_or_else(|| "start must be before end".to_string())?,
            ),
            _ => return Err("start and end must be given together".to_string()),
        };

        Ok(AggregateQuery {
            data_type,
            period,
            source: self.source.filter(|s| !s.trim().is_empty()),
            range,
        })
    }
}

/// Query string for the daily health summary
#[derive(Debug, Default, Deserialize)]
pub struct HealthMetricsParams {
    /// Defaults to today
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl HealthMetricsParams {
    pub fn date(&self, today: NaiveDate) -> Result<NaiveDate, String> {
        match self.date {
            Some(date) if date > today => Err(format!("Date {} is in the future", date)),
            Some(date) => Ok(date),
            None => Ok(today),
        }
    }
}

// ============================================
// HEALTH DTOs
// ============================================

/// Full health status
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status: "healthy" or "unhealthy"
    pub status: String,
    /// Store status: "ok" or "error"
    pub store: String,
    pub uptime_seconds: u64,
    pub version: String,
}
