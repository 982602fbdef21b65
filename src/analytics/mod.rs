//! Check-in Analytics
//!
//! Pure computations over a user's daily check-ins:
//!
//! - **streak**: consecutive-day runs (`DateRunCalculator`)
//! - **trend**: windowed mood statistics and trend direction (`TrendAnalyzer`)
//! - **correlation**: gated Pearson correlation (`CorrelationEngine`)
//! - **types**: `CheckIn` and the derived response shapes
//!
//! Nothing in here holds state or performs I/O. Callers fetch records from
//! persistence and pass them in fully materialized.
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use mindbridge_analytics::analytics::{CheckIn, DateRunCalculator, Period, TrendAnalyzer};
//!
//! let today = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
//! let checkins: Vec<CheckIn> = (1..=5)
//!     .map(|day| CheckIn::new(1, NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), 5.0 + day as f64))
//!     .collect();
//!
//! let streak = DateRunCalculator::new().calculate(checkins.iter().map(|c| c.date), today);
//! assert_eq!(streak.current_streak, 5);
//!
//! let analytics = TrendAnalyzer::default().analyze_period(&checkins, Period::Weekly, today);
//! assert_eq!(analytics.trend_data.len(), 5);
//! ```

pub mod correlation;
pub mod streak;
pub mod trend;
pub mod types;

pub use correlation::{
    pearson_correlation, CorrelationEngine, CorrelationInsight, CorrelationResult,
    DEFAULT_MIN_SAMPLES,
};
pub use streak::DateRunCalculator;
pub use trend::{PeriodWindows, TrendAnalyzer, DEFAULT_TREND_EPSILON};
pub use types::{
    CheckIn, CheckinStreak, MoodAnalytics, MoodCategory, MoodRange, MoodTrendPoint, Period,
    TrendDirection, UserId, WellnessMetric,
};
