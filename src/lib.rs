//! # MindBridge Analytics
//!
//! Mood and passive-data analytics for MindBridge: check-in streaks, mood
//! trends and correlation insights, plus time-bucketed aggregation of passive
//! health readings.
//!
//! ## Features
//!
//! - **Streaks**: consecutive-day runs over check-in dates
//! - **Mood analytics**: averages, trend direction, keyword frequency and
//!   mood/metric correlations over daily, weekly or monthly windows
//! - **Passive data**: validated bulk ingest with per-item errors and
//!   UTC-aligned bucket aggregation with per-type combine rules
//! - **Health summary**: one record per day of sleep, activity, heart rate
//!   and screen time
//! - **REST API**: Axum server over a pluggable store
//!
//! ## Modules
//!
//! - [`analytics`]: Streaks, trends and correlations over check-ins
//! - [`passive`]: Passive data types, ingest validation and bucketing
//! - [`time`]: Time ranges and bucket granularities
//! - [`store`]: Persistence seam and in-memory store
//! - [`service`]: Orchestration between the engine and the store
//! - [`api`]: REST API server with Axum
//! - [`import`]: CSV import of check-in history
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::{Duration, Utc};
//! use mindbridge_analytics::analytics::{CheckIn, DateRunCalculator, Period, TrendAnalyzer};
//!
//! let today = Utc::now().date_naive();
//! let checkins: Vec<CheckIn> = (0..5)
//!     .map(|d| CheckIn::new(1, today - Duration::days(d), 6.0 + d as f64 / 2.0))
//!     .collect();
//!
//! let streak = DateRunCalculator::new().calculate(checkins.iter().map(|c| c.date), today);
//! println!("Current streak: {} days", streak.current_streak);
//!
//! let analytics = TrendAnalyzer::default().analyze_period(&checkins, Period::Weekly, today);
//! println!("Average mood: {:.1} ({:?})", analytics.average_mood, analytics.trend_direction);
//! ```

pub mod analytics;
pub mod api;
pub mod config;
pub mod import;
pub mod logging;
pub mod passive;
pub mod service;
pub mod store;
pub mod time;

// Re-export top-level types for convenience
pub use analytics::{
    CheckIn, CheckinStreak, CorrelationEngine, CorrelationInsight, CorrelationResult,
    DateRunCalculator, MoodAnalytics, MoodCategory, Period, TrendAnalyzer, TrendDirection,
    UserId, WellnessMetric,
};

pub use passive::{
    AggregationError, AggregationReport, BucketAggregator, BulkIngestResult, BulkIngestValidator,
    CombineRule, DailyHealthMetrics, DataAggregation, DataType, IngestCandidate, IngestError,
    PassiveDataPoint, PassiveValue, RuleTable, ValidationError,
};

pub use time::{Granularity, TimeRange};

pub use store::{AnalyticsStore, MemoryStore, PassiveQuery, StoreError, StoreResult};

pub use service::{AggregateQuery, AnalyticsService, ServiceError, ServiceResult};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError, LoggingConfig};
