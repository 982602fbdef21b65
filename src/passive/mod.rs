//! Passive Data
//!
//! Sensor and platform readings (steps, heart rate, sleep, screen time, ...):
//!
//! - **types**: `DataType`, the `PassiveValue` union, `PassiveDataPoint`
//! - **rules**: per-type combination rules (`RuleTable`)
//! - **bucket**: time-bucket aggregation (`BucketAggregator`)
//! - **ingest**: batch validation and duplicate rule (`BulkIngestValidator`)
//! - **health**: one-day health summary (`DailyHealthMetrics`)

pub mod bucket;
pub mod error;
pub mod health;
pub mod ingest;
pub mod rules;
pub mod types;

pub use bucket::{
    AggregationReport, BucketAggregator, DEFAULT_MAX_BUCKETS, DEFAULT_QUALITY_THRESHOLD,
};
pub use error::{AggregationError, IngestError, ValidationError};
pub use health::{summarize_day, DailyHealthMetrics, HEALTH_METRIC_TYPES};
pub use ingest::{
    BulkIngestResult, BulkIngestValidator, IngestCandidate, ItemError, ValidatedBatch,
    DEFAULT_DUPLICATE_WINDOW_SECS, DEFAULT_MAX_BATCH_SIZE,
};
pub use rules::{CombineRule, RuleTable};
pub use types::{DataAggregation, DataType, PassiveDataPoint, PassiveValue, ValueShape};
