//! Passive data error types

use thiserror::Error;

/// Why a single ingest candidate was rejected
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unknown data type: {0}")]
    UnknownDataType(String),

    #[error("{data_type} expects {expected}")]
    WrongShape {
        data_type: String,
        expected: &'static str,
    },

    #[error("{data_type} value {value} is outside [{min}, {max}]")]
    OutOfRange {
        data_type: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{data_type} requires numeric field '{field}'")]
    MissingField {
        data_type: String,
        field: &'static str,
    },

    #[error("Quality score {0} must be within [0, 1]")]
    InvalidQuality(f64),

    #[error("Source cannot be empty")]
    EmptySource,

    #[error("Source exceeds maximum length of {0} characters")]
    SourceTooLong(usize),

    #[error("Timestamp is in the future")]
    FutureTimestamp,

    #[error("Timestamp is more than {0} days in the past")]
    TooOld(i64),

    #[error("Duplicate data point")]
    Duplicate,
}

/// Batch-level ingest failures; the batch is rejected as a whole
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    #[error("Empty batch")]
    EmptyBatch,

    #[error("Batch size {size} exceeds maximum of {max} points")]
    BatchTooLarge { size: usize, max: usize },
}

/// Aggregation requests the engine refuses to run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AggregationError {
    #[error("Range needs more than {max} {period} buckets")]
    TooManyBuckets { period: String, max: usize },
}
