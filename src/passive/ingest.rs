//! Bulk ingest validation
//!
//! Candidates are validated one by one; a bad candidate is rejected with its
//! index and reason while the rest of the batch goes through. Only the batch
//! envelope itself (empty or oversized) fails as a whole.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::{IngestError, ValidationError};
use super::types::{DataType, PassiveDataPoint, PassiveValue, ValueShape};
use crate::analytics::UserId;
use crate::time::TimeRange;

pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;
pub const DEFAULT_MAX_PAST_DAYS: i64 = 365;
pub const DEFAULT_MAX_FUTURE_SKEW_SECS: i64 = 300;
pub const DEFAULT_DUPLICATE_WINDOW_SECS: i64 = 300;
pub const MAX_SOURCE_LEN: usize = 64;

/// One incoming passive reading, as submitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestCandidate {
    pub data_type: String,
    pub value: serde_json::Value,
    pub source: String,
    /// RFC 3339 with any offset; missing means "now"
    #[serde(default)]
    pub timestamp: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub quality_score: Option<f64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

/// Per-item rejection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemError {
    pub index: usize,
    pub reason: String,
}

/// Outcome of validating a batch, before persistence
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    /// Valid points in submission order, ids unassigned
    pub accepted: Vec<PassiveDataPoint>,
    /// Submission index of each accepted point
    pub accepted_indices: Vec<usize>,
    pub rejected: Vec<ItemError>,
    pub total: usize,
}

impl ValidatedBatch {
    /// Move accepted points at the given positions into the rejected list
    ///
    /// `positions` index into `accepted`. Rejections stay ordered by
    /// submission index.
    pub fn reject_accepted(&mut self, positions: &[usize], reason: &ValidationError) {
        if positions.is_empty() {
            return;
        }

        let accepted = std::mem::take(&mut self.accepted);
        let indices = std::mem::take(&mut self.accepted_indices);
        for (pos, (point, index)) in accepted.into_iter().zip(indices).enumerate() {
            if positions.contains(&pos) {
                self.rejected.push(ItemError {
                    index,
                    reason: reason.to_string(),
                });
            } else {
                self.accepted.push(point);
                self.accepted_indices.push(index);
            }
        }
        self.rejected.sort_by_key(|e| e.index);
    }

    /// Build the caller-facing result once accepted points have ids
    pub fn into_result(self, accepted_ids: Vec<u64>, processing_async: bool) -> BulkIngestResult {
        BulkIngestResult {
            success_count: accepted_ids.len(),
            error_count: self.rejected.len(),
            total_count: self.total,
            accepted_ids,
            processing_async,
            errors: self.rejected,
        }
    }
}

/// Result of a bulk ingest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkIngestResult {
    pub success_count: usize,
    pub error_count: usize,
    pub total_count: usize,
    pub accepted_ids: Vec<u64>,
    pub processing_async: bool,
    pub errors: Vec<ItemError>,
}

/// Validates and partitions incoming passive data
#[derive(Debug, Clone)]
pub struct BulkIngestValidator {
    max_batch_size: usize,
    /// None when the configured limit is too large to represent
    max_past: Option<Duration>,
    max_future_skew: Option<Duration>,
    duplicate_window: Duration,
}

impl Default for BulkIngestValidator {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_BATCH_SIZE,
            DEFAULT_MAX_PAST_DAYS,
            DEFAULT_MAX_FUTURE_SKEW_SECS,
        )
    }
}

impl BulkIngestValidator {
    pub fn new(max_batch_size: usize, max_past_days: i64, max_future_skew_secs: i64) -> Self {
        Self {
            max_batch_size,
            max_past: Duration::try_days(max_past_days),
            max_future_skew: Duration::try_seconds(max_future_skew_secs),
            duplicate_window: Duration::seconds(DEFAULT_DUPLICATE_WINDOW_SECS),
        }
    }

    /// Builder: how close in time two identical readings must be to count as one
    ///
    /// Zero or negative disables duplicate detection.
    pub fn with_duplicate_window(mut self, secs: i64) -> Self {
        self.duplicate_window = Duration::try_seconds(secs.max(0)).unwrap_or(Duration::zero());
        self
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Window searched for an earlier copy of a point, None when disabled
    pub fn duplicate_window(&self, point: &PassiveDataPoint) -> Option<TimeRange> {
        if self.duplicate_window.is_zero() {
            return None;
        }
        let start = point.timestamp.checked_sub_signed(self.duplicate_window)?;
        // Inclusive upper edge
        let end = point
            .timestamp
            .checked_add_signed(self.duplicate_window + Duration::nanoseconds(1))?;
        TimeRange::try_new(start, end)
    }

    /// Whether `existing` is the same reading as `candidate`
    ///
    /// Same user, type, source and value, stamped within the window.
    pub fn is_duplicate(&self, candidate: &PassiveDataPoint, existing: &PassiveDataPoint) -> bool {
        match self.duplicate_window(candidate) {
            Some(window) => {
                existing.user_id == candidate.user_id
                    && existing.data_type == candidate.data_type
                    && existing.source == candidate.source
                    && existing.value == candidate.value
                    && window.contains(existing.timestamp)
            }
            None => false,
        }
    }

    /// Validate a batch for one user against the caller's clock
    pub fn validate(
        &self,
        user_id: UserId,
        candidates: Vec<IngestCandidate>,
        now: DateTime<Utc>,
    ) -> Result<ValidatedBatch, IngestError> {
        if candidates.is_empty() {
            return Err(IngestError::EmptyBatch);
        }
        if candidates.len() > self.max_batch_size {
            return Err(IngestError::BatchTooLarge {
                size: candidates.len(),
                max: self.max_batch_size,
            });
        }

        let total = candidates.len();
        let mut accepted = Vec::with_capacity(total);
        let mut accepted_indices = Vec::with_capacity(total);
        let mut rejected = Vec::new();

        for (index, candidate) in candidates.into_iter().enumerate() {
            match self.validate_one(user_id, candidate, now) {
                Ok(point) => {
                    accepted.push(point);
                    accepted_indices.push(index);
                }
                Err(e) => rejected.push(ItemError {
                    index,
                    reason: e.to_string(),
                }),
            }
        }

        tracing::debug!(
            user_id,
            accepted = accepted.len(),
            rejected = rejected.len(),
            "Validated passive batch"
        );

        Ok(ValidatedBatch {
            accepted,
            accepted_indices,
            rejected,
            total,
        })
    }

    /// Validate a single candidate into an unsaved point
    pub fn validate_one(
        &self,
        user_id: UserId,
        candidate: IngestCandidate,
        now: DateTime<Utc>,
    ) -> Result<PassiveDataPoint, ValidationError> {
        let data_type: DataType = candidate
            .data_type
            .parse()
            .map_err(|_| ValidationError::UnknownDataType(candidate.data_type.clone()))?;

        let source = candidate.source.trim();
        if source.is_empty() {
            return Err(ValidationError::EmptySource);
        }
        if source.chars().count() > MAX_SOURCE_LEN {
            return Err(ValidationError::SourceTooLong(MAX_SOURCE_LEN));
        }

        let quality_score = candidate.quality_score.unwrap_or(1.0);
        if !(0.0..=1.0).contains(&quality_score) {
            return Err(ValidationError::InvalidQuality(quality_score));
        }

        let timestamp = candidate
            .timestamp
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or(now);
        // Limits past the representable range mean no limit
        let latest = self.max_future_skew.and_then(|skew| now.checked_add_signed(skew));
        if latest.is_some_and(|latest| timestamp > latest) {
            return Err(ValidationError::FutureTimestamp);
        }
        if let Some(max_past) = self.max_past {
            if now.checked_sub_signed(max_past).is_some_and(|earliest| timestamp < earliest) {
                return Err(ValidationError::TooOld(max_past.num_days()));
            }
        }

        let value = parse_value(data_type, &candidate.value)?;

        let mut point = PassiveDataPoint::new(user_id, timestamp, data_type, value, source)
            .quality(quality_score);
        point.metadata = candidate.metadata;
        Ok(point)
    }
}

/// Check a raw JSON value against the shape its data type allows
fn parse_value(
    data_type: DataType,
    raw: &serde_json::Value,
) -> Result<PassiveValue, ValidationError> {
    let wrong_shape = |expected: &'static str| ValidationError::WrongShape {
        data_type: data_type.to_string(),
        expected,
    };

    match data_type.value_shape() {
        ValueShape::Count => {
            if let Some(n) = raw.as_u64() {
                return Ok(PassiveValue::Count(n));
            }
            // 1200.0 is still a count
            match raw.as_f64() {
                Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => {
                    Ok(PassiveValue::Count(v as u64))
                }
                _ => Err(wrong_shape("a non-negative integer")),
            }
        }
        ValueShape::Measure { min, max } => {
            let value = raw
                .as_f64()
                .filter(|v| v.is_finite())
                .ok_or_else(|| wrong_shape("a finite number"))?;
            if value < min || value > max {
                return Err(ValidationError::OutOfRange {
                    data_type: data_type.to_string(),
                    value,
                    min,
                    max,
                });
            }
            Ok(PassiveValue::Measure(value))
        }
        ValueShape::Structured { required } => {
            let map = raw
                .as_object()
                .ok_or_else(|| wrong_shape("an object"))?;
            for field in required {
                if !map.get(*field).map(|v| v.is_number()).unwrap_or(false) {
                    return Err(ValidationError::MissingField {
                        data_type: data_type.to_string(),
                        field: *field,
                    });
                }
            }
            Ok(PassiveValue::Structured(
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ))
        }
        ValueShape::Categorical => match raw {
            serde_json::Value::String(s) if !s.trim().is_empty() => {
                Ok(PassiveValue::Text(s.clone()))
            }
            serde_json::Value::Object(map) => Ok(PassiveValue::Structured(
                map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            )),
            _ => Err(wrong_shape("text or an object")),
        },
    }
}
