//! Bucket Aggregator
//!
//! Groups passive points into fixed UTC time buckets and combines each
//! bucket's values with the rule its data type maps to.
//!
//! # Pipeline
//!
//! ```text
//! Points → Ignore foreign → Drop low quality → Bucket → Combine → Fill gaps
//! ```
//!
//! Every input point ends up in exactly one of: a bucket's `count`, the
//! dropped-for-quality tally, or the ignored tally.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::error::AggregationError;
use super::rules::RuleTable;
use super::types::{DataAggregation, DataType, PassiveDataPoint, PassiveValue};
use crate::time::{Granularity, TimeRange};

/// Default minimum quality score for a point to be aggregated
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 0.3;

/// Default upper bound on buckets a single run may produce
pub const DEFAULT_MAX_BUCKETS: usize = 5000;

/// Result of one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationReport {
    pub data_type: DataType,
    pub period: Granularity,
    /// Contiguous, ordered buckets, including empty ones
    pub buckets: Vec<DataAggregation>,
    /// Points below the quality threshold
    pub dropped_low_quality: usize,
    /// Points of another data type or outside the requested range
    pub ignored: usize,
}

impl AggregationReport {
    /// Points that landed in a bucket
    pub fn aggregated_count(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

/// Aggregates passive points into time buckets
#[derive(Debug, Clone)]
pub struct BucketAggregator {
    quality_threshold: f64,
    rules: RuleTable,
    max_buckets: usize,
}

impl Default for BucketAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY_THRESHOLD, RuleTable::default())
    }
}

impl BucketAggregator {
    pub fn new(quality_threshold: f64, rules: RuleTable) -> Self {
        Self {
            quality_threshold,
            rules,
            max_buckets: DEFAULT_MAX_BUCKETS,
        }
    }

    /// Builder: cap the number of buckets one run may emit
    pub fn with_max_buckets(mut self, max_buckets: usize) -> Self {
        self.max_buckets = max_buckets;
        self
    }

    pub fn quality_threshold(&self) -> f64 {
        self.quality_threshold
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn max_buckets(&self) -> usize {
        self.max_buckets
    }

    /// Aggregate points into buckets spanning the points' own time range
    pub fn aggregate(
        &self,
        data_type: DataType,
        period: Granularity,
        points: &[PassiveDataPoint],
    ) -> Result<AggregationReport, AggregationError> {
        self.run(data_type, period, None, points)
    }

    /// Aggregate points into the whole buckets covering `range`
    ///
    /// `range` is first widened to bucket boundaries (see
    /// [`Granularity::cover`]), so every emitted bucket accounts for its full
    /// interval. Points outside the widened range are ignored and counted.
    pub fn aggregate_range(
        &self,
        data_type: DataType,
        period: Granularity,
        range: TimeRange,
        points: &[PassiveDataPoint],
    ) -> Result<AggregationReport, AggregationError> {
        self.run(data_type, period, Some(period.cover(range)), points)
    }

    /// Fail before any points are fetched if `range` needs too many buckets
    pub fn check_range(&self, period: Granularity, range: TimeRange) -> Result<(), AggregationError> {
        let covered = period.cover(range);
        self.check_axis(period, covered.start, covered.end, true)
    }

    fn run(
        &self,
        data_type: DataType,
        period: Granularity,
        range: Option<TimeRange>,
        points: &[PassiveDataPoint],
    ) -> Result<AggregationReport, AggregationError> {
        let mut ignored = 0usize;
        let mut dropped_low_quality = 0usize;
        let mut span: Option<(DateTime<Utc>, DateTime<Utc>)> = None;
        let mut groups: BTreeMap<DateTime<Utc>, Vec<&PassiveDataPoint>> = BTreeMap::new();

        for point in points {
            if point.data_type != data_type {
                ignored += 1;
                continue;
            }
            if let Some(range) = range {
                if !range.contains(point.timestamp) {
                    ignored += 1;
                    continue;
                }
            }

            span = Some(match span {
                None => (point.timestamp, point.timestamp),
                Some((lo, hi)) => (lo.min(point.timestamp), hi.max(point.timestamp)),
            });

            if !self.passes_quality(point) {
                dropped_low_quality += 1;
                continue;
            }

            groups
                .entry(period.bucket_start(point.timestamp))
                .or_default()
                .push(point);
        }

        if ignored > 0 {
            tracing::warn!(
                ignored,
                data_type = %data_type,
                "Points outside the requested data type or range were ignored"
            );
        }

        // Requested range wins; otherwise span the points seen
        let axis = match range {
            Some(r) => Some((r.start, r.end)),
            None => span,
        };

        let buckets = match axis {
            Some((first, last)) => {
                self.check_axis(period, first, last, range.is_some())?;
                self.fill_axis(data_type, period, first, last, range.is_some(), groups)
            }
            None => Vec::new(),
        };

        tracing::debug!(
            data_type = %data_type,
            period = %period,
            buckets = buckets.len(),
            dropped_low_quality,
            "Aggregated passive data"
        );

        Ok(AggregationReport {
            data_type,
            period,
            buckets,
            dropped_low_quality,
            ignored,
        })
    }

    /// Walk the axis without allocating, stopping past the cap
    fn check_axis(
        &self,
        period: Granularity,
        first: DateTime<Utc>,
        last: DateTime<Utc>,
        end_exclusive: bool,
    ) -> Result<(), AggregationError> {
        let mut start = period.bucket_start(first);
        let mut count = 0usize;

        while if end_exclusive { start < last } else { start <= last } {
            count += 1;
            if count > self.max_buckets {
                return Err(AggregationError::TooManyBuckets {
                    period: period.to_string(),
                    max: self.max_buckets,
                });
            }
            start = period.bucket_end(start);
        }

        Ok(())
    }

    fn passes_quality(&self, point: &PassiveDataPoint) -> bool {
        // NaN compares false and is dropped
        point.quality_score >= self.quality_threshold
    }

    /// Emit one bucket per step from the bucket of `first` up to `last`
    ///
    /// With `end_exclusive`, `last` is a range end and the bucket starting
    /// exactly at it is not emitted.
    fn fill_axis(
        &self,
        data_type: DataType,
        period: Granularity,
        first: DateTime<Utc>,
        last: DateTime<Utc>,
        end_exclusive: bool,
        mut groups: BTreeMap<DateTime<Utc>, Vec<&PassiveDataPoint>>,
    ) -> Vec<DataAggregation> {
        let rule = self.rules.rule_for(data_type);
        let mut buckets = Vec::new();
        let mut start = period.bucket_start(first);

        loop {
            let within = if end_exclusive { start < last } else { start <= last };
            if !within {
                break;
            }

            let end = period.bucket_end(start);
            let mut members = groups.remove(&start).unwrap_or_default();
            members.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

            let values: Vec<&PassiveValue> = members.iter().map(|p| &p.value).collect();
            let mut source_breakdown = BTreeMap::new();
            for point in &members {
                *source_breakdown.entry(point.source.clone()).or_insert(0) += 1;
            }

            buckets.push(DataAggregation {
                data_type,
                period,
                bucket_start: start,
                bucket_end: end,
                aggregated_value: rule.combine(&values),
                count: members.len(),
                source_breakdown,
            });

            start = end;
        }

        buckets
    }
}
