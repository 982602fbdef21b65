//! Analytics Service
//!
//! Composes a store with the analytics engine. Every query re-reads the
//! records it needs and recomputes from scratch; nothing derived is cached.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

use crate::analytics::{CheckIn, CheckinStreak, DateRunCalculator, MoodAnalytics, Period, TrendAnalyzer, UserId};
use crate::config::Config;
use crate::passive::{
    summarize_day, AggregationError, AggregationReport, BucketAggregator, BulkIngestResult,
    BulkIngestValidator, DailyHealthMetrics, DataType, IngestCandidate, IngestError,
    PassiveDataPoint, ValidatedBatch, ValidationError, HEALTH_METRIC_TYPES,
};
use crate::store::{AnalyticsStore, PassiveQuery, StoreError};
use crate::time::{Granularity, TimeRange};

/// Errors surfaced by service operations
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Parameters of an aggregation query
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateQuery {
    pub data_type: DataType,
    pub period: Granularity,
    pub source: Option<String>,
    /// Defaults to the period's standard lookback ending now
    pub range: Option<TimeRange>,
}

impl AggregateQuery {
    pub fn new(data_type: DataType, period: Granularity) -> Self {
        Self {
            data_type,
            period,
            source: None,
            range: None,
        }
    }
}

/// Outcome of one recomputation job
#[derive(Debug, Clone, PartialEq)]
pub struct RecomputeSummary {
    pub buckets: usize,
    pub points_marked: usize,
}

/// Store plus engine, shared by the API handlers
pub struct AnalyticsService {
    store: Arc<dyn AnalyticsStore>,
    config: Config,
    streaks: DateRunCalculator,
    analyzer: TrendAnalyzer,
    aggregator: BucketAggregator,
    validator: BulkIngestValidator,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn AnalyticsStore>, config: Config) -> Self {
        Self {
            streaks: DateRunCalculator::new(),
            analyzer: config.analytics.trend_analyzer(),
            aggregator: config.aggregation.aggregator(),
            validator: config.ingest.validator(),
            store,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn AnalyticsStore> {
        &self.store
    }

    /// Calendar day considered "today" at `now`
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        self.config.analytics.today(now)
    }

    /// Persist a check-in; fails if the user already checked in that day
    pub async fn record_checkin(&self, checkin: CheckIn) -> ServiceResult<()> {
        let (user_id, date) = (checkin.user_id, checkin.date);
        self.store.insert_checkin(checkin).await?;
        tracing::info!(user_id, %date, "Recorded check-in");
        Ok(())
    }

    pub async fn checkin_streak(&self, user_id: UserId, now: DateTime<Utc>) -> ServiceResult<CheckinStreak> {
        let dates = self.store.checkin_dates(user_id).await?;
        Ok(self.streaks.calculate(dates, self.today(now)))
    }

    pub async fn mood_analytics(
        &self,
        user_id: UserId,
        period: Period,
        now: DateTime<Utc>,
    ) -> ServiceResult<MoodAnalytics> {
        let today = self.today(now);
        let (first, last) = self.analyzer.windows().window(period, today);
        let checkins = self.store.checkins_between(user_id, first, last).await?;

        tracing::debug!(user_id, %period, checkins = checkins.len(), "Computing mood analytics");
        Ok(self.analyzer.analyze_period(&checkins, period, today))
    }

    pub async fn aggregate(
        &self,
        user_id: UserId,
        query: AggregateQuery,
        now: DateTime<Utc>,
    ) -> ServiceResult<AggregationReport> {
        let range = match query.range {
            Some(range) => range,
            None => default_range(query.period, now),
        };
        self.aggregator.check_range(query.period, range)?;

        let mut filter = PassiveQuery::new(query.data_type).range(range);
        if let Some(source) = &query.source {
            filter = filter.source(source.clone());
        }

        let points = self.store.passive_points(user_id, &filter).await?;
        Ok(self
            .aggregator
            .aggregate_range(query.data_type, query.period, range, &points)?)
    }

    /// Sleep, activity, heart rate and screen time for one UTC day
    pub async fn health_metrics(&self, user_id: UserId, date: NaiveDate) -> ServiceResult<DailyHealthMetrics> {
        let day = TimeRange::day(date);
        let mut points = BTreeMap::new();
        for data_type in HEALTH_METRIC_TYPES {
            let found = self
                .store
                .passive_points(user_id, &PassiveQuery::new(data_type).range(day))
                .await?;
            points.insert(data_type, found);
        }

        Ok(summarize_day(&self.aggregator, date, &points)?)
    }

    /// Validate, persist, then recompute the affected daily buckets
    ///
    /// With `process_async` the recomputation runs on a spawned task and the
    /// result is returned as soon as the points are stored.
    pub async fn bulk_ingest(
        &self,
        user_id: UserId,
        candidates: Vec<IngestCandidate>,
        process_async: bool,
        now: DateTime<Utc>,
    ) -> ServiceResult<BulkIngestResult> {
        let mut batch = self.validator.validate(user_id, candidates, now)?;
        self.reject_duplicates(user_id, &mut batch).await?;
        let affected = affected_days(&batch.accepted);

        let ids = if batch.accepted.is_empty() {
            Vec::new()
        } else {
            self.store.insert_points(batch.accepted.clone()).await?
        };

        let job_id = uuid::Uuid::new_v4();
        tracing::info!(
            user_id,
            %job_id,
            accepted = ids.len(),
            rejected = batch.rejected.len(),
            process_async,
            "Ingested passive batch"
        );

        if !affected.is_empty() {
            let store = Arc::clone(&self.store);
            let aggregator = self.aggregator.clone();

            if process_async {
                tokio::spawn(async move {
                    if let Err(e) = recompute(store, aggregator, user_id, affected).await {
                        tracing::error!(%job_id, error = %e, "Background recomputation failed");
                    }
                });
            } else {
                let summary = recompute(store, aggregator, user_id, affected).await?;
                tracing::debug!(%job_id, buckets = summary.buckets, marked = summary.points_marked, "Recomputed inline");
            }
        }

        Ok(batch.into_result(ids, process_async))
    }

    /// Reject points already stored, or repeated earlier in the same batch
    async fn reject_duplicates(&self, user_id: UserId, batch: &mut ValidatedBatch) -> ServiceResult<()> {
        let mut duplicates = Vec::new();

        for (pos, point) in batch.accepted.iter().enumerate() {
            let Some(window) = self.validator.duplicate_window(point) else {
                continue;
            };

            let earlier_in_batch = batch.accepted[..pos]
                .iter()
                .enumerate()
                .any(|(i, other)| !duplicates.contains(&i) && self.validator.is_duplicate(point, other));
            if earlier_in_batch {
                duplicates.push(pos);
                continue;
            }

            let query = PassiveQuery::new(point.data_type)
                .source(point.source.clone())
                .range(window);
            let stored = self.store.passive_points(user_id, &query).await?;
            if stored.iter().any(|existing| self.validator.is_duplicate(point, existing)) {
                duplicates.push(pos);
            }
        }

        if !duplicates.is_empty() {
            tracing::debug!(user_id, duplicates = duplicates.len(), "Rejected duplicate passive points");
        }
        batch.reject_accepted(&duplicates, &ValidationError::Duplicate);
        Ok(())
    }
}

/// Period-aligned range ending with the bucket that holds `now`
fn default_range(period: Granularity, now: DateTime<Utc>) -> TimeRange {
    let current = period.bucket_start(now);
    TimeRange {
        start: period.bucket_start(now - period.default_lookback()),
        end: period.bucket_end(current),
    }
}

/// UTC days touched per data type
fn affected_days(points: &[PassiveDataPoint]) -> BTreeMap<DataType, BTreeSet<NaiveDate>> {
    let mut days: BTreeMap<DataType, BTreeSet<NaiveDate>> = BTreeMap::new();
    for point in points {
        days.entry(point.data_type)
            .or_default()
            .insert(point.timestamp.date_naive());
    }
    days
}

/// Re-aggregate the affected days and mark their points processed
async fn recompute(
    store: Arc<dyn AnalyticsStore>,
    aggregator: BucketAggregator,
    user_id: UserId,
    affected: BTreeMap<DataType, BTreeSet<NaiveDate>>,
) -> ServiceResult<RecomputeSummary> {
    let mut summary = RecomputeSummary {
        buckets: 0,
        points_marked: 0,
    };

    for (data_type, days) in affected {
        let mut dropped = 0;
        for day in &days {
            let range = TimeRange::day(*day);
            let points = store
                .passive_points(user_id, &PassiveQuery::new(data_type).range(range))
                .await?;

            let report = aggregator.aggregate_range(data_type, Granularity::Daily, range, &points)?;
            let ids: Vec<u64> = points.iter().map(|p| p.id).collect();
            summary.points_marked += store.mark_processed(&ids).await?;
            summary.buckets += report.buckets.len();
            dropped += report.dropped_low_quality;
        }

        tracing::debug!(
            user_id,
            data_type = %data_type,
            days = days.len(),
            dropped,
            "Recomputed daily buckets"
        );
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::TrendDirection;
    use crate::passive::PassiveValue;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn service() -> (Arc<MemoryStore>, AnalyticsService) {
        let store = Arc::new(MemoryStore::new());
        let service = AnalyticsService::new(store.clone(), Config::default());
        (store, service)
    }

    fn steps(value: u64, source: &str, ts: &str) -> IngestCandidate {
        IngestCandidate {
            data_type: "step_count".into(),
            value: json!(value),
            source: source.into(),
            timestamp: Some(DateTime::parse_from_rfc3339(ts).unwrap()),
            quality_score: None,
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_streak_from_store() {
        let (_, service) = service();
        for d in [1, 2, 4, 5] {
            service.record_checkin(CheckIn::new(1, day(d), 6.0)).await.unwrap();
        }

        let streak = service.checkin_streak(1, at("2024-01-05T18:00:00Z")).await.unwrap();
        assert_eq!(streak.current_streak, 2);
        assert_eq!(streak.longest_streak, 2);
        assert_eq!(streak.total_checkins, 4);

        let duplicate = service.record_checkin(CheckIn::new(1, day(5), 2.0)).await;
        assert!(matches!(duplicate, Err(ServiceError::Store(StoreError::DuplicateCheckin { .. }))));
    }

    #[tokio::test]
    async fn test_mood_analytics_uses_window() {
        let (_, service) = service();
        // Outside the weekly window
        service.record_checkin(CheckIn::new(1, NaiveDate::from_ymd_opt(2023, 11, 1).unwrap(), 1.0)).await.unwrap();
        for (d, mood) in [(10, 4.0), (11, 4.0), (12, 5.0), (13, 7.0), (14, 8.0), (15, 8.0)] {
            service.record_checkin(CheckIn::new(1, day(d), mood)).await.unwrap();
        }

        let analytics = service
            .mood_analytics(1, Period::Weekly, at("2024-01-15T12:00:00Z"))
            .await
            .unwrap();
        assert_eq!(analytics.trend_data.len(), 6);
        assert_eq!(analytics.trend_direction, TrendDirection::Improving);
    }

    #[tokio::test]
    async fn test_bulk_ingest_inline_then_aggregate() {
        let (store, service) = service();
        let now = at("2024-01-15T23:00:00Z");
        let batch = vec![
            steps(1000, "HealthKit", "2024-01-15T08:00:00Z"),
            steps(500, "GoogleFit", "2024-01-15T12:00:00Z"),
            IngestCandidate {
                data_type: "heart_rate".into(),
                value: json!(20),
                ..steps(0, "HealthKit", "2024-01-15T09:00:00Z")
            },
        ];

        let result = service.bulk_ingest(1, batch, false, now).await.unwrap();
        assert_eq!(result.success_count, 2);
        assert_eq!(result.error_count, 1);
        assert_eq!(result.total_count, 3);
        assert!(!result.processing_async);

        let stored = store.passive_points(1, &PassiveQuery::new(DataType::StepCount)).await.unwrap();
        assert!(stored.iter().all(|p| p.processed));

        let report = service
            .aggregate(1, AggregateQuery::new(DataType::StepCount, Granularity::Daily), now)
            .await
            .unwrap();
        let today = report
            .buckets
            .iter()
            .find(|b| b.bucket_start == at("2024-01-15T00:00:00Z"))
            .unwrap();
        assert_eq!(today.aggregated_value, Some(PassiveValue::Count(1500)));
        assert_eq!(today.count, 2);
        assert_eq!(report.buckets.last().unwrap().bucket_end, at("2024-01-16T00:00:00Z"));
    }

    #[tokio::test]
    async fn test_bulk_ingest_async_marks_processed_later() {
        let (store, service) = service();
        let now = at("2024-01-15T23:00:00Z");
        let result = service
            .bulk_ingest(1, vec![steps(10, "HealthKit", "2024-01-15T08:00:00Z")], true, now)
            .await
            .unwrap();
        assert!(result.processing_async);

        let processed = tokio::time::timeout(std::time::Duration::from_secs(5), async {
            loop {
                let points = store.passive_points(1, &PassiveQuery::new(DataType::StepCount)).await.unwrap();
                if points.iter().all(|p| p.processed) {
                    break;
                }
                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(processed.is_ok());
    }

    #[tokio::test]
    async fn test_duplicates_against_store_and_batch() {
        let (store, service) = service();
        let now = at("2024-01-15T23:00:00Z");
        service
            .bulk_ingest(1, vec![steps(500, "HealthKit", "2024-01-15T10:00:00Z")], false, now)
            .await
            .unwrap();

        let batch = vec![
            // Same reading three minutes after the stored one
            steps(500, "HealthKit", "2024-01-15T10:03:00Z"),
            steps(500, "HealthKit", "2024-01-15T10:30:00Z"),
            // Repeats the previous item
            steps(500, "HealthKit", "2024-01-15T10:31:00Z"),
            steps(600, "HealthKit", "2024-01-15T10:02:00Z"),
            steps(500, "GoogleFit", "2024-01-15T10:01:00Z"),
        ];
        let result = service.bulk_ingest(1, batch, false, now).await.unwrap();

        assert_eq!(result.success_count, 3);
        assert_eq!(result.error_count, 2);
        assert_eq!(result.total_count, 5);
        let rejected: Vec<usize> = result.errors.iter().map(|e| e.index).collect();
        assert_eq!(rejected, vec![0, 2]);
        assert!(result.errors.iter().all(|e| e.reason == "Duplicate data point"));
        assert_eq!(store.point_count().await, 4);

        // Another user may report the same reading
        let other = service
            .bulk_ingest(2, vec![steps(500, "HealthKit", "2024-01-15T10:00:00Z")], false, now)
            .await
            .unwrap();
        assert_eq!(other.success_count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_check_can_be_disabled() {
        let store = Arc::new(MemoryStore::new());
        let mut config = Config::default();
        config.ingest.duplicate_window_secs = 0;
        let service = AnalyticsService::new(store.clone(), config);
        let now = at("2024-01-15T23:00:00Z");

        let batch = vec![
            steps(500, "HealthKit", "2024-01-15T10:00:00Z"),
            steps(500, "HealthKit", "2024-01-15T10:00:00Z"),
        ];
        let result = service.bulk_ingest(1, batch, false, now).await.unwrap();
        assert_eq!(result.success_count, 2);
        assert_eq!(store.point_count().await, 2);
    }

    #[tokio::test]
    async fn test_health_metrics_for_one_day() {
        let (_, service) = service();
        let now = at("2024-01-15T23:00:00Z");
        let reading = |data_type: &str, value: serde_json::Value, ts: &str| IngestCandidate {
            data_type: data_type.into(),
            value,
            ..steps(0, "HealthKit", ts)
        };

        let batch = vec![
            steps(4000, "HealthKit", "2024-01-15T09:00:00Z"),
            steps(2000, "GoogleFit", "2024-01-15T17:00:00Z"),
            reading("heart_rate", json!(62), "2024-01-15T08:00:00Z"),
            reading("heart_rate", json!(78), "2024-01-15T20:00:00Z"),
            reading("sleep_duration", json!(6.5), "2024-01-15T07:00:00Z"),
            reading("screen_time", json!(4), "2024-01-14T21:00:00Z"),
        ];
        let result = service.bulk_ingest(1, batch, false, now).await.unwrap();
        assert_eq!(result.success_count, 6);

        let metrics = service.health_metrics(1, day(15)).await.unwrap();
        assert_eq!(metrics.date, day(15));
        assert_eq!(metrics.step_count, Some(6000));
        assert_eq!(metrics.heart_rate_avg, Some(70.0));
        assert_eq!(metrics.sleep_duration, Some(6.5));
        assert_eq!(metrics.screen_time, None);
        assert_eq!(metrics.exercise_duration, None);

        let previous = service.health_metrics(1, day(14)).await.unwrap();
        assert_eq!(previous.screen_time, Some(4.0));
        assert_eq!(previous.step_count, None);
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let (_, service) = service();
        let err = service.bulk_ingest(1, vec![], false, Utc::now()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Ingest(IngestError::EmptyBatch)));
    }

    #[tokio::test]
    async fn test_aggregate_rejects_huge_ranges() {
        let (_, service) = service();
        let mut query = AggregateQuery::new(DataType::HeartRate, Granularity::Hourly);
        query.range = TimeRange::try_new(at("2020-01-01T00:00:00Z"), at("2024-01-01T00:00:00Z"));

        let err = service.aggregate(1, query, Utc::now()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Aggregation(AggregationError::TooManyBuckets { .. })));
    }

    #[tokio::test]
    async fn test_aggregate_filters_by_source() {
        let (_, service) = service();
        let now = at("2024-01-15T23:00:00Z");
        service
            .bulk_ingest(
                1,
                vec![
                    steps(1000, "HealthKit", "2024-01-15T08:00:00Z"),
                    steps(500, "GoogleFit", "2024-01-15T12:00:00Z"),
                ],
                false,
                now,
            )
            .await
            .unwrap();

        let mut query = AggregateQuery::new(DataType::StepCount, Granularity::Daily);
        query.source = Some("GoogleFit".into());
        query.range = TimeRange::try_new(at("2024-01-15T00:00:00Z"), at("2024-01-16T00:00:00Z"));

        let report = service.aggregate(1, query, now).await.unwrap();
        assert_eq!(report.buckets.len(), 1);
        assert_eq!(report.buckets[0].aggregated_value, Some(PassiveValue::Count(500)));
    }
}
