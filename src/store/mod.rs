//! Persistence collaborator
//!
//! The analytics engine never touches storage directly. Services fetch
//! records through an `AnalyticsStore` and hand them to the engine fully
//! materialized. `MemoryStore` is the in-process implementation used by the
//! API binary and tests.

mod error;
mod memory;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::analytics::{CheckIn, UserId};
use crate::passive::{DataType, PassiveDataPoint};
use crate::time::TimeRange;

/// Filter for passive point retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct PassiveQuery {
    pub data_type: DataType,
    /// Exact source match when set
    pub source: Option<String>,
    pub range: Option<TimeRange>,
}

impl PassiveQuery {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            source: None,
            range: None,
        }
    }

    /// Builder: restrict to one source
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Builder: restrict to a time range
    pub fn range(mut self, range: TimeRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn matches(&self, point: &PassiveDataPoint) -> bool {
        point.data_type == self.data_type
            && self.source.as_deref().map_or(true, |s| point.source == s)
            && self.range.map_or(true, |r| r.contains(point.timestamp))
    }
}

/// Storage operations the analytics services depend on
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Store a check-in unless one already exists for (user, date)
    async fn insert_checkin(&self, checkin: CheckIn) -> StoreResult<()>;

    /// All distinct check-in dates for a user, ascending
    async fn checkin_dates(&self, user_id: UserId) -> StoreResult<Vec<NaiveDate>>;

    /// Check-ins with `first <= date <= last`, ordered by date
    async fn checkins_between(
        &self,
        user_id: UserId,
        first: NaiveDate,
        last: NaiveDate,
    ) -> StoreResult<Vec<CheckIn>>;

    /// Persist validated points, returning their assigned ids in order
    async fn insert_points(&self, points: Vec<PassiveDataPoint>) -> StoreResult<Vec<u64>>;

    /// A user's points matching `query`, ordered by timestamp
    async fn passive_points(
        &self,
        user_id: UserId,
        query: &PassiveQuery,
    ) -> StoreResult<Vec<PassiveDataPoint>>;

    /// Flag points as aggregated; returns how many were newly marked
    async fn mark_processed(&self, ids: &[u64]) -> StoreResult<usize>;
}
