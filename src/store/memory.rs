//! In-memory store

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::{AnalyticsStore, PassiveQuery, StoreError, StoreResult};
use crate::analytics::{CheckIn, UserId};
use crate::passive::PassiveDataPoint;

#[derive(Debug, Default)]
struct Inner {
    checkins: HashMap<UserId, BTreeMap<NaiveDate, CheckIn>>,
    points: Vec<PassiveDataPoint>,
    next_point_id: u64,
}

/// `AnalyticsStore` backed by process memory
///
/// Enforces one check-in per (user, date) and assigns sequential point ids
/// starting at 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total stored check-ins across all users
    pub async fn checkin_count(&self) -> usize {
        self.inner.read().await.checkins.values().map(|m| m.len()).sum()
    }

    /// Total stored passive points across all users
    pub async fn point_count(&self) -> usize {
        self.inner.read().await.points.len()
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn insert_checkin(&self, checkin: CheckIn) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        let days = inner.checkins.entry(checkin.user_id).or_default();
        if days.contains_key(&checkin.date) {
            return Err(StoreError::DuplicateCheckin {
                user_id: checkin.user_id,
                date: checkin.date,
            });
        }
        days.insert(checkin.date, checkin);
        Ok(())
    }

    async fn checkin_dates(&self, user_id: UserId) -> StoreResult<Vec<NaiveDate>> {
        let inner = self.inner.read().await;
        Ok(inner
            .checkins
            .get(&user_id)
            .map(|days| days.keys().copied().collect())
            .unwrap_or_default())
    }

    async fn checkins_between(
        &self,
        user_id: UserId,
        first: NaiveDate,
        last: NaiveDate,
    ) -> StoreResult<Vec<CheckIn>> {
        if first > last {
            return Err(StoreError::InvalidRange);
        }
        let inner = self.inner.read().await;
        Ok(inner
            .checkins
            .get(&user_id)
            .map(|days| days.range(first..=last).map(|(_, c)| c.clone()).collect())
            .unwrap_or_default())
    }

    async fn insert_points(&self, points: Vec<PassiveDataPoint>) -> StoreResult<Vec<u64>> {
        let mut inner = self.inner.write().await;
        let mut ids = Vec::with_capacity(points.len());
        for mut point in points {
            inner.next_point_id += 1;
            point.id = inner.next_point_id;
            point.processed = false;
            ids.push(point.id);
            inner.points.push(point);
        }
        Ok(ids)
    }

    async fn passive_points(
        &self,
        user_id: UserId,
        query: &PassiveQuery,
    ) -> StoreResult<Vec<PassiveDataPoint>> {
        let inner = self.inner.read().await;
        let mut matched: Vec<PassiveDataPoint> = inner
            .points
            .iter()
            .filter(|p| p.user_id == user_id && query.matches(p))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(matched)
    }

    async fn mark_processed(&self, ids: &[u64]) -> StoreResult<usize> {
        let mut inner = self.inner.write().await;
        let mut marked = 0;
        for point in inner.points.iter_mut() {
            if !point.processed && ids.contains(&point.id) {
                point.processed = true;
                marked += 1;
            }
        }
        Ok(marked)
    }
}
