//! Time primitives shared by the analytics engine
//!
//! - `TimeRange`: half-open UTC interval used for queries and bucket spans
//! - `Granularity`: bucket sizes with canonical UTC boundary alignment
//!
//! Everything in here is UTC. Callers holding local times convert before
//! handing timestamps to the engine.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Time range (half-open interval: [start, end))
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start (inclusive)
    pub start: DateTime<Utc>,
    /// End (exclusive)
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a time range, returning None if start >= end
    pub fn try_new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    /// The range covering one calendar day (UTC)
    pub fn day(date: NaiveDate) -> Self {
        let start = start_of_day(date);
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    /// Check if a timestamp falls within this range
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

}

/// Midnight UTC at the start of `date`
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// Bucket size for passive-data aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Aligned to the top of the UTC hour
    Hourly,
    /// Aligned to UTC midnight
    Daily,
    /// Aligned to Monday 00:00 UTC
    Weekly,
    /// Aligned to the first day of the UTC month
    Monthly,
}

impl Granularity {
    /// Truncate a timestamp to the start of its bucket
    pub fn bucket_start(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let day = start_of_day(ts.date_naive());
        match self {
            Self::Hourly => day + Duration::hours(ts.hour() as i64),
            Self::Daily => day,
            Self::Weekly => {
                let days_since_monday = ts.weekday().num_days_from_monday() as i64;
                day - Duration::days(days_since_monday)
            }
            Self::Monthly => {
                let first = ts.date_naive().with_day(1).unwrap_or(ts.date_naive());
                start_of_day(first)
            }
        }
    }

    /// The exclusive end of the bucket starting at `start`
    ///
    /// `start` must already be aligned (see [`Granularity::bucket_start`]).
    pub fn bucket_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Hourly => start + Duration::hours(1),
            Self::Daily => start + Duration::days(1),
            Self::Weekly => start + Duration::weeks(1),
            Self::Monthly => start
                .checked_add_months(Months::new(1))
                .unwrap_or(start + Duration::days(31)),
        }
    }

    /// The bucket interval containing `ts`
    pub fn bucket_for(&self, ts: DateTime<Utc>) -> TimeRange {
        let start = self.bucket_start(ts);
        TimeRange {
            start,
            end: self.bucket_end(start),
        }
    }

    /// Widen `range` outward to whole buckets
    ///
    /// The result starts at the bucket holding `range.start` and ends at the
    /// end of the bucket holding the last instant before `range.end`.
    pub fn cover(&self, range: TimeRange) -> TimeRange {
        let last = self.bucket_for(range.end - Duration::nanoseconds(1));
        TimeRange {
            start: self.bucket_start(range.start),
            end: last.end,
        }
    }

    /// Default query lookback when the caller gives no explicit range
    pub fn default_lookback(&self) -> Duration {
        match self {
            Self::Hourly => Duration::days(1),
            Self::Daily => Duration::days(30),
            Self::Weekly => Duration::days(90),
            Self::Monthly => Duration::days(365),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hourly" | "hour" => Ok(Self::Hourly),
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            other => Err(format!("unknown granularity: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_time_range_contains() {
        let range = TimeRange::try_new(ts("2024-01-01T00:00:00Z"), ts("2024-01-02T00:00:00Z")).unwrap();

        assert!(range.contains(ts("2024-01-01T00:00:00Z")));
        assert!(range.contains(ts("2024-01-01T23:59:59Z")));
        assert!(!range.contains(ts("2024-01-02T00:00:00Z")));
        assert!(!range.contains(ts("2023-12-31T23:59:59Z")));
    }

    #[test]
    fn test_time_range_rejects_inverted() {
        assert!(TimeRange::try_new(ts("2024-01-02T00:00:00Z"), ts("2024-01-01T00:00:00Z")).is_none());
        assert!(TimeRange::try_new(ts("2024-01-01T00:00:00Z"), ts("2024-01-01T00:00:00Z")).is_none());
    }

    #[test]
    fn test_hourly_alignment() {
        let bucket = Granularity::Hourly.bucket_for(ts("2024-01-15T10:30:45Z"));
        assert_eq!(bucket.start, ts("2024-01-15T10:00:00Z"));
        assert_eq!(bucket.end, ts("2024-01-15T11:00:00Z"));
    }

    #[test]
    fn test_daily_alignment_uses_utc_midnight() {
        // 23:30 at -05:00 is already the next UTC day
        let local = DateTime::parse_from_rfc3339("2024-01-15T23:30:00-05:00")
            .unwrap()
            .with_timezone(&Utc);
        let bucket = Granularity::Daily.bucket_for(local);
        assert_eq!(bucket.start, ts("2024-01-16T00:00:00Z"));
        assert_eq!(bucket.end, ts("2024-01-17T00:00:00Z"));
    }

    #[test]
    fn test_weekly_alignment_starts_monday() {
        // 2024-01-17 is a Wednesday
        let bucket = Granularity::Weekly.bucket_for(ts("2024-01-17T12:00:00Z"));
        assert_eq!(bucket.start, ts("2024-01-15T00:00:00Z"));
        assert_eq!(bucket.end, ts("2024-01-22T00:00:00Z"));
    }

    #[test]
    fn test_monthly_alignment_handles_year_end() {
        let bucket = Granularity::Monthly.bucket_for(ts("2023-12-31T23:00:00Z"));
        assert_eq!(bucket.start, ts("2023-12-01T00:00:00Z"));
        assert_eq!(bucket.end, ts("2024-01-01T00:00:00Z"));

        let feb = Granularity::Monthly.bucket_for(ts("2024-02-29T08:00:00Z"));
        assert_eq!(feb.end, ts("2024-03-01T00:00:00Z"));
    }

    #[test]
    fn test_day_range() {
        let day = TimeRange::day(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(day.start, ts("2024-02-29T00:00:00Z"));
        assert_eq!(day.end, ts("2024-03-01T00:00:00Z"));
    }

    #[test]
    fn test_cover_widens_to_whole_buckets() {
        let range = TimeRange::try_new(ts("2024-01-01T12:00:00Z"), ts("2024-01-03T12:00:00Z")).unwrap();
        let covered = Granularity::Daily.cover(range);
        assert_eq!(covered.start, ts("2024-01-01T00:00:00Z"));
        assert_eq!(covered.end, ts("2024-01-04T00:00:00Z"));

        // Already aligned ranges are unchanged
        let aligned = TimeRange::try_new(ts("2024-01-15T00:00:00Z"), ts("2024-01-22T00:00:00Z")).unwrap();
        assert_eq!(Granularity::Weekly.cover(aligned), aligned);
        assert_eq!(Granularity::Daily.cover(aligned), aligned);
    }

    #[test]
    fn test_granularity_parse() {
        assert_eq!("daily".parse::<Granularity>().unwrap(), Granularity::Daily);
        assert_eq!("Week".parse::<Granularity>().unwrap(), Granularity::Weekly);
        assert!("fortnightly".parse::<Granularity>().is_err());
    }
}
