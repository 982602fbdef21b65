//! Date-run calculation
//!
//! Turns the set of days on which a user checked in into a `CheckinStreak`.
//! The current run only counts if it reaches today or yesterday, so a user
//! who has not checked in yet today keeps their streak until midnight.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;

use super::types::CheckinStreak;

/// Computes consecutive-day runs from check-in dates
#[derive(Debug, Clone, Copy, Default)]
pub struct DateRunCalculator;

impl DateRunCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Compute the streak summary for `dates` as seen on `today` (UTC)
    pub fn calculate<I>(&self, dates: I, today: NaiveDate) -> CheckinStreak
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let dates = normalize_dates(dates, today);

        let Some(&last) = dates.last() else {
            return CheckinStreak::empty();
        };

        let (current_streak, streak_start_date) = current_run(&dates, today);

        CheckinStreak {
            current_streak,
            longest_streak: longest_run(&dates),
            total_checkins: dates.len() as u32,
            streak_start_date,
            days_since_last_checkin: Some((today - last).num_days()),
        }
    }
}

/// Deduplicate, drop dates after `today`, and sort ascending
fn normalize_dates<I>(dates: I, today: NaiveDate) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = NaiveDate>,
{
    let mut seen = BTreeSet::new();
    let mut duplicates = 0usize;
    let mut future = 0usize;

    for date in dates {
        if date > today {
            future += 1;
            continue;
        }
        if !seen.insert(date) {
            duplicates += 1;
        }
    }

    if duplicates > 0 {
        tracing::warn!(
            duplicates,
            "Duplicate check-in dates supplied; one check-in per day is expected upstream"
        );
    }
    if future > 0 {
        tracing::warn!(
            future,
            today = %today,
            "Check-in dates after today ignored"
        );
    }

    seen.into_iter().collect()
}

/// Length and start of the run ending at today or yesterday
///
/// `dates` must be sorted ascending and distinct.
fn current_run(dates: &[NaiveDate], today: NaiveDate) -> (u32, Option<NaiveDate>) {
    let mut iter = dates.iter().rev();
    let Some(&most_recent) = iter.next() else {
        return (0, None);
    };

    if most_recent != today && most_recent != today - Duration::days(1) {
        return (0, None);
    }

    let mut run = 1u32;
    let mut start = most_recent;
    for &date in iter {
        if start - date != Duration::days(1) {
            break;
        }
        run += 1;
        start = date;
    }

    (run, Some(start))
}

/// Longest consecutive run anywhere in `dates` (sorted ascending, distinct)
fn longest_run(dates: &[NaiveDate]) -> u32 {
    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;

    for &date in dates {
        run = match prev {
            Some(p) if date - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(date);
    }

    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_consecutive_days_ending_today() {
        let dates: Vec<_> = (1..=5).map(|day| d(2024, 1, day)).collect();
        let streak = DateRunCalculator::new().calculate(dates, d(2024, 1, 5));

        assert_eq!(streak.current_streak, 5);
        assert_eq!(streak.longest_streak, 5);
        assert_eq!(streak.total_checkins, 5);
        assert_eq!(streak.streak_start_date, Some(d(2024, 1, 1)));
        assert_eq!(streak.days_since_last_checkin, Some(0));
    }

    #[test]
    fn test_gap_stops_current_streak() {
        let dates = vec![d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 4), d(2024, 1, 5)];
        let streak = DateRunCalculator::new().calculate(dates, d(2024, 1, 5));

        assert_eq!(streak.current_streak, 2);
        assert_eq!(streak.longest_streak, 2);
        assert_eq!(streak.total_checkins, 4);
        assert_eq!(streak.streak_start_date, Some(d(2024, 1, 4)));
    }

    #[test]
    fn test_yesterday_keeps_streak_alive() {
        let dates = vec![d(2024, 3, 1), d(2024, 3, 2), d(2024, 3, 3)];
        let streak = DateRunCalculator::new().calculate(dates, d(2024, 3, 4));

        assert_eq!(streak.current_streak, 3);
        assert_eq!(streak.days_since_last_checkin, Some(1));
    }

    #[test]
    fn test_two_days_ago_breaks_streak() {
        let dates = vec![d(2024, 3, 1), d(2024, 3, 2)];
        let streak = DateRunCalculator::new().calculate(dates, d(2024, 3, 4));

        assert_eq!(streak.current_streak, 0);
        assert_eq!(streak.streak_start_date, None);
        assert_eq!(streak.longest_streak, 2);
        assert_eq!(streak.days_since_last_checkin, Some(2));
    }

    #[test]
    fn test_empty_dates() {
        let streak = DateRunCalculator::new().calculate(Vec::new(), d(2024, 1, 5));
        assert_eq!(streak, CheckinStreak::empty());
    }

    #[test]
    fn test_longest_run_in_the_past() {
        let mut dates: Vec<_> = (1..=10).map(|day| d(2024, 1, day)).collect();
        dates.push(d(2024, 1, 20));
        dates.push(d(2024, 1, 21));
        let streak = DateRunCalculator::new().calculate(dates, d(2024, 1, 21));

        assert_eq!(streak.current_streak, 2);
        assert_eq!(streak.longest_streak, 10);
    }

    #[test]
    fn test_unordered_and_duplicate_dates() {
        let dates = vec![d(2024, 1, 3), d(2024, 1, 1), d(2024, 1, 2), d(2024, 1, 3)];
        let streak = DateRunCalculator::new().calculate(dates, d(2024, 1, 3));

        assert_eq!(streak.total_checkins, 3);
        assert_eq!(streak.current_streak, 3);
        assert_eq!(streak.longest_streak, 3);
    }

    #[test]
    fn test_future_dates_are_ignored() {
        let dates = vec![d(2024, 1, 4), d(2024, 1, 5), d(2024, 1, 9)];
        let streak = DateRunCalculator::new().calculate(dates, d(2024, 1, 5));

        assert_eq!(streak.total_checkins, 2);
        assert_eq!(streak.current_streak, 2);
        assert_eq!(streak.days_since_last_checkin, Some(0));
    }

    #[test]
    fn test_run_across_month_boundary() {
        let dates = vec![d(2024, 2, 28), d(2024, 2, 29), d(2024, 3, 1)];
        let streak = DateRunCalculator::new().calculate(dates, d(2024, 3, 1));
        assert_eq!(streak.current_streak, 3);
    }

    #[test]
    fn test_streak_properties_over_many_windows() {
        let today = d(2024, 6, 30);
        for len in 1..40i64 {
            let dates: Vec<_> = (0..len).map(|i| today - Duration::days(i)).collect();
            let streak = DateRunCalculator::new().calculate(dates, today);
            assert_eq!(streak.current_streak as i64, len);
            assert!(streak.longest_streak >= streak.current_streak);

            // Remove one day strictly before today: the run must stop at the gap
            if len > 2 {
                let gap = len / 2;
                let dates: Vec<_> = (0..len)
                    .filter(|&i| i != gap)
                    .map(|i| today - Duration::days(i))
                    .collect();
                let streak = DateRunCalculator::new().calculate(dates, today);
                assert_eq!(streak.current_streak as i64, gap);
            }
        }
    }
}
