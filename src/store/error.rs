//! Persistence error types

use chrono::NaiveDate;
use thiserror::Error;

use crate::analytics::UserId;

/// Errors raised by an `AnalyticsStore`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A check-in already exists for this user and day
    #[error("Check-in already exists for user {user_id} on {date}")]
    DuplicateCheckin { user_id: UserId, date: NaiveDate },

    /// Invalid date or time range (start after end)
    #[error("Invalid range: start must not be after end")]
    InvalidRange,

    /// Backend unavailable or failed
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::DuplicateCheckin {
            user_id: 4,
            date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
        };
        assert_eq!(err.to_string(), "Check-in already exists for user 4 on 2024-01-05");
    }
}
