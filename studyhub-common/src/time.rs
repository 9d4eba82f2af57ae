//! Timestamp utilities

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current calendar date in UTC
///
/// Session listings compare against this date ("upcoming" means `date >= today()`).
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Truncate a wall time to whole seconds
///
/// Session slots are compared for exact equality, so sub-second noise from
/// clients must not split one slot into two.
pub fn truncate_to_seconds(time: NaiveTime) -> NaiveTime {
    time.with_nanosecond(0).unwrap_or(time)
}
