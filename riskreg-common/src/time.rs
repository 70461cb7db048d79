//! Timestamp utilities
//!
//! Register dates are local wall-clock values. Anything that depends on
//! "today" (risk ID year scoping, created dates, update log timestamps)
//! reads time through a [`Clock`] so tests can pin it.

use chrono::{Datelike, Local, NaiveDateTime};

/// Date format used in register date columns
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Timestamp format used in the Update Log
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of the current local time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// Current calendar year
    fn year(&self) -> i32 {
        self.now().year()
    }

    /// Today formatted as `YYYY-MM-DD`
    fn today(&self) -> String {
        self.now().format(DATE_FORMAT).to_string()
    }

    /// Now formatted as `YYYY-MM-DD HH:MM:SS`
    fn timestamp(&self) -> String {
        self.now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Wall clock in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock pinned to a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Pin the clock to midday on the given date
    ///
    /// Returns `None` for an invalid calendar date.
    pub fn on_date(year: i32, month: u32, day: u32) -> Option<Self> {
        chrono::NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Convert milliseconds to duration
pub fn millis_to_duration(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_system_clock_returns_recent_year() {
        let year = SystemClock.year();
        assert!(year >= 2024 && year < 2100);
    }

    #[test]
    fn test_fixed_clock_formats() {
        let clock = FixedClock::on_date(2025, 3, 7).unwrap();
        assert_eq!(clock.year(), 2025);
        assert_eq!(clock.today(), "2025-03-07");
        assert_eq!(clock.timestamp(), "2025-03-07 12:00:00");
    }

    #[test]
    fn test_fixed_clock_rejects_invalid_date() {
        assert!(FixedClock::on_date(2025, 2, 30).is_none());
    }

    #[test]
    fn test_millis_to_duration_one_second() {
        let duration = millis_to_duration(1000);
        assert_eq!(duration, Duration::from_secs(1));
    }
}
