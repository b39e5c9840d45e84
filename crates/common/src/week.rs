//! ISO week/year windows for the weekly product rotation.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An ISO 8601 week within a specific week-based year.
///
/// Products are assigned to exactly one week; outside that week they are
/// excluded from purchase by calendar comparison, not by deletion. Note the
/// year here is the ISO *week-based* year, which differs from the calendar
/// year around January 1st.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Week {
    pub year: i32,
    pub week: u32,
}

impl Week {
    /// Creates a week from its components.
    pub const fn new(year: i32, week: u32) -> Self {
        Self { year, week }
    }

    /// The week containing the given date.
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// The current week in UTC.
    pub fn current() -> Self {
        Self::of(Utc::now().date_naive())
    }
}

impl std::fmt::Display for Week {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn week_of_midyear_date() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        assert_eq!(Week::of(date), Week::new(2026, 35));
    }

    #[test]
    fn iso_week_year_differs_at_calendar_boundary() {
        // 2027-01-01 is a Friday, still part of 2026's last ISO week.
        let date = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        assert_eq!(Week::of(date), Week::new(2026, 53));
    }

    #[test]
    fn consecutive_days_can_straddle_weeks() {
        let sunday = NaiveDate::from_ymd_opt(2026, 8, 23).unwrap();
        let monday = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        assert_ne!(Week::of(sunday), Week::of(monday));
    }

    #[test]
    fn display_format() {
        assert_eq!(Week::new(2026, 7).to_string(), "2026-W07");
    }
}
