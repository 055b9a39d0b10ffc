//! Calendar dates as they appear in structure file headers.
//!
//! Two textual forms are understood:
//! - ISO `YYYY-MM-DD` (mmCIF, MMTF)
//! - `DD-MON-YY` (PDB `HEADER`), whose two-digit year is resolved against a
//!   reference year: `yy >= reference % 100 + 1` lands in the 1900s, anything
//!   lower in the 2000s.

use std::fmt;

use chrono::{Datelike, Utc};

const DAYS_PER_MONTH: [u8; 13] = [0, 31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

const MONTHS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// A validated proleptic Gregorian calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Date {
    year: i32,
    month: u8,
    day: u8,
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

impl Date {
    /// Create a date, returning `None` for impossible combinations such as
    /// February 30th.
    pub fn from_ymd_opt(year: i32, month: u8, day: u8) -> Option<Self> {
        if !(1..=12).contains(&month) || day == 0 {
            return None;
        }
        let max_day = if month == 2 && is_leap_year(year) {
            29
        } else {
            DAYS_PER_MONTH[month as usize]
        };
        if day > max_day {
            return None;
        }
        Some(Date { year, month, day })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month in `1..=12`.
    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    /// Parse an ISO `YYYY-MM-DD` date.
    pub fn parse_iso(s: &str) -> Option<Self> {
        let mut parts = s.trim().splitn(3, '-');
        let year = parts.next()?.parse().ok()?;
        let month = parts.next()?.parse().ok()?;
        let day = parts.next()?.parse().ok()?;
        Date::from_ymd_opt(year, month, day)
    }

    /// Parse a PDB `DD-MON-YY` date, e.g. `06-MAY-02`.
    pub fn parse_pdb(s: &str, reference_year: i32) -> Option<Self> {
        let mut parts = s.trim().splitn(3, '-');
        let day = parts.next()?.trim().parse().ok()?;
        let month_name = parts.next()?.trim().to_ascii_uppercase();
        let month = MONTHS.iter().position(|m| *m == month_name)? as u8 + 1;
        let yy = parts.next()?.trim();
        if yy.len() != 2 {
            return None;
        }
        let yy: i32 = yy.parse().ok()?;
        Date::from_ymd_opt(expand_two_digit_year(yy, reference_year), month, day)
    }
}

/// Resolve a two-digit year against the reference year.
pub fn expand_two_digit_year(yy: i32, reference_year: i32) -> i32 {
    if yy > reference_year.rem_euclid(100) {
        1900 + yy
    } else {
        2000 + yy
    }
}

/// The current UTC year according to the system clock.
pub fn current_year() -> i32 {
    Utc::now().year()
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Date {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_dates() {
        let date = Date::parse_iso("2002-05-06").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2002, 5, 6));
        assert_eq!(date.to_string(), "2002-05-06");
        assert!(Date::parse_iso("2002-02-30").is_none());
        assert!(Date::parse_iso("2000-02-29").is_some());
        assert!(Date::parse_iso("1900-02-29").is_none());
        assert!(Date::parse_iso("?").is_none());
    }

    #[test]
    fn pdb_dates_use_pivot() {
        assert_eq!(
            Date::parse_pdb("06-MAY-02", 2026),
            Date::from_ymd_opt(2002, 5, 6)
        );
        assert_eq!(
            Date::parse_pdb("15-may-17", 2026),
            Date::from_ymd_opt(2017, 5, 15)
        );
        assert_eq!(
            Date::parse_pdb("01-JAN-98", 2026),
            Date::from_ymd_opt(1998, 1, 1)
        );
        // Exactly one past the reference two-digit year is the previous century
        assert_eq!(Date::parse_pdb("01-JAN-27", 2026).unwrap().year(), 1927);
        assert_eq!(Date::parse_pdb("01-JAN-26", 2026).unwrap().year(), 2026);
    }

    #[test]
    fn pdb_dates_reject_garbage() {
        assert!(Date::parse_pdb("", 2026).is_none());
        assert!(Date::parse_pdb("06-FOO-02", 2026).is_none());
        assert!(Date::parse_pdb("31-APR-02", 2026).is_none());
        assert!(Date::parse_pdb("06-MAY-2002", 2026).is_none());
    }

    #[test]
    fn current_year_follows_clock() {
        let today = Utc::now().date_naive().to_string();
        let date = Date::parse_iso(&today).unwrap();
        assert_eq!(current_year(), date.year());
        assert!(date.year() >= 2024);
    }
}
