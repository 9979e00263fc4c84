//! Calendar granularity of a climate series.

use std::fmt;

use chrono::{Datelike, Months, NaiveDate};

/// Spacing between consecutive steps of a [`ClimateSeries`](crate::ClimateSeries).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One step per calendar day.
    Daily,
    /// One step per calendar month, stamped on the first of the month.
    Monthly,
    /// One step per calendar year, stamped on January 1st.
    Yearly,
}

impl Granularity {
    /// Return the lowercase name used in logs and artifacts.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Return true if `date` is a valid step timestamp at this granularity.
    #[must_use]
    pub fn is_aligned(self, date: NaiveDate) -> bool {
        match self {
            Self::Daily => true,
            Self::Monthly => date.day() == 1,
            Self::Yearly => date.day() == 1 && date.month() == 1,
        }
    }

    /// Return the timestamp of the step after `date`, or `None` past the end
    /// of the supported calendar.
    #[must_use]
    pub fn next(self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Daily => date.succ_opt(),
            Self::Monthly => date.checked_add_months(Months::new(1)),
            Self::Yearly => date.checked_add_months(Months::new(12)),
        }
    }

    /// Format `date` as a step label (`2024-03-15`, `2024-03` or `2024`).
    #[must_use]
    pub fn label(self, date: NaiveDate) -> String {
        match self {
            Self::Daily => date.format("%Y-%m-%d").to_string(),
            Self::Monthly => date.format("%Y-%m").to_string(),
            Self::Yearly => date.format("%Y").to_string(),
        }
    }

    /// Hours covered by one step. Months use the 730-hour convention.
    #[must_use]
    pub fn hours_per_step(self) -> f64 {
        match self {
            Self::Daily => 24.0,
            Self::Monthly => 730.0,
            Self::Yearly => 8760.0,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a raw timestamp cell: `YYYY-MM-DD`, `YYYY-MM` (first of month) or
/// `YYYY` (January 1st). Surrounding whitespace is ignored.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if raw.len() == 7 && raw.as_bytes()[4] == b'-' {
        return NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d").ok();
    }
    if !raw.is_empty() && raw.len() <= 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
        let year: i32 = raw.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_all_three_forms() {
        assert_eq!(parse_timestamp("2023-07-14"), Some(date(2023, 7, 14)));
        assert_eq!(parse_timestamp("2023-07"), Some(date(2023, 7, 1)));
        assert_eq!(parse_timestamp(" 1901 "), Some(date(1901, 1, 1)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_timestamp("July 2023"), None);
        assert_eq!(parse_timestamp("2023-13"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn monthly_successor_rolls_over_year() {
        assert_eq!(Granularity::Monthly.next(date(2023, 12, 1)), Some(date(2024, 1, 1)));
    }

    #[test]
    fn daily_successor_handles_leap_day() {
        assert_eq!(Granularity::Daily.next(date(2024, 2, 28)), Some(date(2024, 2, 29)));
        assert_eq!(Granularity::Daily.next(date(2023, 2, 28)), Some(date(2023, 3, 1)));
    }

    #[test]
    fn alignment() {
        assert!(Granularity::Monthly.is_aligned(date(2020, 5, 1)));
        assert!(!Granularity::Monthly.is_aligned(date(2020, 5, 2)));
        assert!(!Granularity::Yearly.is_aligned(date(2020, 5, 1)));
        assert!(Granularity::Daily.is_aligned(date(2020, 5, 17)));
    }

    #[test]
    fn labels() {
        let d = date(2024, 3, 15);
        assert_eq!(Granularity::Daily.label(d), "2024-03-15");
        assert_eq!(Granularity::Monthly.label(d), "2024-03");
        assert_eq!(Granularity::Yearly.label(d), "2024");
    }
}
