use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// Calendar year + month scoping one import batch. Rendered as `YYYY-MM`
/// on the wire; persisted documents store the split integers instead so
/// the compound (workspace, year, month) indexes stay usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid month format: {0} (expected YYYY-MM)")]
pub struct ParsePeriodError(String);

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self, ParsePeriodError> {
        if (1..=12).contains(&month) {
            Ok(Self { year, month })
        } else {
            Err(ParsePeriodError(format!("{}-{}", year, month)))
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// True when the date falls inside this calendar month.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let error = || ParsePeriodError(s.to_string());

        let (year, month) = s.split_once('-').ok_or_else(error)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(error());
        }
        let year: i32 = year.parse().map_err(|_| error())?;
        let month: u32 = month.parse().map_err(|_| error())?;

        Period::new(year, month).map_err(|_| error())
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_month() {
        let period: Period = "2026-01".parse().unwrap();
        assert_eq!(period.year(), 2026);
        assert_eq!(period.month(), 1);
        assert_eq!(period.to_string(), "2026-01");
    }

    #[test]
    fn rejects_malformed_input() {
        for raw in ["2026-13", "2026-00", "2026-1", "26-01", "2026/01", "2026-01-10", "garbage", ""] {
            assert!(raw.parse::<Period>().is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn contains_checks_year_and_month() {
        let period = Period::new(2026, 1).unwrap();
        assert!(period.contains(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()));
    }

    #[test]
    fn serde_round_trips_as_string() {
        let period = Period::new(2026, 7).unwrap();
        let json = serde_json::to_string(&period).unwrap();
        assert_eq!(json, "\"2026-07\"");
        let back: Period = serde_json::from_str(&json).unwrap();
        assert_eq!(back, period);
    }
}
