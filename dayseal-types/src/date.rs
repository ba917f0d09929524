//! Calendar date key for daily records.

use crate::error::{TypesError, TypesResult};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A calendar date in the strict `YYYY-MM-DD` form.
///
/// Parsing rejects anything that is not exactly ten characters with
/// zero-padded fields, so the string form always sorts chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordDate(NaiveDate);

impl RecordDate {
    /// Parses a strict `YYYY-MM-DD` string.
    pub fn parse(s: &str) -> TypesResult<Self> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !well_formed {
            return Err(TypesError::InvalidDate(s.to_string()));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Self)
            .map_err(|_| TypesError::InvalidDate(s.to_string()))
    }

    /// Builds a date from its components.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> TypesResult<Self> {
        if !(0..=9999).contains(&year) {
            return Err(TypesError::InvalidDate(format!("{year}-{month}-{day}")));
        }
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| TypesError::InvalidDate(format!("{year:04}-{month:02}-{day:02}")))
    }

    /// Wraps a chrono date. Years outside `0..=9999` are rejected because
    /// they would not fit the fixed-width key.
    pub fn from_naive(date: NaiveDate) -> TypesResult<Self> {
        Self::from_ymd(date.year(), date.month(), date.day())
    }

    pub fn naive(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }
}

impl fmt::Display for RecordDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year(), self.month(), self.day())
    }
}

impl FromStr for RecordDate {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for RecordDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RecordDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// First and last day of a calendar month, inclusive.
pub fn month_range(year: i32, month: u32) -> TypesResult<(RecordDate, RecordDate)> {
    let invalid = || TypesError::InvalidMonth { year, month };
    let first = RecordDate::from_ymd(year, month, 1).map_err(|_| invalid())?;
    let last = first
        .0
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(invalid)?;
    Ok((first, RecordDate(last)))
}
