use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A calendar year-month. Ordering is chronological; equality is by (year, month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month {
    year: i32,
    month: u32,
}

/// Why a month token was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonthParseError {
    /// Not exactly six ASCII digits.
    Shape,
    /// Six digits, but the month part is outside 1..=12 or the year is zero.
    OutOfRange,
}

impl fmt::Display for MonthParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape => write!(f, "expected 6 digits (YYYYMM)"),
            Self::OutOfRange => write!(f, "month must be within 01..12"),
        }
    }
}

impl std::error::Error for MonthParseError {}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if !(1..=9999).contains(&year) {
            return None;
        }
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// Strict `YYYYMM` parse. No trimming, no separators, no short forms.
    pub fn parse(token: &str) -> Result<Self, MonthParseError> {
        if token.len() != 6 || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MonthParseError::Shape);
        }
        let year: i32 = token[..4].parse().map_err(|_| MonthParseError::Shape)?;
        let month: u32 = token[4..].parse().map_err(|_| MonthParseError::Shape)?;
        Self::new(year, month).ok_or(MonthParseError::OutOfRange)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The calendar month immediately after this one.
    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// The month containing `date`.
    pub fn from_date(date: NaiveDate) -> Self {
        Self { year: date.year(), month: date.month() }
    }

    /// Canonical token, e.g. `202301`.
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    /// Localized form used in exported sheets, e.g. `2023年01月`.
    pub fn localized(&self) -> String {
        format!("{:04}年{:02}月", self.year, self.month)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        Self::parse(&token).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_token() {
        let m = Month::parse("202301").unwrap();
        assert_eq!(m.year(), 2023);
        assert_eq!(m.month(), 1);
        assert_eq!(m.canonical(), "202301");
        assert_eq!(m.localized(), "2023年01月");
    }

    #[test]
    fn parse_rejects_month_13_and_00() {
        assert_eq!(Month::parse("202313"), Err(MonthParseError::OutOfRange));
        assert_eq!(Month::parse("202300"), Err(MonthParseError::OutOfRange));
    }

    #[test]
    fn parse_is_strict_about_shape() {
        for bad in ["2023-01", "20231", "2023011", " 202301", "2023O1", "", "２０２３０１"] {
            assert_eq!(Month::parse(bad), Err(MonthParseError::Shape), "{bad:?}");
        }
    }

    #[test]
    fn ordering_is_chronological() {
        let a = Month::parse("202212").unwrap();
        let b = Month::parse("202301").unwrap();
        assert!(a < b);
        assert_eq!(a.succ(), b);
        assert_eq!(Month::parse("202305").unwrap().succ().canonical(), "202306");
    }

    #[test]
    fn serializes_as_token() {
        let m = Month::parse("201910").unwrap();
        assert_eq!(serde_json::to_string(&m).unwrap(), "\"201910\"");
        let back: Month = serde_json::from_str("\"201910\"").unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn from_date_keeps_year_and_month() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Month::from_date(date), Month::parse("202402").unwrap());
    }
}
