//! Week and month period arithmetic
//!
//! Weeks are numbered from the first Monday on or after January 1. Days that
//! fall before that Monday belong to week 01 of their own year, so week
//! numbers never carry over a year boundary the way ISO-8601 weeks do. Report
//! periods and stored weekly plans are keyed by these identifiers, so the
//! numbering has to stay exactly as it is.

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{PdcaError, Result};

/// Highest week number a year can produce (late December of some years,
/// see `WeekId::new`)
pub const MAX_WEEK: u32 = 53;

/// Week after which `WeekId::next` wraps into the following year
const WRAP_AFTER_WEEK: u32 = 52;

/// Inclusive calendar date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Timestamp bounds covering every instant of the range: midnight of the
    /// first day up to 23:59:59 of the last day.
    pub fn timestamp_bounds(&self) -> (NaiveDateTime, NaiveDateTime) {
        let start = self.start.and_time(NaiveTime::MIN);
        let end = (self.end + Days::new(1)).and_time(NaiveTime::MIN) - TimeDelta::seconds(1);
        (start, end)
    }

    /// Smallest range containing both `self` and `other`
    pub fn union(&self, other: &DateRange) -> DateRange {
        DateRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// `YYYY-WW` week identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WeekId {
    year: i32,
    week: u32,
    first_monday: NaiveDate,
}

fn first_monday_after(jan1: NaiveDate) -> NaiveDate {
    let offset = (7 - jan1.weekday().num_days_from_monday()) % 7;
    jan1 + Days::new(u64::from(offset))
}

fn parse_component(
    value: &str,
    raw: &str,
    name: &str,
    digits: std::ops::RangeInclusive<usize>,
) -> Result<u32> {
    if !digits.contains(&value.len()) || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PdcaError::invalid_period(
            raw,
            format!("{name} must be {}-{} digits", digits.start(), digits.end()),
        ));
    }
    value
        .parse()
        .map_err(|_| PdcaError::invalid_period(raw, format!("{name} is not a number")))
}

fn split_period(raw: &str) -> Result<(&str, &str)> {
    raw.trim()
        .split_once('-')
        .ok_or_else(|| PdcaError::invalid_period(raw, "expected YYYY-NN"))
}

impl WeekId {
    pub fn new(year: i32, week: u32) -> Result<Self> {
        if !(1..=9999).contains(&year) {
            return Err(PdcaError::invalid_period(
                format!("{year}-{week:02}"),
                "year out of range",
            ));
        }
        if !(1..=MAX_WEEK).contains(&week) {
            return Err(PdcaError::invalid_period(
                format!("{year}-{week:02}"),
                format!("week must be between 1 and {MAX_WEEK}"),
            ));
        }
        let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| PdcaError::invalid_period(format!("{year}-{week:02}"), "no such year"))?;
        let id = Self {
            year,
            week,
            first_monday: first_monday_after(jan1),
        };
        // Week 53 only exists when its Monday is still in the same year
        if id.range().start.year() != year {
            return Err(PdcaError::invalid_period(
                format!("{year}-{week:02}"),
                format!("{year} has no week {week}"),
            ));
        }
        Ok(id)
    }

    /// Week a calendar date falls in
    pub fn of(date: NaiveDate) -> Self {
        let jan1 = date - Days::new(u64::from(date.ordinal0()));
        let first_monday = first_monday_after(jan1);

        let week = if date < first_monday {
            1
        } else {
            let days_since = (date - first_monday).num_days();
            (days_since / 7) as u32 + 1
        };

        Self {
            year: date.year(),
            week,
            first_monday,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn week(&self) -> u32 {
        self.week
    }

    /// Monday to Sunday of this week
    pub fn range(&self) -> DateRange {
        let start = self.first_monday + Days::new(u64::from(self.week - 1) * 7);
        DateRange {
            start,
            end: start + Days::new(6),
        }
    }

    /// Following week. Anything past week 52 wraps to week 01 of the next
    /// year, including years that have a week 53.
    pub fn next(&self) -> Self {
        if self.week + 1 > WRAP_AFTER_WEEK {
            Self {
                year: self.year + 1,
                week: 1,
                first_monday: first_monday_after(self.jan1() + Months::new(12)),
            }
        } else {
            Self {
                week: self.week + 1,
                ..*self
            }
        }
    }

    /// Month a weekly report is filed under: the month of January 1 plus
    /// `(week - 1) * 7` days, which is not always the month of the Monday.
    pub fn month(&self) -> MonthId {
        MonthId::of(self.jan1() + Days::new(u64::from(self.week - 1) * 7))
    }

    fn jan1(&self) -> NaiveDate {
        self.first_monday - Days::new(u64::from(self.first_monday.ordinal0()))
    }
}

impl fmt::Display for WeekId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.week)
    }
}

impl FromStr for WeekId {
    type Err = PdcaError;

    fn from_str(s: &str) -> Result<Self> {
        let (year, week) = split_period(s)?;
        let year = parse_component(year, s, "year", 4..=4)?;
        let week = parse_component(week, s, "week", 1..=2)?;
        Self::new(year as i32, week).map_err(|e| match e {
            PdcaError::InvalidPeriod { reason, .. } => PdcaError::invalid_period(s, reason),
            other => other,
        })
    }
}

/// `YYYY-MM` month identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthId {
    first_day: NaiveDate,
}

impl MonthId {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=9999).contains(&year) {
            return Err(PdcaError::invalid_period(
                format!("{year}-{month:02}"),
                "year out of range",
            ));
        }
        let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            PdcaError::invalid_period(
                format!("{year}-{month:02}"),
                "month must be between 1 and 12",
            )
        })?;
        Ok(Self { first_day })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            first_day: date - Days::new(u64::from(date.day0())),
        }
    }

    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    /// First to last calendar day of the month
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.first_day,
            end: self.first_day + Months::new(1) - Days::new(1),
        }
    }
}

impl fmt::Display for MonthId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for MonthId {
    type Err = PdcaError;

    fn from_str(s: &str) -> Result<Self> {
        let (year, month) = split_period(s)?;
        let year = parse_component(year, s, "year", 4..=4)?;
        let month = parse_component(month, s, "month", 1..=2)?;
        Self::new(year as i32, month).map_err(|e| match e {
            PdcaError::InvalidPeriod { reason, .. } => PdcaError::invalid_period(s, reason),
            other => other,
        })
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(WeekId);
string_serde!(MonthId);
