//! Calendar days as used by the board (`YYYY-MM-DD`).

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DAY_FORMAT: &str = "%Y-%m-%d";

pub const WEEKDAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid day '{0}': expected YYYY-MM-DD")]
pub struct DayParseError(pub String);

/// A calendar day, serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Day(NaiveDate);

impl Day {
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Today in UTC.
    #[must_use]
    pub fn today() -> Self {
        Self(Utc::now().date_naive())
    }

    pub fn parse(raw: &str) -> Result<Self, DayParseError> {
        NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT)
            .map(Self)
            .map_err(|_| DayParseError(raw.to_string()))
    }

    #[must_use]
    pub fn date(self) -> NaiveDate {
        self.0
    }

    #[must_use]
    pub fn year(self) -> i32 {
        self.0.year()
    }

    #[must_use]
    pub fn month(self) -> u32 {
        self.0.month()
    }

    #[must_use]
    pub fn day_of_month(self) -> u32 {
        self.0.day()
    }

    /// Zero-based weekday index, Monday = 0.
    #[must_use]
    pub fn weekday_index(self) -> usize {
        self.0.weekday().num_days_from_monday() as usize
    }

    #[must_use]
    pub fn weekday_name(self) -> &'static str {
        WEEKDAY_NAMES[self.weekday_index()]
    }

    #[must_use]
    pub fn pred(self) -> Self {
        self.0.pred_opt().map_or(self, Self)
    }

    /// Monday through Sunday of the week containing `self`.
    #[must_use]
    pub fn week(self) -> [Day; 7] {
        let monday = self
            .0
            .checked_sub_days(Days::new(self.weekday_index() as u64))
            .unwrap_or(self.0);
        std::array::from_fn(|offset| {
            Self(
                monday
                    .checked_add_days(Days::new(offset as u64))
                    .unwrap_or(monday),
            )
        })
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DAY_FORMAT))
    }
}

impl FromStr for Day {
    type Err = DayParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Day {
    type Error = DayParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Day> for String {
    fn from(value: Day) -> Self {
        value.to_string()
    }
}
