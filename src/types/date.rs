// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt::Display;
use std::fmt::Formatter;
use std::str::FromStr;

use chrono::Datelike;
use chrono::Days;
use chrono::Local;
use chrono::NaiveDate;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;

const FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Date(NaiveDate);

impl Date {
    #[cfg(test)]
    pub fn ymd(year: i32, month: u32, day: u32) -> Self {
        match NaiveDate::from_ymd_opt(year, month, day) {
            Some(date) => Self(date),
            None => panic!("invalid test date {year}-{month}-{day}"),
        }
    }

    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// Day of the week, Monday = 0 through Sunday = 6.
    pub fn day_of_week(self) -> u8 {
        self.0.weekday().num_days_from_monday() as u8
    }

    /// The Monday on or before this date.
    pub fn week_start(self) -> Self {
        self.minus_days(u64::from(self.day_of_week()))
    }

    pub fn plus_days(self, days: u64) -> Self {
        Self(self.0.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX))
    }

    pub fn minus_days(self, days: u64) -> Self {
        Self(self.0.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN))
    }
}

impl FromStr for Date {
    type Err = ErrorReport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(s.trim(), FORMAT)?;
        Ok(Self(date))
    }
}

impl Display for Date {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(FORMAT))
    }
}

impl Serialize for Date {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An inclusive range of dates.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Fallible<Self> {
        if end < start {
            return fail(format!("date range ends ({end}) before it starts ({start})."));
        }
        Ok(Self { start, end })
    }

    /// The seven days starting at `week_start`.
    pub fn week(week_start: Date) -> Self {
        Self {
            start: week_start,
            end: week_start.plus_days(6),
        }
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }

    pub fn days(&self) -> impl Iterator<Item = Date> + '_ {
        self.start
            .0
            .iter_days()
            .take_while(|day| *day <= self.end.0)
            .map(Date)
    }
}
