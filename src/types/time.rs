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

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;

/// A wall-clock time with minute precision. The backend sends times as
/// `HH:MM:SS`; we only keep hours and minutes, so `08:00` and `08:00:00`
/// are the same time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Fallible<Self> {
        if hour > 23 || minute > 59 {
            return fail(format!("invalid time of day: {hour}:{minute}"));
        }
        Ok(Self { hour, minute })
    }
}

impl FromStr for TimeOfDay {
    type Err = ErrorReport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(':');
        let hour = parts.next().and_then(|p| p.parse::<u8>().ok());
        let minute = parts.next().and_then(|p| p.parse::<u8>().ok());
        // Seconds are allowed but ignored.
        let seconds_ok = match parts.next() {
            None => true,
            Some(sec) => sec.parse::<u8>().is_ok_and(|sec| sec < 60),
        };
        match (hour, minute, seconds_ok, parts.next()) {
            (Some(hour), Some(minute), true, None) => TimeOfDay::new(hour, minute),
            _ => fail(format!("invalid time of day: {s:?}")),
        }
    }
}

impl Display for TimeOfDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
