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

//! Records exchanged with the timetable backend.

use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

use crate::types::date::Date;
use crate::types::event::LectureFlags;
use crate::types::time::TimeOfDay;

pub type SchoolYearId = u64;
pub type CourseId = u64;
pub type TeacherId = u64;
pub type RoomId = u64;
pub type SubjectId = u64;
pub type SchoolId = u64;
pub type HourSlotId = u64;
pub type AssignmentId = u64;
pub type RosterEntryId = u64;

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct TeacherRef {
    pub id: TeacherId,
    pub first_name: String,
    pub last_name: String,
}

impl TeacherRef {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SubjectRef {
    pub id: SubjectId,
    pub name: String,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CourseRef {
    pub id: CourseId,
    pub year: i64,
    pub section: String,
}

impl Display for CourseRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.year, self.section)
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    #[serde(default)]
    pub capacity: Option<u32>,
}

/// A canonical slot of the school's weekly grid.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct HourSlot {
    pub id: HourSlotId,
    pub hour_number: u32,
    pub day_of_week: u8,
    pub starts_at: TimeOfDay,
    pub ends_at: TimeOfDay,
}

/// How many hours a teacher owes a course for one subject, and how many
/// are still missing. The counters are computed by the server.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: RosterEntryId,
    pub teacher: TeacherRef,
    pub subject: SubjectRef,
    pub school: SchoolId,
    pub hours: i64,
    pub hours_bes: i64,
    #[serde(default)]
    pub hours_co_teaching: i64,
    pub missing_hours: i64,
    pub missing_hours_bes: i64,
    #[serde(default)]
    pub missing_hours_co_teaching: i64,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AssignmentRecord {
    pub id: AssignmentId,
    pub date: Date,
    /// Absent when the assignment's time matches no canonical slot.
    #[serde(default)]
    pub hour_slot: Option<HourSlotId>,
    pub hour_start: TimeOfDay,
    pub hour_end: TimeOfDay,
    pub teacher: TeacherRef,
    pub subject: SubjectRef,
    #[serde(default)]
    pub room: Option<Room>,
    #[serde(default)]
    pub course: Option<CourseRef>,
    #[serde(default)]
    pub bes: bool,
    #[serde(default)]
    pub absent: bool,
    #[serde(default)]
    pub substitution: bool,
    #[serde(default)]
    pub co_teaching: bool,
}

impl AssignmentRecord {
    pub fn flags(&self) -> LectureFlags {
        LectureFlags {
            bes: self.bes,
            co_teaching: self.co_teaching,
            absent: self.absent,
            substitution: self.substitution,
        }
    }
}

/// A time at which a teacher is not available.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct AbsenceRecord {
    #[serde(default)]
    pub hour_slot: Option<HourSlotId>,
    #[serde(default)]
    pub date: Option<Date>,
    #[serde(default)]
    pub hour_start: Option<TimeOfDay>,
    #[serde(default)]
    pub hour_end: Option<TimeOfDay>,
}

/// A holiday or an internship period.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Period {
    #[serde(alias = "date_start")]
    pub start: Date,
    #[serde(alias = "date_end")]
    pub end: Date,
    pub name: String,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct NewAssignment {
    pub teacher_id: TeacherId,
    pub course_id: CourseId,
    pub subject_id: SubjectId,
    pub school_year: SchoolYearId,
    pub school: SchoolId,
    pub date: Date,
    pub hour_start: TimeOfDay,
    pub hour_end: TimeOfDay,
    pub bes: bool,
    pub co_teaching: bool,
    pub substitution: bool,
    pub absent: bool,
    pub room_id: Option<RoomId>,
}

/// Parameters of a free-room lookup.
#[derive(Clone, PartialEq, Debug)]
pub struct FreeRoomQuery {
    pub school_year: SchoolYearId,
    pub school: SchoolId,
    pub course: CourseId,
    pub date: Date,
    pub hour_start: TimeOfDay,
    pub hour_end: TimeOfDay,
}
