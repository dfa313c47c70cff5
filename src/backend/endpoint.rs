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

use percent_encoding::AsciiSet;
use percent_encoding::CONTROLS;
use percent_encoding::utf8_percent_encode;
use reqwest::Url;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::types::date::DateRange;
use crate::types::records::AssignmentId;
use crate::types::records::CourseId;
use crate::types::records::FreeRoomQuery;
use crate::types::records::RoomId;
use crate::types::records::SchoolYearId;
use crate::types::records::TeacherId;

/// Characters escaped inside a single path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A backend route with its typed arguments.
#[derive(Clone, Debug)]
pub enum Endpoint<'a> {
    HourSlots {
        year: SchoolYearId,
    },
    Roster {
        year: SchoolYearId,
        course: CourseId,
    },
    CourseAssignments {
        year: SchoolYearId,
        course: CourseId,
        range: DateRange,
    },
    TeacherAssignments {
        year: SchoolYearId,
        teacher: TeacherId,
        range: DateRange,
    },
    RoomAssignments {
        year: SchoolYearId,
        room: RoomId,
        range: DateRange,
    },
    TeacherAbsences {
        year: SchoolYearId,
        teacher: TeacherId,
        range: DateRange,
    },
    Holidays {
        year: SchoolYearId,
        range: DateRange,
    },
    Internships {
        year: SchoolYearId,
        course: CourseId,
        range: DateRange,
    },
    FreeRooms(&'a FreeRoomQuery),
    CreateAssignment,
    DeleteAssignment {
        id: AssignmentId,
        range: DateRange,
    },
    CheckReplication {
        target: DateRange,
    },
    ReplicateWeek {
        year: SchoolYearId,
        course: CourseId,
        target: DateRange,
    },
}

impl Endpoint<'_> {
    fn segments(&self) -> Vec<String> {
        let api = |parts: Vec<String>| -> Vec<String> {
            let mut v = vec!["api".to_string()];
            v.extend(parts);
            v
        };
        let s = |part: &str| part.to_string();
        match self {
            Endpoint::HourSlots { .. } => api(vec![s("hour_slots")]),
            Endpoint::Roster { .. } => api(vec![s("hour_per_teacher_in_class")]),
            Endpoint::CourseAssignments { .. } => api(vec![s("assignments")]),
            Endpoint::CreateAssignment => api(vec![s("assignments")]),
            Endpoint::TeacherAssignments { year, teacher, .. } => api(vec![
                s("teacher_assignments"),
                teacher.to_string(),
                year.to_string(),
            ]),
            Endpoint::RoomAssignments { room, .. } => {
                api(vec![s("room_timetable"), room.to_string()])
            }
            Endpoint::TeacherAbsences { year, teacher, .. } => api(vec![
                s("teacher_absence_block"),
                teacher.to_string(),
                year.to_string(),
            ]),
            Endpoint::Holidays { .. } => api(vec![s("holidays")]),
            Endpoint::Internships { .. } => api(vec![s("stages")]),
            Endpoint::FreeRooms(_) => api(vec![s("rooms")]),
            Endpoint::DeleteAssignment { id, .. } => api(vec![s("assignments"), id.to_string()]),
            Endpoint::CheckReplication { target } => vec![
                s("check_week_replication"),
                target.start().to_string(),
                target.end().to_string(),
            ],
            Endpoint::ReplicateWeek {
                year,
                course,
                target,
            } => vec![
                s("replicate_week"),
                s("add"),
                year.to_string(),
                course.to_string(),
                target.start().to_string(),
                target.end().to_string(),
            ],
        }
    }

    /// REST-framework routes end with a slash; the replication views don't.
    fn trailing_slash(&self) -> bool {
        !matches!(
            self,
            Endpoint::CheckReplication { .. } | Endpoint::ReplicateWeek { .. }
        )
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        let range_pairs = |range: &DateRange| {
            vec![
                ("from_date", range.start().to_string()),
                ("to_date", range.end().to_string()),
            ]
        };
        match self {
            Endpoint::HourSlots { year } => vec![("school_year", year.to_string())],
            Endpoint::Roster { year, course } => vec![
                ("school_year", year.to_string()),
                ("course", course.to_string()),
            ],
            Endpoint::CourseAssignments {
                year,
                course,
                range,
            } => {
                let mut q = vec![
                    ("school_year", year.to_string()),
                    ("course", course.to_string()),
                ];
                q.extend(range_pairs(range));
                q
            }
            Endpoint::TeacherAssignments { year, range, .. }
            | Endpoint::RoomAssignments { year, range, .. }
            | Endpoint::TeacherAbsences { year, range, .. }
            | Endpoint::Holidays { year, range } => {
                let mut q = vec![("school_year", year.to_string())];
                q.extend(range_pairs(range));
                q
            }
            Endpoint::Internships {
                year,
                course,
                range,
            } => {
                let mut q = vec![
                    ("school_year", year.to_string()),
                    ("course", course.to_string()),
                ];
                q.extend(range_pairs(range));
                q
            }
            Endpoint::FreeRooms(query) => vec![
                ("school_year", query.school_year.to_string()),
                ("school", query.school.to_string()),
                ("course", query.course.to_string()),
                ("date", query.date.to_string()),
                ("hour_start", query.hour_start.to_string()),
                ("hour_end", query.hour_end.to_string()),
            ],
            Endpoint::DeleteAssignment { range, .. } => range_pairs(range),
            Endpoint::CreateAssignment
            | Endpoint::CheckReplication { .. }
            | Endpoint::ReplicateWeek { .. } => Vec::new(),
        }
    }

    /// Resolve against the backend's base URL.
    pub fn url(&self, base: &Url) -> Fallible<Url> {
        let mut path: String = self
            .segments()
            .iter()
            .map(|s| utf8_percent_encode(s, SEGMENT).to_string())
            .collect::<Vec<String>>()
            .join("/");
        if self.trailing_slash() {
            path.push('/');
        }
        let mut url = base
            .join(&path)
            .map_err(|e| ErrorReport::new(format!("invalid URL for {self}: {e}")))?;
        let query = self.query();
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

impl Display for Endpoint<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.segments().join("/"))
    }
}
