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

pub mod endpoint;
#[cfg(test)]
pub mod fake;
pub mod http;

use std::fmt::Display;
use std::fmt::Formatter;

use crate::error::Fallible;
use crate::replication::ReplicationCheckReport;
use crate::replication::ReplicationOutcome;
use crate::types::date::DateRange;
use crate::types::records::AbsenceRecord;
use crate::types::records::AssignmentId;
use crate::types::records::AssignmentRecord;
use crate::types::records::CourseId;
use crate::types::records::FreeRoomQuery;
use crate::types::records::HourSlot;
use crate::types::records::NewAssignment;
use crate::types::records::Period;
use crate::types::records::Room;
use crate::types::records::RoomId;
use crate::types::records::RosterEntry;
use crate::types::records::SchoolYearId;
use crate::types::records::TeacherId;

/// Whose timetable the grid shows.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum View {
    Course(CourseId),
    Teacher(TeacherId),
    Room(RoomId),
}

impl View {
    pub fn course(self) -> Option<CourseId> {
        match self {
            View::Course(id) => Some(id),
            _ => None,
        }
    }
}

impl Display for View {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            View::Course(id) => write!(f, "course {id}"),
            View::Teacher(id) => write!(f, "teacher {id}"),
            View::Room(id) => write!(f, "room {id}"),
        }
    }
}

/// Result of a create request.
#[derive(Clone, PartialEq, Debug)]
pub enum CreateOutcome {
    Created(AssignmentRecord),
    /// The server refused the assignment. Carries its messages.
    Rejected(Vec<String>),
}

/// The timetable REST backend. Every method is one request; none retries.
/// Transport and server failures come back as retryable errors, while
/// validation rejections are ordinary outcome values.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn hour_slots(&self, year: SchoolYearId) -> Fallible<Vec<HourSlot>>;

    async fn roster(&self, year: SchoolYearId, course: CourseId) -> Fallible<Vec<RosterEntry>>;

    async fn assignments(
        &self,
        year: SchoolYearId,
        view: View,
        range: DateRange,
    ) -> Fallible<Vec<AssignmentRecord>>;

    async fn teacher_absences(
        &self,
        year: SchoolYearId,
        teacher: TeacherId,
        range: DateRange,
    ) -> Fallible<Vec<AbsenceRecord>>;

    async fn holidays(&self, year: SchoolYearId, range: DateRange) -> Fallible<Vec<Period>>;

    async fn internships(
        &self,
        year: SchoolYearId,
        course: CourseId,
        range: DateRange,
    ) -> Fallible<Vec<Period>>;

    async fn free_rooms(&self, query: &FreeRoomQuery) -> Fallible<Vec<Room>>;

    async fn create_assignment(&self, assignment: &NewAssignment) -> Fallible<CreateOutcome>;

    async fn delete_assignment(&self, id: AssignmentId, range: DateRange) -> Fallible<()>;

    async fn check_replication(
        &self,
        ids: &[AssignmentId],
        target: DateRange,
    ) -> Fallible<ReplicationCheckReport>;

    async fn replicate_week(
        &self,
        year: SchoolYearId,
        course: CourseId,
        ids: &[AssignmentId],
        target: DateRange,
    ) -> Fallible<ReplicationOutcome>;
}
