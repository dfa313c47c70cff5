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

//! An in-memory backend for tests. It records every request it receives.

use std::cell::Ref;
use std::cell::RefCell;
use std::collections::HashSet;

use crate::backend::Backend;
use crate::backend::CreateOutcome;
use crate::backend::View;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::replication::ReplicationCheckReport;
use crate::replication::ReplicationOutcome;
use crate::types::date::Date;
use crate::types::date::DateRange;
use crate::types::records::AbsenceRecord;
use crate::types::records::AssignmentId;
use crate::types::records::AssignmentRecord;
use crate::types::records::CourseId;
use crate::types::records::CourseRef;
use crate::types::records::FreeRoomQuery;
use crate::types::records::HourSlot;
use crate::types::records::NewAssignment;
use crate::types::records::Period;
use crate::types::records::Room;
use crate::types::records::RosterEntry;
use crate::types::records::SchoolYearId;
use crate::types::records::SubjectRef;
use crate::types::records::TeacherId;
use crate::types::records::TeacherRef;
use crate::types::time::TimeOfDay;

#[derive(Default)]
pub struct FakeState {
    pub slots: Vec<HourSlot>,
    pub roster: Vec<RosterEntry>,
    pub assignments: Vec<AssignmentRecord>,
    pub absences: Vec<(TeacherId, AbsenceRecord)>,
    pub holidays: Vec<Period>,
    pub internships: Vec<Period>,
    pub rooms: Vec<Room>,
    pub next_id: AssignmentId,
    /// Operations that answer with a server error.
    pub failing: HashSet<&'static str>,
    /// Every request, in order, as `"operation args"`.
    pub requests: Vec<String>,
    /// When set, the next create is rejected with these messages.
    pub rejection: Option<Vec<String>>,
    pub check_report: ReplicationCheckReport,
    pub replicate_outcome: Option<ReplicationOutcome>,
}

#[derive(Default)]
pub struct FakeBackend {
    state: RefCell<FakeState>,
}

impl FakeBackend {
    pub fn new(state: FakeState) -> Self {
        Self {
            state: RefCell::new(state),
        }
    }

    pub fn state(&self) -> Ref<'_, FakeState> {
        self.state.borrow()
    }

    pub fn with(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.borrow_mut());
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.borrow().requests.clone()
    }

    /// Requests whose operation name is `op`.
    pub fn count(&self, op: &str) -> usize {
        self.state
            .borrow()
            .requests
            .iter()
            .filter(|r| r.split(' ').next() == Some(op))
            .count()
    }

    fn record(&self, op: &'static str, args: String) -> Fallible<()> {
        let mut state = self.state.borrow_mut();
        state.requests.push(format!("{op} {args}").trim_end().to_string());
        if state.failing.contains(&op) {
            return Err(ErrorReport::transport(format!("{op} answered 500.")));
        }
        Ok(())
    }
}

fn in_range(date: Date, range: DateRange) -> bool {
    range.start() <= date && date <= range.end()
}

fn overlaps(period: &Period, range: DateRange) -> bool {
    period.start <= range.end() && range.start() <= period.end
}

impl Backend for FakeBackend {
    async fn hour_slots(&self, year: SchoolYearId) -> Fallible<Vec<HourSlot>> {
        self.record("hour_slots", format!("{year}"))?;
        Ok(self.state.borrow().slots.clone())
    }

    async fn roster(&self, year: SchoolYearId, course: CourseId) -> Fallible<Vec<RosterEntry>> {
        self.record("roster", format!("{year} {course}"))?;
        Ok(self.state.borrow().roster.clone())
    }

    async fn assignments(
        &self,
        year: SchoolYearId,
        view: View,
        range: DateRange,
    ) -> Fallible<Vec<AssignmentRecord>> {
        self.record("assignments", format!("{year} {view} {}", range.start()))?;
        let state = self.state.borrow();
        let records = state
            .assignments
            .iter()
            .filter(|a| in_range(a.date, range))
            .filter(|a| match view {
                View::Course(id) => a.course.as_ref().map(|c| c.id) == Some(id),
                // An absent teacher is not busy.
                View::Teacher(id) => a.teacher.id == id && !a.absent,
                View::Room(id) => a.room.as_ref().map(|r| r.id) == Some(id),
            })
            .cloned()
            .collect();
        Ok(records)
    }

    async fn teacher_absences(
        &self,
        year: SchoolYearId,
        teacher: TeacherId,
        range: DateRange,
    ) -> Fallible<Vec<AbsenceRecord>> {
        self.record("teacher_absences", format!("{year} {teacher} {}", range.start()))?;
        let state = self.state.borrow();
        Ok(state
            .absences
            .iter()
            .filter(|(id, _)| *id == teacher)
            .map(|(_, absence)| absence.clone())
            .collect())
    }

    async fn holidays(&self, year: SchoolYearId, range: DateRange) -> Fallible<Vec<Period>> {
        self.record("holidays", format!("{year} {}", range.start()))?;
        let state = self.state.borrow();
        Ok(state
            .holidays
            .iter()
            .filter(|p| overlaps(p, range))
            .cloned()
            .collect())
    }

    async fn internships(
        &self,
        year: SchoolYearId,
        course: CourseId,
        range: DateRange,
    ) -> Fallible<Vec<Period>> {
        self.record("internships", format!("{year} {course} {}", range.start()))?;
        let state = self.state.borrow();
        Ok(state
            .internships
            .iter()
            .filter(|p| overlaps(p, range))
            .cloned()
            .collect())
    }

    async fn free_rooms(&self, query: &FreeRoomQuery) -> Fallible<Vec<Room>> {
        self.record(
            "free_rooms",
            format!("{} {}-{}", query.date, query.hour_start, query.hour_end),
        )?;
        let state = self.state.borrow();
        let busy: Vec<u64> = state
            .assignments
            .iter()
            .filter(|a| a.date == query.date && a.hour_start == query.hour_start)
            .filter_map(|a| a.room.as_ref().map(|r| r.id))
            .collect();
        Ok(state
            .rooms
            .iter()
            .filter(|r| !busy.contains(&r.id))
            .cloned()
            .collect())
    }

    async fn create_assignment(&self, new: &NewAssignment) -> Fallible<CreateOutcome> {
        self.record(
            "create",
            format!("{} {} {}-{}", new.teacher_id, new.date, new.hour_start, new.hour_end),
        )?;
        let mut state = self.state.borrow_mut();
        if let Some(messages) = state.rejection.take() {
            return Ok(CreateOutcome::Rejected(messages));
        }
        state.next_id += 1;
        let id = state.next_id;
        let record = fake_record(&state, id, new);
        if let Some(entry) = state
            .roster
            .iter_mut()
            .find(|e| e.teacher.id == new.teacher_id && e.subject.id == new.subject_id)
        {
            if new.bes {
                entry.missing_hours_bes -= 1;
            } else if new.co_teaching {
                entry.missing_hours_co_teaching -= 1;
            } else {
                entry.missing_hours -= 1;
            }
        }
        state.assignments.push(record.clone());
        Ok(CreateOutcome::Created(record))
    }

    async fn delete_assignment(&self, id: AssignmentId, range: DateRange) -> Fallible<()> {
        self.record("delete", format!("{id} {}", range.start()))?;
        let mut state = self.state.borrow_mut();
        let before = state.assignments.len();
        state.assignments.retain(|a| a.id != id);
        if state.assignments.len() == before {
            return Err(ErrorReport::transport(format!("assignment {id} answered 404.")));
        }
        Ok(())
    }

    async fn check_replication(
        &self,
        ids: &[AssignmentId],
        target: DateRange,
    ) -> Fallible<ReplicationCheckReport> {
        self.record("check_replication", format!("{ids:?} {}", target.start()))?;
        Ok(self.state.borrow().check_report.clone())
    }

    async fn replicate_week(
        &self,
        year: SchoolYearId,
        course: CourseId,
        ids: &[AssignmentId],
        target: DateRange,
    ) -> Fallible<ReplicationOutcome> {
        self.record(
            "replicate_week",
            format!("{year} {course} {ids:?} {}", target.start()),
        )?;
        let state = self.state.borrow();
        Ok(state
            .replicate_outcome
            .clone()
            .unwrap_or(ReplicationOutcome::Replicated))
    }
}

fn fake_record(state: &FakeState, id: AssignmentId, new: &NewAssignment) -> AssignmentRecord {
    let entry = state
        .roster
        .iter()
        .find(|e| e.teacher.id == new.teacher_id && e.subject.id == new.subject_id);
    let teacher = match entry {
        Some(entry) => entry.teacher.clone(),
        None => TeacherRef {
            id: new.teacher_id,
            first_name: "Teacher".to_string(),
            last_name: new.teacher_id.to_string(),
        },
    };
    let subject = match entry {
        Some(entry) => entry.subject.clone(),
        None => SubjectRef {
            id: new.subject_id,
            name: "Subject".to_string(),
        },
    };
    let hour_slot = state
        .slots
        .iter()
        .find(|s| {
            s.day_of_week == new.date.day_of_week()
                && s.starts_at == new.hour_start
                && s.ends_at == new.hour_end
        })
        .map(|s| s.id);
    AssignmentRecord {
        id,
        date: new.date,
        hour_slot,
        hour_start: new.hour_start,
        hour_end: new.hour_end,
        teacher,
        subject,
        room: new
            .room_id
            .and_then(|room| state.rooms.iter().find(|r| r.id == room).cloned()),
        course: Some(CourseRef {
            id: new.course_id,
            year: 1,
            section: "A".to_string(),
        }),
        bes: new.bes,
        absent: new.absent,
        substitution: new.substitution,
        co_teaching: new.co_teaching,
    }
}

/// Fixture builders shared by the state machine tests.
pub mod fixtures {
    use super::*;

    pub fn t(s: &str) -> TimeOfDay {
        match s.parse() {
            Ok(t) => t,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn teacher(id: TeacherId) -> TeacherRef {
        TeacherRef {
            id,
            first_name: "Teacher".to_string(),
            last_name: id.to_string(),
        }
    }

    pub fn slot(id: u64, day: u8, start: &str, end: &str) -> HourSlot {
        HourSlot {
            id,
            hour_number: (id % 8) as u32 + 1,
            day_of_week: day,
            starts_at: t(start),
            ends_at: t(end),
        }
    }

    /// Two slots a day, Monday through Friday: ids `10 * day + 1` and
    /// `10 * day + 2`.
    pub fn week_of_slots() -> Vec<HourSlot> {
        (0..5u8)
            .flat_map(|day| {
                let base = u64::from(day) * 10;
                vec![
                    slot(base + 1, day, "08:00", "09:00"),
                    slot(base + 2, day, "09:00", "10:00"),
                ]
            })
            .collect()
    }

    pub fn roster_entry(id: u64, teacher_id: TeacherId, subject_id: u64) -> RosterEntry {
        RosterEntry {
            id,
            teacher: teacher(teacher_id),
            subject: SubjectRef {
                id: subject_id,
                name: format!("Subject {subject_id}"),
            },
            school: 1,
            hours: 99,
            hours_bes: 10,
            hours_co_teaching: 5,
            missing_hours: 99,
            missing_hours_bes: 10,
            missing_hours_co_teaching: 5,
        }
    }

    pub fn assignment(
        id: AssignmentId,
        teacher_id: TeacherId,
        course: CourseId,
        date: Date,
        slot: Option<u64>,
        start: &str,
        end: &str,
    ) -> AssignmentRecord {
        AssignmentRecord {
            id,
            date,
            hour_slot: slot,
            hour_start: t(start),
            hour_end: t(end),
            teacher: teacher(teacher_id),
            subject: SubjectRef {
                id: 7,
                name: "Maths".to_string(),
            },
            room: None,
            course: Some(CourseRef {
                id: course,
                year: 1,
                section: "A".to_string(),
            }),
            bes: false,
            absent: false,
            substitution: false,
            co_teaching: false,
        }
    }

    pub fn room(id: u64, name: &str) -> Room {
        Room {
            id,
            name: name.to_string(),
            capacity: Some(25),
        }
    }
}
