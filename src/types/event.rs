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

use crate::types::block::BlockId;
use crate::types::records::AssignmentId;
use crate::types::records::AssignmentRecord;

/// Flags stored on an assignment. They are not mutually exclusive in
/// storage, but only one of them is ever displayed.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct LectureFlags {
    pub bes: bool,
    pub co_teaching: bool,
    pub absent: bool,
    pub substitution: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DisplayKind {
    Regular,
    Bes,
    CoTeaching,
    Absent,
    Substitution,
}

impl LectureFlags {
    /// The first set flag in display precedence order.
    pub fn display_kind(self) -> DisplayKind {
        if self.bes {
            DisplayKind::Bes
        } else if self.co_teaching {
            DisplayKind::CoTeaching
        } else if self.absent {
            DisplayKind::Absent
        } else if self.substitution {
            DisplayKind::Substitution
        } else {
            DisplayKind::Regular
        }
    }
}

impl DisplayKind {
    pub fn tag(self) -> &'static str {
        match self {
            DisplayKind::Regular => "",
            DisplayKind::Bes => "BES",
            DisplayKind::CoTeaching => "CO",
            DisplayKind::Absent => "ABSENT",
            DisplayKind::Substitution => "SUB",
        }
    }
}

/// An assignment placed on the grid.
#[derive(Clone, PartialEq, Debug)]
pub struct Event {
    /// `None` for instances the server has not created yet.
    pub id: Option<AssignmentId>,
    pub teacher: String,
    pub subject: String,
    pub course: Option<String>,
    pub room: Option<String>,
    pub flags: LectureFlags,
    /// The block hosting this event. The grid owns blocks; events only
    /// refer to them by id.
    pub block: BlockId,
}

impl Event {
    pub fn from_record(record: &AssignmentRecord, block: BlockId) -> Self {
        Self {
            id: Some(record.id),
            teacher: record.teacher.full_name(),
            subject: record.subject.name.clone(),
            course: record.course.as_ref().map(|c| c.to_string()),
            room: record.room.as_ref().map(|r| r.name.clone()),
            flags: record.flags(),
            block,
        }
    }
}
