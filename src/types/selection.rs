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

use clap::ValueEnum;

use crate::types::records::RosterEntry;
use crate::types::records::RosterEntryId;
use crate::types::records::SchoolId;
use crate::types::records::SubjectId;
use crate::types::records::TeacherId;

/// Which kind of lecture a selection places.
#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum LectureKind {
    /// An ordinary lecture.
    Regular,
    /// A special-needs support lecture.
    Bes,
    /// A second teacher in the same slot.
    CoTeaching,
}

impl Display for LectureKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LectureKind::Regular => write!(f, "regular"),
            LectureKind::Bes => write!(f, "bes"),
            LectureKind::CoTeaching => write!(f, "co-teaching"),
        }
    }
}

/// Identifies one "assign" button of the roster. Two selections are the
/// same button exactly when their ids are equal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct SelectionId {
    pub roster_entry: RosterEntryId,
    pub kind: LectureKind,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Selection {
    pub id: SelectionId,
    pub teacher_id: TeacherId,
    pub subject_id: SubjectId,
    pub school_id: SchoolId,
}

impl Selection {
    pub fn from_roster(entry: &RosterEntry, kind: LectureKind) -> Self {
        Self {
            id: SelectionId {
                roster_entry: entry.id,
                kind,
            },
            teacher_id: entry.teacher.id,
            subject_id: entry.subject.id,
            school_id: entry.school,
        }
    }

    pub fn bes(&self) -> bool {
        self.id.kind == LectureKind::Bes
    }

    pub fn co_teaching(&self) -> bool {
        self.id.kind == LectureKind::CoTeaching
    }
}
