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
use crate::types::records::SchoolId;
use crate::types::records::SubjectId;
use crate::types::records::TeacherId;
use crate::types::selection::Selection;
use crate::types::selection::SelectionId;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CommandKind {
    /// Create an assignment for the selection in the block.
    Assign,
}

/// What clicking a block does. Commands are plain values: the block holds
/// one, and `Timetable::dispatch` interprets it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BlockCommand {
    pub kind: CommandKind,
    pub selection: SelectionId,
    pub teacher_id: TeacherId,
    pub subject_id: SubjectId,
    pub school_id: SchoolId,
    pub block: BlockId,
    pub bes: bool,
    pub co_teaching: bool,
}

impl BlockCommand {
    pub fn assign(selection: &Selection, block: BlockId) -> Self {
        Self {
            kind: CommandKind::Assign,
            selection: selection.id,
            teacher_id: selection.teacher_id,
            subject_id: selection.subject_id,
            school_id: selection.school_id,
            block,
            bes: selection.bes(),
            co_teaching: selection.co_teaching(),
        }
    }
}
