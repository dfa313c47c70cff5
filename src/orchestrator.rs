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

//! Placing and deleting assignments.
//!
//! Nothing here mutates the grid optimistically. After every successful
//! write the week and the roster counters are fetched again, so the grid
//! shows what the server has. If that refresh fails the write still
//! stands: the outcome is marked stale instead of returned as an error.

use crate::backend::Backend;
use crate::backend::CreateOutcome;
use crate::command::BlockCommand;
use crate::command::CommandKind;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;
use crate::prompt::Prompt;
use crate::prompt::RoomChoice;
use crate::session::Timetable;
use crate::types::block::BlockId;
use crate::types::records::AssignmentId;
use crate::types::records::AssignmentRecord;
use crate::types::records::FreeRoomQuery;
use crate::types::records::NewAssignment;
use crate::types::selection::Selection;

#[derive(Clone, PartialEq, Debug)]
pub enum PlacementOutcome {
    /// The assignment exists on the server. `stale` is set when the grid
    /// and roster could not be fetched again afterwards.
    Created {
        record: AssignmentRecord,
        stale: bool,
    },
    /// The server refused the placement. Nothing changed.
    Rejected(Vec<String>),
    /// The user backed out of the room choice.
    Cancelled,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DeleteOutcome {
    Deleted { stale: bool },
    Declined,
}

/// Whether the view failed to catch up with a write that went through.
fn is_stale(refresh: Fallible<()>) -> bool {
    match refresh {
        Ok(()) => false,
        Err(e) => {
            log::warn!("The change was saved, but the view could not be refreshed: {e}");
            true
        }
    }
}

impl<B: Backend> Timetable<B> {
    /// The command a click on this block dispatches, if the block is
    /// clickable.
    pub fn click(&self, id: &BlockId) -> Option<BlockCommand> {
        self.grid().block(id).and_then(|b| b.command()).copied()
    }

    pub async fn dispatch(
        &mut self,
        command: BlockCommand,
        prompt: &mut impl Prompt,
    ) -> Fallible<PlacementOutcome> {
        match command.kind {
            CommandKind::Assign => self.place(command, prompt).await,
        }
    }

    async fn place(
        &mut self,
        command: BlockCommand,
        prompt: &mut impl Prompt,
    ) -> Fallible<PlacementOutcome> {
        let Some(course) = self.view().course() else {
            return fail("assignments can only be placed in course view.");
        };
        let Some(block) = self.grid().block(&command.block) else {
            return fail(format!("no block {} in this week.", command.block));
        };
        if let Some(label) = block.lock() {
            return fail(format!("{} is locked ({label}).", block.label()));
        }
        let date = self.grid().date_of(block.day());
        let (start, end) = (block.start(), block.end());

        let query = FreeRoomQuery {
            school_year: self.school_year(),
            school: command.school_id,
            course,
            date,
            hour_start: start,
            hour_end: end,
        };
        let rooms = self.backend().free_rooms(&query).await?;
        let room_id = if rooms.is_empty() {
            None
        } else {
            match prompt.choose_room(&rooms)? {
                RoomChoice::Room(id) => Some(id),
                RoomChoice::NoRoom => None,
                RoomChoice::Cancel => return Ok(PlacementOutcome::Cancelled),
            }
        };

        let new = NewAssignment {
            teacher_id: command.teacher_id,
            course_id: course,
            subject_id: command.subject_id,
            school_year: self.school_year(),
            school: command.school_id,
            date,
            hour_start: start,
            hour_end: end,
            bes: command.bes,
            co_teaching: command.co_teaching,
            substitution: false,
            absent: false,
            room_id,
        };
        match self.backend().create_assignment(&new).await? {
            CreateOutcome::Rejected(messages) => {
                log::warn!("Placement rejected: {}", messages.join("; "));
                Ok(PlacementOutcome::Rejected(messages))
            }
            CreateOutcome::Created(record) => {
                log::debug!("Created assignment {} on {date} {start}-{end}.", record.id);
                let selection = Selection {
                    id: command.selection,
                    teacher_id: command.teacher_id,
                    subject_id: command.subject_id,
                    school_id: command.school_id,
                };
                let refresh = async {
                    self.reload().await?;
                    self.refresh_roster().await?;
                    self.select(selection).await?;
                    Ok::<(), ErrorReport>(())
                }
                .await;
                Ok(PlacementOutcome::Created {
                    record,
                    stale: is_stale(refresh),
                })
            }
        }
    }

    /// Delete an assignment of the visible week after asking the user.
    pub async fn delete_event(
        &mut self,
        id: AssignmentId,
        prompt: &mut impl Prompt,
    ) -> Fallible<DeleteOutcome> {
        let Some(event) = self.grid().event(id) else {
            return fail(format!("no assignment {id} in this week."));
        };
        if !prompt.confirm_delete(event)? {
            return Ok(DeleteOutcome::Declined);
        }
        let range = self.grid().week();
        self.backend().delete_assignment(id, range).await?;
        log::debug!("Deleted assignment {id}.");
        let selection = self.selection;
        let refresh = async {
            self.refresh_roster().await?;
            self.reload().await?;
            if let Some(selection) = selection {
                self.select(selection).await?;
            }
            Ok::<(), ErrorReport>(())
        }
        .await;
        Ok(DeleteOutcome::Deleted {
            stale: is_stale(refresh),
        })
    }
}
