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

//! Selecting a roster entry marks where its teacher can be placed.

use crate::backend::Backend;
use crate::backend::View;
use crate::command::BlockCommand;
use crate::error::Fallible;
use crate::extra;
use crate::grid::Grid;
use crate::session::Timetable;
use crate::types::block::BlockId;
use crate::types::block::BlockState;
use crate::types::date::Date;
use crate::types::records::AbsenceRecord;
use crate::types::records::AssignmentRecord;
use crate::types::records::HourSlotId;
use crate::types::selection::Selection;
use crate::types::time::TimeOfDay;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SelectionChange {
    Selected,
    /// The entry was already active; selecting it again turned it off.
    Deselected,
}

impl<B: Backend> Timetable<B> {
    /// Select a roster entry. Both queries for the teacher's commitments
    /// and absences in the visible week complete first; then those blocks
    /// are marked and every other unlocked block becomes available.
    ///
    /// If a query fails nothing is offered: the selection is cleared and
    /// the error is returned, so selecting again retries.
    pub async fn select(&mut self, selection: Selection) -> Fallible<SelectionChange> {
        if self.selection.map(|s| s.id) == Some(selection.id) {
            self.deselect();
            return Ok(SelectionChange::Deselected);
        }
        log::debug!(
            "Selecting {} lecture of roster entry {}.",
            selection.id.kind,
            selection.id.roster_entry
        );
        self.selection = Some(selection);
        self.grid_mut().reset_all_block_states();

        let year = self.school_year();
        let range = self.grid().week();
        let backend = self.backend();
        let (commitments, absences) = tokio::join!(
            backend.assignments(year, View::Teacher(selection.teacher_id), range),
            backend.teacher_absences(year, selection.teacher_id, range),
        );
        let (commitments, absences) = match (commitments, absences) {
            (Ok(commitments), Ok(absences)) => (commitments, absences),
            (Err(e), _) | (_, Err(e)) => {
                self.deselect();
                return Err(e);
            }
        };

        let grid = self.grid_mut();
        apply_conflicts(grid, &commitments);
        apply_absences(grid, &absences);
        for block in grid.blocks_mut() {
            let id = block.id();
            block.offer(BlockCommand::assign(&selection, id));
        }
        Ok(SelectionChange::Selected)
    }

    /// Clear the selection. Every block goes back to neutral.
    pub fn deselect(&mut self) {
        log::debug!("Clearing selection.");
        self.selection = None;
        self.grid_mut().reset_all_block_states();
    }
}

/// The block a commitment refers to: its canonical slot if the grid has
/// it, otherwise an existing block with the same day and times. Never
/// creates a block.
fn resolve(
    grid: &Grid,
    slot: Option<HourSlotId>,
    date: Option<Date>,
    start: Option<TimeOfDay>,
    end: Option<TimeOfDay>,
) -> Option<BlockId> {
    if let Some(id) = slot {
        let id = BlockId::Slot(id);
        if grid.block(&id).is_some() {
            return Some(id);
        }
    }
    match (date, start, end) {
        (Some(date), Some(start), Some(end)) => extra::find_block(grid, date, start, end),
        _ => None,
    }
}

fn mark(grid: &mut Grid, id: Option<BlockId>, state: BlockState) {
    match id.and_then(|id| grid.block_mut(&id)) {
        Some(block) => block.mark(state),
        None => log::debug!("Dropping {state:?} mark for a block not in this week."),
    }
}

/// Mark the blocks where the teacher already teaches.
pub fn apply_conflicts(grid: &mut Grid, commitments: &[AssignmentRecord]) {
    for record in commitments {
        let id = resolve(
            grid,
            record.hour_slot,
            Some(record.date),
            Some(record.hour_start),
            Some(record.hour_end),
        );
        mark(grid, id, BlockState::Conflict);
    }
}

/// Mark the blocks where the teacher is absent. Absence outranks conflict,
/// so the order in which the two are applied does not matter.
pub fn apply_absences(grid: &mut Grid, absences: &[AbsenceRecord]) {
    for absence in absences {
        let id = resolve(
            grid,
            absence.hour_slot,
            absence.date,
            absence.hour_start,
            absence.hour_end,
        );
        mark(grid, id, BlockState::Absence);
    }
}
