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

//! Extra blocks: blocks for assignments whose times match no canonical
//! slot. Their identity depends only on the day of week and the times, so
//! ingesting the same assignment twice, or in any order, yields one block.

use crate::grid::Grid;
use crate::types::block::Block;
use crate::types::block::BlockId;
use crate::types::date::Date;
use crate::types::time::TimeOfDay;

pub const EXTRA_BLOCK_LABEL: &str = "Extra lecture";

/// Find the block for a day and time range: the extra block with that
/// identity, or failing that a canonical block with identical times.
pub fn find_block(grid: &Grid, date: Date, start: TimeOfDay, end: TimeOfDay) -> Option<BlockId> {
    let day = date.day_of_week();
    let extra = BlockId::Extra { day, start, end };
    if grid.block(&extra).is_some() {
        return Some(extra);
    }
    grid.blocks()
        .find(|b| !b.is_deletable() && b.day() == day && b.start() == start && b.end() == end)
        .map(|b| b.id())
}

/// Read-only check: never creates a block.
pub fn block_exists(grid: &Grid, date: Date, start: TimeOfDay, end: TimeOfDay) -> bool {
    find_block(grid, date, start, end).is_some()
}

/// Return the id of the existing block for this day and time range, or
/// insert a new deletable extra block and return its id. Existing blocks
/// are never modified.
pub fn get_or_create_extra_block(
    grid: &mut Grid,
    date: Date,
    start: TimeOfDay,
    end: TimeOfDay,
) -> BlockId {
    if let Some(id) = find_block(grid, date, start, end) {
        return id;
    }
    let block = Block::extra(date.day_of_week(), start, end, EXTRA_BLOCK_LABEL);
    let id = block.id();
    log::debug!("Synthesizing extra block {id}.");
    grid.add_block(block);
    id
}
