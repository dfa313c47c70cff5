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

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::error::Fallible;
use crate::error::fail;
use crate::types::block::Block;
use crate::types::block::BlockId;
use crate::types::date::Date;
use crate::types::date::DateRange;
use crate::types::event::Event;
use crate::types::records::AssignmentId;

/// The blocks and events of the visible week. Pure in-memory state: the
/// grid never talks to the backend, it is rebuilt from a snapshot on every
/// navigation.
#[derive(Clone, Debug)]
pub struct Grid {
    /// Always a Monday.
    week_start: Date,
    blocks: HashMap<BlockId, Block>,
    locked_days: BTreeMap<u8, String>,
}

impl Grid {
    pub fn new(date: Date) -> Self {
        Self {
            week_start: date.week_start(),
            blocks: HashMap::new(),
            locked_days: BTreeMap::new(),
        }
    }

    pub fn week_start(&self) -> Date {
        self.week_start
    }

    pub fn week(&self) -> DateRange {
        DateRange::week(self.week_start)
    }

    /// Move the grid to the week containing `date`. Day locks belong to a
    /// week, so they are dropped.
    pub fn set_week(&mut self, date: Date) {
        self.week_start = date.week_start();
        self.locked_days.clear();
    }

    /// The date of the given day of the visible week.
    pub fn date_of(&self, day: u8) -> Date {
        self.week_start.plus_days(u64::from(day))
    }

    /// Insert a block. Returns false, leaving the grid untouched, if a block
    /// with the same id exists. A block added to a locked day is locked.
    pub fn add_block(&mut self, mut block: Block) -> bool {
        if self.blocks.contains_key(&block.id()) {
            return false;
        }
        if let Some(label) = self.locked_days.get(&block.day()) {
            block.set_lock(label.clone());
        }
        self.blocks.insert(block.id(), block);
        true
    }

    pub fn block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.get(id)
    }

    pub fn block_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.blocks.get_mut(id)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.blocks.values_mut()
    }

    /// Blocks ordered by day, then start and end time.
    pub fn sorted_blocks(&self) -> Vec<&Block> {
        let mut blocks: Vec<&Block> = self.blocks.values().collect();
        blocks.sort_by_key(|b| (b.day(), b.start(), b.end(), b.id()));
        blocks
    }

    pub fn blocks_on(&self, day: u8) -> Vec<&Block> {
        self.sorted_blocks()
            .into_iter()
            .filter(|b| b.day() == day)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn delete_all_blocks(&mut self) {
        self.blocks.clear();
    }

    /// Attach an event to an existing block. Returns `Ok(false)` when the
    /// block already hosts an event with the same id.
    pub fn add_event(&mut self, mut event: Event, block_id: BlockId) -> Fallible<bool> {
        let Some(block) = self.blocks.get_mut(&block_id) else {
            return fail(format!("no block {block_id} in this week."));
        };
        if let Some(id) = event.id {
            if block.has_event(id) {
                log::debug!("Ignoring duplicate event {id} in block {block_id}.");
                return Ok(false);
            }
        }
        event.block = block_id;
        block.push_event(event);
        Ok(true)
    }

    pub fn delete_all_events(&mut self) {
        for block in self.blocks.values_mut() {
            block.clear_events();
        }
    }

    pub fn event(&self, id: AssignmentId) -> Option<&Event> {
        self.blocks
            .values()
            .flat_map(|block| block.events())
            .find(|e| e.id == Some(id))
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.blocks.values().flat_map(|block| block.events())
    }

    /// Ids of every event on the grid, sorted.
    pub fn event_ids(&self) -> Vec<AssignmentId> {
        let mut ids: Vec<AssignmentId> = self.events().filter_map(|e| e.id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Lock every block on `day`, whatever its state.
    pub fn lock_day(&mut self, day: u8, label: &str) {
        self.locked_days.insert(day, label.to_string());
        for block in self.blocks.values_mut().filter(|b| b.day() == day) {
            block.set_lock(label);
        }
    }

    pub fn locked_days(&self) -> &BTreeMap<u8, String> {
        &self.locked_days
    }

    /// Return every block to the neutral state. Events and locks stay.
    pub fn reset_all_block_states(&mut self) {
        for block in self.blocks.values_mut() {
            block.reset_state();
        }
    }
}
