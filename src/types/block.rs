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
use std::str::FromStr;

use crate::command::BlockCommand;
use crate::error::ErrorReport;
use crate::error::fail;
use crate::types::event::Event;
use crate::types::records::HourSlot;
use crate::types::records::HourSlotId;
use crate::types::time::TimeOfDay;

/// Identity of a block. Canonical blocks are keyed by the server's hour
/// slot id; extra blocks by their day and times, so synthesizing the same
/// extra block twice always yields the same id.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum BlockId {
    Slot(HourSlotId),
    Extra {
        day: u8,
        start: TimeOfDay,
        end: TimeOfDay,
    },
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockId::Slot(id) => write!(f, "{id}"),
            BlockId::Extra { day, start, end } => write!(f, "{day}|{start}|{end}"),
        }
    }
}

impl FromStr for BlockId {
    type Err = ErrorReport;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('|').collect();
        match parts.as_slice() {
            [id] => match id.parse::<HourSlotId>() {
                Ok(id) => Ok(BlockId::Slot(id)),
                Err(_) => fail(format!("invalid block id: {s:?}")),
            },
            [day, start, end] => {
                let day = match day.parse::<u8>() {
                    Ok(day) if day < 7 => day,
                    _ => return fail(format!("invalid block id: {s:?}")),
                };
                Ok(BlockId::Extra {
                    day,
                    start: start.parse()?,
                    end: end.parse()?,
                })
            }
            _ => fail(format!("invalid block id: {s:?}")),
        }
    }
}

/// The availability state of a block while a teacher is selected.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockState {
    Neutral,
    Available,
    Conflict,
    Absence,
}

impl BlockState {
    /// Higher ranks win when two sources mark the same block.
    pub fn rank(self) -> u8 {
        match self {
            BlockState::Neutral => 0,
            BlockState::Available => 1,
            BlockState::Conflict => 2,
            BlockState::Absence => 3,
        }
    }
}

/// What a block looks like. A calendar lock overrides everything else.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DisplayState<'a> {
    Neutral,
    Available,
    Conflict,
    Absence,
    Locked(&'a str),
}

#[derive(Clone, Debug)]
pub struct Block {
    id: BlockId,
    label: String,
    day: u8,
    start: TimeOfDay,
    end: TimeOfDay,
    deletable: bool,
    state: BlockState,
    events: Vec<Event>,
    lock: Option<String>,
    command: Option<BlockCommand>,
}

impl Block {
    pub fn canonical(slot: &HourSlot) -> Self {
        Self::new(
            BlockId::Slot(slot.id),
            format!("Lecture {}", slot.hour_number),
            slot.day_of_week,
            slot.starts_at,
            slot.ends_at,
            false,
        )
    }

    pub fn extra(day: u8, start: TimeOfDay, end: TimeOfDay, label: impl Into<String>) -> Self {
        Self::new(
            BlockId::Extra { day, start, end },
            label.into(),
            day,
            start,
            end,
            true,
        )
    }

    fn new(
        id: BlockId,
        label: String,
        day: u8,
        start: TimeOfDay,
        end: TimeOfDay,
        deletable: bool,
    ) -> Self {
        Self {
            id,
            label,
            day,
            start,
            end,
            deletable,
            state: BlockState::Neutral,
            events: Vec::new(),
            lock: None,
            command: None,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    pub fn is_deletable(&self) -> bool {
        self.deletable
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn lock(&self) -> Option<&str> {
        self.lock.as_deref()
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    pub fn command(&self) -> Option<&BlockCommand> {
        self.command.as_ref()
    }

    pub fn display_state(&self) -> DisplayState<'_> {
        match (&self.lock, self.state) {
            (Some(label), _) => DisplayState::Locked(label),
            (None, BlockState::Neutral) => DisplayState::Neutral,
            (None, BlockState::Available) => DisplayState::Available,
            (None, BlockState::Conflict) => DisplayState::Conflict,
            (None, BlockState::Absence) => DisplayState::Absence,
        }
    }

    /// Make the block available and attach the command a click dispatches.
    /// Locked blocks and blocks already marked by a query stay as they are.
    pub fn offer(&mut self, command: BlockCommand) -> bool {
        if self.is_locked() || self.state.rank() > BlockState::Available.rank() {
            return false;
        }
        self.state = BlockState::Available;
        self.command = Some(command);
        true
    }

    /// Raise the block to `state` unless it already holds a stronger one.
    /// A marked block cannot be clicked.
    pub fn mark(&mut self, state: BlockState) {
        if state.rank() >= self.state.rank() {
            self.state = state;
        }
        if self.state != BlockState::Available {
            self.command = None;
        }
    }

    pub fn reset_state(&mut self) {
        self.state = BlockState::Neutral;
        self.command = None;
    }

    pub fn set_lock(&mut self, label: impl Into<String>) {
        self.lock = Some(label.into());
        self.command = None;
    }

    pub fn has_event(&self, id: u64) -> bool {
        self.events.iter().any(|e| e.id == Some(id))
    }

    pub(crate) fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    pub(crate) fn clear_events(&mut self) {
        self.events.clear();
    }
}
