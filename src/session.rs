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

use crate::backend::Backend;
use crate::backend::View;
use crate::command::BlockCommand;
use crate::error::Fallible;
use crate::error::fail;
use crate::extra::block_exists;
use crate::extra::get_or_create_extra_block;
use crate::grid::Grid;
use crate::types::block::Block;
use crate::types::block::BlockId;
use crate::types::date::Date;
use crate::types::date::DateRange;
use crate::types::event::Event;
use crate::types::records::AssignmentRecord;
use crate::types::records::HourSlot;
use crate::types::records::Period;
use crate::types::records::RosterEntry;
use crate::types::records::RosterEntryId;
use crate::types::records::SchoolYearId;
use crate::types::selection::Selection;
use crate::types::time::TimeOfDay;

/// The timetable being edited: the backend, the visible week, the roster
/// of the viewed course, and the active selection.
pub struct Timetable<B: Backend> {
    backend: B,
    school_year: SchoolYearId,
    view: View,
    grid: Grid,
    roster: Vec<RosterEntry>,
    pub(crate) selection: Option<Selection>,
    /// Bumped by every load. Snapshots from older loads are stale.
    generation: u64,
}

/// A week load that has been started but not applied.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LoadRequest {
    generation: u64,
    week_start: Date,
    view: View,
}

/// Everything fetched for one week, tagged with the load that fetched it.
#[derive(Clone, Debug)]
pub struct WeekSnapshot {
    generation: u64,
    week_start: Date,
    view: View,
    slots: Vec<HourSlot>,
    holidays: Vec<Period>,
    internships: Vec<Period>,
    assignments: Vec<AssignmentRecord>,
}

impl<B: Backend> Timetable<B> {
    pub fn new(backend: B, school_year: SchoolYearId, view: View, date: Date) -> Self {
        Self {
            backend,
            school_year,
            view,
            grid: Grid::new(date),
            roster: Vec::new(),
            selection: None,
            generation: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn school_year(&self) -> SchoolYearId {
        self.school_year
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn roster(&self) -> &[RosterEntry] {
        &self.roster
    }

    pub fn roster_entry(&self, id: RosterEntryId) -> Option<&RosterEntry> {
        self.roster.iter().find(|e| e.id == id)
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// Start loading the week containing `date`. Any load started earlier
    /// becomes stale.
    pub fn begin_load(&mut self, date: Date) -> LoadRequest {
        self.generation += 1;
        LoadRequest {
            generation: self.generation,
            week_start: date.week_start(),
            view: self.view,
        }
    }

    /// Fetch everything a week needs. Slots first, then the calendar, then
    /// the assignments: ingestion consumes them in that order.
    pub async fn fetch_week(&self, request: &LoadRequest) -> Fallible<WeekSnapshot> {
        let range = DateRange::week(request.week_start);
        log::debug!("Fetching week of {} for {}.", request.week_start, request.view);
        let slots = self.backend.hour_slots(self.school_year).await?;
        let holidays = self.backend.holidays(self.school_year, range).await?;
        let internships = match request.view.course() {
            Some(course) => {
                self.backend
                    .internships(self.school_year, course, range)
                    .await?
            }
            None => Vec::new(),
        };
        let assignments = self
            .backend
            .assignments(self.school_year, request.view, range)
            .await?;
        Ok(WeekSnapshot {
            generation: request.generation,
            week_start: request.week_start,
            view: request.view,
            slots,
            holidays,
            internships,
            assignments,
        })
    }

    /// Rebuild the grid from a snapshot. Returns `Ok(false)`, leaving the
    /// grid untouched, when a newer load has started since the snapshot was
    /// requested.
    pub fn apply_week(&mut self, snapshot: WeekSnapshot) -> Fallible<bool> {
        if snapshot.generation != self.generation {
            log::debug!(
                "Dropping stale snapshot of week {} (generation {}, current {}).",
                snapshot.week_start,
                snapshot.generation,
                self.generation
            );
            return Ok(false);
        }
        self.view = snapshot.view;
        self.selection = None;
        self.grid.delete_all_events();
        self.grid.delete_all_blocks();
        self.grid.set_week(snapshot.week_start);

        for slot in &snapshot.slots {
            self.grid.add_block(Block::canonical(slot));
        }

        let week = self.grid.week();
        for period in snapshot.holidays.iter().chain(snapshot.internships.iter()) {
            for day in week.days() {
                if period.start <= day && day <= period.end {
                    self.grid.lock_day(day.day_of_week(), &period.name);
                }
            }
        }

        for record in &snapshot.assignments {
            let block_id = match record.hour_slot {
                Some(id) if self.grid.block(&BlockId::Slot(id)).is_some() => BlockId::Slot(id),
                _ => get_or_create_extra_block(
                    &mut self.grid,
                    record.date,
                    record.hour_start,
                    record.hour_end,
                ),
            };
            self.grid.add_event(Event::from_record(record, block_id), block_id)?;
        }
        log::debug!(
            "Week of {} loaded: {} blocks, {} assignments.",
            snapshot.week_start,
            self.grid.len(),
            snapshot.assignments.len()
        );
        Ok(true)
    }

    /// Load the week containing `date`, replacing the grid.
    pub async fn load_week(&mut self, date: Date) -> Fallible<()> {
        let request = self.begin_load(date);
        let snapshot = self.fetch_week(&request).await?;
        self.apply_week(snapshot)?;
        Ok(())
    }

    pub async fn reload(&mut self) -> Fallible<()> {
        self.load_week(self.grid.week_start()).await
    }

    pub async fn next_week(&mut self) -> Fallible<()> {
        self.load_week(self.grid.week_start().plus_days(7)).await
    }

    pub async fn previous_week(&mut self) -> Fallible<()> {
        self.load_week(self.grid.week_start().minus_days(7)).await
    }

    /// Fetch the roster and its hour counters. The counters are the
    /// server's; they are never adjusted locally.
    pub async fn refresh_roster(&mut self) -> Fallible<()> {
        self.roster = match self.view.course() {
            Some(course) => self.backend.roster(self.school_year, course).await?,
            None => Vec::new(),
        };
        Ok(())
    }

    /// Load the roster and the current week.
    pub async fn open(&mut self) -> Fallible<()> {
        self.refresh_roster().await?;
        self.reload().await
    }

    /// Add an empty extra block to the visible week, for a lecture at a time
    /// no canonical slot covers.
    pub fn add_extra_block(&mut self, day: u8, start: TimeOfDay, end: TimeOfDay) -> Fallible<BlockId> {
        if day > 6 {
            return fail(format!("invalid day of week: {day}."));
        }
        if end <= start {
            return fail(format!("block ends ({end}) before it starts ({start})."));
        }
        let date = self.grid.date_of(day);
        if block_exists(&self.grid, date, start, end) {
            // Already offered or marked by the active selection, if any.
            let id = get_or_create_extra_block(&mut self.grid, date, start, end);
            log::debug!("Block {id} already covers day {day} {start}-{end}.");
            return Ok(id);
        }
        let id = get_or_create_extra_block(&mut self.grid, date, start, end);
        if let Some(selection) = self.selection {
            if let Some(block) = self.grid.block_mut(&id) {
                block.offer(BlockCommand::assign(&selection, id));
            }
        }
        Ok(id)
    }
}
