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

//! Copying the visible week's assignments to a target date range.
//!
//! Replication is batched and all-or-nothing: the check and the execution
//! each send the whole id set in one request, and the server either copies
//! every assignment or rejects the batch with the conflicting dates.

use std::fmt::Display;
use std::fmt::Formatter;

use serde::Deserialize;
use serde::Serialize;

use crate::backend::Backend;
use crate::error::Fallible;
use crate::error::fail;
use crate::session::Timetable;
use crate::types::date::Date;
use crate::types::date::DateRange;
use crate::types::records::AssignmentId;
use crate::types::records::AssignmentRecord;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Dimension {
    Teacher,
    Course,
    Room,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Teacher, Dimension::Course, Dimension::Room];
}

impl Display for Dimension {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Teacher => write!(f, "teacher"),
            Dimension::Course => write!(f, "course"),
            Dimension::Room => write!(f, "room"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Badge {
    Success,
    Danger,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DimensionSummary {
    pub dimension: Dimension,
    pub count: usize,
    pub badge: Badge,
}

/// What replicating the week would collide with, per resource.
#[derive(Clone, PartialEq, Default, Debug, Serialize, Deserialize)]
pub struct ReplicationCheckReport {
    #[serde(default)]
    pub teacher_conflicts: Vec<AssignmentRecord>,
    #[serde(default)]
    pub course_conflicts: Vec<AssignmentRecord>,
    #[serde(default)]
    pub room_conflicts: Vec<AssignmentRecord>,
}

impl ReplicationCheckReport {
    pub fn conflicts(&self, dimension: Dimension) -> &[AssignmentRecord] {
        match dimension {
            Dimension::Teacher => &self.teacher_conflicts,
            Dimension::Course => &self.course_conflicts,
            Dimension::Room => &self.room_conflicts,
        }
    }

    pub fn summaries(&self) -> Vec<DimensionSummary> {
        Dimension::ALL
            .iter()
            .map(|&dimension| {
                let count = self.conflicts(dimension).len();
                let badge = if count == 0 {
                    Badge::Success
                } else {
                    Badge::Danger
                };
                DimensionSummary {
                    dimension,
                    count,
                    badge,
                }
            })
            .collect()
    }

    pub fn total(&self) -> usize {
        Dimension::ALL
            .iter()
            .map(|&d| self.conflicts(d).len())
            .sum()
    }

    pub fn is_clear(&self) -> bool {
        self.total() == 0
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum ReplicationOutcome {
    Replicated,
    /// The server refused the batch. Nothing was copied.
    Rejected { dates: Vec<Date> },
}

impl ReplicationOutcome {
    /// The conflicting dates as one message, or `None` on success.
    pub fn rejection_message(&self) -> Option<String> {
        match self {
            ReplicationOutcome::Replicated => None,
            ReplicationOutcome::Rejected { dates } => {
                let dates: Vec<String> = dates.iter().map(|d| d.to_string()).collect();
                Some(format!("Conflicts on: {}", dates.join(", ")))
            }
        }
    }
}

impl<B: Backend> Timetable<B> {
    fn replicable_ids(&self) -> Fallible<Vec<AssignmentId>> {
        let ids = self.grid().event_ids();
        if ids.is_empty() {
            return fail("there are no assignments to replicate in this week.");
        }
        Ok(ids)
    }

    /// Ask the server what copying the visible week to `target` would
    /// collide with. Read-only; may be called any number of times.
    pub async fn check_replication(&self, target: DateRange) -> Fallible<ReplicationCheckReport> {
        let ids = self.replicable_ids()?;
        log::debug!(
            "Checking replication of {} assignments to {}..{}.",
            ids.len(),
            target.start(),
            target.end()
        );
        self.backend().check_replication(&ids, target).await
    }

    pub async fn replicate_week(&self, target: DateRange) -> Fallible<ReplicationOutcome> {
        let Some(course) = self.view().course() else {
            return fail("weeks can only be replicated in course view.");
        };
        let ids = self.replicable_ids()?;
        log::debug!(
            "Replicating {} assignments to {}..{}.",
            ids.len(),
            target.start(),
            target.end()
        );
        let outcome = self
            .backend()
            .replicate_week(self.school_year(), course, &ids, target)
            .await?;
        if let Some(message) = outcome.rejection_message() {
            log::warn!("Replication rejected. {message}");
        }
        Ok(outcome)
    }
}
