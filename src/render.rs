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

//! Plain-text and JSON views of the grid, the roster, and replication
//! reports.

use std::fmt::Display;
use std::fmt::Formatter;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::Fallible;
use crate::grid::Grid;
use crate::replication::Badge;
use crate::replication::ReplicationCheckReport;
use crate::types::block::Block;
use crate::types::block::DisplayState;
use crate::types::event::Event;
use crate::types::records::AssignmentRecord;
use crate::types::records::RosterEntry;

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

#[derive(ValueEnum, Clone, Copy, PartialEq, Eq, Debug)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// JSON output.
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

fn state_marker(block: &Block) -> String {
    match block.display_state() {
        DisplayState::Neutral => String::new(),
        DisplayState::Available => "[available]".to_string(),
        DisplayState::Conflict => "[busy]".to_string(),
        DisplayState::Absence => "[absent]".to_string(),
        DisplayState::Locked(label) => format!("[locked: {label}]"),
    }
}

fn event_line(event: &Event) -> String {
    let mut line = match event.id {
        Some(id) => format!("#{id} {} ({})", event.subject, event.teacher),
        None => format!("{} ({})", event.subject, event.teacher),
    };
    if let Some(course) = &event.course {
        line.push_str(&format!(" class {course}"));
    }
    if let Some(room) = &event.room {
        line.push_str(&format!(" room {room}"));
    }
    let tag = event.flags.display_kind().tag();
    if !tag.is_empty() {
        line.push_str(&format!(" [{tag}]"));
    }
    line
}

/// One section per day that has blocks, blocks in time order.
pub fn render_grid(grid: &Grid) -> String {
    let mut out = String::new();
    let week = grid.week();
    out.push_str(&format!("Week of {} to {}\n", week.start(), week.end()));
    if grid.is_empty() {
        out.push_str("No lecture slots.\n");
        return out;
    }
    for day in 0..7u8 {
        let blocks = grid.blocks_on(day);
        if blocks.is_empty() {
            continue;
        }
        out.push('\n');
        out.push_str(&format!("{} {}", DAY_NAMES[usize::from(day)], grid.date_of(day)));
        if let Some(label) = grid.locked_days().get(&day) {
            out.push_str(&format!(" ({label})"));
        }
        out.push('\n');
        for block in blocks {
            out.push_str(&format!(
                "  {}-{}  {:<14} {:<16} id={}\n",
                block.start(),
                block.end(),
                block.label(),
                state_marker(block),
                block.id()
            ));
            for event in block.events() {
                out.push_str(&format!("      {}\n", event_line(event)));
            }
        }
    }
    out
}

pub fn render_roster(roster: &[RosterEntry]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>6}  {:<24} {:<20} {:>9} {:>9} {:>9}\n",
        "entry", "teacher", "subject", "missing", "bes", "co"
    ));
    for entry in roster {
        out.push_str(&format!(
            "{:>6}  {:<24} {:<20} {:>9} {:>9} {:>9}\n",
            entry.id,
            entry.teacher.full_name(),
            entry.subject.name,
            format!("{}/{}", entry.missing_hours, entry.hours),
            format!("{}/{}", entry.missing_hours_bes, entry.hours_bes),
            format!(
                "{}/{}",
                entry.missing_hours_co_teaching, entry.hours_co_teaching
            ),
        ));
    }
    out
}

fn conflict_line(record: &AssignmentRecord) -> String {
    let mut line = format!(
        "{} {}-{} {} ({})",
        record.date,
        record.hour_start,
        record.hour_end,
        record.subject.name,
        record.teacher.full_name()
    );
    if let Some(course) = &record.course {
        line.push_str(&format!(" class {course}"));
    }
    if let Some(room) = &record.room {
        line.push_str(&format!(" room {}", room.name));
    }
    line
}

/// A badge per dimension, followed by the conflicts behind it.
pub fn render_report(report: &ReplicationCheckReport) -> String {
    let mut out = String::new();
    for summary in report.summaries() {
        let badge = match summary.badge {
            Badge::Success => "ok",
            Badge::Danger => "CONFLICT",
        };
        out.push_str(&format!(
            "{:<8} {:>3}  {badge}\n",
            summary.dimension.to_string(),
            summary.count
        ));
        for record in report.conflicts(summary.dimension) {
            out.push_str(&format!("    {}\n", conflict_line(record)));
        }
    }
    out
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WeekJson {
    week_start: String,
    week_end: String,
    locked_days: Vec<LockedDayJson>,
    blocks: Vec<BlockJson>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LockedDayJson {
    day_of_week: u8,
    label: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BlockJson {
    id: String,
    label: String,
    day_of_week: u8,
    start_time: String,
    end_time: String,
    deletable: bool,
    state: String,
    events: Vec<EventJson>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventJson {
    id: Option<u64>,
    teacher: String,
    subject: String,
    course: Option<String>,
    room: Option<String>,
    kind: &'static str,
}

fn state_name(block: &Block) -> String {
    match block.display_state() {
        DisplayState::Neutral => "neutral".to_string(),
        DisplayState::Available => "available".to_string(),
        DisplayState::Conflict => "conflict".to_string(),
        DisplayState::Absence => "absence".to_string(),
        DisplayState::Locked(_) => "locked".to_string(),
    }
}

pub fn grid_json(grid: &Grid) -> Fallible<String> {
    let week = grid.week();
    let json = WeekJson {
        week_start: week.start().to_string(),
        week_end: week.end().to_string(),
        locked_days: grid
            .locked_days()
            .iter()
            .map(|(&day_of_week, label)| LockedDayJson {
                day_of_week,
                label: label.clone(),
            })
            .collect(),
        blocks: grid
            .sorted_blocks()
            .into_iter()
            .map(|block| BlockJson {
                id: block.id().to_string(),
                label: block.label().to_string(),
                day_of_week: block.day(),
                start_time: block.start().to_string(),
                end_time: block.end().to_string(),
                deletable: block.is_deletable(),
                state: state_name(block),
                events: block
                    .events()
                    .iter()
                    .map(|event| EventJson {
                        id: event.id,
                        teacher: event.teacher.clone(),
                        subject: event.subject.clone(),
                        course: event.course.clone(),
                        room: event.room.clone(),
                        kind: event.flags.display_kind().tag(),
                    })
                    .collect(),
            })
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&json)?)
}
