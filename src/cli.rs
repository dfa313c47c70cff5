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

use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

use crate::backend::View;
use crate::backend::http::Credentials;
use crate::backend::http::HttpBackend;
use crate::config::Config;
use crate::config::DEFAULT_CONFIG_PATH;
use crate::error::Fallible;
use crate::error::fail;
use crate::orchestrator::DeleteOutcome;
use crate::orchestrator::PlacementOutcome;
use crate::prompt::TerminalPrompt;
use crate::render::OutputFormat;
use crate::render::grid_json;
use crate::render::render_grid;
use crate::render::render_report;
use crate::render::render_roster;
use crate::replication::ReplicationOutcome;
use crate::session::Timetable;
use crate::types::block::BlockId;
use crate::types::date::Date;
use crate::types::date::DateRange;
use crate::types::records::AssignmentId;
use crate::types::records::CourseId;
use crate::types::records::RoomId;
use crate::types::records::RosterEntryId;
use crate::types::records::TeacherId;
use crate::types::selection::LectureKind;
use crate::types::selection::Selection;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the timetable of a week.
    Week {
        #[command(flatten)]
        view: ViewArgs,
        /// Any date in the week. Defaults to today.
        #[arg(long)]
        date: Option<Date>,
        /// Move this many weeks forward (or back, if negative) from the date.
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        offset: i32,
        /// Output format.
        #[arg(long, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print a course's roster with the hours still to place.
    Roster {
        #[arg(long)]
        course: CourseId,
    },
    /// Show where a roster entry's teacher can be placed.
    Available {
        #[arg(long)]
        course: CourseId,
        /// Roster entry id.
        #[arg(long)]
        entry: RosterEntryId,
        #[arg(long, default_value_t = LectureKind::Regular)]
        kind: LectureKind,
        #[arg(long)]
        date: Option<Date>,
    },
    /// Place a lecture of a roster entry in a block.
    Assign {
        #[arg(long)]
        course: CourseId,
        /// Roster entry id.
        #[arg(long)]
        entry: RosterEntryId,
        /// A slot id, or `day|HH:MM|HH:MM` for a lecture outside the slots.
        #[arg(long)]
        block: BlockId,
        #[arg(long, default_value_t = LectureKind::Regular)]
        kind: LectureKind,
        #[arg(long)]
        date: Option<Date>,
    },
    /// Delete an assignment.
    Delete {
        #[arg(long)]
        course: CourseId,
        #[arg(long)]
        assignment: AssignmentId,
        /// A date in the assignment's week. Defaults to today.
        #[arg(long)]
        date: Option<Date>,
    },
    /// Copy a week's assignments to a date range.
    Replicate {
        #[arg(long)]
        course: CourseId,
        /// A date in the week to copy. Defaults to today.
        #[arg(long)]
        date: Option<Date>,
        /// First day of the target range.
        #[arg(long)]
        from: Date,
        /// Last day of the target range.
        #[arg(long)]
        to: Date,
        /// Only report conflicts; copy nothing.
        #[arg(long)]
        check: bool,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ViewArgs {
    #[arg(long)]
    course: Option<CourseId>,
    #[arg(long)]
    teacher: Option<TeacherId>,
    #[arg(long)]
    room: Option<RoomId>,
}

impl ViewArgs {
    fn view(&self) -> Fallible<View> {
        match (self.course, self.teacher, self.room) {
            (Some(id), None, None) => Ok(View::Course(id)),
            (None, Some(id), None) => Ok(View::Teacher(id)),
            (None, None, Some(id)) => Ok(View::Room(id)),
            _ => fail("pass exactly one of --course, --teacher, --room."),
        }
    }
}

async fn open(config: &Config, view: View, date: Option<Date>) -> Fallible<Timetable<HttpBackend>> {
    let backend = HttpBackend::new(
        &config.base_url,
        Credentials::new(config.csrf_token.clone()),
        config.timeout,
    )?;
    let date = date.unwrap_or_else(Date::today);
    let mut timetable = Timetable::new(backend, config.school_year, view, date);
    timetable.open().await?;
    Ok(timetable)
}

fn selection(
    timetable: &Timetable<HttpBackend>,
    entry: RosterEntryId,
    kind: LectureKind,
) -> Fallible<Selection> {
    match timetable.roster_entry(entry) {
        Some(entry) => Ok(Selection::from_roster(entry, kind)),
        None => fail(format!("no roster entry {entry} in this course.")),
    }
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    match cli.command {
        Command::Week {
            view,
            date,
            offset,
            format,
        } => {
            let mut timetable = open(&config, view.view()?, date).await?;
            for _ in 0..offset.unsigned_abs() {
                if offset > 0 {
                    timetable.next_week().await?;
                } else {
                    timetable.previous_week().await?;
                }
            }
            match format {
                OutputFormat::Text => print!("{}", render_grid(timetable.grid())),
                OutputFormat::Json => println!("{}", grid_json(timetable.grid())?),
            }
            Ok(())
        }
        Command::Roster { course } => {
            let timetable = open(&config, View::Course(course), None).await?;
            print!("{}", render_roster(timetable.roster()));
            Ok(())
        }
        Command::Available {
            course,
            entry,
            kind,
            date,
        } => {
            let mut timetable = open(&config, View::Course(course), date).await?;
            let selection = selection(&timetable, entry, kind)?;
            timetable.select(selection).await?;
            print!("{}", render_grid(timetable.grid()));
            Ok(())
        }
        Command::Assign {
            course,
            entry,
            block,
            kind,
            date,
        } => {
            let mut timetable = open(&config, View::Course(course), date).await?;
            // Added before selecting, so the teacher's commitments mark it.
            let block = match block {
                BlockId::Extra { day, start, end } => timetable.add_extra_block(day, start, end)?,
                slot => slot,
            };
            let selection = selection(&timetable, entry, kind)?;
            timetable.select(selection).await?;
            let Some(command) = timetable.click(&block) else {
                return fail(format!("block {block} is not available for this teacher."));
            };
            let mut prompt = TerminalPrompt::stdio();
            match timetable.dispatch(command, &mut prompt).await? {
                PlacementOutcome::Created { record, stale } => {
                    println!("Created assignment #{} on {}.", record.id, record.date);
                    if stale {
                        eprintln!("weekplan: the timetable could not be reloaded; do not repeat the placement.");
                    }
                    Ok(())
                }
                PlacementOutcome::Rejected(messages) => {
                    fail(format!("the server rejected the assignment: {}", messages.join("; ")))
                }
                PlacementOutcome::Cancelled => {
                    println!("Cancelled.");
                    Ok(())
                }
            }
        }
        Command::Delete {
            course,
            assignment,
            date,
        } => {
            let mut timetable = open(&config, View::Course(course), date).await?;
            let mut prompt = TerminalPrompt::stdio();
            match timetable.delete_event(assignment, &mut prompt).await? {
                DeleteOutcome::Deleted { stale } => {
                    println!("Deleted assignment #{assignment}.");
                    if stale {
                        eprintln!("weekplan: the timetable could not be reloaded.");
                    }
                }
                DeleteOutcome::Declined => println!("Nothing deleted."),
            }
            Ok(())
        }
        Command::Replicate {
            course,
            date,
            from,
            to,
            check,
        } => {
            let target = DateRange::new(from, to)?;
            let timetable = open(&config, View::Course(course), date).await?;
            let report = timetable.check_replication(target).await?;
            print!("{}", render_report(&report));
            if report.is_clear() {
                println!("No conflicts.");
            }
            if check {
                return Ok(());
            }
            match timetable.replicate_week(target).await? {
                ReplicationOutcome::Replicated => {
                    println!(
                        "Replicated {} assignments to {from}..{to}.",
                        timetable.grid().event_ids().len()
                    );
                    Ok(())
                }
                outcome @ ReplicationOutcome::Rejected { .. } => {
                    fail(outcome.rejection_message().unwrap_or_default())
                }
            }
        }
    }
}
