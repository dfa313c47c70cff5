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

use std::io::BufRead;
use std::io::BufReader;
use std::io::Stdin;
use std::io::Stdout;
use std::io::Write;

use crate::error::Fallible;
use crate::types::event::Event;
use crate::types::records::Room;
use crate::types::records::RoomId;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RoomChoice {
    Room(RoomId),
    NoRoom,
    Cancel,
}

/// The questions a placement or a deletion asks the user.
pub trait Prompt {
    fn choose_room(&mut self, rooms: &[Room]) -> Fallible<RoomChoice>;

    fn confirm_delete(&mut self, event: &Event) -> Fallible<bool>;
}

/// Asks on a line-oriented terminal.
pub struct TerminalPrompt<R: BufRead, W: Write> {
    input: R,
    output: W,
}

impl TerminalPrompt<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Read one trimmed line. `None` at end of input.
    fn read_line(&mut self) -> Fallible<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead, W: Write> Prompt for TerminalPrompt<R, W> {
    fn choose_room(&mut self, rooms: &[Room]) -> Fallible<RoomChoice> {
        writeln!(self.output, "Free rooms:")?;
        for (i, room) in rooms.iter().enumerate() {
            match room.capacity {
                Some(capacity) => {
                    writeln!(self.output, "  {}. {} ({capacity} seats)", i + 1, room.name)?
                }
                None => writeln!(self.output, "  {}. {}", i + 1, room.name)?,
            }
        }
        writeln!(self.output, "  0. No room")?;
        loop {
            write!(self.output, "Room [0-{}, empty to cancel]: ", rooms.len())?;
            self.output.flush()?;
            let Some(line) = self.read_line()? else {
                return Ok(RoomChoice::Cancel);
            };
            if line.is_empty() {
                return Ok(RoomChoice::Cancel);
            }
            match line.parse::<usize>() {
                Ok(0) => return Ok(RoomChoice::NoRoom),
                Ok(n) if n <= rooms.len() => return Ok(RoomChoice::Room(rooms[n - 1].id)),
                _ => writeln!(self.output, "Invalid input. Enter a number from the list.")?,
            }
        }
    }

    fn confirm_delete(&mut self, event: &Event) -> Fallible<bool> {
        write!(
            self.output,
            "Delete {} with {}? [y/N] ",
            event.subject, event.teacher
        )?;
        self.output.flush()?;
        let answer = self.read_line()?.unwrap_or_default();
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }
}
