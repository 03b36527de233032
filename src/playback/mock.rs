// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! A sample engine that records what it was asked to play.

use parking_lot::Mutex;
use tracing::debug;

use super::{PlayInstruction, SampleEngine};

/// Records play instructions instead of playing them.
#[derive(Debug, Default)]
pub struct Recorder {
    played: Mutex<Vec<PlayInstruction>>,
}

impl Recorder {
    pub fn new() -> Recorder {
        Recorder::default()
    }

    /// Everything played so far, in order.
    pub fn played(&self) -> Vec<PlayInstruction> {
        self.played.lock().clone()
    }

    /// Number of instructions recorded for `key`.
    pub fn count_for(&self, key: &str) -> usize {
        self.played
            .lock()
            .iter()
            .filter(|instruction| instruction.key.as_str() == key)
            .count()
    }
}

impl SampleEngine for Recorder {
    fn play(&self, instruction: PlayInstruction) {
        debug!(
            key = %instruction.key,
            at = instruction.scheduled_time,
            "Recorded play (mock)"
        );
        self.played.lock().push(instruction);
    }
}
