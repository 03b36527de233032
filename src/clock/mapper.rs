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

//! Musical clock position to grid column conversion.
//!
//! Everything in here is a pure function of the tick count, the time signature
//! and the grid width.

use super::signature::TimeSignature;
use super::ClockState;

/// Clock resolution in ticks per quarter note.
pub const PPQ: u64 = 960;

/// Ticks in one sixteenth note, the 1x column length.
const TICKS_PER_SIXTEENTH: u64 = PPQ / 4;

/// Number of ticks that make up one column under the given signature.
pub fn ticks_per_column(signature: TimeSignature) -> u64 {
    match signature {
        TimeSignature::Sixteenth => TICKS_PER_SIXTEENTH / 4,
        TimeSignature::Eighth => TICKS_PER_SIXTEENTH / 2,
        TimeSignature::Quarter => TICKS_PER_SIXTEENTH,
        TimeSignature::Half => TICKS_PER_SIXTEENTH * 2,
    }
}

/// Number of ticks in one pass over a grid `grid_columns` wide.
pub fn loop_ticks(signature: TimeSignature, grid_columns: u32) -> u64 {
    ticks_per_column(signature) * u64::from(grid_columns.max(1))
}

/// The unwrapped column count at the given tick.
pub fn elapsed_columns(ticks: u64, signature: TimeSignature) -> u64 {
    ticks / ticks_per_column(signature)
}

/// The tick at which the given unwrapped column starts.
pub fn column_start_tick(column: u64, signature: TimeSignature) -> u64 {
    column * ticks_per_column(signature)
}

/// Wraps an unwrapped column index onto the grid.
pub fn wrap_column(column: u64, grid_columns: u32) -> u32 {
    if grid_columns == 0 {
        return 0;
    }
    (column % u64::from(grid_columns)) as u32
}

/// The column the clock is currently in, in `[0, grid_columns)`.
pub fn current_column(state: &ClockState, grid_columns: u32) -> u32 {
    wrap_column(
        elapsed_columns(state.ticks, state.time_signature),
        grid_columns,
    )
}
