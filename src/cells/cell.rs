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

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Identifies a sample to trigger. Cheap to clone so it can be handed to the
/// playback side without allocating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleKey(Arc<str>);

impl SampleKey {
    /// Creates a new sample key.
    pub fn new(key: &str) -> SampleKey {
        SampleKey(Arc::from(key))
    }

    /// Gets the key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SampleKey {
    fn from(key: &str) -> Self {
        SampleKey::new(key)
    }
}

impl fmt::Display for SampleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a placed cell does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Triggered by the clock.
    Arrange,
    /// Shifts the pitch of the arrange cell with the same key and column.
    Pitch,
    /// Sets the gain of every arrange cell with the same key.
    Volume,
    /// Marks a trim boundary for the key's sample.
    Trim,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Arrange => "arrange",
            Role::Pitch => "pitch",
            Role::Volume => "volume",
            Role::Trim => "trim",
        };
        f.write_str(name)
    }
}

/// A cell placed on the grid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub key: SampleKey,
    pub column: u32,
    pub row: i32,
    pub role: Role,
}

impl Cell {
    /// Creates a new cell.
    pub fn new(key: impl Into<SampleKey>, column: u32, row: i32, role: Role) -> Cell {
        Cell {
            key: key.into(),
            column,
            row,
            role,
        }
    }

    pub fn arrange(key: &str, column: u32, row: i32) -> Cell {
        Cell::new(key, column, row, Role::Arrange)
    }

    pub fn pitch(key: &str, column: u32, row: i32) -> Cell {
        Cell::new(key, column, row, Role::Pitch)
    }

    pub fn volume(key: &str, column: u32, row: i32) -> Cell {
        Cell::new(key, column, row, Role::Volume)
    }

    pub fn trim(key: &str, column: u32, row: i32) -> Cell {
        Cell::new(key, column, row, Role::Trim)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} '{}' at column {}, row {}",
            self.role, self.key, self.column, self.row
        )
    }
}

/// The trimmed region of a sample, in grid columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimRegion {
    pub start_column: u32,
    /// `None` plays through to the end of the buffer.
    pub end_column: Option<u32>,
}
