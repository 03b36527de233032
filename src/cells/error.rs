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

use super::{Role, SampleKey};

/// Reasons a cell placement is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CellError {
    #[error("a {role} cell for '{key}' already exists at column {column}")]
    Duplicate {
        role: Role,
        key: SampleKey,
        column: u32,
    },

    #[error("a volume cell for '{key}' already exists")]
    DuplicateVolume { key: SampleKey },

    #[error("a {role} cell already occupies column {column}, row {row}")]
    PositionOccupied { role: Role, column: u32, row: i32 },

    #[error("column {column} is outside a grid {grid_columns} columns wide")]
    ColumnOutOfRange { column: u32, grid_columns: u32 },

    #[error("no arrange cell for '{key}' at column {column} to attach a pitch cell to")]
    MissingArrangeCell { key: SampleKey, column: u32 },
}
