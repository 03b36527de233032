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

use crate::cells::CellError;

/// Typed error for engine config load/parse failures so callers can
/// distinguish a missing file from a bad value without string matching.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config load/parse error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid duration '{value}': {reason}")]
    Duration { value: String, reason: String },
}

/// Errors reading or writing a pattern file.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("Pattern file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Pattern YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("Pattern contains an invalid cell: {0}")]
    Cell(#[from] CellError),
}
