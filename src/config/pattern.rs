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
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::PatternError;
use crate::cells::CellRecord;
use crate::clock::{Tempo, TimeSignature};

/// A saved arrangement: the placed cells plus the tempo and subdivision they
/// were written at. Caches are never saved; they rebuild on first use.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Pattern {
    pub tempo: Tempo,
    pub time_signature: TimeSignature,
    pub grid_columns: u32,
    #[serde(default)]
    pub cells: Vec<CellRecord>,
}

impl Pattern {
    /// Reads a pattern from a YAML file.
    pub fn load(path: &Path) -> Result<Pattern, PatternError> {
        let pattern: Pattern = serde_yml::from_str(&fs::read_to_string(path)?)?;
        info!(
            path = ?path,
            cells = pattern.cells.len(),
            "Pattern loaded"
        );
        Ok(pattern)
    }

    /// Writes the pattern to a YAML file.
    pub fn save(&self, path: &Path) -> Result<(), PatternError> {
        let serialized = serde_yml::to_string(self)?;
        fs::write(path, serialized)?;
        info!(path = ?path, cells = self.cells.len(), "Pattern saved");
        Ok(())
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Pattern ({}, {}, {} columns, {} cells):",
            self.tempo,
            self.time_signature,
            self.grid_columns,
            self.cells.len()
        )?;
        for cell in &self.cells {
            write!(
                f,
                "- {} '{}' at column {}, row {}",
                cell.role, cell.key, cell.column, cell.row
            )?;
            if let Some(value) = cell.value {
                write!(f, " ({})", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cells::Role;

    #[test]
    fn test_parse_pattern() {
        let pattern: Pattern = serde_yml::from_str(
            r#"
tempo: 90
time_signature: eighth
grid_columns: 8
cells:
  - key: a
    column: 1
    row: 4
    role: arrange
  - key: a
    column: 1
    row: 2
    role: pitch
    value: 2.0
  - key: a
    column: 5
    row: 11
    role: volume
    value: -.inf
"#,
        )
        .unwrap();
        assert_eq!(pattern.tempo.bpm(), 90.0);
        assert_eq!(pattern.time_signature, TimeSignature::Eighth);
        assert_eq!(pattern.cells.len(), 3);
        assert_eq!(pattern.cells[1].role, Role::Pitch);
        assert_eq!(pattern.cells[0].value, None);
        assert_eq!(pattern.cells[2].value, Some(f64::NEG_INFINITY));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pattern.yaml");
        let pattern = Pattern {
            tempo: Tempo::new(140.0).unwrap(),
            time_signature: TimeSignature::Half,
            grid_columns: 12,
            cells: vec![CellRecord {
                key: "s".into(),
                column: 3,
                row: 1,
                role: Role::Volume,
                value: Some(f64::NEG_INFINITY),
            }],
        };
        pattern.save(&path).unwrap();
        assert_eq!(Pattern::load(&path).unwrap(), pattern);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Pattern::load(&dir.path().join("missing.yaml")),
            Err(PatternError::Io(_))
        ));
    }
}
