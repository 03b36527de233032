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

//! The authoritative set of placed cells.
//!
//! Cells are indexed by position, by (column, role) and by the constraint each
//! role carries, so lookups on the trigger path never scan the whole grid.
//! Pitch cells hang off the arrange cell they modify through an explicit
//! dependency edge, which is how removing an arrange cell finds what else has
//! to go.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::params::{clamp_gain_db, ParamCache, Purge, ValueCurves};

mod cell;
mod error;

pub use cell::{Cell, Role, SampleKey, TrimRegion};
pub use error::CellError;

/// Identifies a placed cell. Ids grow with insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

/// A cell together with the override value computed when it was placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub key: SampleKey,
    pub column: u32,
    pub row: i32,
    pub role: Role,
    /// Semitones for pitch cells, decibels for volume cells.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

impl CellRecord {
    fn cell(&self) -> Cell {
        Cell::new(self.key.clone(), self.column, self.row, self.role)
    }
}

#[derive(Debug)]
struct Entry {
    cell: Cell,
    value: Option<f64>,
}

/// Stores placed cells and their derived overrides.
pub struct CellStore {
    grid_columns: u32,
    next_id: u64,
    cells: BTreeMap<CellId, Entry>,
    positions: HashMap<(u32, i32, Role), CellId>,
    columns: HashMap<(u32, Role), Vec<CellId>>,
    arrange: HashMap<(SampleKey, u32), CellId>,
    pitch: HashMap<(SampleKey, u32), CellId>,
    volume: HashMap<SampleKey, CellId>,
    trim: HashMap<SampleKey, Vec<CellId>>,
    /// Arrange cell -> the pitch cells bound to it.
    dependents: HashMap<CellId, Vec<CellId>>,
    curves: Arc<dyn ValueCurves>,
    cache: Arc<ParamCache>,
}

impl CellStore {
    /// Creates an empty store. Every mutation purges the affected entries of
    /// `cache` before it returns.
    pub fn new(
        grid_columns: u32,
        curves: Arc<dyn ValueCurves>,
        cache: Arc<ParamCache>,
    ) -> CellStore {
        CellStore {
            grid_columns: grid_columns.max(1),
            next_id: 0,
            cells: BTreeMap::new(),
            positions: HashMap::new(),
            columns: HashMap::new(),
            arrange: HashMap::new(),
            pitch: HashMap::new(),
            volume: HashMap::new(),
            trim: HashMap::new(),
            dependents: HashMap::new(),
            curves,
            cache,
        }
    }

    /// Gets the grid width new cells are validated against.
    pub fn grid_columns(&self) -> u32 {
        self.grid_columns
    }

    /// Changes the grid width. Cells beyond the new width are kept; they are
    /// simply never reached by the clock until the grid grows again.
    pub fn set_grid_columns(&mut self, grid_columns: u32) {
        self.grid_columns = grid_columns.max(1);
    }

    /// Number of placed cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All cells in insertion order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values().map(|entry| &entry.cell)
    }

    /// All cells with their override values, in insertion order.
    pub fn records(&self) -> Vec<CellRecord> {
        self.cells
            .values()
            .map(|entry| CellRecord {
                key: entry.cell.key.clone(),
                column: entry.cell.column,
                row: entry.cell.row,
                role: entry.cell.role,
                value: entry.value,
            })
            .collect()
    }

    /// Places a cell. Pitch and volume values are computed from the row here
    /// and stored; they are not recomputed later.
    pub fn add_cell(&mut self, cell: Cell) -> Result<CellId, CellError> {
        self.check_column(cell.column)?;
        self.place(cell, None)
    }

    /// Places a cell with a previously computed override value. Restored
    /// cells may lie beyond the grid width, the same way cells survive a
    /// shrinking grid.
    pub fn restore(&mut self, record: &CellRecord) -> Result<CellId, CellError> {
        self.place(record.cell(), record.value)
    }

    fn check_column(&self, column: u32) -> Result<(), CellError> {
        if column >= self.grid_columns {
            return Err(CellError::ColumnOutOfRange {
                column,
                grid_columns: self.grid_columns,
            });
        }
        Ok(())
    }

    fn place(&mut self, cell: Cell, value: Option<f64>) -> Result<CellId, CellError> {
        if self
            .positions
            .contains_key(&(cell.column, cell.row, cell.role))
        {
            return Err(CellError::PositionOccupied {
                role: cell.role,
                column: cell.column,
                row: cell.row,
            });
        }

        let id = CellId(self.next_id);
        let slot = (cell.key.clone(), cell.column);
        let (value, purge) = match cell.role {
            Role::Arrange => {
                if self.arrange.contains_key(&slot) {
                    return Err(self.duplicate(&cell));
                }
                self.arrange.insert(slot.clone(), id);
                (None, Purge::Entry(slot.0, slot.1))
            }
            Role::Pitch => {
                if self.pitch.contains_key(&slot) {
                    return Err(self.duplicate(&cell));
                }
                let arrange = self
                    .arrange
                    .get(&slot)
                    .and_then(|arrange_id| Some((*arrange_id, self.cells.get(arrange_id)?)));
                let (arrange_id, arrange_row) = match arrange {
                    Some((arrange_id, entry)) => (arrange_id, entry.cell.row),
                    None => {
                        return Err(CellError::MissingArrangeCell {
                            key: cell.key.clone(),
                            column: cell.column,
                        })
                    }
                };
                let semitones =
                    value.unwrap_or_else(|| self.curves.semitones(arrange_row, cell.row));
                self.pitch.insert(slot.clone(), id);
                self.dependents.entry(arrange_id).or_default().push(id);
                (Some(semitones), Purge::Entry(slot.0, slot.1))
            }
            Role::Volume => {
                if self.volume.contains_key(&cell.key) {
                    return Err(self.duplicate(&cell));
                }
                let db = clamp_gain_db(value.unwrap_or_else(|| self.curves.decibels(cell.row)));
                self.volume.insert(cell.key.clone(), id);
                (Some(db), Purge::Key(slot.0))
            }
            Role::Trim => {
                self.trim.entry(cell.key.clone()).or_default().push(id);
                (None, Purge::Key(slot.0))
            }
        };

        self.next_id += 1;
        self.positions
            .insert((cell.column, cell.row, cell.role), id);
        self.columns
            .entry((cell.column, cell.role))
            .or_default()
            .push(id);
        debug!(%cell, ?value, "Cell placed");
        self.cells.insert(id, Entry { cell, value });
        self.cache.purge(&purge);

        Ok(id)
    }

    fn duplicate(&self, cell: &Cell) -> CellError {
        debug!(%cell, "Rejected duplicate cell");
        match cell.role {
            Role::Volume => CellError::DuplicateVolume {
                key: cell.key.clone(),
            },
            role => CellError::Duplicate {
                role,
                key: cell.key.clone(),
                column: cell.column,
            },
        }
    }

    /// Removes the cell at the given position. Removing an arrange cell also
    /// removes the pitch cell bound to it. Returns every removed cell, or
    /// `None` if nothing was there.
    pub fn remove_cell(&mut self, column: u32, row: i32, role: Role) -> Option<Vec<Cell>> {
        let id = *self.positions.get(&(column, row, role))?;
        let mut removed = Vec::new();

        for dependent in self.dependents.remove(&id).unwrap_or_default() {
            if let Some(cell) = self.remove_entry(dependent) {
                removed.push(cell);
            }
        }
        if let Some(cell) = self.remove_entry(id) {
            removed.insert(0, cell);
        }

        if removed.len() > 1 {
            debug!(
                cell = %removed[0],
                cascaded = removed.len() - 1,
                "Removed cell and its dependents"
            );
        }
        Some(removed)
    }

    /// Unindexes a single cell and purges whatever it affected.
    fn remove_entry(&mut self, id: CellId) -> Option<Cell> {
        let entry = self.cells.remove(&id)?;
        let cell = entry.cell;
        let slot = (cell.key.clone(), cell.column);

        self.positions.remove(&(cell.column, cell.row, cell.role));
        if let Some(ids) = self.columns.get_mut(&(cell.column, cell.role)) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.columns.remove(&(cell.column, cell.role));
            }
        }

        let purge = match cell.role {
            Role::Arrange => {
                self.arrange.remove(&slot);
                Purge::Entry(slot.0, slot.1)
            }
            Role::Pitch => {
                self.pitch.remove(&slot);
                if let Some(arrange_id) = self.arrange.get(&slot) {
                    if let Some(dependents) = self.dependents.get_mut(arrange_id) {
                        dependents.retain(|other| *other != id);
                    }
                }
                Purge::Entry(slot.0, slot.1)
            }
            Role::Volume => {
                self.volume.remove(&cell.key);
                Purge::Key(slot.0)
            }
            Role::Trim => {
                if let Some(ids) = self.trim.get_mut(&cell.key) {
                    ids.retain(|other| *other != id);
                    if ids.is_empty() {
                        self.trim.remove(&cell.key);
                    }
                }
                Purge::Key(slot.0)
            }
        };
        self.cache.purge(&purge);

        Some(cell)
    }

    /// Moves the volume control for `key`, replacing any existing volume cell.
    pub fn place_volume(&mut self, key: &SampleKey, column: u32, row: i32) -> Result<CellId, CellError> {
        let existing = self.volume.get(key).copied();
        if let Some(occupant) = self.positions.get(&(column, row, Role::Volume)) {
            if Some(*occupant) != existing {
                return Err(CellError::PositionOccupied {
                    role: Role::Volume,
                    column,
                    row,
                });
            }
        }
        self.check_column(column)?;
        if let Some(existing) = existing {
            self.remove_entry(existing);
        }
        self.add_cell(Cell::new(key.clone(), column, row, Role::Volume))
    }

    /// Replaces every volume cell with one 0 dB cell per key, spread evenly
    /// across the grid on `row`. When there are more keys than the grid can
    /// space out, they fill consecutive columns and spill onto the rows below.
    pub fn seed_volume_cells(&mut self, keys: &[SampleKey], row: i32) {
        let existing: Vec<CellId> = self.volume.values().copied().collect();
        for id in existing {
            self.remove_entry(id);
        }

        let spacing = self.grid_columns / (keys.len() as u32 + 1);
        for (index, key) in keys.iter().enumerate() {
            let index = index as u32;
            let (column, row) = if spacing > 0 {
                (spacing * (index + 1), row)
            } else {
                (
                    index % self.grid_columns,
                    row + (index / self.grid_columns) as i32,
                )
            };
            let cell = Cell::new(key.clone(), column, row, Role::Volume);
            if let Err(e) = self.place(cell, Some(0.0)) {
                warn!(%key, error = %e, "Could not seed volume cell");
            }
        }
    }

    /// Cells of the given role in `column`, in insertion order.
    pub fn cells_at_column(&self, column: u32, role: Role) -> impl Iterator<Item = &Cell> {
        self.columns
            .get(&(column, role))
            .into_iter()
            .flatten()
            .filter_map(|id| self.cells.get(id))
            .map(|entry| &entry.cell)
    }

    /// The cell at an exact position, if any.
    pub fn cell_at(&self, column: u32, row: i32, role: Role) -> Option<&Cell> {
        self.positions
            .get(&(column, row, role))
            .and_then(|id| self.cells.get(id))
            .map(|entry| &entry.cell)
    }

    /// The semitone shift stored for (key, column), if a pitch cell exists.
    pub fn pitch_shift(&self, key: &SampleKey, column: u32) -> Option<f64> {
        self.pitch
            .get(&(key.clone(), column))
            .and_then(|id| self.cells.get(id))
            .and_then(|entry| entry.value)
    }

    /// The gain stored for `key`, if a volume cell exists.
    pub fn volume_db(&self, key: &SampleKey) -> Option<f64> {
        self.volume
            .get(key)
            .and_then(|id| self.cells.get(id))
            .and_then(|entry| entry.value)
    }

    /// The trim region for `key`'s sample, derived from the current trim
    /// cells: the leftmost cell starts it, the rightmost (if there are at
    /// least two) ends it.
    pub fn trim_region_for(&self, key: &SampleKey) -> Option<TrimRegion> {
        let ids = self.trim.get(key)?;
        let columns = ids
            .iter()
            .filter_map(|id| self.cells.get(id))
            .map(|entry| entry.cell.column);
        let (start, end) = columns.fold(None, |acc: Option<(u32, u32)>, column| match acc {
            None => Some((column, column)),
            Some((start, end)) => Some((start.min(column), end.max(column))),
        })?;
        Some(TrimRegion {
            start_column: start,
            end_column: if ids.len() > 1 { Some(end) } else { None },
        })
    }
}

impl std::fmt::Debug for CellStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellStore")
            .field("grid_columns", &self.grid_columns)
            .field("cells", &self.cells.len())
            .field("arrange", &self.arrange.len())
            .field("pitch", &self.pitch.len())
            .field("volume", &self.volume.len())
            .field("trim_keys", &self.trim.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DefaultCurves;

    fn store() -> CellStore {
        CellStore::new(
            16,
            Arc::new(DefaultCurves::new(12)),
            Arc::new(ParamCache::new()),
        )
    }

    fn keys<'a>(cells: impl Iterator<Item = &'a Cell>) -> Vec<String> {
        cells.map(|cell| cell.key.to_string()).collect()
    }

    #[test]
    fn test_add_and_query_by_column() {
        let mut store = store();
        store.add_cell(Cell::arrange("a", 4, 3)).unwrap();
        store.add_cell(Cell::arrange("s", 4, 5)).unwrap();
        store.add_cell(Cell::arrange("d", 5, 5)).unwrap();

        assert_eq!(keys(store.cells_at_column(4, Role::Arrange)), vec!["a", "s"]);
        assert_eq!(keys(store.cells_at_column(5, Role::Arrange)), vec!["d"]);
        assert_eq!(store.cells_at_column(4, Role::Pitch).count(), 0);
        // Stable across repeated calls.
        assert_eq!(keys(store.cells_at_column(4, Role::Arrange)), vec!["a", "s"]);
    }

    #[test]
    fn test_duplicate_arrange_rejected() {
        let mut store = store();
        store.add_cell(Cell::arrange("a", 4, 3)).unwrap();
        assert_eq!(
            store.add_cell(Cell::arrange("a", 4, 7)),
            Err(CellError::Duplicate {
                role: Role::Arrange,
                key: "a".into(),
                column: 4
            })
        );
        // Same key, different column is fine.
        assert!(store.add_cell(Cell::arrange("a", 5, 3)).is_ok());
    }

    #[test]
    fn test_position_occupied() {
        let mut store = store();
        store.add_cell(Cell::arrange("a", 4, 3)).unwrap();
        assert_eq!(
            store.add_cell(Cell::arrange("s", 4, 3)),
            Err(CellError::PositionOccupied {
                role: Role::Arrange,
                column: 4,
                row: 3
            })
        );
        // Roles live on separate layers.
        assert!(store.add_cell(Cell::trim("s", 4, 3)).is_ok());
    }

    #[test]
    fn test_column_out_of_range() {
        let mut store = store();
        assert!(matches!(
            store.add_cell(Cell::arrange("a", 16, 0)),
            Err(CellError::ColumnOutOfRange { column: 16, grid_columns: 16 })
        ));
    }

    #[test]
    fn test_pitch_needs_arrange_cell() {
        let mut store = store();
        assert!(matches!(
            store.add_cell(Cell::pitch("a", 2, 1)),
            Err(CellError::MissingArrangeCell { .. })
        ));

        store.add_cell(Cell::arrange("a", 2, 6)).unwrap();
        store.add_cell(Cell::pitch("a", 2, 1)).unwrap();
        assert_eq!(store.pitch_shift(&"a".into(), 2), Some(5.0));
        assert!(matches!(
            store.add_cell(Cell::pitch("a", 2, 9)),
            Err(CellError::Duplicate { role: Role::Pitch, .. })
        ));
    }

    #[test]
    fn test_removing_arrange_cascades_to_pitch() {
        let mut store = store();
        store.add_cell(Cell::arrange("a", 2, 6)).unwrap();
        store.add_cell(Cell::pitch("a", 2, 1)).unwrap();
        store.add_cell(Cell::volume("a", 8, 3)).unwrap();

        let removed = store.remove_cell(2, 6, Role::Arrange).unwrap();
        assert_eq!(removed, vec![Cell::arrange("a", 2, 6), Cell::pitch("a", 2, 1)]);
        assert_eq!(store.pitch_shift(&"a".into(), 2), None);
        assert!(store.cell_at(2, 1, Role::Pitch).is_none());
        // Volume is per key and survives.
        assert!(store.volume_db(&"a".into()).is_some());
        assert_eq!(store.len(), 1);

        // A new pitch cell needs a new arrange cell.
        assert!(store.add_cell(Cell::pitch("a", 2, 1)).is_err());
    }

    #[test]
    fn test_remove_missing_cell() {
        let mut store = store();
        assert!(store.remove_cell(1, 1, Role::Arrange).is_none());
        store.add_cell(Cell::arrange("a", 1, 1)).unwrap();
        assert!(store.remove_cell(1, 1, Role::Trim).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_pitch_only() {
        let mut store = store();
        store.add_cell(Cell::arrange("a", 2, 6)).unwrap();
        store.add_cell(Cell::pitch("a", 2, 1)).unwrap();
        assert_eq!(store.remove_cell(2, 1, Role::Pitch).unwrap().len(), 1);
        assert_eq!(store.pitch_shift(&"a".into(), 2), None);
        // The dependency edge is gone, so removing the arrange cell removes one cell.
        assert_eq!(store.remove_cell(2, 6, Role::Arrange).unwrap().len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_trim_region() {
        let mut store = store();
        let key: SampleKey = "a".into();
        assert_eq!(store.trim_region_for(&key), None);

        store.add_cell(Cell::trim("a", 9, 0)).unwrap();
        assert_eq!(
            store.trim_region_for(&key),
            Some(TrimRegion {
                start_column: 9,
                end_column: None
            })
        );

        store.add_cell(Cell::trim("a", 2, 0)).unwrap();
        store.add_cell(Cell::trim("a", 5, 0)).unwrap();
        assert_eq!(
            store.trim_region_for(&key),
            Some(TrimRegion {
                start_column: 2,
                end_column: Some(9)
            })
        );

        store.remove_cell(9, 0, Role::Trim).unwrap();
        assert_eq!(
            store.trim_region_for(&key),
            Some(TrimRegion {
                start_column: 2,
                end_column: Some(5)
            })
        );

        store.remove_cell(2, 0, Role::Trim).unwrap();
        store.remove_cell(5, 0, Role::Trim).unwrap();
        assert_eq!(store.trim_region_for(&key), None);
    }

    #[test]
    fn test_volume_is_one_per_key() {
        let mut store = store();
        store.add_cell(Cell::volume("a", 3, 0)).unwrap();
        assert_eq!(store.volume_db(&"a".into()), Some(6.0));
        assert_eq!(
            store.add_cell(Cell::volume("a", 5, 2)),
            Err(CellError::DuplicateVolume { key: "a".into() })
        );

        store.place_volume(&"a".into(), 5, 11).unwrap();
        assert_eq!(store.volume_db(&"a".into()), Some(f64::NEG_INFINITY));
        assert!(store.cell_at(3, 0, Role::Volume).is_none());
        assert_eq!(store.cells_at_column(5, Role::Volume).count(), 1);
    }

    #[test]
    fn test_place_volume_respects_other_keys() {
        let mut store = store();
        store.add_cell(Cell::volume("a", 3, 0)).unwrap();
        store.add_cell(Cell::volume("s", 4, 0)).unwrap();
        assert!(matches!(
            store.place_volume(&"a".into(), 4, 0),
            Err(CellError::PositionOccupied { .. })
        ));
        // The failed move leaves the original in place.
        assert!(store.cell_at(3, 0, Role::Volume).is_some());
    }

    #[test]
    fn test_seed_volume_cells() {
        let mut store = store();
        store.add_cell(Cell::volume("x", 1, 1)).unwrap();
        store.seed_volume_cells(&["a".into(), "s".into(), "d".into()], 6);

        assert_eq!(store.volume_db(&"x".into()), None);
        assert_eq!(store.cell_at(4, 6, Role::Volume).map(|c| c.key.as_str()), Some("a"));
        assert_eq!(store.cell_at(8, 6, Role::Volume).map(|c| c.key.as_str()), Some("s"));
        assert_eq!(store.cell_at(12, 6, Role::Volume).map(|c| c.key.as_str()), Some("d"));
        assert_eq!(store.volume_db(&"s".into()), Some(0.0));
    }

    #[test]
    fn test_records_restore() {
        let mut store = store();
        store.add_cell(Cell::arrange("a", 2, 6)).unwrap();
        store.add_cell(Cell::pitch("a", 2, 1)).unwrap();
        store.add_cell(Cell::volume("a", 8, 3)).unwrap();
        store.add_cell(Cell::trim("a", 1, 0)).unwrap();

        let records = store.records();
        let mut restored = self::store();
        for record in &records {
            restored.restore(record).unwrap();
        }
        assert_eq!(restored.records(), records);
        assert_eq!(restored.pitch_shift(&"a".into(), 2), Some(5.0));
    }

    #[test]
    fn test_seed_more_keys_than_columns() {
        let mut store = CellStore::new(
            4,
            Arc::new(DefaultCurves::new(12)),
            Arc::new(ParamCache::new()),
        );
        let keys: Vec<SampleKey> = ["a", "s", "d", "f", "g", "h"]
            .into_iter()
            .map(SampleKey::new)
            .collect();
        store.seed_volume_cells(&keys, 6);

        assert_eq!(store.len(), 6);
        for key in &keys {
            assert_eq!(store.volume_db(key), Some(0.0));
        }
        assert_eq!(store.cell_at(3, 6, Role::Volume).map(|c| c.key.as_str()), Some("f"));
        assert_eq!(store.cell_at(1, 7, Role::Volume).map(|c| c.key.as_str()), Some("h"));
    }

    #[test]
    fn test_restore_beyond_grid_width() {
        let mut store = store();
        store.add_cell(Cell::arrange("a", 12, 0)).unwrap();
        store.add_cell(Cell::pitch("a", 12, 3)).unwrap();
        store.set_grid_columns(8);
        let records = store.records();

        let mut restored = CellStore::new(
            8,
            Arc::new(DefaultCurves::new(12)),
            Arc::new(ParamCache::new()),
        );
        for record in &records {
            restored.restore(record).unwrap();
        }
        assert_eq!(restored.records(), records);
        assert_eq!(
            restored.add_cell(Cell::arrange("s", 12, 1)),
            Err(CellError::ColumnOutOfRange {
                column: 12,
                grid_columns: 8
            })
        );
    }
}
