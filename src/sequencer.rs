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

//! A complete sequencer instance: clock, cells, parameter cache and dispatch.
//!
//! The edit path (cell placement from a UI thread) and the trigger path
//! ([`Sequencer::tick`], typically from an audio callback) share the cell store
//! through a reader/writer lock. Every edit, including its cache purge, happens
//! under the write lock, so a trigger never sees half of a removal. Locks are
//! always taken in the order clock, cells, dispatcher.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::cells::{Cell, CellError, CellId, CellStore, Role, SampleKey, TrimRegion};
use crate::clock::{mapper, signature_from_value_logged, ClockSource, ClockState, Tempo, TimeSignature};
use crate::config::{EngineConfig, Pattern, PatternError};
use crate::dispatch::{DispatchReport, DispatchState, TriggerDispatcher};
use crate::params::{DefaultCurves, ParamCache, ParameterResolver, Purge, ResolvedParams, ValueCurves};
use crate::playback::{SampleEngine, SampleLibrary};

/// The step sequencer engine.
pub struct Sequencer {
    clock: Mutex<ClockSource>,
    cells: RwLock<CellStore>,
    dispatcher: Mutex<TriggerDispatcher>,
    resolver: ParameterResolver,
    engine: Arc<dyn SampleEngine>,
    grid_rows: u32,
    tempo_step: f64,
}

impl Sequencer {
    /// Creates a sequencer using the stock row curves.
    pub fn new(
        config: &EngineConfig,
        library: Arc<dyn SampleLibrary>,
        engine: Arc<dyn SampleEngine>,
    ) -> Sequencer {
        let curves = Arc::new(DefaultCurves::new(config.grid_rows()));
        Sequencer::with_curves(config, library, engine, curves)
    }

    /// Creates a sequencer with custom row-to-value curves.
    pub fn with_curves(
        config: &EngineConfig,
        library: Arc<dyn SampleLibrary>,
        engine: Arc<dyn SampleEngine>,
        curves: Arc<dyn ValueCurves>,
    ) -> Sequencer {
        let cache = Arc::new(ParamCache::new());
        Sequencer {
            clock: Mutex::new(ClockSource::new(config.tempo(), config.time_signature())),
            cells: RwLock::new(CellStore::new(config.grid_columns(), curves, cache.clone())),
            dispatcher: Mutex::new(TriggerDispatcher::new()),
            resolver: ParameterResolver::new(
                cache,
                library,
                config.trim_column_seconds(),
                config.trim_scaling(),
            ),
            engine,
            grid_rows: config.grid_rows(),
            tempo_step: config.tempo_step(),
        }
    }

    /// Creates a sequencer holding a saved pattern. The pattern's tempo, time
    /// signature and grid width override the config's.
    pub fn from_pattern(
        config: &EngineConfig,
        pattern: &Pattern,
        library: Arc<dyn SampleLibrary>,
        engine: Arc<dyn SampleEngine>,
    ) -> Result<Sequencer, PatternError> {
        let config = config
            .clone()
            .with_grid_columns(pattern.grid_columns)
            .with_tempo(pattern.tempo)
            .with_time_signature(pattern.time_signature);
        let sequencer = Sequencer::new(&config, library, engine);
        {
            let mut cells = sequencer.cells.write();
            for record in &pattern.cells {
                cells.restore(record)?;
            }
        }
        info!(cells = pattern.cells.len(), "Sequencer restored from pattern");
        Ok(sequencer)
    }

    /// Snapshots the cells, tempo, signature and grid width.
    pub fn pattern(&self) -> Pattern {
        let clock = self.clock.lock();
        let cells = self.cells.read();
        Pattern {
            tempo: clock.tempo(),
            time_signature: clock.time_signature(),
            grid_columns: cells.grid_columns(),
            cells: cells.records(),
        }
    }

    /// Drives the sequencer forward by `elapsed` wall time, firing every
    /// column entered along the way. Call this periodically from the host's
    /// audio or frame scheduler.
    pub fn tick(&self, elapsed: Duration) -> DispatchReport {
        let mut clock = self.clock.lock();
        let step = match clock.advance(elapsed) {
            Some(step) => step,
            None => return DispatchReport::default(),
        };
        let time_signature = clock.time_signature();

        let cells = self.cells.read();
        let grid_columns = cells.grid_columns();
        let mut dispatcher = self.dispatcher.lock();
        let report = dispatcher.update(
            &step,
            time_signature,
            grid_columns,
            &cells,
            &self.resolver,
            self.engine.as_ref(),
        );

        let loop_ticks = mapper::loop_ticks(time_signature, grid_columns);
        while clock.wrap(loop_ticks) {
            dispatcher.rebase(grid_columns);
            debug!("Loop wrapped");
        }
        report
    }

    /// Starts the clock from the current position.
    pub fn start(&self) {
        self.clock.lock().start();
    }

    /// Stops the clock and rewinds it. Safe to call at any time; the next
    /// start fires column 0 exactly once.
    pub fn stop(&self) {
        let mut clock = self.clock.lock();
        clock.stop();
        self.dispatcher.lock().reset();
    }

    pub fn is_running(&self) -> bool {
        self.clock.lock().is_running()
    }

    /// Gets a snapshot of the clock.
    pub fn clock_state(&self) -> ClockState {
        self.clock.lock().state()
    }

    /// The clock's running time in seconds, the time base of scheduled plays.
    pub fn seconds(&self) -> f64 {
        self.clock.lock().seconds()
    }

    /// The column the clock is in.
    pub fn current_column(&self) -> u32 {
        let clock = self.clock.lock();
        let cells = self.cells.read();
        mapper::current_column(&clock.state(), cells.grid_columns())
    }

    /// Gets the dispatcher state.
    pub fn dispatch_state(&self) -> DispatchState {
        self.dispatcher.lock().state()
    }

    pub fn tempo(&self) -> Tempo {
        self.clock.lock().tempo()
    }

    /// Sets the tempo, clamped into range.
    pub fn set_tempo(&self, bpm: f64) {
        self.clock.lock().set_tempo(bpm);
    }

    /// Raises the tempo by one nudge.
    pub fn increase_tempo(&self) {
        let mut clock = self.clock.lock();
        let bpm = clock.tempo().nudged(self.tempo_step).bpm();
        clock.set_tempo(bpm);
    }

    /// Lowers the tempo by one nudge.
    pub fn decrease_tempo(&self) {
        let mut clock = self.clock.lock();
        let bpm = clock.tempo().nudged(-self.tempo_step).bpm();
        clock.set_tempo(bpm);
    }

    pub fn time_signature(&self) -> TimeSignature {
        self.clock.lock().time_signature()
    }

    pub fn set_time_signature(&self, time_signature: TimeSignature) {
        self.clock.lock().set_time_signature(time_signature);
    }

    /// Sets the time signature from a legacy multiplier (0.25, 0.5, 1 or 2).
    /// Unknown values are logged and ignored.
    pub fn set_time_signature_value(&self, value: f64) {
        if let Some(time_signature) = signature_from_value_logged(value) {
            self.set_time_signature(time_signature);
        }
    }

    /// Moves to the next longer subdivision.
    pub fn lengthen_time_signature(&self) {
        let mut clock = self.clock.lock();
        let longer = clock.time_signature().longer();
        clock.set_time_signature(longer);
    }

    /// Moves to the next shorter subdivision.
    pub fn shorten_time_signature(&self) {
        let mut clock = self.clock.lock();
        let shorter = clock.time_signature().shorter();
        clock.set_time_signature(shorter);
    }

    pub fn grid_columns(&self) -> u32 {
        self.cells.read().grid_columns()
    }

    /// Changes the grid width.
    pub fn set_grid_columns(&self, grid_columns: u32) {
        self.cells.write().set_grid_columns(grid_columns);
        info!(grid_columns, "Grid width changed");
    }

    /// Places a cell.
    pub fn add_cell(&self, cell: Cell) -> Result<CellId, CellError> {
        self.cells.write().add_cell(cell)
    }

    /// Removes the cell at a position, along with anything bound to it.
    pub fn remove_cell(&self, column: u32, row: i32, role: Role) -> Option<Vec<Cell>> {
        self.cells.write().remove_cell(column, row, role)
    }

    /// Moves `key`'s volume control, replacing the old one.
    pub fn place_volume(&self, key: &SampleKey, column: u32, row: i32) -> Result<CellId, CellError> {
        self.cells.write().place_volume(key, column, row)
    }

    /// Lays out one 0 dB volume cell per key across the middle row.
    pub fn seed_volume_cells(&self, keys: &[SampleKey]) {
        let row = (self.grid_rows / 2) as i32;
        self.cells.write().seed_volume_cells(keys, row);
    }

    /// Copies out the cells of a role in a column.
    pub fn cells_at_column(&self, column: u32, role: Role) -> Vec<Cell> {
        self.cells
            .read()
            .cells_at_column(column, role)
            .cloned()
            .collect()
    }

    /// Number of placed cells.
    pub fn cell_count(&self) -> usize {
        self.cells.read().len()
    }

    /// The current trim region for `key`.
    pub fn trim_region_for(&self, key: &SampleKey) -> Option<TrimRegion> {
        self.cells.read().trim_region_for(key)
    }

    /// Resolves playback parameters for (key, column).
    pub fn resolve(&self, key: &SampleKey, column: u32) -> Option<ResolvedParams> {
        let cells = self.cells.read();
        self.resolver.resolve(&cells, key, column)
    }

    /// Converts a trim column into buffer seconds.
    pub fn column_to_time(&self, column: u32) -> f64 {
        self.resolver.column_to_time(column)
    }

    /// Tells the sequencer that `key`'s buffer was loaded or replaced, purging
    /// the parameters cached for it.
    pub fn notify_sample_changed(&self, key: &SampleKey) {
        let _cells = self.cells.write();
        self.resolver.cache().purge(&Purge::Key(key.clone()));
        debug!(%key, "Sample changed, cached parameters purged");
    }
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("clock", &self.clock.lock().state())
            .field("cells", &*self.cells.read())
            .field("resolver", &self.resolver)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MAX_BPM;
    use crate::playback::mock::Recorder;
    use crate::playback::{LoadedSample, SampleBank};

    fn sequencer() -> (Sequencer, Arc<Recorder>) {
        let bank = Arc::new(SampleBank::new());
        for key in ["a", "b"] {
            bank.assign_key(&key.into(), key);
            bank.insert(key, LoadedSample::silence(1.0, 1, 1000));
        }
        let recorder = Arc::new(Recorder::new());
        let sequencer = Sequencer::new(&EngineConfig::default(), bank, recorder.clone());
        (sequencer, recorder)
    }

    #[test]
    fn test_tick_while_stopped_does_nothing() {
        let (sequencer, recorder) = sequencer();
        sequencer.add_cell(Cell::arrange("a", 0, 0)).unwrap();
        let report = sequencer.tick(Duration::from_millis(100));
        assert_eq!(report, DispatchReport::default());
        assert!(recorder.played().is_empty());
    }

    #[test]
    fn test_loop_wraps_and_refires() {
        let (sequencer, recorder) = sequencer();
        sequencer.add_cell(Cell::arrange("a", 0, 0)).unwrap();
        sequencer.start();

        // 16 columns of 0.125s make a 2s loop. Step just past two loops.
        for _ in 0..401 {
            sequencer.tick(Duration::from_millis(10));
        }
        assert_eq!(recorder.count_for("a"), 3);
        let played = recorder.played();
        assert!((played[1].scheduled_time - 2.0).abs() < 1e-9);
        assert!((played[2].scheduled_time - 4.0).abs() < 1e-9);
        assert_eq!(sequencer.current_column(), 0);
    }

    #[test]
    fn test_tempo_controls() {
        let (sequencer, _) = sequencer();
        sequencer.increase_tempo();
        assert_eq!(sequencer.tempo().bpm(), 125.0);
        sequencer.decrease_tempo();
        sequencer.decrease_tempo();
        assert_eq!(sequencer.tempo().bpm(), 115.0);
        sequencer.set_tempo(1000.0);
        assert_eq!(sequencer.tempo().bpm(), MAX_BPM);
        sequencer.set_tempo(f64::NAN);
        assert_eq!(sequencer.tempo().bpm(), MAX_BPM);
    }

    #[test]
    fn test_time_signature_controls() {
        let (sequencer, _) = sequencer();
        sequencer.shorten_time_signature();
        assert_eq!(sequencer.time_signature(), TimeSignature::Eighth);
        sequencer.lengthen_time_signature();
        sequencer.lengthen_time_signature();
        assert_eq!(sequencer.time_signature(), TimeSignature::Half);
        sequencer.set_time_signature_value(0.25);
        assert_eq!(sequencer.time_signature(), TimeSignature::Sixteenth);
        sequencer.set_time_signature_value(3.0);
        assert_eq!(sequencer.time_signature(), TimeSignature::Sixteenth);
    }

    #[test]
    fn test_signature_change_keeps_column() {
        let (sequencer, _) = sequencer();
        sequencer.start();
        sequencer.tick(Duration::from_millis(500));
        assert_eq!(sequencer.current_column(), 4);
        sequencer.set_time_signature(TimeSignature::Half);
        assert_eq!(sequencer.current_column(), 4);
    }

    #[test]
    fn test_seed_volume_cells() {
        let (sequencer, _) = sequencer();
        sequencer.seed_volume_cells(&["a".into(), "b".into()]);
        assert_eq!(sequencer.cell_count(), 2);
        let params = sequencer.resolve(&"a".into(), 0).unwrap();
        assert_eq!(params.gain_db, 0.0);
    }

    #[test]
    fn test_notify_sample_changed_purges() {
        let bank = Arc::new(SampleBank::new());
        bank.assign_key(&"a".into(), "a");
        bank.insert("a", LoadedSample::silence(1.0, 1, 1000));
        let sequencer = Sequencer::new(
            &EngineConfig::default(),
            bank.clone(),
            Arc::new(Recorder::new()),
        );
        let key: SampleKey = "a".into();
        assert_eq!(sequencer.resolve(&key, 0).unwrap().duration, 1.0);

        bank.insert("a", LoadedSample::silence(3.0, 1, 1000));
        assert_eq!(sequencer.resolve(&key, 0).unwrap().duration, 1.0);
        sequencer.notify_sample_changed(&key);
        assert_eq!(sequencer.resolve(&key, 0).unwrap().duration, 3.0);
    }

    #[test]
    fn test_pattern_snapshot() {
        let (sequencer, _) = sequencer();
        sequencer.add_cell(Cell::arrange("a", 2, 3)).unwrap();
        sequencer.add_cell(Cell::pitch("a", 2, 1)).unwrap();
        sequencer.set_tempo(90.0);

        let pattern = sequencer.pattern();
        assert_eq!(pattern.tempo.bpm(), 90.0);
        assert_eq!(pattern.grid_columns, 16);
        assert_eq!(pattern.cells.len(), 2);
        assert_eq!(pattern.cells[1].value, Some(2.0));
    }

    #[test]
    fn test_shrunk_grid_skips_outer_cells() {
        let (sequencer, recorder) = sequencer();
        sequencer.add_cell(Cell::arrange("a", 12, 0)).unwrap();
        sequencer.set_grid_columns(8);
        assert_eq!(
            sequencer.add_cell(Cell::arrange("b", 12, 1)),
            Err(CellError::ColumnOutOfRange {
                column: 12,
                grid_columns: 8
            })
        );
        sequencer.start();
        for _ in 0..300 {
            sequencer.tick(Duration::from_millis(10));
        }
        assert!(recorder.played().is_empty());
        assert_eq!(sequencer.cell_count(), 1);
    }

    #[test]
    fn test_readers_never_see_partial_edits() {
        let (sequencer, _) = sequencer();
        let sequencer = Arc::new(sequencer);

        let editor = {
            let sequencer = sequencer.clone();
            std::thread::spawn(move || {
                for i in 0..2000u32 {
                    let column = i % 16;
                    if sequencer.add_cell(Cell::arrange("a", column, 8)).is_ok() {
                        let _ = sequencer.add_cell(Cell::pitch("a", column, 4));
                    } else {
                        sequencer.remove_cell(column, 8, Role::Arrange);
                    }
                }
            })
        };
        let reader = {
            let sequencer = sequencer.clone();
            std::thread::spawn(move || {
                for _ in 0..2000 {
                    let cells = sequencer.cells.read();
                    for pitch in cells.cells().filter(|cell| cell.role == Role::Pitch) {
                        assert!(
                            cells
                                .cells_at_column(pitch.column, Role::Arrange)
                                .any(|arrange| arrange.key == pitch.key),
                            "Pitch cell {} has no arrange cell",
                            pitch
                        );
                        assert!(cells.pitch_shift(&pitch.key, pitch.column).is_some());
                    }
                }
            })
        };

        editor.join().unwrap();
        reader.join().unwrap();
    }
}
