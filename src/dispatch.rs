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

//! Column boundary detection and trigger dispatch.

use tracing::{debug, warn};

use crate::cells::{CellStore, Role};
use crate::clock::{mapper, ClockStep, TimeSignature};
use crate::params::ParameterResolver;
use crate::playback::{PlayInstruction, SampleEngine};

/// Where the dispatcher is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Nothing crossed since the last update.
    Idle,
    /// The last update crossed into `column`.
    Firing { column: u32 },
}

/// What a single update did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Column boundaries crossed.
    pub columns_crossed: u32,
    /// Play instructions issued.
    pub triggered: usize,
    /// Cells skipped because their sample wasn't available.
    pub skipped: usize,
}

/// Watches the clock for column changes and fires the arrange cells of every
/// column it enters.
#[derive(Debug)]
pub struct TriggerDispatcher {
    /// Unwrapped index of the last column fired. `None` is the out-of-range
    /// marker: the next update always fires the column it lands in.
    last_column: Option<u64>,
    state: DispatchState,
}

impl TriggerDispatcher {
    pub fn new() -> TriggerDispatcher {
        TriggerDispatcher {
            last_column: None,
            state: DispatchState::Idle,
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Forgets the last fired column so the next update fires unconditionally.
    pub fn reset(&mut self) {
        self.last_column = None;
        self.state = DispatchState::Idle;
    }

    /// Shifts the marker back by one loop after the clock wrapped.
    pub fn rebase(&mut self, grid_columns: u32) {
        self.last_column = self
            .last_column
            .map(|last| last.saturating_sub(u64::from(grid_columns)));
    }

    /// Processes one clock step, firing every column entered during it at the
    /// exact time its boundary was reached. At most one full pass over the
    /// grid is fired per step.
    pub fn update(
        &mut self,
        step: &ClockStep,
        time_signature: TimeSignature,
        grid_columns: u32,
        cells: &CellStore,
        resolver: &ParameterResolver,
        engine: &dyn SampleEngine,
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        let current = mapper::elapsed_columns(step.to_ticks as u64, time_signature);
        let mut first = match self.last_column {
            Some(last) => last + 1,
            None => mapper::elapsed_columns(step.from_ticks as u64, time_signature),
        };

        if first > current {
            self.state = DispatchState::Idle;
            return report;
        }

        let limit = u64::from(grid_columns.max(1));
        if current - first + 1 > limit {
            debug!(
                skipped = current - first + 1 - limit,
                "Clock step spans more than one loop, dropping oldest columns"
            );
            first = current + 1 - limit;
        }

        for column in first..=current {
            let start_tick = mapper::column_start_tick(column, time_signature);
            let scheduled_time = step.time_at_tick(start_tick as f64);
            let wrapped = mapper::wrap_column(column, grid_columns);
            self.fire_column(wrapped, scheduled_time, cells, resolver, engine, &mut report);
            report.columns_crossed += 1;
        }

        self.last_column = Some(current);
        self.state = DispatchState::Firing {
            column: mapper::wrap_column(current, grid_columns),
        };
        report
    }

    fn fire_column(
        &self,
        column: u32,
        scheduled_time: f64,
        cells: &CellStore,
        resolver: &ParameterResolver,
        engine: &dyn SampleEngine,
        report: &mut DispatchReport,
    ) {
        for cell in cells.cells_at_column(column, Role::Arrange) {
            if !resolver.library().is_loaded(&cell.key) {
                warn!(key = %cell.key, column, "Sample not loaded, skipping trigger");
                report.skipped += 1;
                continue;
            }
            let params = match resolver.resolve(cells, &cell.key, column) {
                Some(params) => params,
                None => {
                    warn!(key = %cell.key, column, "No buffer for sample, skipping trigger");
                    report.skipped += 1;
                    continue;
                }
            };

            engine.play(PlayInstruction {
                key: cell.key.clone(),
                scheduled_time,
                start_offset: params.start_offset,
                duration: params.duration,
                rate: params.playback_rate,
                gain_db: params.gain_db,
            });
            report.triggered += 1;
            debug!(key = %cell.key, column, scheduled_time, "Cell triggered");
        }
    }
}

impl Default for TriggerDispatcher {
    fn default() -> Self {
        TriggerDispatcher::new()
    }
}
