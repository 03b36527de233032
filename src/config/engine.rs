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
use std::path::Path;
use std::time::Duration;

use config::{Config, File};
use duration_string::DurationString;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::clock::{Tempo, TimeSignature};
use crate::params::{TrimScaling, DEFAULT_TRIM_COLUMN_SECONDS};

const DEFAULT_GRID_COLUMNS: u32 = 16;
const DEFAULT_GRID_ROWS: u32 = 12;
const DEFAULT_TEMPO_STEP: f64 = 5.0;
const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(5);

/// A YAML representation of the engine configuration.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct EngineConfig {
    /// Number of columns in the grid.
    #[serde(default = "default_grid_columns")]
    grid_columns: u32,

    /// Number of rows in the grid. Feeds the default gain curve.
    #[serde(default = "default_grid_rows")]
    grid_rows: u32,

    /// Starting tempo.
    #[serde(default)]
    tempo: Tempo,

    /// Starting grid subdivision.
    #[serde(default)]
    time_signature: TimeSignature,

    /// Length of one trim column in buffer seconds.
    #[serde(default = "default_trim_column_seconds")]
    trim_column_seconds: f64,

    /// Whether pitch shifts scale the trimmed window.
    #[serde(default)]
    trim_scaling: TrimScaling,

    /// BPM added or removed by one tempo nudge.
    #[serde(default = "default_tempo_step")]
    tempo_step: f64,

    /// How often the host drives the clock, e.g. "5ms".
    tick_interval: Option<String>,
}

fn default_grid_columns() -> u32 {
    DEFAULT_GRID_COLUMNS
}

fn default_grid_rows() -> u32 {
    DEFAULT_GRID_ROWS
}

fn default_trim_column_seconds() -> f64 {
    DEFAULT_TRIM_COLUMN_SECONDS
}

fn default_tempo_step() -> f64 {
    DEFAULT_TEMPO_STEP
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            grid_columns: DEFAULT_GRID_COLUMNS,
            grid_rows: DEFAULT_GRID_ROWS,
            tempo: Tempo::default(),
            time_signature: TimeSignature::default(),
            trim_column_seconds: DEFAULT_TRIM_COLUMN_SECONDS,
            trim_scaling: TrimScaling::default(),
            tempo_step: DEFAULT_TEMPO_STEP,
            tick_interval: None,
        }
    }
}

impl EngineConfig {
    /// Parses an engine config from a YAML file.
    pub fn deserialize(path: &Path) -> Result<EngineConfig, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<EngineConfig>()?)
    }

    /// Overrides the grid width.
    pub fn with_grid_columns(mut self, grid_columns: u32) -> EngineConfig {
        self.grid_columns = grid_columns;
        self
    }

    /// Overrides the starting tempo.
    pub fn with_tempo(mut self, tempo: Tempo) -> EngineConfig {
        self.tempo = tempo;
        self
    }

    /// Overrides the starting time signature.
    pub fn with_time_signature(mut self, time_signature: TimeSignature) -> EngineConfig {
        self.time_signature = time_signature;
        self
    }

    /// Overrides the trim scaling.
    pub fn with_trim_scaling(mut self, trim_scaling: TrimScaling) -> EngineConfig {
        self.trim_scaling = trim_scaling;
        self
    }

    /// Gets the grid width. Never zero.
    pub fn grid_columns(&self) -> u32 {
        self.grid_columns.max(1)
    }

    /// Gets the grid height. Never zero.
    pub fn grid_rows(&self) -> u32 {
        self.grid_rows.max(1)
    }

    /// Gets the starting tempo.
    pub fn tempo(&self) -> Tempo {
        self.tempo
    }

    /// Gets the starting time signature.
    pub fn time_signature(&self) -> TimeSignature {
        self.time_signature
    }

    /// Gets the trim column length, falling back to the default for
    /// non-positive or non-finite values.
    pub fn trim_column_seconds(&self) -> f64 {
        if self.trim_column_seconds.is_finite() && self.trim_column_seconds > 0.0 {
            self.trim_column_seconds
        } else {
            DEFAULT_TRIM_COLUMN_SECONDS
        }
    }

    /// Gets the trim scaling.
    pub fn trim_scaling(&self) -> TrimScaling {
        self.trim_scaling
    }

    /// Gets the tempo nudge size.
    pub fn tempo_step(&self) -> f64 {
        if self.tempo_step.is_finite() {
            self.tempo_step.abs()
        } else {
            DEFAULT_TEMPO_STEP
        }
    }

    /// Returns the tick interval.
    pub fn tick_interval(&self) -> Result<Duration, ConfigError> {
        match &self.tick_interval {
            Some(tick_interval) => Ok(DurationString::from_string(tick_interval.clone())
                .map_err(|e| ConfigError::Duration {
                    value: tick_interval.clone(),
                    reason: e.to_string(),
                })?
                .into()),
            None => Ok(DEFAULT_TICK_INTERVAL),
        }
    }
}
