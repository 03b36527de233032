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

//! Per-cell playback parameter resolution.
//!
//! Resolved parameters are cached per (key, column). The cell store purges
//! entries itself as part of every mutation, one key or one entry at a time,
//! so a busy editor never stalls lookups for unrelated keys.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cells::{CellStore, SampleKey, TrimRegion};
use crate::playback::SampleLibrary;

mod curves;

pub use curves::{clamp_gain_db, DefaultCurves, ValueCurves, MAX_GAIN_DB, MIN_GAIN_DB};

/// Default length of one trim column: a sixteenth note at 120 BPM.
pub const DEFAULT_TRIM_COLUMN_SECONDS: f64 = 0.125;

/// Everything the sample engine needs to play one cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedParams {
    /// Playback speed, 1.0 being the original pitch.
    pub playback_rate: f64,
    /// Where playback starts in the buffer, in seconds.
    pub start_offset: f64,
    /// How long to play, in seconds.
    pub duration: f64,
    /// Gain in decibels. Negative infinity is silence.
    pub gain_db: f64,
}

impl Default for ResolvedParams {
    fn default() -> Self {
        ResolvedParams {
            playback_rate: 1.0,
            start_offset: 0.0,
            duration: 0.0,
            gain_db: 0.0,
        }
    }
}

/// How a pitch shift affects the length of the trimmed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimScaling {
    /// The window is in buffer time, so its played length divides by the rate.
    #[default]
    Scaled,
    /// The window length is played as-is regardless of rate.
    Unscaled,
}

/// A cache invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Purge {
    /// One (key, column) entry.
    Entry(SampleKey, u32),
    /// Every column of one key.
    Key(SampleKey),
}

/// Cache of resolved parameters keyed by sample key, then column.
#[derive(Debug, Default)]
pub struct ParamCache {
    entries: Mutex<HashMap<SampleKey, HashMap<u32, ResolvedParams>>>,
}

impl ParamCache {
    pub fn new() -> ParamCache {
        ParamCache::default()
    }

    /// Looks up a cached entry.
    pub fn get(&self, key: &SampleKey, column: u32) -> Option<ResolvedParams> {
        self.entries
            .lock()
            .get(key)
            .and_then(|columns| columns.get(&column))
            .copied()
    }

    fn insert(&self, key: &SampleKey, column: u32, params: ResolvedParams) {
        self.entries
            .lock()
            .entry(key.clone())
            .or_default()
            .insert(column, params);
    }

    /// Applies a single invalidation.
    pub fn purge(&self, purge: &Purge) {
        let mut entries = self.entries.lock();
        match purge {
            Purge::Entry(key, column) => {
                if let Some(columns) = entries.get_mut(key) {
                    columns.remove(column);
                    if columns.is_empty() {
                        entries.remove(key);
                    }
                }
            }
            Purge::Key(key) => {
                entries.remove(key);
            }
        }
    }

    /// Number of cached entries across all keys.
    pub fn len(&self) -> usize {
        self.entries.lock().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolves playback rate, trim window and gain for a (key, column) pair.
pub struct ParameterResolver {
    cache: Arc<ParamCache>,
    library: Arc<dyn SampleLibrary>,
    trim_column_seconds: f64,
    trim_scaling: TrimScaling,
}

impl ParameterResolver {
    /// Creates a resolver. The cache must be the one handed to the cell store
    /// so edits purge what this resolver reads.
    pub fn new(
        cache: Arc<ParamCache>,
        library: Arc<dyn SampleLibrary>,
        trim_column_seconds: f64,
        trim_scaling: TrimScaling,
    ) -> ParameterResolver {
        ParameterResolver {
            cache,
            library,
            trim_column_seconds,
            trim_scaling,
        }
    }

    /// The sample collaborator this resolver reads buffer lengths from.
    pub fn library(&self) -> &Arc<dyn SampleLibrary> {
        &self.library
    }

    /// Gets the shared cache.
    pub fn cache(&self) -> &Arc<ParamCache> {
        &self.cache
    }

    /// Converts a trim column into a buffer position in seconds.
    pub fn column_to_time(&self, column: u32) -> f64 {
        f64::from(column) * self.trim_column_seconds
    }

    /// Resolves parameters for the given key and column. Keys without a pitch
    /// cell play at rate 1.0, keys without trim cells play the whole buffer.
    /// Returns `None` when the key's sample has no buffer; nothing is cached
    /// in that case.
    pub fn resolve(
        &self,
        cells: &CellStore,
        key: &SampleKey,
        column: u32,
    ) -> Option<ResolvedParams> {
        if let Some(params) = self.cache.get(key, column) {
            return Some(params);
        }

        let sample_name = self.library.sample_name(key)?;
        let buffer_duration = self.library.buffer_duration(&sample_name)?;

        let semitones = cells.pitch_shift(key, column).unwrap_or(0.0);
        let playback_rate = 2f64.powf(semitones / 12.0);

        let (start_offset, window) = self.trim_window(cells.trim_region_for(key), buffer_duration);
        let duration = match self.trim_scaling {
            TrimScaling::Scaled => window / playback_rate,
            TrimScaling::Unscaled => window,
        };

        let params = ResolvedParams {
            playback_rate,
            start_offset,
            duration,
            gain_db: cells.volume_db(key).unwrap_or(0.0),
        };
        self.cache.insert(key, column, params);
        debug!(%key, column, ?params, "Resolved cell parameters");
        Some(params)
    }

    /// Start offset and window length in buffer seconds, clamped to the buffer.
    fn trim_window(&self, region: Option<TrimRegion>, buffer_duration: f64) -> (f64, f64) {
        match region {
            None => (0.0, buffer_duration),
            Some(region) => {
                let start = self
                    .column_to_time(region.start_column)
                    .min(buffer_duration);
                let end = region
                    .end_column
                    .map(|column| self.column_to_time(column))
                    .unwrap_or(buffer_duration)
                    .min(buffer_duration);
                (start, (end - start).max(0.0))
            }
        }
    }
}

impl std::fmt::Debug for ParameterResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParameterResolver")
            .field("cached", &self.cache.len())
            .field("trim_column_seconds", &self.trim_column_seconds)
            .field("trim_scaling", &self.trim_scaling)
            .finish()
    }
}
