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

//! In-memory sample storage.
//!
//! Decoding is left to the host; buffers arrive here already in memory.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::SampleLibrary;
use crate::cells::SampleKey;

/// A decoded sample. The data is shared so voices can play it without copying.
#[derive(Clone)]
pub struct LoadedSample {
    /// Interleaved f32 samples.
    data: Arc<Vec<f32>>,
    channel_count: u16,
    sample_rate: u32,
}

impl LoadedSample {
    /// Creates a sample from interleaved data.
    pub fn new(data: Vec<f32>, channel_count: u16, sample_rate: u32) -> LoadedSample {
        LoadedSample {
            data: Arc::new(data),
            channel_count: channel_count.max(1),
            sample_rate: sample_rate.max(1),
        }
    }

    /// Creates a silent sample of the given length.
    pub fn silence(seconds: f64, channel_count: u16, sample_rate: u32) -> LoadedSample {
        let frames = (seconds.max(0.0) * f64::from(sample_rate)).round() as usize;
        LoadedSample::new(
            vec![0.0; frames * usize::from(channel_count.max(1))],
            channel_count,
            sample_rate,
        )
    }

    /// Number of frames in the buffer.
    pub fn frames(&self) -> usize {
        self.data.len() / usize::from(self.channel_count)
    }

    /// Length of the buffer in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

impl std::fmt::Debug for LoadedSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedSample")
            .field("frames", &self.frames())
            .field("channel_count", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}

/// Holds loaded samples by name and the trigger keys assigned to them.
#[derive(Default)]
pub struct SampleBank {
    samples: RwLock<HashMap<String, LoadedSample>>,
    keys: RwLock<HashMap<SampleKey, String>>,
}

impl SampleBank {
    pub fn new() -> SampleBank {
        SampleBank::default()
    }

    /// Stores a sample under `name`, replacing any previous buffer.
    pub fn insert(&self, name: &str, sample: LoadedSample) {
        info!(
            name,
            duration = sample.duration(),
            memory_kb = sample.memory_size() / 1024,
            "Sample stored"
        );
        self.samples.write().insert(name.to_string(), sample);
    }

    /// Drops a sample. Keys pointing at it stay assigned but report unloaded.
    pub fn remove(&self, name: &str) -> Option<LoadedSample> {
        self.samples.write().remove(name)
    }

    /// Points a trigger key at a sample name.
    pub fn assign_key(&self, key: &SampleKey, name: &str) {
        debug!(%key, name, "Key assigned");
        self.keys.write().insert(key.clone(), name.to_string());
    }

    /// Gets a loaded sample by name.
    pub fn get(&self, name: &str) -> Option<LoadedSample> {
        self.samples.read().get(name).cloned()
    }

    /// All keys with an assigned sample, sorted.
    pub fn keys(&self) -> Vec<SampleKey> {
        let mut keys: Vec<SampleKey> = self.keys.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Total memory used by loaded samples.
    fn memory_usage(&self) -> usize {
        self.samples.read().values().map(LoadedSample::memory_size).sum()
    }
}

impl SampleLibrary for SampleBank {
    fn sample_name(&self, key: &SampleKey) -> Option<String> {
        self.keys.read().get(key).cloned()
    }

    fn buffer_duration(&self, sample_name: &str) -> Option<f64> {
        self.samples.read().get(sample_name).map(LoadedSample::duration)
    }

    fn is_loaded(&self, key: &SampleKey) -> bool {
        match self.keys.read().get(key) {
            Some(name) => self.samples.read().contains_key(name),
            None => false,
        }
    }
}

impl std::fmt::Debug for SampleBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleBank")
            .field("samples", &self.samples.read().len())
            .field("keys", &self.keys.read().len())
            .field("memory_kb", &(self.memory_usage() / 1024))
            .finish()
    }
}
