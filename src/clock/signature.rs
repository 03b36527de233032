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

//! Tempo and grid subdivision types.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Slowest allowed tempo.
pub const MIN_BPM: f64 = 20.0;

/// Fastest allowed tempo.
pub const MAX_BPM: f64 = 300.0;

/// Default tempo for a fresh engine.
pub const DEFAULT_BPM: f64 = 120.0;

/// The grid subdivision. Each variant scales the length of one column relative
/// to a sixteenth note: a quarter signature is the 1x grid, sixteenth is 0.25x,
/// half is 2x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSignature {
    Sixteenth,
    Eighth,
    #[default]
    Quarter,
    Half,
}

impl TimeSignature {
    /// All signatures, shortest column first.
    pub const ALL: [TimeSignature; 4] = [
        TimeSignature::Sixteenth,
        TimeSignature::Eighth,
        TimeSignature::Quarter,
        TimeSignature::Half,
    ];

    /// The column length multiplier relative to a sixteenth note.
    pub fn multiplier(&self) -> f64 {
        match self {
            TimeSignature::Sixteenth => 0.25,
            TimeSignature::Eighth => 0.5,
            TimeSignature::Quarter => 1.0,
            TimeSignature::Half => 2.0,
        }
    }

    /// Looks up a signature by its multiplier. Anything other than the four
    /// known values is rejected.
    pub fn from_value(value: f64) -> Option<TimeSignature> {
        TimeSignature::ALL
            .into_iter()
            .find(|sig| sig.multiplier() == value)
    }

    /// The next longer subdivision, saturating at half.
    pub fn longer(&self) -> TimeSignature {
        match self {
            TimeSignature::Sixteenth => TimeSignature::Eighth,
            TimeSignature::Eighth => TimeSignature::Quarter,
            TimeSignature::Quarter | TimeSignature::Half => TimeSignature::Half,
        }
    }

    /// The next shorter subdivision, saturating at sixteenth.
    pub fn shorter(&self) -> TimeSignature {
        match self {
            TimeSignature::Sixteenth | TimeSignature::Eighth => TimeSignature::Sixteenth,
            TimeSignature::Quarter => TimeSignature::Eighth,
            TimeSignature::Half => TimeSignature::Quarter,
        }
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeSignature::Sixteenth => "16th",
            TimeSignature::Eighth => "8th",
            TimeSignature::Quarter => "quarter",
            TimeSignature::Half => "half",
        };
        write!(f, "{} notes", name)
    }
}

/// Beats per minute, always within [`MIN_BPM`, `MAX_BPM`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Tempo(f64);

impl Tempo {
    /// Creates a tempo, clamping into range. Non-finite input yields `None`.
    pub fn new(bpm: f64) -> Option<Tempo> {
        if !bpm.is_finite() {
            return None;
        }
        Some(Tempo(bpm.clamp(MIN_BPM, MAX_BPM)))
    }

    /// Gets the tempo in beats per minute.
    pub fn bpm(&self) -> f64 {
        self.0
    }

    /// Gets the tempo in beats per second.
    pub fn beats_per_second(&self) -> f64 {
        self.0 / 60.0
    }

    /// Returns this tempo moved by `delta` BPM, re-clamped.
    pub fn nudged(&self, delta: f64) -> Tempo {
        Tempo::new(self.0 + delta).unwrap_or(*self)
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo(DEFAULT_BPM)
    }
}

impl TryFrom<f64> for Tempo {
    type Error = String;

    fn try_from(bpm: f64) -> Result<Self, Self::Error> {
        Tempo::new(bpm).ok_or_else(|| format!("tempo {} is not a finite number", bpm))
    }
}

impl From<Tempo> for f64 {
    fn from(tempo: Tempo) -> f64 {
        tempo.0
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.0)
    }
}

/// Parses a legacy signature multiplier, logging and returning `None` when it
/// isn't one of the four known values.
pub(crate) fn signature_from_value_logged(value: f64) -> Option<TimeSignature> {
    let signature = TimeSignature::from_value(value);
    if signature.is_none() {
        warn!(value, "Ignoring unknown time signature value");
    }
    signature
}
