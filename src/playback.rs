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

//! The boundary to the audio backend.
//!
//! The sequencer never decodes or mixes audio itself. It asks a
//! [`SampleLibrary`] what is loaded and how long it is, and tells a
//! [`SampleEngine`] what to play and when.

mod bank;
mod channel;
pub mod mock;

pub use bank::{LoadedSample, SampleBank};
pub use channel::ChannelSampleEngine;

use crate::cells::SampleKey;

/// Read access to the decoded sample buffers.
pub trait SampleLibrary: Send + Sync {
    /// The name of the sample a trigger key plays.
    fn sample_name(&self, key: &SampleKey) -> Option<String>;

    /// Length of the named sample's buffer in seconds, if it is loaded.
    fn buffer_duration(&self, sample_name: &str) -> Option<f64>;

    /// Returns true if the key's sample is loaded and ready to play.
    fn is_loaded(&self, key: &SampleKey) -> bool;
}

/// One playback request.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayInstruction {
    pub key: SampleKey,
    /// Clock time, in seconds, at which playback should begin.
    pub scheduled_time: f64,
    /// Position in the buffer to start from, in seconds.
    pub start_offset: f64,
    /// How long to play, in seconds.
    pub duration: f64,
    pub rate: f64,
    pub gain_db: f64,
}

/// Starts sample playback. Fire-and-forget: failures are the backend's to
/// report.
pub trait SampleEngine: Send + Sync {
    fn play(&self, instruction: PlayInstruction);
}
