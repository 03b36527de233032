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
//! A grid step sequencer engine.
//!
//! Cells placed on a grid of columns and rows trigger samples as a musical
//! clock sweeps across the columns. Pitch, volume and trim cells override how
//! each sample plays. The engine owns no audio device: play instructions go to
//! a [`playback::SampleEngine`] supplied by the host.
pub mod cells;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod params;
pub mod playback;
pub mod sequencer;

pub use cells::{Cell, CellError, Role, SampleKey};
pub use clock::{Tempo, TimeSignature};
pub use config::{EngineConfig, Pattern};
pub use params::ResolvedParams;
pub use playback::{PlayInstruction, SampleEngine, SampleLibrary};
pub use sequencer::Sequencer;
