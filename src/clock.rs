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

//! The musical clock that drives the sequencer.
//!
//! The clock never runs on its own. The host calls [`ClockSource::advance`]
//! from its audio or frame scheduler with the wall time that passed, and the
//! clock converts that into ticks at the current tempo. Fractional ticks are
//! carried between calls so the position never drifts.

use std::time::Duration;

use tracing::{debug, info, warn};

pub mod mapper;
mod signature;

pub use signature::{Tempo, TimeSignature, DEFAULT_BPM, MAX_BPM, MIN_BPM};

pub(crate) use signature::signature_from_value_logged;

/// Snapshot of the clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockState {
    /// Whether the clock is advancing.
    pub running: bool,
    /// Whole ticks elapsed since start or the last wrap.
    pub ticks: u64,
    /// The current tempo.
    pub tempo: Tempo,
    /// The current grid subdivision.
    pub time_signature: TimeSignature,
}

/// The span of musical time covered by a single call to [`ClockSource::advance`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockStep {
    /// Exact tick position at the start of the step.
    pub from_ticks: f64,
    /// Exact tick position at the end of the step.
    pub to_ticks: f64,
    /// Clock time in seconds at the start of the step.
    pub from_seconds: f64,
    /// Tick rate in effect for the whole step.
    pub ticks_per_second: f64,
}

impl ClockStep {
    /// The clock time at which the given tick is (or was) reached within this
    /// step. Ticks before the step map onto its start.
    pub fn time_at_tick(&self, tick: f64) -> f64 {
        let offset = (tick - self.from_ticks).max(0.0);
        self.from_seconds + offset / self.ticks_per_second
    }

    /// Clock time at the end of the step.
    pub fn to_seconds(&self) -> f64 {
        self.time_at_tick(self.to_ticks)
    }
}

/// Produces the advancing musical position.
#[derive(Debug)]
pub struct ClockSource {
    state: ClockState,
    /// Fractional tick carried over between advances.
    fraction: f64,
    /// Running time in seconds. Only grows, and only while running.
    seconds: f64,
}

impl ClockSource {
    /// Creates a stopped clock.
    pub fn new(tempo: Tempo, time_signature: TimeSignature) -> ClockSource {
        ClockSource {
            state: ClockState {
                running: false,
                ticks: 0,
                tempo,
                time_signature,
            },
            fraction: 0.0,
            seconds: 0.0,
        }
    }

    /// Gets a snapshot of the clock state.
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Returns true if the clock is advancing.
    pub fn is_running(&self) -> bool {
        self.state.running
    }

    /// Gets the current tempo.
    pub fn tempo(&self) -> Tempo {
        self.state.tempo
    }

    /// Gets the current time signature.
    pub fn time_signature(&self) -> TimeSignature {
        self.state.time_signature
    }

    /// The clock's running time in seconds. Monotonically non-decreasing for
    /// the lifetime of the clock; stopping does not rewind it.
    pub fn seconds(&self) -> f64 {
        self.seconds
    }

    /// The exact tick position including the carried fraction.
    pub fn exact_ticks(&self) -> f64 {
        self.state.ticks as f64 + self.fraction
    }

    fn ticks_per_second(&self) -> f64 {
        self.state.tempo.beats_per_second() * mapper::PPQ as f64
    }

    /// Starts advancing from the current tick count.
    pub fn start(&mut self) {
        if self.state.running {
            return;
        }
        self.state.running = true;
        info!(
            tempo = self.state.tempo.bpm(),
            signature = %self.state.time_signature,
            "Clock started"
        );
    }

    /// Stops the clock and rewinds the tick count. Calling this while already
    /// stopped changes nothing.
    pub fn stop(&mut self) {
        if !self.state.running {
            return;
        }
        self.state.running = false;
        self.state.ticks = 0;
        self.fraction = 0.0;
        info!("Clock stopped");
    }

    /// Sets the tempo, clamped into range. Phase is preserved. Non-finite
    /// values are ignored.
    pub fn set_tempo(&mut self, bpm: f64) {
        match Tempo::new(bpm) {
            Some(tempo) => {
                if tempo.bpm() != bpm {
                    debug!(requested = bpm, clamped = tempo.bpm(), "Tempo clamped");
                }
                self.state.tempo = tempo;
            }
            None => warn!(bpm, "Ignoring invalid tempo"),
        }
    }

    /// Changes the subdivision. The tick count is rescaled so the position
    /// within the current column is unchanged.
    pub fn set_time_signature(&mut self, time_signature: TimeSignature) {
        let old = self.state.time_signature;
        if old == time_signature {
            return;
        }
        let scale = mapper::ticks_per_column(time_signature) as f64
            / mapper::ticks_per_column(old) as f64;
        let rescaled = self.exact_ticks() * scale;
        self.state.ticks = rescaled.floor() as u64;
        self.fraction = rescaled - rescaled.floor();
        self.state.time_signature = time_signature;
        debug!(from = %old, to = %time_signature, "Time signature changed");
    }

    /// Advances the clock by `elapsed` wall time. Returns the musical span that
    /// was covered, or `None` when the clock is stopped.
    pub fn advance(&mut self, elapsed: Duration) -> Option<ClockStep> {
        if !self.state.running {
            return None;
        }

        let ticks_per_second = self.ticks_per_second();
        let from_ticks = self.exact_ticks();
        let from_seconds = self.seconds;

        let to_ticks = from_ticks + elapsed.as_secs_f64() * ticks_per_second;
        self.state.ticks = to_ticks.floor() as u64;
        self.fraction = to_ticks - to_ticks.floor();
        self.seconds += elapsed.as_secs_f64();

        Some(ClockStep {
            from_ticks,
            to_ticks,
            from_seconds,
            ticks_per_second,
        })
    }

    /// Pulls the tick count back by one loop length once it has passed the
    /// end of the grid. Returns true if a wrap happened.
    pub fn wrap(&mut self, loop_ticks: u64) -> bool {
        if loop_ticks == 0 || self.state.ticks < loop_ticks {
            return false;
        }
        self.state.ticks -= loop_ticks;
        true
    }
}

impl Default for ClockSource {
    fn default() -> Self {
        ClockSource::new(Tempo::default(), TimeSignature::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopped_clock_does_not_advance() {
        let mut clock = ClockSource::default();
        assert!(clock.advance(Duration::from_secs(1)).is_none());
        assert_eq!(clock.state().ticks, 0);
        assert_eq!(clock.seconds(), 0.0);
    }

    #[test]
    fn test_advance_one_beat() {
        let mut clock = ClockSource::default();
        clock.start();
        // 120 BPM, so half a second is one beat.
        let step = clock.advance(Duration::from_millis(500)).unwrap();
        assert_eq!(step.from_ticks, 0.0);
        assert!((step.to_ticks - mapper::PPQ as f64).abs() < 1e-6);
        assert_eq!(clock.state().ticks, mapper::PPQ);
        assert!((step.to_seconds() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_fraction_carries_between_advances() {
        let mut clock = ClockSource::default();
        clock.start();
        // 1920 ticks per second, so 1ms is 1.92 ticks.
        for _ in 0..500 {
            clock.advance(Duration::from_millis(1));
        }
        assert!((clock.exact_ticks() - mapper::PPQ as f64).abs() < 1e-6);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut clock = ClockSource::default();
        clock.start();
        clock.advance(Duration::from_millis(300));
        clock.stop();
        let after_first = clock.state();
        let seconds = clock.seconds();
        clock.stop();
        assert_eq!(clock.state(), after_first);
        assert_eq!(clock.seconds(), seconds);
        assert_eq!(after_first.ticks, 0);
        assert!(!after_first.running);
    }

    #[test]
    fn test_tempo_change_keeps_phase() {
        let mut clock = ClockSource::default();
        clock.start();
        clock.advance(Duration::from_millis(250));
        let ticks = clock.exact_ticks();
        clock.set_tempo(60.0);
        assert_eq!(clock.exact_ticks(), ticks);
        assert_eq!(clock.tempo().bpm(), 60.0);

        clock.set_tempo(1000.0);
        assert_eq!(clock.tempo().bpm(), MAX_BPM);

        clock.set_tempo(f64::NAN);
        assert_eq!(clock.tempo().bpm(), MAX_BPM);
    }

    #[test]
    fn test_signature_change_keeps_column_position() {
        let mut clock = ClockSource::default();
        clock.start();
        // Two and a half quarter-signature columns.
        clock.advance(Duration::from_secs_f64(2.5 * 0.125));
        let before = mapper::current_column(&clock.state(), 16);
        clock.set_time_signature(TimeSignature::Sixteenth);
        assert_eq!(mapper::current_column(&clock.state(), 16), before);
        clock.set_time_signature(TimeSignature::Half);
        assert_eq!(mapper::current_column(&clock.state(), 16), before);
    }

    #[test]
    fn test_wrap() {
        let mut clock = ClockSource::default();
        clock.start();
        clock.advance(Duration::from_secs(3));
        let loop_ticks = mapper::loop_ticks(TimeSignature::Quarter, 16);
        assert!(clock.state().ticks < loop_ticks * 2);
        assert!(clock.wrap(loop_ticks));
        assert!(!clock.wrap(loop_ticks));
        assert!(clock.state().ticks < loop_ticks);
    }

    #[test]
    fn test_time_at_tick() {
        let step = ClockStep {
            from_ticks: 100.0,
            to_ticks: 300.0,
            from_seconds: 2.0,
            ticks_per_second: 100.0,
        };
        assert_eq!(step.time_at_tick(200.0), 3.0);
        assert_eq!(step.time_at_tick(50.0), 2.0);
        assert_eq!(step.to_seconds(), 4.0);
    }
}
