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

//! Row position to parameter value mappings.
//!
//! How a row translates into semitones or decibels is an editor decision, so
//! the engine only sees it through [`ValueCurves`].

/// Quietest audible gain. Anything below is silence.
pub const MIN_GAIN_DB: f64 = -40.0;

/// Loudest allowed gain.
pub const MAX_GAIN_DB: f64 = 6.0;

/// Share of the grid, from the bottom, that maps to silence.
const SILENT_SHARE: f64 = 0.2;

/// Exponent of the row to gain curve.
const GAIN_CURVE_EXPONENT: f64 = 1.5;

/// Converts override cell rows into parameter values.
pub trait ValueCurves: Send + Sync {
    /// Semitone shift for a pitch cell at `pitch_row` bound to an arrange
    /// cell at `arrange_row`.
    fn semitones(&self, arrange_row: i32, pitch_row: i32) -> f64;

    /// Gain in decibels for a volume cell at `row`.
    fn decibels(&self, row: i32) -> f64;
}

/// Clamps a gain into [`MIN_GAIN_DB`, `MAX_GAIN_DB`]. Gains below the floor,
/// and NaN, become silence.
pub fn clamp_gain_db(db: f64) -> f64 {
    if db.is_nan() || db < MIN_GAIN_DB {
        f64::NEG_INFINITY
    } else {
        db.min(MAX_GAIN_DB)
    }
}

/// The stock curves: one row per semitone, and an exponential gain curve where
/// the top row is +6 dB and the bottom fifth of the grid is silent.
#[derive(Debug, Clone, Copy)]
pub struct DefaultCurves {
    grid_rows: u32,
}

impl DefaultCurves {
    pub fn new(grid_rows: u32) -> DefaultCurves {
        DefaultCurves { grid_rows }
    }
}

impl ValueCurves for DefaultCurves {
    fn semitones(&self, arrange_row: i32, pitch_row: i32) -> f64 {
        f64::from(arrange_row - pitch_row)
    }

    fn decibels(&self, row: i32) -> f64 {
        if self.grid_rows < 2 {
            return 0.0;
        }
        let normalized = 1.0 - f64::from(row) / f64::from(self.grid_rows - 1);
        if normalized < SILENT_SHARE {
            return f64::NEG_INFINITY;
        }
        let remapped = ((normalized - SILENT_SHARE) / (1.0 - SILENT_SHARE)).min(1.0);
        let db = MIN_GAIN_DB + (MAX_GAIN_DB - MIN_GAIN_DB) * remapped.powf(GAIN_CURVE_EXPONENT);
        db.clamp(MIN_GAIN_DB, MAX_GAIN_DB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semitones_are_row_delta() {
        let curves = DefaultCurves::new(12);
        assert_eq!(curves.semitones(5, 2), 3.0);
        assert_eq!(curves.semitones(5, 9), -4.0);
    }

    #[test]
    fn test_gain_curve_ends() {
        let curves = DefaultCurves::new(11);
        assert_eq!(curves.decibels(0), MAX_GAIN_DB);
        assert_eq!(curves.decibels(10), f64::NEG_INFINITY);
        assert_eq!(curves.decibels(9), f64::NEG_INFINITY);
        assert!(curves.decibels(7) > MIN_GAIN_DB);
        let mid = curves.decibels(5);
        assert!(mid > MIN_GAIN_DB && mid < MAX_GAIN_DB);
    }

    #[test]
    fn test_clamp_gain() {
        assert_eq!(clamp_gain_db(12.0), MAX_GAIN_DB);
        assert_eq!(clamp_gain_db(-3.0), -3.0);
        assert_eq!(clamp_gain_db(-41.0), f64::NEG_INFINITY);
        assert_eq!(clamp_gain_db(f64::NAN), f64::NEG_INFINITY);
    }
}
