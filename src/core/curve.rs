//! Voltage to capacity lookup curves
//!
//! A [`CapacityCurve`] is an ordered table of `(voltage_mv, capacity_pct)`
//! breakpoints, strictly decreasing in voltage. One curve exists per charge
//! controller; the tables below were measured on PiSugar 2 hardware.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// IP5209 discharge curve (PiSugar 2, Pi Zero)
pub const IP5209_CURVE: [(i32, i32); 10] = [
    (4160, 100),
    (4050, 95),
    (4000, 80),
    (3920, 65),
    (3860, 40),
    (3790, 25),
    (3660, 10),
    (3520, 6),
    (3490, 3),
    (3100, 0),
];

/// IP5312 discharge curve (PiSugar 2 Pro, Pi 3/4)
pub const IP5312_CURVE: [(i32, i32); 10] = [
    (4100, 100),
    (4050, 95),
    (3900, 88),
    (3800, 77),
    (3700, 65),
    (3620, 55),
    (3580, 49),
    (3490, 25),
    (3320, 4),
    (3100, 0),
];

/// How an averaged voltage is turned into a percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Linear inside the segment that contains the voltage
    #[default]
    Segment,
    /// Base percentage of the lowest breakpoint not above the voltage, plus
    /// an integer-slope correction summed over every segment. Matches the
    /// numbers older PiSugar 2 setups reported.
    Cumulative,
}

/// Immutable voltage → capacity table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapacityCurve {
    points: Vec<(i32, i32)>,
    mode: Interpolation,
}

impl CapacityCurve {
    /// Build a curve, validating the breakpoints
    ///
    /// Requires at least two points, strictly decreasing voltage,
    /// non-increasing percentage, and percentages within 0-100.
    pub fn new(points: &[(i32, i32)], mode: Interpolation) -> Result<Self> {
        if points.len() < 2 {
            return Err(Error::Curve(format!(
                "need at least 2 breakpoints, got {}",
                points.len()
            )));
        }
        for &(mv, pct) in points {
            if !(0..=100).contains(&pct) {
                return Err(Error::Curve(format!(
                    "capacity {}% at {} mV is out of range",
                    pct, mv
                )));
            }
        }
        for pair in points.windows(2) {
            let (hi, lo) = (pair[0], pair[1]);
            if lo.0 >= hi.0 {
                return Err(Error::Curve(format!(
                    "voltage must strictly decrease: {} mV then {} mV",
                    hi.0, lo.0
                )));
            }
            if lo.1 > hi.1 {
                return Err(Error::Curve(format!(
                    "capacity must not increase as voltage drops: {}% then {}%",
                    hi.1, lo.1
                )));
            }
        }
        Ok(Self {
            points: points.to_vec(),
            mode,
        })
    }

    /// IP5209 table
    pub fn ip5209(mode: Interpolation) -> Self {
        Self {
            points: IP5209_CURVE.to_vec(),
            mode,
        }
    }

    /// IP5312 table
    pub fn ip5312(mode: Interpolation) -> Self {
        Self {
            points: IP5312_CURVE.to_vec(),
            mode,
        }
    }

    /// Breakpoints, highest voltage first
    pub fn points(&self) -> &[(i32, i32)] {
        &self.points
    }

    pub fn mode(&self) -> Interpolation {
        self.mode
    }

    /// Convert an averaged voltage to a capacity percentage (0-100)
    pub fn interpolate(&self, avg_voltage_mv: i32) -> i32 {
        let pct = match self.mode {
            Interpolation::Segment => self.segment(avg_voltage_mv),
            Interpolation::Cumulative => self.cumulative(avg_voltage_mv),
        };
        pct.clamp(0, 100)
    }

    fn segment(&self, mv: i32) -> i32 {
        let (top_mv, top_pct) = self.points[0];
        if mv >= top_mv {
            return top_pct;
        }
        for pair in self.points.windows(2) {
            let ((hi_mv, hi_pct), (lo_mv, lo_pct)) = (pair[0], pair[1]);
            if mv >= lo_mv {
                // Multiply first, slopes are below 1 %/mV
                return lo_pct + (mv - lo_mv) * (hi_pct - lo_pct) / (hi_mv - lo_mv);
            }
        }
        self.points[self.points.len() - 1].1
    }

    fn cumulative(&self, mv: i32) -> i32 {
        let mut cap = 0;
        for (i, &(bp_mv, bp_pct)) in self.points.iter().enumerate() {
            if mv >= bp_mv {
                cap = bp_pct;
            }
            if i > 0 {
                let (prev_mv, prev_pct) = self.points[i - 1];
                let k = (prev_pct - bp_pct) / (prev_mv - bp_mv);
                cap += k * (mv - bp_mv);
            }
        }
        cap
    }
}
