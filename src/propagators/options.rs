/*
    Gravity Sim, N-body gravity integration for real-time simulators
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use std::fmt;

use serde_derive::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::io::ConfigRepr;

/// Admissible range of the fixed step size, in days.
pub const DT_RANGE: (f64, f64) = (1e-10, 100.0);
/// Admissible range of the number of fixed sub-steps per frame.
pub const TIME_SPEED_RANGE: (u32, u32) = (1, 200_000);
/// Admissible range of the integration tolerance.
pub const TOLERANCE_RANGE: (f64, f64) = (1e-15, 1e-4);
/// Admissible range of the expected time scale, in days.
pub const TIME_SCALE_RANGE: (f64, f64) = (1.0, 1e10);
/// Admissible range of the per-frame micro-step budget bounds.
pub const ITERATION_RANGE: (u32, u32) = (1, 50_000);

/// PropOpts stores the integration options shared by all the integrators.
///
/// The fixed step methods only use `dt` and `time_speed`. The adaptive methods use the
/// tolerance, the expected time scale (which sets both the step size floor and the early exit
/// threshold of a frame), and the per-frame micro-step budget.
#[derive(Clone, Copy, Debug, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(doc)]
#[serde(default)]
pub struct PropOpts {
    /// Fixed step size, in days
    #[builder(default = 0.1)]
    pub dt: f64,
    /// Number of fixed steps per frame
    #[builder(default = 1)]
    pub time_speed: u32,
    /// IAS15 tolerance, and both the absolute and relative tolerance of the embedded RK methods
    #[builder(default = 1e-6)]
    pub tolerance: f64,
    /// Characteristic duration of the simulation, in days
    #[builder(default = 1e4)]
    pub expected_time_scale: f64,
    #[builder(default = 1)]
    pub min_iteration: u32,
    #[builder(default = 10)]
    pub max_iteration: u32,
    /// Bodies farther than this on any axis are removed, in AU
    #[builder(default = 1e5)]
    pub max_range: f64,
}

impl Default for PropOpts {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PropOpts {
    /// Options for fixed step integration with the provided step and number of steps per frame.
    pub fn with_fixed_step(dt: f64, time_speed: u32) -> Self {
        Self::builder().dt(dt).time_speed(time_speed).build()
    }

    /// Options for adaptive integration at the provided tolerance.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self::builder().tolerance(tolerance).build()
    }

    /// Smallest step size an adaptive integrator may use, in days.
    pub fn step_floor(&self) -> f64 {
        self.expected_time_scale * 1e-12
    }

    /// Simulated time after which an adaptive frame may stop early, in days.
    pub fn early_exit_span(&self) -> f64 {
        self.expected_time_scale * 1e-5
    }

    /// Simulated time covered by one frame of a fixed step integrator, in days.
    pub fn frame_span(&self) -> f64 {
        self.dt * f64::from(self.time_speed)
    }

    /// Returns a copy of these options with every value brought back into its admissible range.
    pub fn clamped(&self) -> Self {
        let mut opts = *self;
        opts.dt = clamp_f64("dt", self.dt, DT_RANGE, Self::default().dt);
        opts.tolerance = clamp_f64(
            "tolerance",
            self.tolerance,
            TOLERANCE_RANGE,
            Self::default().tolerance,
        );
        opts.expected_time_scale = clamp_f64(
            "expected_time_scale",
            self.expected_time_scale,
            TIME_SCALE_RANGE,
            Self::default().expected_time_scale,
        );
        opts.time_speed = clamp_u32("time_speed", self.time_speed, TIME_SPEED_RANGE);
        opts.max_iteration = clamp_u32("max_iteration", self.max_iteration, ITERATION_RANGE);
        opts.min_iteration = clamp_u32("min_iteration", self.min_iteration, ITERATION_RANGE);
        if opts.min_iteration > opts.max_iteration {
            warn!(
                "min_iteration {} exceeds max_iteration {}, lowering it",
                opts.min_iteration, opts.max_iteration
            );
            opts.min_iteration = opts.max_iteration;
        }
        if !(self.max_range.is_finite() && self.max_range > 0.0) {
            warn!(
                "max_range {} is not a positive distance, using {}",
                self.max_range,
                Self::default().max_range
            );
            opts.max_range = Self::default().max_range;
        }
        opts
    }
}

fn clamp_f64(name: &str, value: f64, (min, max): (f64, f64), default: f64) -> f64 {
    if value.is_nan() {
        warn!("{name} is NaN, using {default:e}");
        default
    } else if value < min {
        warn!("{name} {value:e} is below {min:e}, clamping");
        min
    } else if value > max {
        warn!("{name} {value:e} is above {max:e}, clamping");
        max
    } else {
        value
    }
}

fn clamp_u32(name: &str, value: u32, (min, max): (u32, u32)) -> u32 {
    if value < min {
        warn!("{name} {value} is below {min}, clamping");
        min
    } else if value > max {
        warn!("{name} {value} is above {max}, clamping");
        max
    } else {
        value
    }
}

impl fmt::Display for PropOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dt: {:e} d x{}, tol: {:e}, time scale: {:e} d, iterations: [{}, {}], range: {:e} AU",
            self.dt,
            self.time_speed,
            self.tolerance,
            self.expected_time_scale,
            self.min_iteration,
            self.max_iteration,
            self.max_range
        )
    }
}

impl ConfigRepr for PropOpts {}

#[cfg(test)]
mod ut_options {
    use super::*;

    #[test]
    fn defaults() {
        let opts = PropOpts::default();
        assert_eq!(opts.dt, 0.1);
        assert_eq!(opts.time_speed, 1);
        assert_eq!(opts.tolerance, 1e-6);
        assert_eq!(opts.expected_time_scale, 1e4);
        assert_eq!(opts.min_iteration, 1);
        assert_eq!(opts.max_iteration, 10);
        assert_eq!(opts.max_range, 1e5);
        assert_eq!(opts.step_floor(), 1e-8);
        assert_eq!(opts.clamped(), opts);
    }

    #[test]
    fn clamping() {
        let opts = PropOpts::builder()
            .dt(1e3)
            .time_speed(0)
            .tolerance(1e-20)
            .expected_time_scale(f64::NAN)
            .min_iteration(100)
            .max_iteration(60_000)
            .max_range(-1.0)
            .build()
            .clamped();
        assert_eq!(opts.dt, 100.0);
        assert_eq!(opts.time_speed, 1);
        assert_eq!(opts.tolerance, 1e-15);
        assert_eq!(opts.expected_time_scale, 1e4);
        assert_eq!(opts.max_iteration, 50_000);
        assert_eq!(opts.min_iteration, 100);
        assert_eq!(opts.max_range, 1e5);

        let opts = PropOpts::builder()
            .min_iteration(20)
            .max_iteration(5)
            .build()
            .clamped();
        assert_eq!(opts.min_iteration, 5);
        assert_eq!(opts.max_iteration, 5);
    }

    #[test]
    fn partial_yaml() {
        let opts = PropOpts::loads("tolerance: 1.0e-9\nmax_iteration: 300\n").unwrap();
        assert_eq!(opts.tolerance, 1e-9);
        assert_eq!(opts.max_iteration, 300);
        assert_eq!(opts.dt, 0.1);
        assert_eq!(opts.frame_span(), 0.1);
    }
}
