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

use snafu::prelude::*;

use crate::io::ConfigError;

/// Errors surfaced to the caller of the simulation core.
///
/// Numerical singularities are not errors: they propagate as `inf`/`NaN` and are only reported
/// through [`SimError::Instability`] once the total energy is no longer a number.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SimError {
    #[snafu(display("unknown integrator `{name}`, expected one of: {expected}"))]
    UnknownIntegrator { name: String, expected: String },
    #[snafu(display("unknown scenario `{name}`, expected one of: {expected}"))]
    UnknownScenario { name: String, expected: String },
    #[snafu(display(
        "no embedded Runge-Kutta tableau for order code {order}, expected one of 45, 54, 65 or 78"
    ))]
    InvalidTableau { order: u8 },
    #[snafu(display(
        "body arrays differ in length: {positions} positions, {velocities} velocities, {masses} masses"
    ))]
    BodyCountMismatch {
        positions: usize,
        velocities: usize,
        masses: usize,
    },
    #[snafu(display("total energy is NaN at t = {time} days: configuration is numerically unstable"))]
    Instability { time: f64 },
    #[snafu(display("body index {index} is out of range for {count} bodies"))]
    BodyIndex { index: usize, count: usize },
    #[snafu(display("could not load configuration: {source}"))]
    ConfigLoad { source: ConfigError },
    #[snafu(display("could not export trajectory: {source}"))]
    TrajectoryExport { source: ConfigError },
}

impl PartialEq for SimError {
    /// Two errors are equal when they are the same variant with the same plain fields.
    /// Configuration and export errors wrap I/O errors and never compare equal.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::UnknownIntegrator { name: n1, .. },
                Self::UnknownIntegrator { name: n2, .. },
            ) => n1 == n2,
            (Self::UnknownScenario { name: n1, .. }, Self::UnknownScenario { name: n2, .. }) => {
                n1 == n2
            }
            (Self::InvalidTableau { order: o1 }, Self::InvalidTableau { order: o2 }) => o1 == o2,
            (
                Self::BodyCountMismatch {
                    positions: p1,
                    velocities: v1,
                    masses: m1,
                },
                Self::BodyCountMismatch {
                    positions: p2,
                    velocities: v2,
                    masses: m2,
                },
            ) => p1 == p2 && v1 == v2 && m1 == m2,
            (Self::Instability { time: t1 }, Self::Instability { time: t2 }) => {
                t1 == t2 || (t1.is_nan() && t2.is_nan())
            }
            (
                Self::BodyIndex {
                    index: i1,
                    count: c1,
                },
                Self::BodyIndex {
                    index: i2,
                    count: c2,
                },
            ) => i1 == i2 && c1 == c2,
            _ => false,
        }
    }
}
