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

use crate::linalg::Vector3;

/// The local error estimate of one block of the state (positions or velocities) over a candidate
/// step.
#[derive(Copy, Clone, Debug)]
pub struct ErrorBlock<'a> {
    /// Difference between the propagated and companion solutions
    pub error: &'a [Vector3<f64>],
    /// Values at the start of the step
    pub previous: &'a [Vector3<f64>],
    /// Propagated values at the end of the step
    pub candidate: &'a [Vector3<f64>],
}

impl<'a> ErrorBlock<'a> {
    /// Iterates over the error of each component divided by its tolerance scale
    /// `abs_tol + rel_tol * max(|previous|, |candidate|)`.
    fn scaled(self, abs_tol: f64, rel_tol: f64) -> impl Iterator<Item = f64> + 'a {
        self.error
            .iter()
            .zip(self.previous.iter().zip(self.candidate.iter()))
            .flat_map(move |(err, (prev, cand))| {
                (0..3).map(move |c| {
                    err[c] / (abs_tol + prev[c].abs().max(cand[c].abs()) * rel_tol)
                })
            })
    }
}

/// The Error Control trait computes the normalized error of a candidate step of the embedded
/// Runge-Kutta methods. A result at most equal to one means the step is within tolerance.
pub trait ErrorCtrl: Copy + Clone + Default + Send + Sync + fmt::Debug {
    fn estimate(
        position: ErrorBlock<'_>,
        velocity: ErrorBlock<'_>,
        abs_tol: f64,
        rel_tol: f64,
    ) -> f64;
}

/// Root mean square of the scaled errors over all the position and velocity components.
///
/// This is the usual norm of Hairer, Nørsett and Wanner, and the default controller.
#[derive(Clone, Copy, Debug, Default)]
pub struct RmsScaled;

impl ErrorCtrl for RmsScaled {
    fn estimate(
        position: ErrorBlock<'_>,
        velocity: ErrorBlock<'_>,
        abs_tol: f64,
        rel_tol: f64,
    ) -> f64 {
        let components = 3 * (position.error.len() + velocity.error.len());
        if components == 0 {
            return 0.0;
        }
        let sum: f64 = position
            .scaled(abs_tol, rel_tol)
            .chain(velocity.scaled(abs_tol, rel_tol))
            .map(|e| e * e)
            .sum();
        (sum / components as f64).sqrt()
    }
}
