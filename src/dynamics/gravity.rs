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

use crate::linalg::{DVector, Matrix3xX, Vector3};

/// Evaluates the mutual Newtonian acceleration of every body.
///
/// For body `j`, the acceleration is `-G Σ_{k≠j} m_k (x_j - x_k) / |x_j - x_k|³`.
/// Implementations are pure functions of the positions: they hold no state and are called once
/// per integrator stage. Coincident bodies are not filtered out; the division by zero produces
/// `inf` or `NaN`, which the energy check later reports as an instability.
pub trait AccelerationKernel: fmt::Debug {
    /// Overwrites `accel` with the accelerations at `positions`.
    fn accelerations_into(
        &self,
        positions: &[Vector3<f64>],
        masses: &[f64],
        grav_constant: f64,
        accel: &mut [Vector3<f64>],
    );

    /// Allocating version of [`AccelerationKernel::accelerations_into`].
    fn accelerations(
        &self,
        positions: &[Vector3<f64>],
        masses: &[f64],
        grav_constant: f64,
    ) -> Vec<Vector3<f64>> {
        let mut accel = vec![Vector3::zeros(); positions.len()];
        self.accelerations_into(positions, masses, grav_constant, &mut accel);
        accel
    }
}

/// Evaluates each unordered pair once and applies the scaled separation to both bodies.
///
/// This is the reference kernel: for two equal masses the two accelerations are exactly opposite.
#[derive(Copy, Clone, Debug, Default)]
pub struct Pairwise;

impl AccelerationKernel for Pairwise {
    fn accelerations_into(
        &self,
        positions: &[Vector3<f64>],
        masses: &[f64],
        grav_constant: f64,
        accel: &mut [Vector3<f64>],
    ) {
        accel.iter_mut().for_each(|a| *a = Vector3::zeros());

        let n = positions.len();
        for j in 0..n {
            for k in (j + 1)..n {
                let r_jk = positions[j] - positions[k];
                let scaled = r_jk * (grav_constant / r_jk.norm().powi(3));
                accel[j] -= scaled * masses[k];
                accel[k] += scaled * masses[j];
            }
        }
    }
}

/// Computes each body's acceleration as one matrix-vector product: the 3×N matrix of separations
/// from that body times the vector of `m_k / r³` weights.
///
/// Mathematically identical to [`Pairwise`], but does not exploit the pair symmetry so results
/// may differ in the last bits.
#[derive(Copy, Clone, Debug, Default)]
pub struct Batched;

impl AccelerationKernel for Batched {
    fn accelerations_into(
        &self,
        positions: &[Vector3<f64>],
        masses: &[f64],
        grav_constant: f64,
        accel: &mut [Vector3<f64>],
    ) {
        let n = positions.len();
        for j in 0..n {
            // Columns are x_k - x_j
            let separations = Matrix3xX::from_fn(n, |row, col| positions[col][row] - positions[j][row]);
            let weights = DVector::from_fn(n, |k, _| {
                if k == j {
                    0.0
                } else {
                    masses[k] / separations.column(k).norm().powi(3)
                }
            });
            accel[j] = (separations * weights) * grav_constant;
        }
    }
}
