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

use crate::linalg::Vector3;
use crate::state::NBodyState;

/// Kinetic energy `Σ ½ m |v|²`.
pub fn kinetic_energy(velocities: &[Vector3<f64>], masses: &[f64]) -> f64 {
    velocities
        .iter()
        .zip(masses)
        .map(|(v, m)| 0.5 * m * v.norm_squared())
        .sum()
}

/// Gravitational potential energy `-Σ_{j<k} G m_j m_k / |x_j - x_k|`.
///
/// Returns `NaN` as soon as two bodies share the exact same position.
pub fn potential_energy(positions: &[Vector3<f64>], masses: &[f64], grav_constant: f64) -> f64 {
    let mut potential = 0.0;
    for j in 0..positions.len() {
        for k in (j + 1)..positions.len() {
            let r_jk = (positions[j] - positions[k]).norm();
            if r_jk == 0.0 {
                return f64::NAN;
            }
            potential -= grav_constant * masses[j] * masses[k] / r_jk;
        }
    }
    potential
}

/// Total mechanical energy of the state, `NaN` signals an instability.
pub fn total_energy(state: &NBodyState) -> f64 {
    kinetic_energy(state.velocities(), state.masses())
        + potential_energy(state.positions(), state.masses(), state.grav_constant())
}
