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

/// Newtonian point-mass accelerations, with a pairwise and a batched back end.
pub mod gravity;
pub use self::gravity::{AccelerationKernel, Batched, Pairwise};

/// Total mechanical energy, used to detect numerical instability.
pub mod energy;
pub use self::energy::{kinetic_energy, potential_energy, total_energy};
