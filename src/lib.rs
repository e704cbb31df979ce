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


/*! # gravity-sim

N-body gravity integration for real-time simulators: a Newtonian acceleration kernel, an energy
diagnostic, fixed step (Euler, Euler-Cromer, RK4, leapfrog), embedded Runge-Kutta (RKF45,
Dormand-Prince, Verner, RKF78) and IAS15 integrators, and a simulation driver which advances the
body ensemble one rendered frame at a time.

Units are AU, days and solar masses unless stated otherwise.
*/

/// Provides all the integrators, their options and the trajectory container.
pub mod propagators;

/// Provides the Newtonian acceleration kernels and the energy diagnostic.
pub mod dynamics;

/// Utility functions shared by different modules.
pub mod utils;

mod errors;
/// Functions which may fail return an error, numerical singularities are never raised.
pub use self::errors::SimError;

/// Loading of scenario and option files, and export of trajectories.
pub mod io;

/// Preset initial conditions.
pub mod scenarios;

/// The per-frame simulation driver.
pub mod simulation;
pub use self::simulation::{FrameReport, Simulation, StateSnapshot};

mod state;
pub use self::state::{Body, NBodyState};

pub use self::propagators::IntegratorKind;

#[macro_use]
extern crate log;
extern crate hifitime;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}
