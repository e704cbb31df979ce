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

use snafu::ensure;

use crate::dynamics::AccelerationKernel;
use crate::errors::{BodyCountMismatchSnafu, BodyIndexSnafu, SimError};
use crate::linalg::Vector3;

/// A point mass. Positions are in AU, velocities in AU per day, and masses in solar masses.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Body {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub mass: f64,
}

impl Body {
    pub fn new(position: Vector3<f64>, velocity: Vector3<f64>, mass: f64) -> Self {
        Self {
            position,
            velocity,
            mass,
        }
    }

    /// A body with zero initial velocity.
    pub fn at_rest(position: Vector3<f64>, mass: f64) -> Self {
        Self::new(position, Vector3::zeros(), mass)
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m = {:e} M_sun\tr = [{:.6}, {:.6}, {:.6}] AU\tv = [{:.6}, {:.6}, {:.6}] AU/d",
            self.mass,
            self.position.x,
            self.position.y,
            self.position.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z
        )
    }
}

/// The body ensemble stored as parallel arrays, with the simulation clock.
///
/// All arrays always have the same length. Accelerations are a cache: they are only meaningful
/// right after an integrator or [`NBodyState::refresh_accelerations`] has written them.
#[derive(Clone, Debug, PartialEq)]
pub struct NBodyState {
    pub(crate) positions: Vec<Vector3<f64>>,
    pub(crate) velocities: Vec<Vector3<f64>>,
    pub(crate) accelerations: Vec<Vector3<f64>>,
    pub(crate) masses: Vec<f64>,
    pub(crate) grav_constant: f64,
    /// Simulation clock, in days
    pub(crate) time: f64,
}

impl NBodyState {
    /// Builds a state from parallel arrays, which must all have the same length.
    pub fn new(
        positions: Vec<Vector3<f64>>,
        velocities: Vec<Vector3<f64>>,
        masses: Vec<f64>,
        grav_constant: f64,
    ) -> Result<Self, SimError> {
        ensure!(
            positions.len() == velocities.len() && positions.len() == masses.len(),
            BodyCountMismatchSnafu {
                positions: positions.len(),
                velocities: velocities.len(),
                masses: masses.len()
            }
        );

        let accelerations = vec![Vector3::zeros(); positions.len()];
        Ok(Self {
            positions,
            velocities,
            accelerations,
            masses,
            grav_constant,
            time: 0.0,
        })
    }

    pub fn from_bodies(bodies: &[Body], grav_constant: f64) -> Self {
        Self {
            positions: bodies.iter().map(|b| b.position).collect(),
            velocities: bodies.iter().map(|b| b.velocity).collect(),
            accelerations: vec![Vector3::zeros(); bodies.len()],
            masses: bodies.iter().map(|b| b.mass).collect(),
            grav_constant,
            time: 0.0,
        }
    }

    /// A state without any body.
    pub fn empty(grav_constant: f64) -> Self {
        Self::from_bodies(&[], grav_constant)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    pub fn velocities(&self) -> &[Vector3<f64>] {
        &self.velocities
    }

    pub fn accelerations(&self) -> &[Vector3<f64>] {
        &self.accelerations
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    pub fn grav_constant(&self) -> f64 {
        self.grav_constant
    }

    /// Simulation clock in days
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn body(&self, index: usize) -> Option<Body> {
        if index < self.len() {
            Some(Body::new(
                self.positions[index],
                self.velocities[index],
                self.masses[index],
            ))
        } else {
            None
        }
    }

    pub fn bodies(&self) -> Vec<Body> {
        (0..self.len()).filter_map(|i| self.body(i)).collect()
    }

    pub fn push(&mut self, body: Body) {
        self.positions.push(body.position);
        self.velocities.push(body.velocity);
        self.accelerations.push(Vector3::zeros());
        self.masses.push(body.mass);
    }

    pub fn remove(&mut self, index: usize) -> Result<Body, SimError> {
        ensure!(
            index < self.len(),
            BodyIndexSnafu {
                index,
                count: self.len()
            }
        );
        self.accelerations.remove(index);
        Ok(Body::new(
            self.positions.remove(index),
            self.velocities.remove(index),
            self.masses.remove(index),
        ))
    }

    /// Removes every body, the clock is left untouched.
    pub fn clear(&mut self) {
        self.positions.clear();
        self.velocities.clear();
        self.accelerations.clear();
        self.masses.clear();
    }

    /// Removes the bodies with a position component larger than `max_range` in magnitude and
    /// returns how many were removed.
    pub fn cull_out_of_range(&mut self, max_range: f64) -> usize {
        let mut removed = 0;
        let mut i = 0;
        while i < self.len() {
            if self.positions[i].iter().any(|c| c.abs() > max_range) {
                self.positions.remove(i);
                self.velocities.remove(i);
                self.accelerations.remove(i);
                self.masses.remove(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Recomputes the cached accelerations at the current positions.
    pub fn refresh_accelerations(&mut self, kernel: &dyn AccelerationKernel) {
        kernel.accelerations_into(
            &self.positions,
            &self.masses,
            self.grav_constant,
            &mut self.accelerations,
        );
    }
}

impl fmt::Display for NBodyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "t = {} days, {} bodies", self.time, self.len())?;
        for body in self.bodies() {
            writeln!(f, "\t{body}")?;
        }
        Ok(())
    }
}
