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
use std::slice::Iter;

use crate::dynamics::total_energy;
use crate::linalg::Vector3;
use crate::state::NBodyState;
use crate::utils::nan_max;

/// A snapshot of the body ensemble kept by a fixed horizon propagation.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    /// Simulation clock, in days
    pub time: f64,
    /// Total energy, in M_sun AU^2 d^-2
    pub energy: f64,
    pub positions: Vec<Vector3<f64>>,
    pub velocities: Vec<Vector3<f64>>,
}

impl Sample {
    pub fn from_state(state: &NBodyState) -> Self {
        Self {
            time: state.time(),
            energy: total_energy(state),
            positions: state.positions().to_vec(),
            velocities: state.velocities().to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Time ordered samples of a propagation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trajectory {
    samples: Vec<Sample>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample. Samples must be pushed in increasing time order, and a sample at the
    /// same time as the last one replaces it.
    pub fn push(&mut self, sample: Sample) {
        match self.samples.last_mut() {
            Some(last) if last.time == sample.time => *last = sample,
            _ => self.samples.push(sample),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn iter(&self) -> Iter<'_, Sample> {
        self.samples.iter()
    }

    /// Largest relative deviation of the total energy from its value at the first sample.
    ///
    /// Returns `NaN` if any sample has a non-finite energy, and zero for fewer than two samples.
    pub fn energy_drift(&self) -> f64 {
        let Some(first) = self.first() else {
            return 0.0;
        };
        let reference = first.energy;
        nan_max(self.samples.iter().map(|s| {
            if reference == 0.0 {
                (s.energy - reference).abs()
            } else {
                ((s.energy - reference) / reference).abs()
            }
        }))
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Sample;
    type IntoIter = Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => write!(
                f,
                "Trajectory of {} bodies from {} to {} days ({} samples)",
                first.len(),
                first.time,
                last.time,
                self.len()
            ),
            _ => write!(f, "Empty trajectory"),
        }
    }
}
