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
use std::str::FromStr;

use enum_iterator::{all, Sequence};
use serde_derive::{Deserialize, Serialize};

use super::Tableau;
use crate::errors::SimError;

/// The integrators available to the simulation, exactly one is active at a time.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    Euler,
    EulerCromer,
    #[default]
    Rk4,
    Leapfrog,
    Rkf45,
    Dopri,
    Dverk,
    Rkf78,
    Ias15,
}

impl IntegratorKind {
    /// Canonical lower case name, as accepted by `from_str`.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Euler => "euler",
            Self::EulerCromer => "euler_cromer",
            Self::Rk4 => "rk4",
            Self::Leapfrog => "leapfrog",
            Self::Rkf45 => "rkf45",
            Self::Dopri => "dopri",
            Self::Dverk => "dverk",
            Self::Rkf78 => "rkf78",
            Self::Ias15 => "ias15",
        }
    }

    /// Whether this integrator controls its own step size from a tolerance.
    pub const fn is_adaptive(&self) -> bool {
        matches!(
            self,
            Self::Rkf45 | Self::Dopri | Self::Dverk | Self::Rkf78 | Self::Ias15
        )
    }

    /// Butcher tableau of the embedded Runge-Kutta methods, `None` for the others.
    pub fn tableau(&self) -> Option<Tableau> {
        match self {
            Self::Rkf45 => Some(Tableau::rkf45()),
            Self::Dopri => Some(Tableau::dopri()),
            Self::Dverk => Some(Tableau::dverk()),
            Self::Rkf78 => Some(Tableau::rkf78()),
            _ => None,
        }
    }

    /// Comma separated list of all the names.
    pub fn names() -> String {
        all::<Self>()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for IntegratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for IntegratorKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        all::<Self>()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| SimError::UnknownIntegrator {
                name: s.to_string(),
                expected: Self::names(),
            })
    }
}
