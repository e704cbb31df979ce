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


use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use super::{ConfigError, ConfigRepr};
use crate::errors::SimError;
use crate::linalg::Vector3;
use crate::propagators::{IntegratorKind, PropOpts};
use crate::scenarios::{Scenario, GRAV_CONSTANT};
use crate::state::Body;

/// A body as written in a scenario file. Velocity defaults to rest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodySerde {
    pub name: Option<String>,
    /// AU
    pub position: [f64; 3],
    /// AU/d
    #[serde(default)]
    pub velocity: [f64; 3],
    /// M_sun
    pub mass: f64,
}

impl BodySerde {
    pub fn as_body(&self) -> Result<Body, ConfigError> {
        if !(self.mass.is_finite() && self.mass >= 0.0) {
            return Err(ConfigError::InvalidConfig {
                msg: format!(
                    "mass of {} must be a non-negative number, got {}",
                    self.name.as_deref().unwrap_or("unnamed body"),
                    self.mass
                ),
            });
        }
        Ok(Body::new(
            Vector3::from(self.position),
            Vector3::from(self.velocity),
            self.mass,
        ))
    }
}

impl From<&Body> for BodySerde {
    fn from(body: &Body) -> Self {
        Self {
            name: None,
            position: body.position.into(),
            velocity: body.velocity.into(),
            mass: body.mass,
        }
    }
}

/// A complete simulation setup: the initial bodies, the gravitational constant, the integrator
/// and its options.
///
/// The bodies of the optional preset come first, followed by the listed ones. `G` defaults to
/// the value of the AU, day and solar mass unit system.
///
/// ```yaml
/// preset: figure_eight
/// integrator: ias15
/// options:
///   tolerance: 1.0e-9
///   max_iteration: 300
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub preset: Option<Scenario>,
    pub bodies: Vec<BodySerde>,
    pub grav_constant: Option<f64>,
    pub integrator: Option<String>,
    pub options: PropOpts,
}

impl ScenarioConfig {
    pub fn bodies(&self) -> Result<Vec<Body>, ConfigError> {
        let mut bodies = self.preset.map(|p| p.bodies()).unwrap_or_default();
        for body in &self.bodies {
            bodies.push(body.as_body()?);
        }
        Ok(bodies)
    }

    pub fn grav_constant(&self) -> Result<f64, ConfigError> {
        match self.grav_constant {
            None => Ok(GRAV_CONSTANT),
            Some(g) if g.is_finite() && g >= 0.0 => Ok(g),
            Some(g) => Err(ConfigError::InvalidConfig {
                msg: format!("gravitational constant must be a non-negative number, got {g}"),
            }),
        }
    }

    /// The selected integrator, RK4 when unset.
    pub fn integrator(&self) -> Result<IntegratorKind, SimError> {
        match &self.integrator {
            Some(name) => IntegratorKind::from_str(name),
            None => Ok(IntegratorKind::default()),
        }
    }
}

impl ConfigRepr for ScenarioConfig {}
