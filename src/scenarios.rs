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


//! Initial conditions of the systems the simulator ships with.
//!
//! Units are AU, days and solar masses: `G` is expressed in AU^3 M_sun^-1 d^-2.

use std::fmt;
use std::str::FromStr;

use enum_iterator::{all, Sequence};
use serde_derive::{Deserialize, Serialize};

use crate::errors::SimError;
use crate::linalg::Vector3;
use crate::state::Body;

/// Gravitational parameter of the Sun, in km^3 s^-2 (DE440).
pub const GM_SUN: f64 = 132_712_440_041.279_419;
/// Astronomical unit, in km.
pub const AU: f64 = 149_597_870.7;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Gravitational constant in AU^3 M_sun^-1 d^-2.
pub const GRAV_CONSTANT: f64 = GM_SUN * SECONDS_PER_DAY * SECONDS_PER_DAY / (AU * AU * AU);

/// Gravitational parameters in km^3 s^-2 (DE440), in the order of [`SOLAR_SYSTEM_NAMES`].
const GM_BODIES: [f64; 13] = [
    GM_SUN,
    22_031.868_551,
    324_858.592,
    398_600.435_507,
    42_828.375_816,
    126_712_764.1,
    37_940_584.841_8,
    5_794_556.4,
    6_836_527.100_58,
    4_902.800_118,
    975.5,
    62.628_9,
    17.288_245,
];

pub const SOLAR_SYSTEM_NAMES: [&str; 13] = [
    "Sun", "Mercury", "Venus", "Earth", "Mars", "Jupiter", "Saturn", "Uranus", "Neptune", "Moon",
    "Pluto", "Ceres", "Vesta",
];

/// Barycentric positions in AU at 2024-01-01 00:00:00 TDB (JPL Horizons).
const SOLAR_SYSTEM_POSITIONS: [[f64; 3]; 13] = [
    [-7.967955691533730e-03, -2.906227441573178e-03, 2.103054301547123e-04],
    [-2.825983269538632e-01, 1.974559795958082e-01, 4.177433558063677e-02],
    [-7.232103701666379e-01, -7.948302026312400e-02, 4.042871428174315e-02],
    [-1.738192017257054e-01, 9.663245550235138e-01, 1.553901854897183e-04],
    [-3.013262392582653e-01, -1.454029331393295e00, -2.300531433991428e-02],
    [3.485202469657674e00, 3.552136904413157e00, -9.271035442798399e-02],
    [8.988104223143450e00, -3.719064854634689e00, -2.931937777323593e-01],
    [1.226302417897505e01, 1.529738792480545e01, -1.020549026883563e-01],
    [2.983501460984741e01, -1.793812957956852e00, -6.506401132254588e-01],
    [-1.762788124769829e-01, 9.674377513177153e-01, 3.236901585768862e-04],
    [1.720200478843485e01, -3.034155683573043e01, -1.729127607100611e00],
    [-1.103880510367569e00, -2.533340440444230e00, 1.220283937721780e-01],
    [-8.092549658731499e-02, 2.558381434460076e00, -6.695836142398572e-02],
];

/// Barycentric velocities in AU/d at 2024-01-01 00:00:00 TDB (JPL Horizons).
const SOLAR_SYSTEM_VELOCITIES: [[f64; 3]; 13] = [
    [4.875094764261564e-06, -7.057133213976680e-06, -4.573453713094512e-08],
    [-2.232165900189702e-02, -2.157207103176252e-02, 2.855193410495743e-04],
    [2.034068201002341e-03, -2.020828626592994e-02, -3.945639843855159e-04],
    [-1.723001232538228e-02, -2.967721342618870e-03, 6.382125383116755e-07],
    [1.424832259345280e-02, -1.579236181580905e-03, -3.823722796161561e-04],
    [-5.470970658852281e-03, 5.642487338479145e-03, 9.896190602066252e-05],
    [1.822013845554067e-03, 5.143470425888054e-03, -1.617235904887937e-04],
    [-3.097615358317413e-03, 2.276781932345769e-03, 4.860433222241686e-05],
    [1.676536611817232e-04, 3.152098732861913e-03, -6.877501095688201e-05],
    [-1.746667306153906e-02, -3.473438277358121e-03, -3.359028758606074e-05],
    [2.802810313667557e-03, 8.492056438614633e-04, -9.060790113327894e-04],
    [8.978653480111301e-03, -4.873256528198994e-03, -1.807162046049230e-03],
    [-1.017876585480054e-02, -5.452367109338154e-04, 1.255870551153315e-03],
];

/// Period of the figure-8 orbit, in days.
pub const FIGURE_EIGHT_PERIOD: f64 = 6.3259;

/// A preset body configuration.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Sequence, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Sun and the eight planets
    #[default]
    SolarSystem,
    /// Solar system with the Moon, Pluto, Ceres and Vesta
    SolarSystemExtended,
    /// Chenciner-Montgomery choreography of three equal masses
    FigureEight,
    /// Burrau's problem: three masses at rest on a 3-4-5 triangle
    PythagoreanThreeBody,
}

impl Scenario {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SolarSystem => "solar_system",
            Self::SolarSystemExtended => "solar_system_extended",
            Self::FigureEight => "figure_eight",
            Self::PythagoreanThreeBody => "pythagorean_three_body",
        }
    }

    /// Gravitational constant the bodies of this scenario are expressed with.
    pub const fn grav_constant(&self) -> f64 {
        GRAV_CONSTANT
    }

    /// Initial bodies of this scenario.
    pub fn bodies(&self) -> Vec<Body> {
        match self {
            Self::SolarSystem => solar_system(9),
            Self::SolarSystemExtended => solar_system(SOLAR_SYSTEM_NAMES.len()),
            Self::FigureEight => {
                let mass = 1.0 / GRAV_CONSTANT;
                vec![
                    Body::new(
                        Vector3::new(0.970043, -0.24308753, 0.0),
                        Vector3::new(0.466203685, 0.43236573, 0.0),
                        mass,
                    ),
                    Body::new(
                        Vector3::new(-0.970043, 0.24308753, 0.0),
                        Vector3::new(0.466203685, 0.43236573, 0.0),
                        mass,
                    ),
                    Body::new(
                        Vector3::zeros(),
                        Vector3::new(-0.93240737, -0.86473146, 0.0),
                        mass,
                    ),
                ]
            }
            Self::PythagoreanThreeBody => vec![
                Body::at_rest(Vector3::new(1.0, 3.0, 0.0), 3.0 / GRAV_CONSTANT),
                Body::at_rest(Vector3::new(-2.0, -1.0, 0.0), 4.0 / GRAV_CONSTANT),
                Body::at_rest(Vector3::new(1.0, -1.0, 0.0), 5.0 / GRAV_CONSTANT),
            ],
        }
    }

    /// Names of the bodies, in the order of [`Scenario::bodies`].
    pub fn body_names(&self) -> Vec<String> {
        match self {
            Self::SolarSystem => SOLAR_SYSTEM_NAMES[..9].iter().map(|n| n.to_string()).collect(),
            Self::SolarSystemExtended => SOLAR_SYSTEM_NAMES.iter().map(|n| n.to_string()).collect(),
            Self::FigureEight | Self::PythagoreanThreeBody => {
                (1..=3).map(|i| format!("Body {i}")).collect()
            }
        }
    }

    /// Comma separated list of all the names.
    pub fn names() -> String {
        all::<Self>()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn solar_system(count: usize) -> Vec<Body> {
    (0..count)
        .map(|i| {
            Body::new(
                Vector3::from(SOLAR_SYSTEM_POSITIONS[i]),
                Vector3::from(SOLAR_SYSTEM_VELOCITIES[i]),
                GM_BODIES[i] / GM_SUN,
            )
        })
        .collect()
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Scenario {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', ' '], "_");
        all::<Self>()
            .find(|scenario| scenario.name() == wanted)
            .ok_or_else(|| SimError::UnknownScenario {
                name: s.to_string(),
                expected: Self::names(),
            })
    }
}
