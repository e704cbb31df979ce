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

use super::IntegratorKind;
use crate::errors::{InvalidTableauSnafu, SimError};

mod dormand;
pub use self::dormand::*;
mod fehlberg;
pub use self::fehlberg::*;
mod verner;
pub use self::verner::*;

/// The `RK` trait defines an embedded Runge Kutta integrator.
#[allow(clippy::upper_case_acronyms)]
pub trait RK
where
    Self: Sized,
{
    /// Order of the solution which is propagated.
    const ORDER: u8;

    /// Order of the companion solution, only used for the local error estimate.
    const ERROR_ORDER: u8;

    /// Order `p` of the step size controller, which uses `0.38^(1/(1+p))` as its safety factor and
    /// `1/(1+p)` as the error exponent. Defaults to the lowest order of the pair.
    const CONTROL_ORDER: u8 = if Self::ORDER < Self::ERROR_ORDER {
        Self::ORDER
    } else {
        Self::ERROR_ORDER
    };

    /// Returns the stages of this integrator (as usize because it's used as indexing)
    const STAGES: usize;

    /// Returns a pointer to a list of f64 corresponding to the A coefficients of the Butcher table for that RK.
    /// This module only supports *explicit* integrators, and as such, `Self.a_coeffs().len()` must be of
    /// size (stages)*(stages-1)/2: row `i` holds the `i` coefficients of stage `i` on the prior stages.
    /// *Warning:* this RK trait supposes that the implementation is consistent, i.e. c_i = \sum_j a_{ij}.
    const A_COEFFS: &'static [f64];
    /// Returns a pointer to a list of f64 corresponding to the b_i and b^*_i coefficients of the
    /// Butcher table for that RK. `Self.b_coeffs().len()` must be of size (stages)*2, and the
    /// propagated weights come first.
    const B_COEFFS: &'static [f64];
}

/// A Butcher tableau resolved at integrator selection time, so that the embedded integrator is
/// not monomorphized for each method.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Tableau {
    pub kind: IntegratorKind,
    pub order: u8,
    pub error_order: u8,
    pub control_order: u8,
    pub stages: usize,
    pub a_coeffs: &'static [f64],
    pub b_coeffs: &'static [f64],
}

impl Tableau {
    pub fn of<T: RK>(kind: IntegratorKind) -> Self {
        Self {
            kind,
            order: T::ORDER,
            error_order: T::ERROR_ORDER,
            control_order: T::CONTROL_ORDER,
            stages: T::STAGES,
            a_coeffs: T::A_COEFFS,
            b_coeffs: T::B_COEFFS,
        }
    }

    pub fn rkf45() -> Self {
        Self::of::<Fehlberg45>(IntegratorKind::Rkf45)
    }

    pub fn dopri() -> Self {
        Self::of::<Dormand54>(IntegratorKind::Dopri)
    }

    pub fn dverk() -> Self {
        Self::of::<Verner65>(IntegratorKind::Dverk)
    }

    pub fn rkf78() -> Self {
        Self::of::<Fehlberg78>(IntegratorKind::Rkf78)
    }

    /// Resolves the tableau from its order code: the propagated order followed by the error
    /// order, e.g. 54 for Dormand-Prince.
    pub fn from_order_code(order: u8) -> Result<Self, SimError> {
        match order {
            45 => Ok(Self::rkf45()),
            54 => Ok(Self::dopri()),
            65 => Ok(Self::dverk()),
            78 => Ok(Self::rkf78()),
            _ => InvalidTableauSnafu { order }.fail(),
        }
    }

    pub fn order_code(&self) -> u8 {
        self.order * 10 + self.error_order
    }

    /// Order which drives the step size controller.
    pub fn control_order(&self) -> u8 {
        self.control_order
    }

    /// Coefficients of stage `stage` (1-based, stage 0 has none) on the prior stages.
    pub fn a_row(&self, stage: usize) -> &'static [f64] {
        let start = stage * (stage - 1) / 2;
        &self.a_coeffs[start..start + stage]
    }

    /// Weights of the propagated solution.
    pub fn weights(&self) -> &'static [f64] {
        &self.b_coeffs[..self.stages]
    }

    /// Weights of the companion solution.
    pub fn error_weights(&self) -> &'static [f64] {
        &self.b_coeffs[self.stages..]
    }
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}({}), {} stages)",
            self.kind, self.order, self.error_order, self.stages
        )
    }
}
