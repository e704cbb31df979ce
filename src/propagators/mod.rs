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

use crate::dynamics::AccelerationKernel;
use crate::state::NBodyState;

/// Provides different methods for controlling the error computation of the integrator.
pub mod error_ctrl;
pub use self::error_ctrl::*;

/// Euler, Euler-Cromer, RK4 and leapfrog.
pub mod fixed;
pub use self::fixed::{FixedMethod, FixedStep};

/// Adaptive Runge-Kutta integration from an embedded pair.
pub mod embedded;
pub use self::embedded::EmbeddedRk;

/// Gauss-Radau predictor-corrector integration.
pub mod ias15;
pub use self::ias15::Ias15;

mod kind;
pub use kind::IntegratorKind;
mod rk_methods;
pub use rk_methods::*;
mod options;
pub use options::*;

/// Sampled states of a fixed horizon propagation.
pub mod trajectory;
pub use self::trajectory::{Sample, Trajectory};

/// Stores the details of the latest frame of an integrator.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct IntegrationDetails {
    /// step size used by the last micro-step, in days
    pub step: f64,
    /// error of the last micro-step (zero for fixed step methods)
    pub error: f64,
    /// number of micro-steps executed during the frame
    pub micro_steps: u32,
    /// number of micro-steps which advanced the clock
    pub accepted: u32,
    /// number of step attempts, including those rejected by the step size control
    pub attempts: u32,
}

impl fmt::Display for IntegrationDetails {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "IntegrationDetails {{step: {:.3e}, error: {:.3e}, micro-steps: {}, accepted: {}, attempts: {}}}",
            self.step, self.error, self.micro_steps, self.accepted, self.attempts
        )
    }
}

/// Result of a single adaptive micro-step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StepOutcome {
    /// whether the clock and the state were advanced
    pub accepted: bool,
    /// normalized error, at most one when within tolerance
    pub error: f64,
    /// step size tried, in days
    pub dt_used: f64,
    /// step size for the next attempt, in days
    pub dt_next: f64,
    /// number of tries, only larger than one for integrators which retry until acceptance
    pub attempts: u32,
}

/// Whether the private state of an integrator (step size, auxiliary buffers, cached
/// accelerations) may be used.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Ready,
}

/// An integrator advances the whole body ensemble by one frame of work.
///
/// Selection change, body set change and clock reset must call [`Integrator::invalidate`]: the
/// next call to [`Integrator::advance`] then reinitializes the private state from the current
/// positions and velocities.
pub trait Integrator: fmt::Debug {
    fn kind(&self) -> IntegratorKind;

    fn lifecycle(&self) -> Lifecycle;

    fn is_ready(&self) -> bool {
        self.lifecycle() == Lifecycle::Ready
    }

    /// Computes the private state of the integrator (e.g. initial step size) and the
    /// accelerations at the current positions.
    fn initialize(
        &mut self,
        state: &mut NBodyState,
        kernel: &dyn AccelerationKernel,
        opts: &PropOpts,
    );

    fn invalidate(&mut self);

    /// Runs one frame of integration, initializing first if needed.
    fn advance(
        &mut self,
        state: &mut NBodyState,
        kernel: &dyn AccelerationKernel,
        opts: &PropOpts,
    ) -> IntegrationDetails;

    /// Step size of the next adaptive micro-step, `None` for fixed step methods.
    fn step_size(&self) -> Option<f64> {
        None
    }
}

/// Builds an uninitialized integrator of the requested kind.
pub fn integrator_for(kind: IntegratorKind) -> Box<dyn Integrator> {
    match kind {
        IntegratorKind::Euler => Box::new(FixedStep::new(FixedMethod::Euler)),
        IntegratorKind::EulerCromer => Box::new(FixedStep::new(FixedMethod::EulerCromer)),
        IntegratorKind::Rk4 => Box::new(FixedStep::new(FixedMethod::Rk4)),
        IntegratorKind::Leapfrog => Box::new(FixedStep::new(FixedMethod::Leapfrog)),
        IntegratorKind::Rkf45 => Box::new(EmbeddedRk::<RmsScaled>::new(Tableau::rkf45())),
        IntegratorKind::Dopri => Box::new(EmbeddedRk::<RmsScaled>::new(Tableau::dopri())),
        IntegratorKind::Dverk => Box::new(EmbeddedRk::<RmsScaled>::new(Tableau::dverk())),
        IntegratorKind::Rkf78 => Box::new(EmbeddedRk::<RmsScaled>::new(Tableau::rkf78())),
        IntegratorKind::Ias15 => Box::new(Ias15::new()),
    }
}

/// Runs the micro-steps of one adaptive frame.
///
/// At most `max_iteration` micro-steps are executed. The frame ends early once `min_iteration`
/// micro-steps ran and the clock moved past the early exit span. Exhausting the budget is not an
/// error: the state simply holds the progress made so far.
pub(crate) fn adaptive_frame<F>(
    state: &mut NBodyState,
    opts: &PropOpts,
    mut micro_step: F,
) -> IntegrationDetails
where
    F: FnMut(&mut NBodyState) -> StepOutcome,
{
    let t0 = state.time;
    let mut details = IntegrationDetails::default();
    let mut last_dt = f64::INFINITY;

    for count in 1..=opts.max_iteration {
        let outcome = micro_step(state);
        details.micro_steps = count;
        details.attempts += outcome.attempts;
        details.step = outcome.dt_used;
        details.error = outcome.error;
        if outcome.accepted {
            details.accepted += 1;
        }
        last_dt = outcome.dt_next;

        if count >= opts.min_iteration && state.time > t0 + opts.early_exit_span() {
            return details;
        }
    }

    if last_dt <= opts.step_floor() {
        warn!(
            "frame budget of {} micro-steps exhausted with the step size at its floor of {:e} days",
            opts.max_iteration,
            opts.step_floor()
        );
    }
    details
}
