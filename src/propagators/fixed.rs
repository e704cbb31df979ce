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

use super::{IntegrationDetails, Integrator, IntegratorKind, Lifecycle, PropOpts};
use crate::dynamics::AccelerationKernel;
use crate::linalg::Vector3;
use crate::state::NBodyState;

/// The single step methods without error control.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FixedMethod {
    /// `x += v dt` then `v += a(x₀) dt`
    Euler,
    /// Semi-implicit: `v += a(x) dt` then `x += v dt` with the updated velocity
    EulerCromer,
    /// Classical fourth order Runge-Kutta on the coupled position and velocity system
    Rk4,
    /// Velocity Verlet, which carries the acceleration from one step to the next
    Leapfrog,
}

impl FixedMethod {
    pub fn kind(&self) -> IntegratorKind {
        match self {
            Self::Euler => IntegratorKind::Euler,
            Self::EulerCromer => IntegratorKind::EulerCromer,
            Self::Rk4 => IntegratorKind::Rk4,
            Self::Leapfrog => IntegratorKind::Leapfrog,
        }
    }

    /// Advances the positions and velocities by `dt`. The clock is not touched.
    ///
    /// Leapfrog requires the cached accelerations of the state to be those at the current
    /// positions, and leaves them at the new positions. The other methods overwrite the cache
    /// with the accelerations at the start of the step.
    pub fn step(&self, state: &mut NBodyState, kernel: &dyn AccelerationKernel, dt: f64) {
        match self {
            Self::Euler => euler(state, kernel, dt),
            Self::EulerCromer => euler_cromer(state, kernel, dt),
            Self::Rk4 => rk4(state, kernel, dt),
            Self::Leapfrog => leapfrog(state, kernel, dt),
        }
    }
}

impl fmt::Display for FixedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

fn euler(state: &mut NBodyState, kernel: &dyn AccelerationKernel, dt: f64) {
    state.refresh_accelerations(kernel);
    for ((x, v), a) in state
        .positions
        .iter_mut()
        .zip(state.velocities.iter_mut())
        .zip(state.accelerations.iter())
    {
        *x += *v * dt;
        *v += a * dt;
    }
}

fn euler_cromer(state: &mut NBodyState, kernel: &dyn AccelerationKernel, dt: f64) {
    state.refresh_accelerations(kernel);
    for ((x, v), a) in state
        .positions
        .iter_mut()
        .zip(state.velocities.iter_mut())
        .zip(state.accelerations.iter())
    {
        *v += a * dt;
        *x += *v * dt;
    }
}

/// `base + slope * h`, element-wise
fn offset(base: &[Vector3<f64>], slope: &[Vector3<f64>], h: f64) -> Vec<Vector3<f64>> {
    base.iter().zip(slope).map(|(b, s)| b + s * h).collect()
}

fn rk4(state: &mut NBodyState, kernel: &dyn AccelerationKernel, dt: f64) {
    let g = state.grav_constant;
    let m = &state.masses;
    let x = &state.positions;
    let v = &state.velocities;

    let vk1 = kernel.accelerations(x, m, g);
    let xk1 = v.clone();

    let vk2 = kernel.accelerations(&offset(x, &xk1, 0.5 * dt), m, g);
    let xk2 = offset(v, &vk1, 0.5 * dt);

    let vk3 = kernel.accelerations(&offset(x, &xk2, 0.5 * dt), m, g);
    let xk3 = offset(v, &vk2, 0.5 * dt);

    let vk4 = kernel.accelerations(&offset(x, &xk3, dt), m, g);
    let xk4 = offset(v, &vk3, dt);

    for i in 0..state.len() {
        state.positions[i] += (xk1[i] + 2.0 * xk2[i] + 2.0 * xk3[i] + xk4[i]) * dt / 6.0;
        state.velocities[i] += (vk1[i] + 2.0 * vk2[i] + 2.0 * vk3[i] + vk4[i]) * dt / 6.0;
    }
    state.accelerations = vk1;
}

fn leapfrog(state: &mut NBodyState, kernel: &dyn AccelerationKernel, dt: f64) {
    for ((x, v), a) in state
        .positions
        .iter_mut()
        .zip(state.velocities.iter())
        .zip(state.accelerations.iter())
    {
        *x += v * dt + 0.5 * a * dt * dt;
    }

    let a1 = kernel.accelerations(&state.positions, &state.masses, state.grav_constant);
    for ((v, a0), a1) in state
        .velocities
        .iter_mut()
        .zip(state.accelerations.iter())
        .zip(a1.iter())
    {
        *v += 0.5 * (a0 + a1) * dt;
    }
    state.accelerations = a1;
}

/// Runs `time_speed` steps of `dt` per frame with one of the [`FixedMethod`]s.
#[derive(Clone, Debug)]
pub struct FixedStep {
    method: FixedMethod,
    lifecycle: Lifecycle,
}

impl FixedStep {
    pub fn new(method: FixedMethod) -> Self {
        Self {
            method,
            lifecycle: Lifecycle::Uninitialized,
        }
    }

    pub fn method(&self) -> FixedMethod {
        self.method
    }
}

impl Integrator for FixedStep {
    fn kind(&self) -> IntegratorKind {
        self.method.kind()
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn initialize(
        &mut self,
        state: &mut NBodyState,
        kernel: &dyn AccelerationKernel,
        _opts: &PropOpts,
    ) {
        state.refresh_accelerations(kernel);
        debug!("{} initialized for {} bodies", self.method, state.len());
        self.lifecycle = Lifecycle::Ready;
    }

    fn invalidate(&mut self) {
        self.lifecycle = Lifecycle::Uninitialized;
    }

    fn advance(
        &mut self,
        state: &mut NBodyState,
        kernel: &dyn AccelerationKernel,
        opts: &PropOpts,
    ) -> IntegrationDetails {
        if state.is_empty() {
            return IntegrationDetails::default();
        }
        if !self.is_ready() {
            self.initialize(state, kernel, opts);
        }

        for _ in 0..opts.time_speed {
            self.method.step(state, kernel, opts.dt);
        }
        state.time += opts.frame_span();

        IntegrationDetails {
            step: opts.dt,
            error: 0.0,
            micro_steps: opts.time_speed,
            accepted: opts.time_speed,
            attempts: opts.time_speed,
        }
    }
}
