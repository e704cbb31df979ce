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

use std::marker::PhantomData;

use super::error_ctrl::{ErrorBlock, ErrorCtrl, RmsScaled};
use super::{
    adaptive_frame, IntegrationDetails, Integrator, IntegratorKind, Lifecycle, PropOpts,
    StepOutcome, Tableau,
};
use crate::dynamics::AccelerationKernel;
use crate::linalg::Vector3;
use crate::state::NBodyState;

/// The step size never grows by more than this factor from one micro-step to the next.
const MAX_GROWTH: f64 = 6.0;
/// The step size never shrinks by more than this factor from one micro-step to the next.
const MIN_SHRINK: f64 = 0.33;

/// Adaptive integration with an explicit embedded Runge-Kutta pair.
///
/// The difference between the propagated and companion solutions estimates the local error of
/// each micro-step. That error is normalized by the error controller `E` using the tolerance of
/// the [`PropOpts`] as both absolute and relative tolerance.
#[derive(Clone, Debug)]
pub struct EmbeddedRk<E: ErrorCtrl = RmsScaled> {
    tableau: Tableau,
    lifecycle: Lifecycle,
    /// Step size of the next micro-step, in days
    dt: f64,
    // Stage buffers, one vector per stage
    xk: Vec<Vec<Vector3<f64>>>,
    vk: Vec<Vec<Vector3<f64>>>,
    _error_ctrl: PhantomData<E>,
}

impl<E: ErrorCtrl> EmbeddedRk<E> {
    pub fn new(tableau: Tableau) -> Self {
        Self {
            tableau,
            lifecycle: Lifecycle::Uninitialized,
            dt: 0.0,
            xk: Vec::new(),
            vk: Vec::new(),
            _error_ctrl: PhantomData,
        }
    }

    pub fn tableau(&self) -> &Tableau {
        &self.tableau
    }

    /// Overrides the step size of the next micro-step.
    pub fn set_step(&mut self, dt: f64) {
        self.dt = dt;
    }

    /// Safety factor applied to the optimal step size, `0.38^(1/(1+p))` with `p` the control
    /// order of the tableau.
    pub fn safety_factor(&self) -> f64 {
        0.38_f64.powf(1.0 / (1.0 + f64::from(self.tableau.control_order())))
    }

    fn ensure_buffers(&mut self, bodies: usize) {
        if self.xk.len() != self.tableau.stages || self.xk[0].len() != bodies {
            self.xk = vec![vec![Vector3::zeros(); bodies]; self.tableau.stages];
            self.vk = vec![vec![Vector3::zeros(); bodies]; self.tableau.stages];
        }
    }

    /// Starting step size from the scales of the positions, velocities and accelerations, and
    /// from a probe of how fast the accelerations change.
    ///
    /// The estimate is divided by 100 since it is too optimistic for close encounters.
    pub fn initial_step(
        state: &NBodyState,
        kernel: &dyn AccelerationKernel,
        order: u8,
        abs_tol: f64,
        rel_tol: f64,
    ) -> f64 {
        let x = state.positions();
        let v = state.velocities();
        let components = (6 * state.len()) as f64;
        let a = kernel.accelerations(x, state.masses(), state.grav_constant());

        let scale = |value: f64| abs_tol + rel_tol * value.abs();

        let mut sum_0 = 0.0;
        let mut sum_1 = 0.0;
        for i in 0..state.len() {
            for c in 0..3 {
                let (scale_x, scale_v) = (scale(x[i][c]), scale(v[i][c]));
                sum_0 += (x[i][c] / scale_x).powi(2) + (v[i][c] / scale_v).powi(2);
                sum_1 += (v[i][c] / scale_x).powi(2) + (a[i][c] / scale_v).powi(2);
            }
        }
        let d_0 = (sum_0 / components).sqrt();
        let d_1 = (sum_1 / components).sqrt();

        let dt_0 = if d_0 < 1e-5 || d_1 < 1e-5 {
            1e-4
        } else {
            d_0 / d_1
        };

        let probe: Vec<Vector3<f64>> = x
            .iter()
            .zip(v)
            .map(|(x, v)| x + v * (dt_0 / 100.0))
            .collect();
        let a_1 = kernel.accelerations(&probe, state.masses(), state.grav_constant());

        let mut sum_2 = 0.0;
        for i in 0..state.len() {
            for c in 0..3 {
                // The probe velocity moved by a dt_0 / 100 step of the acceleration
                let dv = a[i][c] * (dt_0 / 100.0);
                sum_2 += (dv / scale(x[i][c])).powi(2)
                    + ((a_1[i][c] - a[i][c]) / scale(v[i][c])).powi(2);
            }
        }
        let d_2 = (sum_2 / components).sqrt() / dt_0;

        let d_max = d_1.max(d_2);
        let dt_1 = if d_max <= 1e-15 {
            (dt_0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d_max).powf(1.0 / (1.0 + f64::from(order)))
        };

        (100.0 * dt_0).min(dt_1) * 1e-2
    }

    /// Attempts one micro-step of the current step size, and updates the step size for the next
    /// attempt. The state and clock only change if the step is accepted.
    ///
    /// A step is accepted when its error is at most one, when the step size is already at its
    /// floor, or when the error is not finite: the `NaN` then reaches the state and is reported
    /// by the energy check instead of stalling the controller.
    pub fn try_step(
        &mut self,
        state: &mut NBodyState,
        kernel: &dyn AccelerationKernel,
        opts: &PropOpts,
    ) -> StepOutcome {
        let n = state.len();
        let dt = self.dt;
        if n == 0 {
            return StepOutcome {
                accepted: false,
                error: 0.0,
                dt_used: dt,
                dt_next: dt,
                attempts: 0,
            };
        }
        self.ensure_buffers(n);

        let stages = self.tableau.stages;
        let g = state.grav_constant;
        let x = &state.positions;
        let v = &state.velocities;
        let m = &state.masses;

        kernel.accelerations_into(x, m, g, &mut self.vk[0]);
        self.xk[0].copy_from_slice(v);

        for stage in 1..stages {
            // The wi stores the a_{s1} * k_1 + a_{s2} * k_2 + ... + a_{s, s-1} * k_{s-1}
            let mut wx = vec![Vector3::zeros(); n];
            let mut wv = vec![Vector3::zeros(); n];
            for (j, a_sj) in self.tableau.a_row(stage).iter().enumerate() {
                for i in 0..n {
                    wx[i] += *a_sj * self.xk[j][i];
                    wv[i] += *a_sj * self.vk[j][i];
                }
            }
            let x_stage: Vec<Vector3<f64>> =
                x.iter().zip(&wx).map(|(x, w)| x + w * dt).collect();
            kernel.accelerations_into(&x_stage, m, g, &mut self.vk[stage]);
            for i in 0..n {
                self.xk[stage][i] = v[i] + wv[i] * dt;
            }
        }

        // Propagated solution and error estimate
        let mut sum_x = vec![Vector3::zeros(); n];
        let mut sum_v = vec![Vector3::zeros(); n];
        let mut err_x = vec![Vector3::zeros(); n];
        let mut err_v = vec![Vector3::zeros(); n];
        for (stage, (b_i, b_i_star)) in self
            .tableau
            .weights()
            .iter()
            .zip(self.tableau.error_weights())
            .enumerate()
        {
            let delta = b_i - b_i_star;
            for i in 0..n {
                sum_x[i] += *b_i * self.xk[stage][i];
                sum_v[i] += *b_i * self.vk[stage][i];
                err_x[i] += delta * self.xk[stage][i];
                err_v[i] += delta * self.vk[stage][i];
            }
        }
        let x_1: Vec<Vector3<f64>> = x.iter().zip(&sum_x).map(|(x, s)| x + s * dt).collect();
        let v_1: Vec<Vector3<f64>> = v.iter().zip(&sum_v).map(|(v, s)| v + s * dt).collect();
        err_x.iter_mut().for_each(|e| *e *= dt);
        err_v.iter_mut().for_each(|e| *e *= dt);

        let error = E::estimate(
            ErrorBlock {
                error: &err_x,
                previous: x,
                candidate: &x_1,
            },
            ErrorBlock {
                error: &err_v,
                previous: v,
                candidate: &v_1,
            },
            opts.tolerance,
            opts.tolerance,
        );

        let accepted = error <= 1.0 || dt == opts.step_floor() || !error.is_finite();
        if accepted {
            state.positions = x_1;
            state.velocities = v_1;
            state.time += dt;
        }

        let dt_new = if error == 0.0 || !error.is_finite() {
            dt
        } else {
            dt * self.safety_factor()
                / error.powf(1.0 / (1.0 + f64::from(self.tableau.control_order())))
        };
        self.dt = if dt_new > MAX_GROWTH * dt {
            MAX_GROWTH * dt
        } else if dt_new < MIN_SHRINK * dt {
            MIN_SHRINK * dt
        } else {
            dt_new
        };
        if dt_new / opts.expected_time_scale < 1e-12 {
            self.dt = opts.step_floor();
        }

        StepOutcome {
            accepted,
            error,
            dt_used: dt,
            dt_next: self.dt,
            attempts: 1,
        }
    }
}

impl<E: ErrorCtrl> Integrator for EmbeddedRk<E> {
    fn kind(&self) -> IntegratorKind {
        self.tableau.kind
    }

    fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    fn initialize(
        &mut self,
        state: &mut NBodyState,
        kernel: &dyn AccelerationKernel,
        opts: &PropOpts,
    ) {
        state.refresh_accelerations(kernel);
        self.ensure_buffers(state.len());
        self.dt = if state.is_empty() {
            0.0
        } else {
            Self::initial_step(
                state,
                kernel,
                self.tableau.order,
                opts.tolerance,
                opts.tolerance,
            )
        };
        debug!(
            "{} initialized for {} bodies with a step of {:e} days",
            self.tableau,
            state.len(),
            self.dt
        );
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
        adaptive_frame(state, opts, |state| self.try_step(state, kernel, opts))
    }

    fn step_size(&self) -> Option<f64> {
        Some(self.dt)
    }
}

#[cfg(test)]
mod ut_embedded {
    use super::*;
    use crate::dynamics::Pairwise;
    use crate::state::Body;
    use approx::assert_abs_diff_eq;

    fn binary() -> NBodyState {
        let speed = 0.5_f64.sqrt();
        NBodyState::from_bodies(
            &[
                Body::new(Vector3::new(0.5, 0.0, 0.0), Vector3::new(0.0, speed, 0.0), 1.0),
                Body::new(
                    Vector3::new(-0.5, 0.0, 0.0),
                    Vector3::new(0.0, -speed, 0.0),
                    1.0,
                ),
            ],
            1.0,
        )
    }

    #[test]
    fn initial_step_is_positive() {
        let state = binary();
        for tableau in [
            Tableau::rkf45(),
            Tableau::dopri(),
            Tableau::dverk(),
            Tableau::rkf78(),
        ] {
            let dt =
                EmbeddedRk::<RmsScaled>::initial_step(&state, &Pairwise, tableau.order, 1e-6, 1e-6);
            assert!(dt > 0.0 && dt < 1.0, "{tableau}: {dt}");
        }
    }

    #[test]
    fn safety_factors() {
        let factor = |tableau: Tableau| EmbeddedRk::<RmsScaled>::new(tableau).safety_factor();
        assert_abs_diff_eq!(factor(Tableau::rkf45()), 0.38_f64.powf(0.2), epsilon = 1e-15);
        assert_abs_diff_eq!(factor(Tableau::dopri()), 0.38_f64.powf(0.2), epsilon = 1e-15);
        assert_abs_diff_eq!(factor(Tableau::dverk()), 0.870_901_593_589_505_9, epsilon = 1e-15);
        assert_abs_diff_eq!(factor(Tableau::rkf78()), 0.38_f64.powf(0.125), epsilon = 1e-15);
    }

    #[test]
    fn accepted_step_grows_bounded() {
        let mut state = binary();
        let opts = PropOpts::with_tolerance(1e-6);
        let mut rk = EmbeddedRk::<RmsScaled>::new(Tableau::dopri());
        rk.initialize(&mut state, &Pairwise, &opts);
        let dt = rk.step_size().unwrap();
        let outcome = rk.try_step(&mut state, &Pairwise, &opts);
        assert!(outcome.error <= 1.0);
        assert!(outcome.accepted);
        assert_eq!(state.time(), dt);
        assert!(outcome.dt_next <= MAX_GROWTH * dt);
        assert!(outcome.dt_next >= MIN_SHRINK * dt);
    }

    #[test]
    fn oversized_step_is_rejected() {
        let mut state = binary();
        let opts = PropOpts::with_tolerance(1e-12);
        let mut rk = EmbeddedRk::<RmsScaled>::new(Tableau::rkf45());
        rk.initialize(&mut state, &Pairwise, &opts);
        let before = state.clone();
        rk.set_step(1.0);
        let outcome = rk.try_step(&mut state, &Pairwise, &opts);
        assert!(outcome.error > 1.0);
        assert!(!outcome.accepted);
        assert!(outcome.dt_next < outcome.dt_used);
        assert_eq!(state, before);
    }
}
