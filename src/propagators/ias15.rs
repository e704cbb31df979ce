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

use std::array;

use super::{
    adaptive_frame, IntegrationDetails, Integrator, IntegratorKind, Lifecycle, PropOpts,
    StepOutcome,
};
use crate::dynamics::AccelerationKernel;
use crate::linalg::Vector3;
use crate::state::NBodyState;
use crate::utils::max_abs_component;

/// Gauss-Radau spacing of the eight substep nodes over a step, the first one being the start of
/// the step.
pub const NODES: [f64; 8] = [
    0.0,
    0.056262560536922146465652191032,
    0.180240691736892364987579942809,
    0.352624717113169637373907770171,
    0.547153626330555383001448557652,
    0.734210177215410531523210608306,
    0.885320946839095768090359762932,
    0.977520613561287501891174500429,
];

/// Converts the divided differences `g` into the polynomial coefficients `b`: `b_k = Σ_{j≥k} c_jk g_j`.
#[allow(clippy::excessive_precision)]
const C: [[f64; 7]; 7] = [
    [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [-0.0562625605369221464656522, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [
        0.01014080283006362998648180399549641417413495311078,
        -0.2365032522738145114532321,
        1.0,
        0.0,
        0.0,
        0.0,
        0.0,
    ],
    [
        -0.0035758977292516175949344589284567187362040464593728,
        0.09353769525946206589574845561035371499343547051116,
        -0.5891279693869841488271399,
        1.0,
        0.0,
        0.0,
        0.0,
    ],
    [
        0.0019565654099472210769005672379668610648179838140913,
        -0.054755386889068686440808430671055022602028382584495,
        0.41588120008230686168862193041156933067050816537030,
        -1.1362815957175395318285885,
        1.0,
        0.0,
        0.0,
    ],
    [
        -0.0014365302363708915424459554194153247134438571962198,
        0.042158527721268707707297347813203202980228135395858,
        -0.36009959650205681228976647408968845289781580280782,
        1.2501507118406910258505441186857527694077565516084,
        -1.8704917729329500633517991,
        1.0,
        0.0,
    ],
    [
        0.0012717903090268677492943117622964220889484666147501,
        -0.038760357915906770369904626849901899108502158354383,
        0.36096224345284598322533983078129066420907893718190,
        -1.4668842084004269643701553461378480148761655599754,
        2.9061362593084293014237914371173946705384212479246,
        -2.7558127197720458314421589,
        1.0,
    ],
];

/// Reciprocals of the node differences, `r_kj = 1 / (h_k - h_j)` for `j < k`.
#[allow(clippy::excessive_precision)]
const R: [[f64; 8]; 8] = [
    [0.0; 8],
    [17.773808914078000840752659565672904106978971632681, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [
        5.5481367185372165056928216140765061758579336941398,
        8.0659386483818866885371256689687154412267416180207,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
    ],
    [
        2.8358760786444386782520104428042437400879003147949,
        3.3742499769626352599420358188267460448330087696743,
        5.8010015592640614823286778893918880155743979164251,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
    ],
    [
        1.8276402675175978297946077587371204385651628457154,
        2.0371118353585847827949159161566554921841792590404,
        2.7254422118082262837742722003491334729711450288807,
        5.1406241058109342286363199091504437929335189668304,
        0.0,
        0.0,
        0.0,
        0.0,
    ],
    [
        1.3620078160624694969370006292445650994197371928318,
        1.4750402175604115479218482480167404024740127431358,
        1.8051535801402512604391147435448679586574414080693,
        2.6206449263870350811541816031933074696730227729812,
        5.3459768998711075141214909632277898045770336660354,
        0.0,
        0.0,
        0.0,
    ],
    [
        1.1295338753367899027322861542728593509768148769105,
        1.2061876660584456166252036299646227791474203527801,
        1.4182782637347391537713783674858328433713640692518,
        1.8772424961868100972169920283109658335427446084411,
        2.9571160172904557478071040204245556508352776929762,
        6.6176620137024244874471284891193925737033291491748,
        0.0,
        0.0,
    ],
    [
        1.0229963298234867458386119071939636779024159134103,
        1.0854721939386423840467243172568913862030118679827,
        1.2542646222818777659905422465868249586862369725826,
        1.6002665494908162609916716949161150366323259154408,
        2.3235983002196942228325345451091668073608955835034,
        4.1099757783445590862385761824068782144723082633980,
        10.846026190236844684706431007823415424143683137181,
        0.0,
    ],
];

/// Bounds the change of step size between two attempts to a factor of four.
pub const SAFETY_FACTOR: f64 = 0.25;
/// Step size control exponent, one over the order of the error term.
pub const EXPONENT: f64 = 1.0 / 7.0;
/// Relative change of the last `b` coefficient under which the predictor-corrector has converged.
pub const PC_TOLERANCE: f64 = 1e-16;
pub const MAX_PC_ITERATIONS: usize = 12;

/// Seven coefficient vectors, each with one entry per body.
pub type Coefficients = [Vec<Vector3<f64>>; 7];

fn zeroed(bodies: usize) -> Coefficients {
    array::from_fn(|_| vec![Vector3::zeros(); bodies])
}

/// Largest absolute component of `a - b`.
fn max_abs_diff(a: &[Vector3<f64>], b: &[Vector3<f64>]) -> f64 {
    max_abs_component(&a.iter().zip(b).map(|(a, b)| a - b).collect::<Vec<_>>())
}

/// Position at the fraction `h` of a step of `dt` from the polynomial coefficients of body `i`.
fn position_at(
    x0: &Vector3<f64>,
    v0: &Vector3<f64>,
    a0: &Vector3<f64>,
    b: &Coefficients,
    i: usize,
    h: f64,
    dt: f64,
) -> Vector3<f64> {
    x0 + dt
        * h
        * (v0
            + dt * h
                * (a0
                    + h * (b[0][i] / 3.0
                        + h * (b[1][i] / 6.0
                            + h * (b[2][i] / 10.0
                                + h * (b[3][i] / 15.0
                                    + h * (b[4][i] / 21.0
                                        + h * (b[5][i] / 28.0 + h * b[6][i] / 36.0)))))))
                / 2.0)
}

/// Velocity at the fraction `h` of a step of `dt` from the polynomial coefficients of body `i`.
fn velocity_at(
    v0: &Vector3<f64>,
    a0: &Vector3<f64>,
    b: &Coefficients,
    i: usize,
    h: f64,
    dt: f64,
) -> Vector3<f64> {
    v0 + dt
        * h
        * (a0
            + h * (b[0][i] / 2.0
                + h * (b[1][i] / 3.0
                    + h * (b[2][i] / 4.0
                        + h * (b[3][i] / 5.0
                            + h * (b[4][i] / 6.0 + h * (b[5][i] / 7.0 + h * b[6][i] / 8.0)))))))
}

/// Predicts the coefficients of the next step of `q` times the current step size.
///
/// The new prediction `e` is the Taylor shift of the polynomial of the step which just
/// completed. When `has_previous` is set, the correction between the converged `b` and the
/// previous prediction `e` is added back to the new prediction.
pub fn refine_coefficients(b: &mut Coefficients, e: &mut Coefficients, q: f64, has_previous: bool) {
    let q2 = q * q;
    let q3 = q2 * q;
    let q4 = q3 * q;
    let q5 = q4 * q;
    let q6 = q5 * q;
    let q7 = q6 * q;

    for i in 0..b[0].len() {
        let bi: [Vector3<f64>; 7] = array::from_fn(|k| b[k][i]);
        let delta: [Vector3<f64>; 7] = if has_previous {
            array::from_fn(|k| bi[k] - e[k][i])
        } else {
            [Vector3::zeros(); 7]
        };

        e[0][i] = q
            * (bi[6] * 7.0
                + bi[5] * 6.0
                + bi[4] * 5.0
                + bi[3] * 4.0
                + bi[2] * 3.0
                + bi[1] * 2.0
                + bi[0]);
        e[1][i] = q2 * (bi[6] * 21.0 + bi[5] * 15.0 + bi[4] * 10.0 + bi[3] * 6.0 + bi[2] * 3.0 + bi[1]);
        e[2][i] = q3 * (bi[6] * 35.0 + bi[5] * 20.0 + bi[4] * 10.0 + bi[3] * 4.0 + bi[2]);
        e[3][i] = q4 * (bi[6] * 35.0 + bi[5] * 15.0 + bi[4] * 5.0 + bi[3]);
        e[4][i] = q5 * (bi[6] * 21.0 + bi[5] * 6.0 + bi[4]);
        e[5][i] = q6 * (bi[6] * 7.0 + bi[5]);
        e[6][i] = q7 * bi[6];

        for k in 0..7 {
            b[k][i] = e[k][i] + delta[k];
        }
    }
}

/// IAS15: the 15th order Gauss-Radau integrator of Rein and Spiegel (2015), with adaptive step
/// size.
///
/// Each step fits a polynomial in time to the accelerations sampled at the eight Gauss-Radau
/// nodes, iterating the predictor-corrector until the last coefficient settles. The magnitude of
/// that last coefficient relative to the accelerations then drives the step size.
#[derive(Clone, Debug)]
pub struct Ias15 {
    lifecycle: Lifecycle,
    /// Step size of the next attempt, in days
    dt: f64,
    b: Coefficients,
    /// `b` at the end of the previous predictor-corrector pass
    b0: Coefficients,
    g: Coefficients,
    e: Coefficients,
    /// Whether `e` holds a prediction made at the end of an accepted step
    refined: bool,
}

impl Default for Ias15 {
    fn default() -> Self {
        Self::new()
    }
}

impl Ias15 {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Uninitialized,
            dt: 0.0,
            b: zeroed(0),
            b0: zeroed(0),
            g: zeroed(0),
            e: zeroed(0),
            refined: false,
        }
    }

    /// Overrides the step size of the next attempt.
    pub fn set_step(&mut self, dt: f64) {
        self.dt = dt;
    }

    /// Polynomial coefficients of the latest step.
    pub fn coefficients(&self) -> &Coefficients {
        &self.b
    }

    fn reset_buffers(&mut self, bodies: usize) {
        self.b = zeroed(bodies);
        self.b0 = zeroed(bodies);
        self.g = zeroed(bodies);
        self.e = zeroed(bodies);
        self.refined = false;
    }

    /// Starting step size from the ratio of the position and acceleration magnitudes, refined by
    /// a probe of how fast the accelerations change.
    pub fn initial_step(state: &NBodyState, kernel: &dyn AccelerationKernel) -> f64 {
        let x = state.positions();
        let a = kernel.accelerations(x, state.masses(), state.grav_constant());

        let d_0 = max_abs_component(x);
        let d_1 = max_abs_component(&a);
        let dt_0 = if d_0 < 1e-5 || d_1 < 1e-5 {
            1e-6
        } else {
            0.01 * (d_0 / d_1)
        };

        let probe: Vec<Vector3<f64>> = x
            .iter()
            .zip(state.velocities())
            .map(|(x, v)| x + v * dt_0)
            .collect();
        let a_1 = kernel.accelerations(&probe, state.masses(), state.grav_constant());
        let d_2 = max_abs_diff(&a_1, &a) / dt_0;

        let d_max = d_1.max(d_2);
        let dt_1 = if d_max <= 1e-15 {
            (dt_0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d_max).powf(1.0 / 16.0)
        };

        (100.0 * dt_0).min(dt_1)
    }

    /// Updates the divided difference `g_{k-1}` from the accelerations at the nodes up to `k`.
    fn update_g(&mut self, node_accel: &[Vec<Vector3<f64>>; 8], k: usize) {
        for i in 0..node_accel[0].len() {
            let mut g_k = (node_accel[k][i] - node_accel[0][i]) * R[k][0];
            for j in 1..k {
                g_k = (g_k - self.g[j - 1][i]) * R[k][j];
            }
            self.g[k - 1][i] = g_k;
        }
    }

    /// Recomputes the coefficients `b_0` to `b_{k-1}` from all the divided differences.
    fn update_b(&mut self, k: usize) {
        for m in 0..k {
            for i in 0..self.b[m].len() {
                let mut b_m = Vector3::zeros();
                for (j, c_row) in C.iter().enumerate().skip(m) {
                    b_m += c_row[m] * self.g[j][i];
                }
                self.b[m][i] = b_m;
            }
        }
    }

    /// Attempts one step of the current step size, and updates the step size for the next
    /// attempt. The state and clock only change if the step is accepted.
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
        if self.b[0].len() != n {
            self.reset_buffers(n);
        }

        let g = state.grav_constant;
        let x0 = &state.positions;
        let v0 = &state.velocities;
        let a0 = &state.accelerations;
        let m = &state.masses;

        let mut node_accel: [Vec<Vector3<f64>>; 8] = array::from_fn(|_| vec![Vector3::zeros(); n]);
        let mut x = vec![Vector3::zeros(); n];

        let mut converged = false;
        for _ in 0..MAX_PC_ITERATIONS {
            for (k, h) in NODES.iter().enumerate() {
                for i in 0..n {
                    x[i] = position_at(&x0[i], &v0[i], &a0[i], &self.b, i, *h, dt);
                }
                kernel.accelerations_into(&x, m, g, &mut node_accel[k]);
                if k >= 1 {
                    self.update_g(&node_accel, k);
                    self.update_b(k);
                }
            }

            let delta_b6 = max_abs_diff(&self.b[6], &self.b0[6]);
            let peak_accel = max_abs_component(&node_accel[7]);
            self.b0.clone_from(&self.b);
            // A vanishing acceleration (e.g. G = 0) leaves nothing to correct
            if peak_accel == 0.0 || delta_b6 / peak_accel < PC_TOLERANCE {
                converged = true;
                break;
            }
        }
        if !converged {
            debug!("predictor-corrector did not converge in {MAX_PC_ITERATIONS} iterations");
        }

        let mut v = vec![Vector3::zeros(); n];
        for i in 0..n {
            x[i] = position_at(&x0[i], &v0[i], &a0[i], &self.b, i, 1.0, dt);
            v[i] = velocity_at(&v0[i], &a0[i], &self.b, i, 1.0, dt);
        }
        let a_end = kernel.accelerations(&x, m, g);

        let peak_end = max_abs_component(&a_end);
        let error = if peak_end == 0.0 {
            0.0
        } else {
            (max_abs_component(&self.b[6]) / peak_end / opts.tolerance).powf(EXPONENT)
        };
        let dt_new = if error == 0.0 || !error.is_finite() {
            dt
        } else {
            dt / error
        };
        let accepted = error <= 1.0 || dt == opts.step_floor() || !error.is_finite();

        self.dt = if dt_new / dt > 1.0 / SAFETY_FACTOR {
            dt / SAFETY_FACTOR
        } else if dt_new < dt * SAFETY_FACTOR {
            dt * SAFETY_FACTOR
        } else {
            dt_new
        };
        if dt_new / opts.expected_time_scale < 1e-12 {
            self.dt = opts.step_floor();
        }

        if accepted {
            refine_coefficients(&mut self.b, &mut self.e, dt_new / dt, self.refined);
            self.refined = true;
            state.positions = x;
            state.velocities = v;
            state.accelerations = a_end;
            state.time += dt;
        }

        StepOutcome {
            accepted,
            error,
            dt_used: dt,
            dt_next: self.dt,
            attempts: 1,
        }
    }

    /// Retries [`Ias15::try_step`] with the adapted step size until a step is accepted.
    pub fn step(
        &mut self,
        state: &mut NBodyState,
        kernel: &dyn AccelerationKernel,
        opts: &PropOpts,
    ) -> StepOutcome {
        let mut attempts = 0;
        loop {
            let outcome = self.try_step(state, kernel, opts);
            attempts += outcome.attempts;
            if outcome.accepted || outcome.attempts == 0 {
                return StepOutcome {
                    attempts,
                    ..outcome
                };
            }
        }
    }
}

impl Integrator for Ias15 {
    fn kind(&self) -> IntegratorKind {
        IntegratorKind::Ias15
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
        self.reset_buffers(state.len());
        self.dt = if state.is_empty() {
            0.0
        } else {
            Self::initial_step(state, kernel)
        };
        debug!(
            "ias15 initialized for {} bodies with a step of {:e} days",
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
        adaptive_frame(state, opts, |state| self.step(state, kernel, opts))
    }

    fn step_size(&self) -> Option<f64> {
        Some(self.dt)
    }
}

#[cfg(test)]
mod ut_ias15 {
    use super::*;
    use crate::dynamics::Pairwise;
    use crate::state::Body;
    use approx::assert_relative_eq;

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
    fn reciprocal_node_differences() {
        for k in 1..8 {
            for j in 0..k {
                assert_relative_eq!(R[k][j] * (NODES[k] - NODES[j]), 1.0, max_relative = 1e-14);
            }
        }
    }

    #[test]
    fn first_refinement_without_step_change() {
        let mut b: Coefficients =
            array::from_fn(|k| vec![Vector3::new(k as f64 + 1.0, -0.5 * k as f64, 0.25)]);
        let original = b.clone();
        let mut e = zeroed(1);
        refine_coefficients(&mut b, &mut e, 1.0, false);
        // Without any previous prediction, b is exactly the new prediction
        assert_eq!(b, e);
        // The last coefficient is unchanged by a unit shift
        assert_eq!(e[6], original[6]);
        // e_0 = 7 b_6 + 6 b_5 + ... + b_0
        let expected: Vector3<f64> = original[6][0] * 7.0
            + original[5][0] * 6.0
            + original[4][0] * 5.0
            + original[3][0] * 4.0
            + original[2][0] * 3.0
            + original[1][0] * 2.0
            + original[0][0];
        assert_eq!(e[0][0], expected);
    }

    #[test]
    fn refinement_applies_previous_correction() {
        let mut b: Coefficients = array::from_fn(|k| vec![Vector3::new(1.0, 0.0, k as f64)]);
        let mut e: Coefficients = array::from_fn(|_| vec![Vector3::new(0.5, 0.0, 0.0)]);
        let correction: Vec<Vector3<f64>> = (0..7).map(|k| b[k][0] - e[k][0]).collect();
        refine_coefficients(&mut b, &mut e, 0.5, true);
        for k in 0..7 {
            assert_eq!(b[k][0], e[k][0] + correction[k]);
        }
        assert_eq!(e[6][0], Vector3::new(1.0, 0.0, 6.0) * 0.5_f64.powi(7));
    }

    #[test]
    fn controller_accepts_and_rejects() {
        let opts = PropOpts::with_tolerance(1e-9);
        let mut state = binary();
        let mut ias15 = Ias15::new();
        ias15.initialize(&mut state, &Pairwise, &opts);

        let mut accepted = 0;
        for _ in 0..20 {
            let before = state.clone();
            let outcome = ias15.try_step(&mut state, &Pairwise, &opts);
            assert_eq!(outcome.accepted, outcome.error <= 1.0, "{outcome:?}");
            if outcome.accepted {
                accepted += 1;
                assert_eq!(state.time(), before.time() + outcome.dt_used);
            } else {
                assert!(outcome.dt_next < outcome.dt_used);
                assert_eq!(state, before);
            }
        }
        assert!(accepted > 0);

        // A step longer than the orbital period cannot be within tolerance
        let before = state.clone();
        ias15.set_step(10.0);
        let outcome = ias15.try_step(&mut state, &Pairwise, &opts);
        assert!(outcome.error > 1.0);
        assert!(!outcome.accepted);
        assert!(outcome.dt_next < 10.0);
        assert_eq!(state, before);

        // Retrying always ends on an accepted step
        let outcome = ias15.step(&mut state, &Pairwise, &opts);
        assert!(outcome.accepted);
        assert!(outcome.attempts >= 1);
        assert!(state.time() > before.time());
    }
}
