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
use std::path::Path;

use snafu::prelude::*;

use crate::dynamics::{total_energy, AccelerationKernel, Pairwise};
use crate::errors::{ConfigLoadSnafu, InstabilitySnafu, SimError};
use crate::io::scenario::ScenarioConfig;
use crate::io::ConfigRepr;
use crate::linalg::Vector3;
use crate::propagators::{
    integrator_for, FixedMethod, FixedStep, IntegrationDetails, Integrator, IntegratorKind,
    PropOpts, Sample, Trajectory,
};
use crate::scenarios::{Scenario, GRAV_CONSTANT};
use crate::state::{Body, NBodyState};
use crate::time::{Duration, Unit};

/// Read-only copy of the simulation for rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct StateSnapshot {
    pub positions: Vec<Vector3<f64>>,
    pub velocities: Vec<Vector3<f64>>,
    pub masses: Vec<f64>,
    /// M_sun AU^2 d^-2, as of the last frame
    pub total_energy: f64,
    /// days
    pub simulation_time: f64,
    /// Simulation clock as a duration
    pub elapsed: Duration,
}

/// What a call to [`Simulation::advance_frame`] did.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// Integrator which actually ran, Euler when a single body is left
    pub integrator: IntegratorKind,
    /// Bodies removed for being out of range before stepping
    pub culled: usize,
    pub details: IntegrationDetails,
}

impl fmt::Display for FrameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.integrator, self.details)?;
        if self.culled > 0 {
            write!(f, " ({} culled)", self.culled)?;
        }
        Ok(())
    }
}

/// Owns the body ensemble and drives exactly one integrator per frame.
///
/// Selecting an integrator, changing the body set, and resetting the clock all invalidate the
/// integrator, which then reinitializes from the current positions and velocities at the next
/// frame.
#[derive(Debug)]
pub struct Simulation {
    state: NBodyState,
    kernel: Box<dyn AccelerationKernel>,
    selected: IntegratorKind,
    integrator: Box<dyn Integrator>,
    opts: PropOpts,
    total_energy: f64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation {
    /// An empty simulation in AU, days and solar masses, integrated with RK4.
    pub fn new() -> Self {
        let selected = IntegratorKind::default();
        Self {
            state: NBodyState::empty(GRAV_CONSTANT),
            kernel: Box::new(Pairwise),
            selected,
            integrator: integrator_for(selected),
            opts: PropOpts::default(),
            total_energy: 0.0,
        }
    }

    /// Uses the provided acceleration back end instead of the pairwise loop.
    pub fn with_kernel(mut self, kernel: Box<dyn AccelerationKernel>) -> Self {
        self.set_kernel(kernel);
        self
    }

    pub fn set_kernel(&mut self, kernel: Box<dyn AccelerationKernel>) {
        debug!("using the {kernel:?} acceleration kernel");
        self.kernel = kernel;
        self.integrator.invalidate();
    }

    /// Reseeds the simulation with new bodies, starting the clock over.
    pub fn configure(
        &mut self,
        positions: Vec<Vector3<f64>>,
        velocities: Vec<Vector3<f64>>,
        masses: Vec<f64>,
        grav_constant: f64,
    ) -> Result<(), SimError> {
        let state = NBodyState::new(positions, velocities, masses, grav_constant)?;
        self.seed(state);
        Ok(())
    }

    /// Reseeds the simulation from a list of bodies, starting the clock over.
    pub fn configure_bodies(&mut self, bodies: &[Body], grav_constant: f64) {
        self.seed(NBodyState::from_bodies(bodies, grav_constant));
    }

    pub fn load_scenario(&mut self, scenario: Scenario) {
        info!("loading the {scenario} scenario");
        self.configure_bodies(&scenario.bodies(), scenario.grav_constant());
    }

    fn seed(&mut self, state: NBodyState) {
        info!(
            "configured {} bodies with G = {:e}",
            state.len(),
            state.grav_constant()
        );
        self.state = state;
        self.total_energy = total_energy(&self.state);
        self.integrator.invalidate();
    }

    /// Builds a simulation from a scenario configuration.
    pub fn from_config(cfg: &ScenarioConfig) -> Result<Self, SimError> {
        let bodies = cfg.bodies().context(ConfigLoadSnafu)?;
        let grav_constant = cfg.grav_constant().context(ConfigLoadSnafu)?;
        let mut sim = Self::new();
        sim.set_integrator(cfg.integrator()?);
        sim.set_options(cfg.options);
        sim.configure_bodies(&bodies, grav_constant);
        Ok(sim)
    }

    /// Builds a simulation from the path to a YAML scenario configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let cfg = ScenarioConfig::load(path).context(ConfigLoadSnafu)?;
        Self::from_config(&cfg)
    }

    /// Selects an integrator by name, see [`IntegratorKind`] for the accepted names.
    pub fn select_integrator(&mut self, name: &str) -> Result<IntegratorKind, SimError> {
        let kind = name.parse::<IntegratorKind>()?;
        self.set_integrator(kind);
        Ok(kind)
    }

    /// Switches to the provided integrator. Its private state starts over even if it was
    /// already selected.
    pub fn set_integrator(&mut self, kind: IntegratorKind) {
        if kind != self.selected {
            info!("switching integrator from {} to {}", self.selected, kind);
        }
        self.selected = kind;
        self.integrator = integrator_for(kind);
    }

    /// Stores the options after bringing them into their admissible ranges.
    pub fn set_options(&mut self, opts: PropOpts) {
        self.opts = opts.clamped();
    }

    /// Zeroes the clock and the energy and keeps the bodies where they are.
    pub fn reset(&mut self) {
        info!("resetting the simulation clock");
        self.state.time = 0.0;
        self.total_energy = 0.0;
        self.integrator.invalidate();
    }

    pub fn add_body(&mut self, body: Body) {
        info!("adding body {body}");
        self.state.push(body);
        self.integrator.invalidate();
    }

    pub fn remove_body(&mut self, index: usize) -> Result<Body, SimError> {
        let body = self.state.remove(index)?;
        info!("removed body {index}: {body}");
        self.integrator.invalidate();
        Ok(body)
    }

    /// Removes every body and zeroes the clock and the energy. This is the recovery from an
    /// [`SimError::Instability`].
    pub fn clear_bodies(&mut self) {
        info!("clearing all {} bodies", self.state.len());
        self.state.clear();
        self.state.time = 0.0;
        self.total_energy = 0.0;
        self.integrator.invalidate();
    }

    /// Runs one frame of integration with the stored options.
    ///
    /// Bodies out of range are removed first. A single body is always stepped with Euler since it
    /// cannot interact with anything. Fails with [`SimError::Instability`] when the total energy
    /// after the frame is not a number; the state is left as is so the caller may inspect it.
    pub fn advance_frame(&mut self) -> Result<FrameReport, SimError> {
        let culled = self.state.cull_out_of_range(self.opts.max_range);
        if culled > 0 {
            info!(
                "removed {culled} bodies beyond {:e} AU, {} left",
                self.opts.max_range,
                self.state.len()
            );
            self.integrator.invalidate();
        }

        let (integrator, details) = match self.state.len() {
            0 => (self.selected, IntegrationDetails::default()),
            1 => {
                let mut euler = FixedStep::new(FixedMethod::Euler);
                let details = euler.advance(&mut self.state, self.kernel.as_ref(), &self.opts);
                // The selected integrator did not see this step
                self.integrator.invalidate();
                (IntegratorKind::Euler, details)
            }
            _ => (
                self.selected,
                self.integrator
                    .advance(&mut self.state, self.kernel.as_ref(), &self.opts),
            ),
        };

        self.total_energy = total_energy(&self.state);
        if self.total_energy.is_nan() {
            info!(
                "total energy is NaN at t = {} days with {} bodies",
                self.state.time,
                self.state.len()
            );
            return InstabilitySnafu {
                time: self.state.time,
            }
            .fail();
        }

        let report = FrameReport {
            integrator,
            culled,
            details,
        };
        trace!("t = {} days\t{report}", self.state.time);
        Ok(report)
    }

    /// Stores the options then runs one frame with them.
    pub fn advance_frame_with(&mut self, opts: PropOpts) -> Result<FrameReport, SimError> {
        self.set_options(opts);
        self.advance_frame()
    }

    /// Advances frame after frame until the clock moved by at least `duration` days.
    ///
    /// The returned trajectory holds the initial state, every `store_every_n`-th frame, and the
    /// final state. The last frame is not shortened, so the clock may overshoot by up to one
    /// frame. Propagation stops early if every body is removed.
    pub fn propagate_for(
        &mut self,
        duration: f64,
        store_every_n: usize,
    ) -> Result<Trajectory, SimError> {
        let every = store_every_n.max(1);
        let t_end = self.state.time + duration;
        let mut traj = Trajectory::new();
        traj.push(Sample::from_state(&self.state));

        let mut frame = 0;
        while self.state.time < t_end {
            if self.state.is_empty() {
                warn!(
                    "no bodies left at t = {} days, stopping propagation",
                    self.state.time
                );
                break;
            }
            self.advance_frame()?;
            frame += 1;
            if frame % every == 0 {
                traj.push(Sample::from_state(&self.state));
            }
        }
        traj.push(Sample::from_state(&self.state));

        debug!("propagated {frame} frames: {traj}");
        Ok(traj)
    }

    pub fn read_state(&self) -> StateSnapshot {
        StateSnapshot {
            positions: self.state.positions().to_vec(),
            velocities: self.state.velocities().to_vec(),
            masses: self.state.masses().to_vec(),
            total_energy: self.total_energy,
            simulation_time: self.state.time,
            elapsed: Unit::Day * self.state.time,
        }
    }

    pub fn state(&self) -> &NBodyState {
        &self.state
    }

    pub fn integrator_kind(&self) -> IntegratorKind {
        self.selected
    }

    pub fn integrator(&self) -> &dyn Integrator {
        self.integrator.as_ref()
    }

    pub fn options(&self) -> &PropOpts {
        &self.opts
    }

    /// Total energy as of the last frame or configuration.
    pub fn total_energy(&self) -> f64 {
        self.total_energy
    }
}
