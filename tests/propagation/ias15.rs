use gravity_sim::dynamics::Pairwise;
use gravity_sim::propagators::*;
use gravity_sim::scenarios::{Scenario, FIGURE_EIGHT_PERIOD};
use gravity_sim::{IntegratorKind, Simulation};

use approx::assert_relative_eq;

use super::embedded::eccentric_binary;
use crate::{circular_binary, circular_binary_period, separation};

#[test]
fn figure_eight_energy() {
    let _ = pel::try_init();
    let mut sim = Simulation::new();
    sim.load_scenario(Scenario::FigureEight);
    sim.set_integrator(IntegratorKind::Ias15);
    sim.set_options(
        PropOpts::builder()
            .tolerance(1e-9)
            .max_iteration(300)
            .build(),
    );

    let traj = sim.propagate_for(FIGURE_EIGHT_PERIOD, 1).unwrap();
    assert!(traj.len() > 2);
    let drift = traj.energy_drift();
    assert!(drift < 1e-8, "energy drift of {drift:e}");

    assert!(traj.last().unwrap().time >= FIGURE_EIGHT_PERIOD);
}

#[test]
fn circular_orbit_one_period() {
    let initial = circular_binary();
    let mut sim = Simulation::new();
    sim.configure_bodies(&initial.bodies(), initial.grav_constant());
    sim.set_integrator(IntegratorKind::Ias15);
    sim.set_options(PropOpts::builder().tolerance(1e-9).max_iteration(300).build());

    let traj = sim.propagate_for(circular_binary_period(), 10).unwrap();
    assert!(traj.energy_drift() < 1e-9);
    assert_relative_eq!(separation(sim.state()), 1.0, max_relative = 1e-8);
}

#[test]
fn step_control_decisions() {
    let mut state = eccentric_binary();
    let opts = PropOpts::with_tolerance(1e-9);
    let mut ias15 = Ias15::new();
    ias15.initialize(&mut state, &Pairwise, &opts);
    ias15.set_step(0.5);

    let mut rejections = 0;
    for _ in 0..300 {
        let time = state.time();
        let outcome = ias15.try_step(&mut state, &Pairwise, &opts);
        if outcome.error <= 1.0 {
            assert!(outcome.accepted);
            assert_eq!(state.time(), time + outcome.dt_used);
        } else if outcome.error.is_finite() && outcome.dt_used != opts.step_floor() {
            rejections += 1;
            assert!(!outcome.accepted);
            assert!(outcome.dt_next < outcome.dt_used);
            assert_eq!(state.time(), time);
        }
    }
    assert!(rejections > 0);
    assert!(state.time() > 0.0);
}

#[test]
fn retries_until_accepted() {
    let mut state = eccentric_binary();
    let opts = PropOpts::with_tolerance(1e-9);
    let mut ias15 = Ias15::new();
    ias15.initialize(&mut state, &Pairwise, &opts);
    ias15.set_step(1.0);

    let outcome = ias15.step(&mut state, &Pairwise, &opts);
    assert!(outcome.accepted);
    assert!(outcome.attempts > 1);
    assert!(outcome.dt_used < 1.0);
    assert_eq!(state.time(), outcome.dt_used);
}
