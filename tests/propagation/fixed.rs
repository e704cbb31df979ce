use gravity_sim::dynamics::{total_energy, Pairwise};
use gravity_sim::propagators::*;
use gravity_sim::scenarios::Scenario;
use gravity_sim::NBodyState;

use rstest::*;

use crate::{circular_binary, circular_binary_period, separation};

fn run(method: FixedMethod, state: &mut NBodyState, opts: &PropOpts, frames: usize) {
    let mut integrator = FixedStep::new(method);
    for _ in 0..frames {
        integrator.advance(state, &Pairwise, opts);
    }
}

#[test]
fn leapfrog_is_deterministic() {
    let opts = PropOpts::with_fixed_step(1e-3, 50);
    let mut first = NBodyState::from_bodies(
        &Scenario::FigureEight.bodies(),
        Scenario::FigureEight.grav_constant(),
    );
    let mut second = first.clone();

    run(FixedMethod::Leapfrog, &mut first, &opts, 40);
    run(FixedMethod::Leapfrog, &mut second, &opts, 40);

    // Bit for bit
    assert_eq!(first.positions(), second.positions());
    assert_eq!(first.velocities(), second.velocities());
    assert_eq!(first.accelerations(), second.accelerations());
    assert_eq!(first.time(), second.time());
}

#[rstest]
#[case(FixedMethod::Rk4, 1e-6)]
#[case(FixedMethod::Leapfrog, 1e-4)]
#[case(FixedMethod::EulerCromer, 1e-2)]
fn circular_orbit_one_period(#[case] method: FixedMethod, #[case] max_drift: f64) {
    let _ = pel::try_init();
    let mut state = circular_binary();
    let e0 = total_energy(&state);
    let steps = 2000;
    let dt = circular_binary_period() / steps as f64;
    run(method, &mut state, &PropOpts::with_fixed_step(dt, 100), steps / 100);

    let drift = ((total_energy(&state) - e0) / e0).abs();
    assert!(drift < max_drift, "{method}: energy drift of {drift:e}");
    assert!(
        (separation(&state) - 1.0).abs() < 10.0 * max_drift,
        "{method}: separation of {}",
        separation(&state)
    );
}

#[test]
fn explicit_euler_gains_energy() {
    let mut euler = circular_binary();
    let mut cromer = circular_binary();
    let e0 = total_energy(&euler);
    let opts = PropOpts::with_fixed_step(circular_binary_period() / 500.0, 50);
    run(FixedMethod::Euler, &mut euler, &opts, 10);
    run(FixedMethod::EulerCromer, &mut cromer, &opts, 10);

    // Forward Euler spirals outward while the semi-implicit scheme stays on the orbit
    assert!(total_energy(&euler) > e0);
    assert!(separation(&euler) > 1.05);
    let cromer_drift = ((total_energy(&cromer) - e0) / e0).abs();
    let euler_drift = ((total_energy(&euler) - e0) / e0).abs();
    assert!(cromer_drift < euler_drift / 10.0);
}

#[test]
fn rk4_converges_at_fourth_order() {
    let period = circular_binary_period();
    let errors: Vec<f64> = [200, 400]
        .iter()
        .map(|&steps| {
            let mut state = circular_binary();
            let dt = period / f64::from(steps);
            run(
                FixedMethod::Rk4,
                &mut state,
                &PropOpts::with_fixed_step(dt, steps),
                1,
            );
            (state.positions()[0] - circular_binary().positions()[0]).norm()
        })
        .collect();
    let ratio = errors[0] / errors[1];
    // Halving the step divides the error by about 16
    assert!(ratio > 12.0 && ratio < 24.0, "convergence ratio of {ratio}");
}
