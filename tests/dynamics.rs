extern crate gravity_sim;

use gravity_sim::dynamics::*;
use gravity_sim::linalg::Vector3;
use gravity_sim::scenarios::{Scenario, GRAV_CONSTANT};
use gravity_sim::NBodyState;

use approx::{assert_abs_diff_eq, assert_relative_eq};
use rstest::*;

#[rstest]
fn equal_masses_are_antiparallel(
    #[values(Box::new(Pairwise), Box::new(Batched))] kernel: Box<dyn AccelerationKernel>,
) {
    let positions = vec![Vector3::new(2.0, -1.0, 0.5), Vector3::new(-2.0, 1.0, -0.5)];
    let masses = vec![3.0, 3.0];
    let accel = kernel.accelerations(&positions, &masses, GRAV_CONSTANT);
    assert_eq!(accel[0], -accel[1]);
    // |r| = sqrt(21), so |a| = G m / 21
    assert_relative_eq!(
        accel[0].norm(),
        GRAV_CONSTANT * 3.0 / 21.0,
        max_relative = 1e-14
    );
}

#[test]
fn kernels_agree_on_the_solar_system() {
    let bodies = Scenario::SolarSystemExtended.bodies();
    let state = NBodyState::from_bodies(&bodies, GRAV_CONSTANT);
    let pairwise = Pairwise.accelerations(state.positions(), state.masses(), GRAV_CONSTANT);
    let batched = Batched.accelerations(state.positions(), state.masses(), GRAV_CONSTANT);
    for (p, b) in pairwise.iter().zip(&batched) {
        assert_relative_eq!(p, b, max_relative = 1e-12);
    }
    // The Sun barely moves and the Earth feels mostly the Sun and the Moon
    assert!(pairwise[0].norm() < 1e-6);
    assert_relative_eq!(
        pairwise[3].norm(),
        GRAV_CONSTANT / state.positions()[3].norm_squared(),
        max_relative = 0.2
    );
}

#[test]
fn momentum_is_conserved_by_the_kernel() {
    let state = NBodyState::from_bodies(&Scenario::PythagoreanThreeBody.bodies(), GRAV_CONSTANT);
    let accel = Pairwise.accelerations(state.positions(), state.masses(), GRAV_CONSTANT);
    let force = accel
        .iter()
        .zip(state.masses())
        .fold(Vector3::zeros(), |f, (a, m)| f + a * *m);
    assert_abs_diff_eq!(force, Vector3::zeros(), epsilon = 1e-12);
}

#[test]
fn figure_eight_energy() {
    let state = NBodyState::from_bodies(&Scenario::FigureEight.bodies(), GRAV_CONSTANT);
    // In units where G m = 1, the figure-8 has E = -1.28705...
    assert_relative_eq!(
        total_energy(&state) * GRAV_CONSTANT,
        -1.287_048_3,
        max_relative = 1e-6
    );
    assert!(kinetic_energy(state.velocities(), state.masses()) > 0.0);
    assert!(potential_energy(state.positions(), state.masses(), GRAV_CONSTANT) < 0.0);
}

#[test]
fn coincident_bodies_are_nan() {
    let positions = vec![Vector3::new(1.0, 0.0, 0.0); 2];
    let masses = vec![1.0, 1.0];
    let accel = Pairwise.accelerations(&positions, &masses, 1.0);
    assert!(accel.iter().all(|a| a.iter().all(|c| c.is_nan())));
    assert!(potential_energy(&positions, &masses, 1.0).is_nan());
}
