use gravity_sim::dynamics::Pairwise;
use gravity_sim::linalg::Vector3;
use gravity_sim::propagators::*;
use gravity_sim::{Body, IntegratorKind, NBodyState, Simulation};

use rstest::*;

use crate::{circular_binary, circular_binary_period, separation};

/// A binary released at a tenth of the circular speed, which plunges toward its pericenter.
pub fn eccentric_binary() -> NBodyState {
    let speed = 0.1 * 0.5_f64.sqrt();
    NBodyState::from_bodies(
        &[
            Body::new(
                Vector3::new(0.5, 0.0, 0.0),
                Vector3::new(0.0, speed, 0.0),
                1.0,
            ),
            Body::new(
                Vector3::new(-0.5, 0.0, 0.0),
                Vector3::new(0.0, -speed, 0.0),
                1.0,
            ),
        ],
        1.0,
    )
}

#[rstest]
#[case(IntegratorKind::Rkf45)]
#[case(IntegratorKind::Dopri)]
#[case(IntegratorKind::Dverk)]
#[case(IntegratorKind::Rkf78)]
fn circular_orbit_one_period(#[case] kind: IntegratorKind) {
    let _ = pel::try_init();
    let initial = circular_binary();
    let mut sim = Simulation::new();
    sim.configure_bodies(&initial.bodies(), initial.grav_constant());
    sim.set_integrator(kind);
    sim.set_options(
        PropOpts::builder()
            .tolerance(1e-10)
            .max_iteration(1000)
            .build(),
    );

    let traj = sim.propagate_for(circular_binary_period(), 5).unwrap();
    let drift = traj.energy_drift();
    assert!(drift < 1e-6, "{kind}: energy drift of {drift:e}");
    assert!(
        (separation(sim.state()) - 1.0).abs() < 1e-5,
        "{kind}: separation of {}",
        separation(sim.state())
    );
    assert!(traj.last().unwrap().time >= circular_binary_period());
}

#[rstest]
fn step_control_decisions(
    #[values(
        Tableau::rkf45(),
        Tableau::dopri(),
        Tableau::dverk(),
        Tableau::rkf78()
    )]
    tableau: Tableau,
) {
    let mut state = eccentric_binary();
    let opts = PropOpts::with_tolerance(1e-9);
    let mut rk = EmbeddedRk::<RmsScaled>::new(tableau);
    rk.initialize(&mut state, &Pairwise, &opts);
    // Start far too large to exercise rejections
    rk.set_step(0.5);

    let mut rejections = 0;
    for _ in 0..300 {
        let time = state.time();
        let outcome = rk.try_step(&mut state, &Pairwise, &opts);
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
    assert!(rejections > 0, "{tableau}: no step was rejected");
    assert!(state.time() > 0.0);
}
