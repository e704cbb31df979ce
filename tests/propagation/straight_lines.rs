use gravity_sim::linalg::Vector3;
use gravity_sim::propagators::*;
use gravity_sim::{Body, NBodyState};

use approx::assert_relative_eq;
use rstest::*;

#[fixture]
fn free_bodies() -> NBodyState {
    NBodyState::from_bodies(
        &[
            Body::new(
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 0.2, 0.0),
                1.0,
            ),
            Body::new(
                Vector3::new(-1.0, 2.0, 0.5),
                Vector3::new(0.1, -0.1, 0.05),
                2.0,
            ),
            Body::new(
                Vector3::new(0.0, -3.0, 1.0),
                Vector3::new(-0.3, 0.0, 0.0),
                0.5,
            ),
        ],
        0.0,
    )
}

#[rstest]
fn straight_lines_without_gravity(
    free_bodies: NBodyState,
    #[values(
        IntegratorKind::Euler,
        IntegratorKind::EulerCromer,
        IntegratorKind::Rk4,
        IntegratorKind::Leapfrog,
        IntegratorKind::Rkf45,
        IntegratorKind::Dopri,
        IntegratorKind::Dverk,
        IntegratorKind::Rkf78,
        IntegratorKind::Ias15
    )]
    kind: IntegratorKind,
) {
    let _ = pel::try_init();
    let opts = PropOpts::with_fixed_step(0.05, 4);
    let mut state = free_bodies.clone();
    let mut integrator = integrator_for(kind);
    assert_eq!(integrator.kind(), kind);

    for _ in 0..5 {
        integrator.advance(&mut state, &gravity_sim::dynamics::Pairwise, &opts);
    }

    let t = state.time();
    assert!(t > 0.0, "{kind} did not advance the clock");
    for (i, body) in free_bodies.bodies().iter().enumerate() {
        assert_eq!(state.velocities()[i], body.velocity, "{kind} changed a velocity");
        assert_relative_eq!(
            state.positions()[i],
            body.position + body.velocity * t,
            epsilon = 1e-12
        );
    }
}
