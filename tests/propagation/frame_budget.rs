use gravity_sim::dynamics::Pairwise;
use gravity_sim::linalg::Vector3;
use gravity_sim::propagators::*;
use gravity_sim::scenarios::Scenario;
use gravity_sim::{Body, NBodyState};

use approx::assert_relative_eq;
use rstest::*;

#[fixture]
fn figure_eight() -> NBodyState {
    let scenario = Scenario::FigureEight;
    NBodyState::from_bodies(&scenario.bodies(), scenario.grav_constant())
}

#[test]
fn exhausted_budget_keeps_progress() {
    let _ = pel::try_init();
    let mut state = NBodyState::from_bodies(
        &[
            Body::new(Vector3::new(1.0, 0.0, 0.0), Vector3::new(0.0, 0.2, 0.0), 1.0),
            Body::new(Vector3::new(-1.0, 0.0, 0.0), Vector3::new(0.1, 0.0, 0.0), 1.0),
        ],
        0.0,
    );
    let opts = PropOpts::builder().max_iteration(3).build();
    let mut ias15 = integrator_for(IntegratorKind::Ias15);

    let details = ias15.advance(&mut state, &Pairwise, &opts);
    assert_eq!(details.micro_steps, 3);
    assert_eq!(details.accepted, 3);
    assert_eq!(details.attempts, 3);
    // Without gravity the error is zero and the initial step is kept
    assert_eq!(details.step, 1e-6);
    let t = state.time();
    assert!(t > 0.0 && t < opts.early_exit_span(), "t = {t}");
    assert_relative_eq!(t, 3e-6, max_relative = 1e-12);

    // The next frame resumes where this one stopped
    let details = ias15.advance(&mut state, &Pairwise, &opts);
    assert_eq!(details.micro_steps, 3);
    assert_relative_eq!(state.time(), 6e-6, max_relative = 1e-12);
}

#[rstest]
fn early_exit_at_min_iteration(
    figure_eight: NBodyState,
    #[values(
        IntegratorKind::Rkf45,
        IntegratorKind::Dopri,
        IntegratorKind::Dverk,
        IntegratorKind::Rkf78,
        IntegratorKind::Ias15
    )]
    kind: IntegratorKind,
) {
    let _ = pel::try_init();
    let opts = PropOpts::builder()
        .expected_time_scale(1.0)
        .min_iteration(5)
        .max_iteration(50)
        .build();
    let mut state = figure_eight;
    let mut integrator = integrator_for(kind);

    for frame in 1..=2 {
        let t0 = state.time();
        let details = integrator.advance(&mut state, &Pairwise, &opts);
        assert_eq!(details.micro_steps, 5, "{kind} frame {frame}: {details}");
        assert!(details.accepted >= 1, "{kind} frame {frame}: {details}");
        assert!(
            state.time() > t0 + opts.early_exit_span(),
            "{kind} frame {frame} stopped at t = {}",
            state.time()
        );
    }
}
