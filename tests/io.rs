extern crate gravity_sim;
extern crate pretty_env_logger as pel;

use std::fs;
use std::path::PathBuf;

use gravity_sim::io::scenario::ScenarioConfig;
use gravity_sim::io::{ConfigError, ConfigRepr};
use gravity_sim::propagators::{PropOpts, Trajectory};
use gravity_sim::scenarios::{Scenario, GRAV_CONSTANT};
use gravity_sim::{IntegratorKind, SimError, Simulation};

use approx::assert_relative_eq;

fn output_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("gravity_sim_tests");
    fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

const BINARY_YAML: &str = r#"
grav_constant: 1.0
integrator: leapfrog
bodies:
  - name: primary
    position: [0.5, 0.0, 0.0]
    velocity: [0.0, 0.7071067811865476, 0.0]
    mass: 1.0
  - name: secondary
    position: [-0.5, 0.0, 0.0]
    velocity: [0.0, -0.7071067811865476, 0.0]
    mass: 1.0
options:
  dt: 0.001
  time_speed: 100
"#;

#[test]
fn load_scenario_file() {
    let _ = pel::try_init();
    let path = output_path("binary.yaml");
    fs::write(&path, BINARY_YAML).unwrap();

    let mut sim = Simulation::load(&path).unwrap();
    assert_eq!(sim.integrator_kind(), IntegratorKind::Leapfrog);
    assert_eq!(sim.state().len(), 2);
    assert_eq!(sim.state().grav_constant(), 1.0);
    assert_eq!(sim.options().time_speed, 100);

    sim.advance_frame().unwrap();
    assert_relative_eq!(sim.read_state().simulation_time, 0.1, epsilon = 1e-12);
    let separation = (sim.state().positions()[0] - sim.state().positions()[1]).norm();
    assert_relative_eq!(separation, 1.0, epsilon = 1e-6);
}

#[test]
fn load_preset_with_clamped_options() {
    let cfg = ScenarioConfig::loads(
        "preset: solar_system_extended\nintegrator: ias15\noptions:\n  tolerance: 1.0\n",
    )
    .unwrap();
    let sim = Simulation::from_config(&cfg).unwrap();
    assert_eq!(sim.state().len(), 13);
    assert_eq!(sim.state().grav_constant(), GRAV_CONSTANT);
    assert_eq!(sim.options().tolerance, 1e-4);
}

#[test]
fn configuration_errors() {
    let err = Simulation::load(output_path("does_not_exist.yaml")).unwrap_err();
    assert!(matches!(err, SimError::ConfigLoad { .. }));

    let cfg = ScenarioConfig::loads("integrator: midpoint\n").unwrap();
    assert!(matches!(
        Simulation::from_config(&cfg),
        Err(SimError::UnknownIntegrator { .. })
    ));

    let cfg = ScenarioConfig::loads("bodies:\n  - position: [0, 0, 0]\n    mass: .nan\n").unwrap();
    assert!(matches!(
        Simulation::from_config(&cfg),
        Err(SimError::ConfigLoad { .. })
    ));
}

#[test]
fn load_many_options() {
    let path = output_path("options.yaml");
    fs::write(
        &path,
        "- dt: 0.01\n  time_speed: 10\n- tolerance: 1.0e-12\n  max_iteration: 500\n",
    )
    .unwrap();
    let all = PropOpts::load_many(&path).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].frame_span(), 0.1);
    assert_eq!(all[1].max_iteration, 500);
    assert_eq!(all[1].dt, PropOpts::default().dt);
}

#[test]
fn export_trajectory_csv() {
    let mut sim = Simulation::new();
    sim.load_scenario(Scenario::FigureEight);
    sim.set_options(PropOpts::with_fixed_step(0.01, 10));
    let traj = sim.propagate_for(0.95, 2).unwrap();
    // Initial state, every other frame of ten, and the final state
    assert_eq!(traj.len(), 6);

    let path = output_path("figure_eight.csv");
    traj.to_csv(&path).unwrap();

    let mut rdr = csv::Reader::from_path(&path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    assert_eq!(headers.len(), 2 + 6 * 3);
    assert_eq!(&headers[0], "time");
    assert_eq!(&headers[2], "x0");
    assert_eq!(&headers[19], "vz2");

    let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), traj.len());
    for (row, sample) in rows.iter().zip(&traj) {
        assert_eq!(row[0].parse::<f64>().unwrap(), sample.time);
        assert_eq!(row[1].parse::<f64>().unwrap(), sample.energy);
        assert_eq!(row[5].parse::<f64>().unwrap(), sample.velocities[0].x);
    }

    assert!(Trajectory::new().to_csv(output_path("empty.csv")).is_ok());
}

#[test]
fn export_to_missing_directory() {
    let mut sim = Simulation::new();
    sim.load_scenario(Scenario::FigureEight);
    let traj = sim.propagate_for(0.01, 1).unwrap();
    let path = output_path("no_such_dir").join("nested").join("traj.csv");
    let err = traj.to_csv(path).unwrap_err();
    assert!(matches!(
        err,
        SimError::TrajectoryExport {
            source: ConfigError::CsvError { .. }
        }
    ));
}
