use crate::body::{Perturber, PerturberSource, Rock};
use crate::elements::OrbitalElements;
use crate::error::SimError;
use crate::integrator::{IntegrationError, Integrator, IntegratorConfig};
use crate::model::PerturberModel;
use crate::simulation::{PropagateOptions, Simulation};
use rocks_core::constants::{AU, M_SUN};
use rocks_core::{EpochSpec, Frame, Origin, StateVector, UnitSpec, Units};
use std::f64::consts::PI;

const J2000: f64 = 2451545.0;

fn lone_sun() -> PerturberModel {
    PerturberModel::new()
        .with(Perturber::new("Sun", M_SUN, PerturberSource::Cartesian(StateVector::zero(Origin::Sun, Frame::Ecliptic))))
        .unwrap()
}

fn sun_session(config: IntegratorConfig) -> Simulation {
    Simulation::new(&lone_sun(), Units::default(), Some(J2000.into()), config).unwrap()
}

/// Circular heliocentric orbit at 1 AU in the ecliptic
fn circular_rock(sim: &Simulation, name: &str, epoch: Option<EpochSpec>) -> Rock {
    let v = sim.units().g.sqrt();
    Rock::cartesian(name, StateVector::from_au([1.0, 0.0, 0.0], [0.0, v, 0.0], Origin::Sun, Frame::Ecliptic), epoch)
}

fn days_after_j2000(days: f64) -> EpochSpec {
    EpochSpec::JdTdb(J2000 + days)
}

fn ceres() -> Rock {
    let elements = OrbitalElements::from_au_degrees(2.7675, 0.0758, 10.59, 80.31, 73.60, 95.99, 0.0);
    Rock::elements("Ceres", elements, None)
}

#[test]
fn test_rocks_at_session_epoch_take_no_steps() {
    let mut sim = sun_session(IntegratorConfig::default());
    assert_eq!(sim.integrator().time(), 0.0);
    let start = sim.start_epoch();
    let rock = circular_rock(&sim, "here", Some(EpochSpec::JdTdb(start)));

    let report = sim.add_rocks(&[rock]).unwrap();
    assert_eq!(report.steps, 0);
    assert_eq!(sim.integrator().steps(), 0);
    assert_eq!(report.registered, ["here"]);
    assert!(sim.pending().is_empty());
}

#[test]
fn test_rocks_join_at_their_own_epochs() {
    let mut sim = sun_session(IntegratorConfig::default());
    let t1 = days_after_j2000(10.0);
    let t2 = days_after_j2000(30.0);
    // Given out of order on purpose
    let late = circular_rock(&sim, "late", Some(t2));
    let early = circular_rock(&sim, "early", Some(t1));

    let report = sim.add_rocks(&[late, early]).unwrap();

    assert_eq!(report.registered, ["early", "late"]);
    assert_eq!(report.epochs.len(), 2);
    assert!(report.epochs[0] < report.epochs[1]);
    assert!(report.steps > 0);
    assert_eq!(sim.integrator().time(), sim.units().time_from_days(30.0));
    assert_eq!(sim.epoch(), J2000 + 30.0);

    for name in ["early", "late"] {
        let rows = sim.log().rows(crate::BodyHash::of(name)).unwrap();
        assert!(rows.is_empty());
    }
}

#[test]
fn test_undated_elements_use_the_current_epoch() {
    let mut sim = Simulation::new(&PerturberModel::builtin("SUN").unwrap(), Units::default(), None, IntegratorConfig::default()).unwrap();
    let rock = ceres();
    sim.add_rocks(&[rock.clone()]).unwrap();

    let expected = rock.ecliptic_state(sim.epoch()).unwrap();
    let state = sim.state_of("Ceres").unwrap();
    assert!((state.position - expected.position).magnitude() / AU < 1e-12);
}

#[test]
fn test_zero_length_propagation_returns_ingested_state() {
    let mut sim = sun_session(IntegratorConfig::default());
    sim.add_rocks(&[circular_rock(&sim, "rock", None)]).unwrap();
    let v = sim.units().g.sqrt();

    let tables = sim.propagate(&[EpochSpec::JdTdb(sim.start_epoch())], &PropagateOptions::default()).unwrap();
    let rocks = tables.test_particles.unwrap();

    assert_eq!(rocks.len(), 1);
    assert_eq!(rocks.epoch[0], J2000);
    assert!((rocks.x[0] - 1.0).abs() < 1e-12);
    assert!(rocks.y[0].abs() < 1e-12);
    assert!((rocks.vy[0] - v).abs() < 1e-15);
    assert_eq!(sim.integrator().steps(), 0);
}

#[test]
fn test_circular_orbit_closes_after_one_period() {
    let mut sim = sun_session(IntegratorConfig::default());
    sim.add_rocks(&[circular_rock(&sim, "rock", None)]).unwrap();
    let v = sim.units().g.sqrt();
    let period = 2.0 * PI / v;

    let tables = sim.propagate(&[(J2000 + period).into()], &PropagateOptions::default()).unwrap();
    let rocks = tables.test_particles.unwrap();

    assert_eq!(rocks.len(), 1);
    assert!((rocks.x[0] - 1.0).abs() < 1e-7, "x = {}", rocks.x[0]);
    assert!(rocks.y[0].abs() < 1e-7, "y = {}", rocks.y[0]);
    assert!((rocks.vy[0] - v).abs() < 1e-9);

    // The Sun alone does not move
    assert_eq!(tables.perturbers.len(), 1);
    assert_eq!(tables.perturbers.x[0], 0.0);
}

#[test]
fn test_rows_are_time_ordered() {
    let mut sim = Simulation::new(&PerturberModel::builtin("GIANTS").unwrap(), Units::default(), None, IntegratorConfig::default()).unwrap();
    sim.add_rocks(&[ceres()]).unwrap();

    let epochs: Vec<EpochSpec> = [J2000 + 300.0, J2000 + 20.0, J2000 + 150.0, J2000 + 20.0]
        .into_iter()
        .map(EpochSpec::from)
        .collect();
    let tables = sim.propagate(&epochs, &PropagateOptions::default()).unwrap();

    for table in [tables.test_particles.as_ref().unwrap(), &tables.perturbers] {
        for name in table.names() {
            let times: Vec<f64> = table.rows_for(name).map(|r| r.jd_tdb).collect();
            assert_eq!(times.len(), 4, "{name}");
            assert!(times.windows(2).all(|w| w[0] <= w[1]), "{name}: {times:?}");
        }
    }

    // The repeated epoch is a no-op step with a duplicated row
    let ceres: Vec<_> = tables.test_particles.unwrap().rows_for("Ceres").collect();
    assert_eq!(ceres[0], ceres[1]);
}

#[test]
fn test_repeat_propagation_only_appends() {
    let epochs: Vec<EpochSpec> = vec![(J2000 + 40.0).into(), (J2000 + 80.0).into()];

    let mut sim = Simulation::new(&PerturberModel::builtin("GIANTS").unwrap(), Units::default(), None, IntegratorConfig::default()).unwrap();
    sim.add_rocks(&[ceres()]).unwrap();
    let first = sim.propagate(&epochs, &PropagateOptions::default()).unwrap();
    let second = sim.propagate(&epochs, &PropagateOptions::default()).unwrap();

    let a = first.test_particles.unwrap();
    let b = second.test_particles.unwrap();
    assert_eq!(a.len(), 2);
    assert_eq!(b.len(), 4);
    for i in 0..2 {
        assert_eq!(b.epoch[i], a.epoch[i]);
        assert_eq!(b.epoch[i + 2], a.epoch[i]);
        assert!((b.x[i + 2] - a.x[i]).abs() < 1e-9);
        assert!((b.y[i + 2] - a.y[i]).abs() < 1e-9);
    }
}

#[test]
fn test_deduplicated_repeat_is_byte_identical() {
    let epochs: Vec<EpochSpec> = vec![(J2000 + 40.0).into(), (J2000 + 80.0).into(), (J2000 + 40.0).into()];
    let options = PropagateOptions { deduplicate: true, ..Default::default() };

    let mut sim = Simulation::new(&PerturberModel::builtin("GIANTS").unwrap(), Units::default(), None, IntegratorConfig::default()).unwrap();
    sim.add_rocks(&[ceres()]).unwrap();
    let first = sim.propagate(&epochs, &options).unwrap();
    let steps = sim.integrator().steps();
    let second = sim.propagate(&epochs, &options).unwrap();

    assert_eq!(first.test_particles.as_ref().unwrap().len(), 2);
    assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
    assert_eq!(sim.integrator().steps(), steps);
}

#[test]
fn test_empty_epoch_list() {
    let mut sim = sun_session(IntegratorConfig::default());
    let tables = sim.propagate(&[], &PropagateOptions::default()).unwrap();
    assert!(tables.test_particles.is_none());
    assert!(tables.perturbers.is_empty());

    sim.add_rocks(&[circular_rock(&sim, "rock", None)]).unwrap();
    let tables = sim.propagate(&[], &PropagateOptions::default()).unwrap();
    assert_eq!(tables.test_particles.map(|t| t.len()), Some(0));
    assert!(tables.perturbers.is_empty());
}

#[test]
fn test_callback_sees_each_epoch() {
    let mut sim = sun_session(IntegratorConfig::default());
    sim.add_rocks(&[circular_rock(&sim, "rock", None)]).unwrap();

    let mut seen = Vec::new();
    sim.propagate_with(
        &[(J2000 + 2.0).into(), (J2000 + 1.0).into()],
        &PropagateOptions::default(),
        |s| seen.push((s.epoch(), s.log().total_rows())),
    )
    .unwrap();

    assert_eq!(seen.len(), 2);
    assert!((seen[0].0 - (J2000 + 1.0)).abs() < 1e-6);
    assert!((seen[1].0 - (J2000 + 2.0)).abs() < 1e-6);
    // The callback runs before the rows of its epoch are logged
    assert_eq!(seen[0].1, 0);
    assert_eq!(seen[1].1, 2);
}

#[test]
fn test_overshoot_lands_past_the_epoch() {
    let mut sim = sun_session(IntegratorConfig::default());
    sim.add_rocks(&[circular_rock(&sim, "rock", None)]).unwrap();
    let options = PropagateOptions { exact_finish_time: false, ..Default::default() };

    let tables = sim.propagate(&[(J2000 + 3.3).into()], &options).unwrap();
    assert!(tables.perturbers.epoch[0] >= J2000 + 3.3 - 1e-9);
}

#[test]
fn test_overshoot_rows_stay_ordered() {
    let mut sim = sun_session(IntegratorConfig::default());
    sim.add_rocks(&[circular_rock(&sim, "rock", None)]).unwrap();
    let options = PropagateOptions { exact_finish_time: false, ..Default::default() };

    // Closer together than one natural step, so the first overshoot passes all three
    let epochs: Vec<EpochSpec> = [3.3, 3.3001, 3.3002].into_iter().map(days_after_j2000).collect();
    let tables = sim.propagate(&epochs, &options).unwrap();
    let rocks = tables.test_particles.unwrap();

    let times: Vec<f64> = rocks.rows_for("rock").map(|r| r.jd_tdb).collect();
    assert_eq!(times.len(), 3);
    assert!(times.windows(2).all(|w| w[0] <= w[1]), "{times:?}");
    assert!(times.iter().all(|&jd| jd >= J2000 + 3.3 - 1e-9), "{times:?}");
    assert_eq!(sim.epoch(), times[2]);
}

#[test]
fn test_partial_results_survive_a_failure() {
    let config = IntegratorConfig { max_distance: Some(5.0), ..Default::default() };
    let mut sim = sun_session(config);
    let runaway = Rock::cartesian(
        "runaway",
        StateVector::from_au([1.0, 0.0, 0.0], [0.1, 0.0, 0.0], Origin::Sun, Frame::Ecliptic),
        None,
    );
    sim.add_rocks(&[runaway]).unwrap();

    let epochs: Vec<EpochSpec> = vec![(J2000 + 10.0).into(), (J2000 + 20.0).into(), (J2000 + 2000.0).into()];
    let err = sim.propagate(&epochs, &PropagateOptions::default()).unwrap_err();
    assert!(matches!(err, SimError::Integration(IntegrationError::Escaped { .. })), "{err}");

    let partial = sim.trajectories();
    assert_eq!(partial.test_particles.unwrap().len(), 2);
    assert_eq!(partial.perturbers.len(), 2);
}

#[test]
fn test_failed_ingestion_leaves_rock_pending() {
    let config = IntegratorConfig { max_steps: 1, ..Default::default() };
    let mut sim = sun_session(config);
    let far = circular_rock(&sim, "far", Some(days_after_j2000(5000.0)));

    let err = sim.add_rocks(&[far]).unwrap_err();
    assert!(matches!(err, SimError::Integration(IntegrationError::MaxStepsExceeded { .. })));
    assert_eq!(sim.pending(), ["far"]);
    assert_eq!(sim.test_particle_names(), ["far"]);
    let again = circular_rock(&sim, "far", None);
    assert!(matches!(sim.add_rocks(&[again]), Err(SimError::DuplicateBody(name)) if name == "far"));

    let tables = sim.trajectories();
    assert_eq!(tables.test_particles.map(|t| t.len()), Some(0));
}

#[test]
fn test_heliocentric_rocks_are_moved_to_the_barycentre() {
    let mut sim = Simulation::new(&PerturberModel::builtin("PLANETS").unwrap(), Units::default(), None, IntegratorConfig::default()).unwrap();
    let helio = StateVector::from_au([2.0, 0.5, 0.1], [-0.002, 0.011, 0.0], Origin::Sun, Frame::Ecliptic);
    sim.add_rocks(&[Rock::cartesian("rock", helio, None)]).unwrap();

    let rock = sim.state_of("rock").unwrap();
    let sun = sim.state_of("Sun").unwrap();
    assert!(sun.position.magnitude() > 0.0, "Sun is off the barycentre");
    assert!((rock.position - sun.position - helio.position).magnitude() < 1e-3);
    assert!((rock.velocity - sun.velocity - helio.velocity).magnitude() < 1e-9);
}

#[test]
fn test_barycentre_is_at_rest() {
    let sim = Simulation::new(&PerturberModel::builtin("ALL").unwrap(), Units::default(), None, IntegratorConfig::default()).unwrap();
    let particles = sim.integrator().particles();
    let total: f64 = particles.iter().map(|p| p.mass).sum();
    let com = particles.iter().fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.position * p.mass) / total;
    let momentum = particles.iter().fold(nalgebra::Vector3::zeros(), |acc, p| acc + p.velocity * p.mass);
    assert!(com.magnitude() < 1e-15);
    assert!(momentum.magnitude() < 1e-18);
    assert!((total - 1.00134).abs() < 1e-4, "total mass {total} msun");
}

#[test]
fn test_ingestion_errors() {
    let mut sim = sun_session(IntegratorConfig::default());
    let rock = circular_rock(&sim, "twin", None);
    let err = sim.add_rocks(&[rock.clone(), rock.clone()]).unwrap_err();
    assert!(matches!(err, SimError::DuplicateBody(ref n) if n == "twin"));
    assert!(sim.test_particle_names().is_empty());

    let err = sim.add_rocks(&[circular_rock(&sim, "Sun", None)]).unwrap_err();
    assert!(matches!(err, SimError::DuplicateBody(ref n) if n == "Sun"));

    let jupiter_only = PerturberModel::new().with(crate::Body::Jupiter.perturber()).unwrap();
    let mut sim = Simulation::new(&jupiter_only, Units::default(), None, IntegratorConfig::default()).unwrap();
    let err = sim.add_rocks(&[ceres()]).unwrap_err();
    assert!(matches!(err, SimError::MissingOrigin { ref name } if name == "Ceres"));
}

#[test]
fn test_session_errors() {
    let furlongs = Units { distance: UnitSpec::from("furlong"), ..Default::default() };
    let err = Simulation::new(&lone_sun(), furlongs, None, IntegratorConfig::default()).err().unwrap();
    assert!(matches!(err, SimError::Unit(_)));

    let err = Simulation::new(&lone_sun(), Units::default(), Some("yesterday-ish".into()), IntegratorConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, SimError::Epoch(_)));

    let mixed = lone_sun()
        .with(Perturber::new(
            "Beacon",
            1.0e3,
            PerturberSource::Cartesian(StateVector::from_au([1.0, 0.0, 0.0], [0.0; 3], Origin::Barycenter, Frame::Ecliptic)),
        ))
        .unwrap();
    let err = Simulation::new(&mixed, Units::default(), None, IntegratorConfig::default()).err().unwrap();
    assert!(matches!(err, SimError::InconsistentOrigins(_)));
}

#[test]
fn test_text_epochs_are_detected() {
    let sim = Simulation::new(&lone_sun(), Units::default(), Some("2020-01-01 TDB".into()), IntegratorConfig::default()).unwrap();
    assert!((sim.start_epoch() - 2458849.5).abs() < 1e-8);

    let sim = Simulation::new(&lone_sun(), Units::default(), Some("MJD 51544.5 TDB".into()), IntegratorConfig::default()).unwrap();
    assert_eq!(sim.epoch(), J2000);
    assert_eq!(sim.integrator().time(), 0.0);
}

#[test]
fn test_results_agree_across_unit_systems() {
    let si = Units {
        mass: UnitSpec::from("kg"),
        distance: UnitSpec::from("km"),
        time: UnitSpec::from("s"),
        ..Default::default()
    };
    let rock = Rock::cartesian(
        "rock",
        StateVector::from_au([1.2, 0.1, 0.0], [0.0, 0.015, 0.001], Origin::Sun, Frame::Ecliptic),
        None,
    );
    let epochs: Vec<EpochSpec> = vec![(J2000 + 30.0).into()];

    let mut au_day = sun_session(IntegratorConfig::default());
    au_day.add_rocks(&[rock.clone()]).unwrap();
    let a = au_day.propagate(&epochs, &PropagateOptions::default()).unwrap().test_particles.unwrap();

    // The clock counts seconds from the start epoch, not from the JD origin
    let mut km_s = Simulation::new(&lone_sun(), si, Some(EpochSpec::JdTdb(J2000)), IntegratorConfig::default()).unwrap();
    assert_eq!(km_s.integrator().time(), 0.0);
    km_s.add_rocks(&[rock]).unwrap();
    let b = km_s.propagate(&epochs, &PropagateOptions::default()).unwrap().test_particles.unwrap();

    assert_eq!(b.units.label(), "kg/km/s");
    assert!((a.epoch[0] - b.epoch[0]).abs() < 1e-6);
    let x_a = a.x[0] * AU / 1000.0;
    assert!(((b.x[0] - x_a) / x_a).abs() < 1e-8, "{} vs {}", b.x[0], x_a);
}
