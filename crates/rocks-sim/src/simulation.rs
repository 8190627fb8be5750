//! Simulation session: perturbers plus test particles driven through an
//! [`Integrator`], with every requested epoch appended to a trajectory log.

use std::collections::HashSet;

use indicatif::{ProgressBar, ProgressStyle};
use rocks_core::constants::J2000_JD;
use rocks_core::{EpochSpec, Frame, Origin, SimUnits, StateVector, Units};
use serde::{Deserialize, Serialize};

use crate::body::{BodyHash, Rock};
use crate::error::{SimError, SimResult};
use crate::integrator::{FinishMode, Integrator, IntegratorConfig, NBody, Particle};
use crate::model::PerturberModel;
use crate::planets::Body;
use crate::trajectory::{assemble, TrajectoryLog, TrajectoryRow, Trajectories};

/// Knobs for one `propagate` call
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagateOptions {
    /// Scale and format for bare numeric epochs; the session's own units when absent
    pub units: Option<Units>,
    /// Show a progress bar
    pub progress: bool,
    /// Land exactly on each epoch instead of the first internal step past it
    pub exact_finish_time: bool,
    /// Drop repeated epochs, and epochs every body already has a row for
    pub deduplicate: bool,
}

impl Default for PropagateOptions {
    fn default() -> Self {
        Self {
            units: None,
            progress: false,
            exact_finish_time: true,
            deduplicate: false,
        }
    }
}

/// What `add_rocks` did
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IngestReport {
    pub registered: Vec<String>,
    /// Integrator steps taken to reach the rocks' epochs
    pub steps: u64,
    /// Distinct rock epochs visited, ascending (JD TDB)
    pub epochs: Vec<f64>,
}

/// A propagation session.
///
/// Only ingestion (`new`, `add_rocks`) creates log entries and only the
/// propagation loop appends rows to them. The engine clock counts from the
/// session's start epoch, so it reads zero right after `new`.
pub struct Simulation<I: Integrator = NBody> {
    integrator: I,
    units: SimUnits,
    declared: Units,
    start_jd: f64,
    perturbers: Vec<String>,
    test_particles: Vec<String>,
    pending: Vec<String>,
    log: TrajectoryLog,
}

impl Simulation<NBody> {
    /// Session on the bundled engine, `epoch` defaulting to J2000 TDB
    pub fn new(
        model: &PerturberModel,
        units: Units,
        epoch: Option<EpochSpec>,
        config: IntegratorConfig,
    ) -> SimResult<Self> {
        let g = units.resolve()?.g;
        Self::with_integrator(model, units, epoch, NBody::new(g, config))
    }
}

impl<I: Integrator> Simulation<I> {
    /// Session on a caller-provided engine. The engine must be empty and
    /// already use the gravitational constant of `units`.
    pub fn with_integrator(
        model: &PerturberModel,
        units: Units,
        epoch: Option<EpochSpec>,
        mut integrator: I,
    ) -> SimResult<Self> {
        let sim_units = units.resolve()?;
        let start_jd = match &epoch {
            Some(spec) => spec.resolve_jd(units.timescale, units.timeformat)?,
            None => J2000_JD,
        };
        integrator.set_time(0.0);

        let mut session = Self {
            integrator,
            units: sim_units,
            declared: units,
            start_jd,
            perturbers: Vec::new(),
            test_particles: Vec::new(),
            pending: Vec::new(),
            log: TrajectoryLog::new(),
        };

        let mut origin: Option<(Origin, &str)> = None;
        for perturber in model.iter() {
            let state = perturber.state_at(start_jd)?.to_frame(Frame::Ecliptic);
            match origin {
                None => origin = Some((state.origin, perturber.name.as_str())),
                Some((first, first_name)) if first != state.origin => {
                    return Err(SimError::InconsistentOrigins(format!(
                        "{first_name} is {first:?}, {} is {:?}",
                        perturber.name, state.origin
                    )));
                }
                Some(_) => {}
            }

            let mass = session.units.mass_from_si(perturber.mass_kg);
            session.register(&perturber.name, mass, &state)?;
            session.perturbers.push(perturber.name.clone());
        }

        session.integrator.move_to_com();

        tracing::info!(
            "Session at JD {:.6} TDB with {} perturbers ({})",
            start_jd,
            session.perturbers.len(),
            session.units.label()
        );
        Ok(session)
    }

    /// Add massless test particles.
    ///
    /// Rocks without an epoch join at the current time. The rest are grouped
    /// by epoch and, in ascending order, the integrator is advanced exactly
    /// to each group's epoch before that group joins.
    pub fn add_rocks(&mut self, rocks: &[Rock]) -> SimResult<IngestReport> {
        let now = self.epoch();
        let declared = &self.declared;
        let has_sun = self.has_sun();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut undated: Vec<(&str, StateVector)> = Vec::new();
        let mut dated: Vec<(f64, &str, StateVector)> = Vec::new();
        for rock in rocks {
            let known = self.log.contains(BodyHash::of(&rock.name)) || self.test_particles.contains(&rock.name);
            if known || !seen.insert(rock.name.as_str()) {
                return Err(SimError::DuplicateBody(rock.name.clone()));
            }
            let jd = match &rock.epoch {
                Some(spec) => Some(spec.resolve_jd(declared.timescale, declared.timeformat)?),
                None => None,
            };
            let state = rock.ecliptic_state(jd.unwrap_or(now))?;
            if state.origin == Origin::Sun && !has_sun {
                return Err(SimError::MissingOrigin { name: rock.name.clone() });
            }
            match jd {
                Some(jd) => dated.push((self.time_of(jd), rock.name.as_str(), state)),
                None => undated.push((rock.name.as_str(), state)),
            }
        }

        for rock in rocks {
            self.test_particles.push(rock.name.clone());
            self.pending.push(rock.name.clone());
        }

        let steps_before = self.integrator.steps();
        let mut report = IngestReport::default();

        for (name, state) in undated {
            self.insert_rock(name, &state)?;
            report.registered.push(name.to_string());
        }

        dated.sort_by(|a, b| a.0.total_cmp(&b.0));
        for group in dated.chunk_by(|a, b| a.0 == b.0) {
            let t = group[0].0;
            tracing::debug!(
                "Advancing to JD {:.6} for {} rock(s)",
                self.jd_of(t),
                group.len()
            );
            self.integrator.integrate(t, FinishMode::Exact)?;
            report.epochs.push(self.jd_of(t));

            for (_, name, state) in group {
                self.insert_rock(name, state)?;
                report.registered.push(name.to_string());
            }
        }

        report.steps = self.integrator.steps() - steps_before;
        tracing::info!(
            "Added {} rocks over {} epoch(s) in {} steps",
            report.registered.len(),
            report.epochs.len(),
            report.steps
        );
        Ok(report)
    }

    /// Advance through `epochs` (sorted ascending), logging every body at each
    pub fn propagate(&mut self, epochs: &[EpochSpec], options: &PropagateOptions) -> SimResult<Trajectories> {
        self.propagate_with(epochs, options, |_| {})
    }

    /// As [`propagate`](Self::propagate), calling `callback` after each
    /// epoch is reached and before its rows are logged.
    ///
    /// Without an exact finish the engine may already sit past the next
    /// epoch; it is then not moved and the current state is logged again,
    /// so rows stay in time order.
    ///
    /// On error, rows logged so far stay available through
    /// [`trajectories`](Self::trajectories).
    pub fn propagate_with<F>(
        &mut self,
        epochs: &[EpochSpec],
        options: &PropagateOptions,
        mut callback: F,
    ) -> SimResult<Trajectories>
    where
        F: FnMut(&Self),
    {
        let declared = options.units.as_ref().unwrap_or(&self.declared);
        let mut times = epochs
            .iter()
            .map(|spec| {
                spec.resolve_jd(declared.timescale, declared.timeformat)
                    .map(|jd| self.time_of(jd))
            })
            .collect::<Result<Vec<f64>, _>>()?;
        times.sort_by(f64::total_cmp);
        if options.deduplicate {
            times.dedup();
        }

        let finish = FinishMode::from_exact(options.exact_finish_time);
        let pb = if options.progress {
            ProgressBar::new(times.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40}] {pos}/{len} JD {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }

        tracing::info!("Propagating {} bodies over {} epochs", self.integrator.particles().len(), times.len());

        let mut moved = false;
        for t in times {
            if options.deduplicate && self.is_recorded(t) {
                tracing::debug!("Skipping JD {:.6}, already logged", self.jd_of(t));
                pb.inc(1);
                continue;
            }

            if finish == FinishMode::Overshoot && moved && self.integrator.time() >= t {
                tracing::debug!(
                    "Already at JD {:.6}, past JD {:.6}",
                    self.jd_of(self.integrator.time()),
                    self.jd_of(t)
                );
            } else {
                self.integrator.integrate(t, finish)?;
                moved = true;
            }
            callback(&*self);
            self.record();

            pb.set_message(format!("{:.2}", self.jd_of(self.integrator.time())));
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(self.trajectories())
    }

    /// Current tables: perturbers, plus test particles when any were added.
    /// Safe to call after a failed propagation.
    pub fn trajectories(&self) -> Trajectories {
        for name in &self.pending {
            tracing::warn!("{} was registered but never entered the integrator", name);
        }

        let perturbers = assemble(self.perturbers.iter().map(String::as_str), &self.log, &self.units);
        let test_particles = if self.test_particles.is_empty() {
            None
        } else {
            Some(assemble(self.test_particles.iter().map(String::as_str), &self.log, &self.units))
        };

        Trajectories { test_particles, perturbers }
    }

    /// Julian Date (TDB) the integrator currently sits at
    pub fn epoch(&self) -> f64 {
        self.jd_of(self.integrator.time())
    }

    /// Julian Date (TDB) the session was created at
    pub fn start_epoch(&self) -> f64 {
        self.start_jd
    }

    pub fn units(&self) -> &SimUnits {
        &self.units
    }

    pub fn declared_units(&self) -> &Units {
        &self.declared
    }

    pub fn integrator(&self) -> &I {
        &self.integrator
    }

    pub fn perturber_names(&self) -> &[String] {
        &self.perturbers
    }

    pub fn test_particle_names(&self) -> &[String] {
        &self.test_particles
    }

    /// Rocks that were accepted but have not entered the integrator
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    pub fn log(&self) -> &TrajectoryLog {
        &self.log
    }

    /// Barycentric ecliptic state of a body right now (SI)
    pub fn state_of(&self, name: &str) -> SimResult<StateVector> {
        let particle = self
            .integrator
            .particle(BodyHash::of(name))
            .ok_or_else(|| SimError::BodyNotFound(name.to_string()))?;
        Ok(StateVector::new(
            particle.position.map(|c| self.units.length_to_si(c)),
            particle.velocity.map(|c| self.units.speed_to_si(c)),
            Origin::Barycenter,
            Frame::Ecliptic,
        ))
    }

    fn has_sun(&self) -> bool {
        self.perturbers.iter().any(|n| n == Body::Sun.name())
    }

    fn register(&mut self, name: &str, mass: f64, state: &StateVector) -> SimResult<()> {
        let hash = BodyHash::of(name);
        if self.log.contains(hash) {
            return Err(SimError::DuplicateBody(name.to_string()));
        }
        self.integrator.add(Particle::new(
            hash,
            mass,
            state.position.map(|c| self.units.length_from_si(c)),
            state.velocity.map(|c| self.units.speed_from_si(c)),
        ))?;
        self.log.register(hash);
        Ok(())
    }

    fn insert_rock(&mut self, name: &str, state: &StateVector) -> SimResult<()> {
        let state = match state.origin {
            Origin::Barycenter => *state,
            Origin::Sun => {
                let sun = self.state_of(Body::Sun.name()).map_err(|_| SimError::MissingOrigin {
                    name: name.to_string(),
                })?;
                state.recentered(&sun, Origin::Barycenter)
            }
        };
        self.register(name, 0.0, &state)?;
        self.pending.retain(|n| n != name);
        Ok(())
    }

    fn time_of(&self, jd_tdb: f64) -> f64 {
        self.units.time_from_days(jd_tdb - self.start_jd)
    }

    fn jd_of(&self, t: f64) -> f64 {
        self.start_jd + self.units.days_from_time(t)
    }

    fn is_recorded(&self, t: f64) -> bool {
        let jd = self.jd_of(t);
        !self.integrator.particles().is_empty()
            && self
                .integrator
                .particles()
                .iter()
                .all(|p| self.log.has_row_at(p.hash, jd))
    }

    fn record(&mut self) {
        let jd_tdb = self.epoch();
        for particle in self.integrator.particles() {
            self.log.append(
                particle.hash,
                TrajectoryRow {
                    jd_tdb,
                    position: particle.position,
                    velocity: particle.velocity,
                },
            );
        }
    }
}
