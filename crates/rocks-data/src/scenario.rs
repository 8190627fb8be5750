//! JSON scenario files: a perturber model, rocks and the epochs to visit
//!
//! ```json
//! {
//!   "epoch": "2020-01-01 TDB",
//!   "model": "PLANETS",
//!   "rocks": [
//!     {"name": "Ceres", "epoch": 2459000.5,
//!      "elements": {"a": 2.7675, "e": 0.0758, "inc": 10.59, "node": 80.31, "peri": 73.6, "mean_anomaly": 95.99}}
//!   ],
//!   "epochs": {"end": "+1y", "step": "30d"}
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use hifitime::{Duration, Unit};
use rocks_core::constants::{DAYS_PER_JULIAN_YEAR, J2000_JD};
use rocks_core::epoch::{detect_jd, jd_to_jc};
use rocks_core::{ChebyshevEphemeris, EpochSpec, Frame, Origin, StateVector, Timescale, Units};
use rocks_sim::{
    Body, IntegratorConfig, OrbitalElements, Perturber, PerturberModel, PropagateOptions, Rock, SimError,
    Simulation,
};
use serde::{Deserialize, Serialize};

use crate::tables::load_ephemeris_json;

/// Top-level scenario
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub units: Units,
    /// Session epoch; J2000 TDB when absent
    #[serde(default)]
    pub epoch: Option<EpochSpec>,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub integrator: IntegratorConfig,
    #[serde(default)]
    pub options: PropagateOptions,
    /// Chebyshev table files, relative to the scenario file
    #[serde(default)]
    pub ephemerides: Vec<PathBuf>,
    /// SPK kernels, relative to the scenario file
    #[serde(default)]
    pub kernels: Vec<PathBuf>,
    #[serde(default)]
    pub rocks: Vec<RockConfig>,
    #[serde(default)]
    pub epochs: EpochsConfig,
}

/// A built-in model name or an explicit perturber list
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelConfig {
    Builtin(String),
    Bodies(Vec<PerturberConfig>),
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::Builtin("PLANETS".to_string())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PerturberConfig {
    pub name: String,
    /// `builtin`, `kepler`, `ephemeris` or `spice`
    pub kind: String,
    #[serde(default)]
    pub mass_kg: Option<f64>,
    #[serde(default)]
    pub elements: Option<ElementsConfig>,
    /// Name of the Chebyshev table; the perturber's own name by default
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub naif_id: Option<i32>,
    /// NAIF id of the observer, 10 (Sun) by default
    #[serde(default)]
    pub observer: Option<i32>,
}

/// Heliocentric ecliptic elements in AU and degrees
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElementsConfig {
    pub a: f64,
    pub e: f64,
    pub inc: f64,
    pub node: f64,
    pub peri: f64,
    pub mean_anomaly: f64,
    /// Epoch of the mean anomaly (perturbers only; rocks use their own epoch)
    #[serde(default)]
    pub epoch: Option<EpochSpec>,
}

impl ElementsConfig {
    fn to_elements(&self, jd_tdb: f64) -> OrbitalElements {
        OrbitalElements::from_au_degrees(
            self.a,
            self.e,
            self.inc,
            self.node,
            self.peri,
            self.mean_anomaly,
            jd_to_jc(jd_tdb),
        )
    }
}

fn default_origin() -> Origin {
    Origin::Sun
}

fn default_frame() -> Frame {
    Frame::Ecliptic
}

/// Cartesian state in AU and AU/day
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CartesianConfig {
    pub position: [f64; 3],
    pub velocity: [f64; 3],
    #[serde(default = "default_origin")]
    pub origin: Origin,
    #[serde(default = "default_frame")]
    pub frame: Frame,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RockConfig {
    pub name: String,
    #[serde(default)]
    pub epoch: Option<EpochSpec>,
    #[serde(default)]
    pub cartesian: Option<CartesianConfig>,
    #[serde(default)]
    pub elements: Option<ElementsConfig>,
}

/// Either an explicit list or an evenly spaced range
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EpochsConfig {
    List(Vec<EpochSpec>),
    Range {
        /// Session epoch when absent
        #[serde(default)]
        start: Option<EpochSpec>,
        /// Absolute epoch or an offset from `start` such as `+10y`
        end: EpochSpec,
        /// e.g. `30d`, `1y`, `12h`
        step: String,
    },
}

impl Default for EpochsConfig {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl ScenarioConfig {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("reading scenario {:?}", path))?;
        Self::from_json(&text).with_context(|| format!("parsing scenario {:?}", path))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    fn resolve_jd(&self, spec: &EpochSpec) -> Result<f64> {
        Ok(spec
            .resolve_jd(self.units.timescale, self.units.timeformat)
            .map_err(SimError::from)?)
    }

    /// The session epoch (JD TDB)
    pub fn start_jd(&self) -> Result<f64> {
        match &self.epoch {
            Some(spec) => self.resolve_jd(spec),
            None => Ok(J2000_JD),
        }
    }

    /// Build the perturber model, loading tables and kernels from `base_dir`
    pub fn model(&self, base_dir: &Path) -> Result<PerturberModel> {
        let bodies = match &self.model {
            ModelConfig::Builtin(name) => return Ok(PerturberModel::builtin(name)?),
            ModelConfig::Bodies(bodies) => bodies,
        };

        let mut tables: HashMap<String, Arc<ChebyshevEphemeris>> = HashMap::new();
        for path in &self.ephemerides {
            for table in load_ephemeris_json(base_dir.join(path))? {
                tables.insert(table.name.clone(), Arc::new(table));
            }
        }
        let kernels = Kernels::load(base_dir, &self.kernels)?;

        let mut model = PerturberModel::new();
        for body in bodies {
            model.add(self.perturber(body, &tables, &kernels)?)?;
        }
        Ok(model)
    }

    fn perturber(
        &self,
        config: &PerturberConfig,
        tables: &HashMap<String, Arc<ChebyshevEphemeris>>,
        kernels: &Kernels,
    ) -> Result<Perturber> {
        let name = config.name.as_str();
        let required_mass = || {
            config.mass_kg.with_context(|| format!("{name}: `mass_kg` is required for {} perturbers", config.kind))
        };

        let perturber = match config.kind.to_ascii_lowercase().as_str() {
            "builtin" => {
                let body = Body::from_name(name).ok_or_else(|| SimError::BodyNotFound(name.to_string()))?;
                let mut perturber = body.perturber();
                if let Some(mass) = config.mass_kg {
                    perturber.mass_kg = mass;
                }
                perturber
            }
            "kepler" => {
                let elements = config
                    .elements
                    .as_ref()
                    .with_context(|| format!("{name}: kepler perturbers need `elements`"))?;
                let jd = match &elements.epoch {
                    Some(spec) => self.resolve_jd(spec)?,
                    None => J2000_JD,
                };
                Perturber::kepler(name, required_mass()?, elements.to_elements(jd))
            }
            "ephemeris" => {
                let table_name = config.table.as_deref().unwrap_or(name);
                let table = tables
                    .get(table_name)
                    .with_context(|| format!("{name}: no ephemeris table named {table_name}"))?;
                Perturber::ephemeris(name, required_mass()?, table.clone())
            }
            "spice" => {
                let target = match config.naif_id {
                    Some(id) => id,
                    None => crate::ephemeris::naif_id(name)
                        .ok_or_else(|| crate::EphemerisError::UnknownBody(name.to_string()))?,
                };
                let mass = match config.mass_kg {
                    Some(mass) => mass,
                    None => Body::from_name(name).map(|b| b.mass_kg()).with_context(|| {
                        format!("{name}: `mass_kg` is required for non-planet SPICE perturbers")
                    })?,
                };
                kernels.perturber(name, mass, target, config.observer.unwrap_or(10))?
            }
            _ => {
                return Err(SimError::UnknownBodyType {
                    name: name.to_string(),
                    kind: config.kind.clone(),
                }
                .into())
            }
        };
        Ok(perturber)
    }

    /// Rocks with their epochs resolved to JD TDB. Elements of undated rocks
    /// are taken to be osculating at the session epoch.
    pub fn rocks(&self) -> Result<Vec<Rock>> {
        let start = self.start_jd()?;
        self.rocks
            .iter()
            .map(|rock| {
                let jd = rock.epoch.as_ref().map(|spec| self.resolve_jd(spec)).transpose()?;
                let epoch = jd.map(EpochSpec::JdTdb);
                match (&rock.cartesian, &rock.elements) {
                    (Some(c), None) => Ok(Rock::cartesian(
                        rock.name.clone(),
                        StateVector::from_au(c.position, c.velocity, c.origin, c.frame),
                        epoch,
                    )),
                    (None, Some(e)) => Ok(Rock::elements(
                        rock.name.clone(),
                        e.to_elements(jd.unwrap_or(start)),
                        epoch,
                    )),
                    _ => bail!("{}: give exactly one of `cartesian` or `elements`", rock.name),
                }
            })
            .collect()
    }

    /// Requested epochs, ranges expanded
    pub fn epochs(&self) -> Result<Vec<EpochSpec>> {
        match &self.epochs {
            EpochsConfig::List(list) => Ok(list.clone()),
            EpochsConfig::Range { start, end, step } => {
                let start = match start {
                    Some(spec) => self.resolve_jd(spec)?,
                    None => self.start_jd()?,
                };
                let end = match end {
                    EpochSpec::Text(text) if text.trim_start().starts_with(['+', '-']) => {
                        parse_relative_jd(text, start, self.units.timescale)?
                    }
                    spec => self.resolve_jd(spec)?,
                };
                Ok(jd_range(start, end, parse_duration(step)?)?
                    .into_iter()
                    .map(EpochSpec::JdTdb)
                    .collect())
            }
        }
    }

    /// A session with the scenario's perturbers and rocks added
    pub fn simulation(&self, base_dir: &Path) -> Result<Simulation> {
        let model = self.model(base_dir)?;
        let mut sim = Simulation::new(&model, self.units.clone(), self.epoch.clone(), self.integrator.clone())?;
        let rocks = self.rocks()?;
        if !rocks.is_empty() {
            sim.add_rocks(&rocks)?;
        }
        Ok(sim)
    }
}

/// Parse relative epoch like "-100y", "+30d" relative to a JD TDB, or an
/// absolute one in any form [`detect_jd`] accepts
pub fn parse_relative_jd(s: &str, reference_jd: f64, scale: Timescale) -> Result<f64> {
    let s = s.trim();
    match s.strip_prefix('+') {
        Some(rest) => Ok(reference_jd + parse_duration(rest)?.to_unit(Unit::Day)),
        None if s.starts_with('-') => Ok(reference_jd - parse_duration(&s[1..])?.to_unit(Unit::Day)),
        None => Ok(detect_jd(s, scale).map_err(SimError::from)?),
    }
}

/// Parse duration like "30d", "1y", "12h" (bare numbers are seconds)
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();
    let value = |suffix: char| -> Result<f64> {
        s.trim_end_matches(suffix)
            .trim()
            .parse::<f64>()
            .with_context(|| format!("invalid duration {s:?}"))
    };
    if s.ends_with('d') {
        Ok(Duration::from_days(value('d')?))
    } else if s.ends_with('y') {
        Ok(Duration::from_days(value('y')? * DAYS_PER_JULIAN_YEAR))
    } else if s.ends_with('h') {
        Ok(Duration::from_hours(value('h')?))
    } else {
        Ok(Duration::from_seconds(s.parse().with_context(|| format!("invalid duration {s:?}"))?))
    }
}

/// `start`, `start + step`, ... up to and including `end` (either
/// direction), all JD TDB
pub fn jd_range(start: f64, end: f64, step: Duration) -> Result<Vec<f64>> {
    let step_days = step.to_unit(Unit::Day).abs();
    if step_days == 0.0 || !step_days.is_finite() {
        bail!("epoch step must be non-zero");
    }
    if !start.is_finite() || !end.is_finite() {
        bail!("epoch range bounds must be finite");
    }
    let span = end - start;
    let count = (span.abs() / step_days + 1e-9).floor() as u64;
    let signed = step_days.copysign(span);
    Ok((0..=count).map(|k| start + signed * k as f64).collect())
}

/// SPICE perturbers, available with the `spice` feature
struct Kernels {
    #[cfg(feature = "spice")]
    loaded: Option<crate::ephemeris::SpiceKernels>,
}

impl Kernels {
    #[cfg(feature = "spice")]
    fn load(base_dir: &Path, paths: &[PathBuf]) -> Result<Self> {
        if paths.is_empty() {
            return Ok(Self { loaded: None });
        }
        let paths: Vec<PathBuf> = paths.iter().map(|p| base_dir.join(p)).collect();
        Ok(Self { loaded: Some(crate::ephemeris::SpiceKernels::load(&paths)?) })
    }

    #[cfg(not(feature = "spice"))]
    fn load(_base_dir: &Path, paths: &[PathBuf]) -> Result<Self> {
        if !paths.is_empty() {
            tracing::warn!("Ignoring {} SPK kernel(s): built without the `spice` feature", paths.len());
        }
        Ok(Self {})
    }

    #[cfg(feature = "spice")]
    fn perturber(&self, name: &str, mass_kg: f64, target: i32, observer: i32) -> Result<Perturber> {
        let kernels = self
            .loaded
            .as_ref()
            .with_context(|| format!("{name}: SPICE perturbers need `kernels`"))?;
        Ok(Perturber::ephemeris(name, mass_kg, Arc::new(kernels.source(name, target, observer))))
    }

    #[cfg(not(feature = "spice"))]
    fn perturber(&self, name: &str, _mass_kg: f64, _target: i32, _observer: i32) -> Result<Perturber> {
        Err(crate::EphemerisError::Unsupported(name.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocks_sim::{Integrator, RockState};

    #[test]
    fn test_minimal_scenario_defaults() {
        let scenario = ScenarioConfig::from_json("{}").unwrap();
        assert!(matches!(scenario.model, ModelConfig::Builtin(ref name) if name == "PLANETS"));
        assert!(scenario.rocks().unwrap().is_empty());
        assert!(scenario.epochs().unwrap().is_empty());
        assert_eq!(scenario.start_jd().unwrap(), 2451545.0);
        assert!(scenario.options.exact_finish_time);
    }

    #[test]
    fn test_full_scenario() {
        let json = r#"{
            "units": {"mass": "msun", "distance": "au", "time": "day", "timeformat": "mjd"},
            "epoch": 51544.5,
            "model": "GIANTS",
            "integrator": {"rtol": 1e-11},
            "rocks": [
                {"name": "Ceres", "elements": {"a": 2.7675, "e": 0.0758, "inc": 10.59, "node": 80.31, "peri": 73.6, "mean_anomaly": 95.99}},
                {"name": "Tracer", "epoch": "2000-01-31 TDB", "cartesian": {"position": [1.0, 0.0, 0.0], "velocity": [0.0, 0.017, 0.0], "frame": "j2000"}}
            ],
            "epochs": {"end": "+60d", "step": "30d"}
        }"#;
        let scenario = ScenarioConfig::from_json(json).unwrap();
        assert_eq!(scenario.integrator.rtol, 1e-11);
        assert_eq!(scenario.integrator.max_steps, IntegratorConfig::default().max_steps);

        let rocks = scenario.rocks().unwrap();
        assert_eq!(rocks.len(), 2);
        assert!(rocks[0].epoch.is_none());
        assert!(matches!(rocks[0].state, RockState::Elements(ref e) if e.epoch_jc == 0.0));
        match rocks[1].epoch {
            Some(EpochSpec::JdTdb(jd)) => assert!((jd - 2451574.5).abs() < 1e-8),
            ref other => panic!("unexpected epoch {other:?}"),
        }
        assert!(matches!(rocks[1].state, RockState::Cartesian(ref s) if s.frame == Frame::Equatorial));

        let epochs = scenario.epochs().unwrap();
        assert_eq!(epochs.len(), 3);
        assert_eq!(epochs[0], EpochSpec::JdTdb(2451545.0));
        assert!(matches!(epochs[2], EpochSpec::JdTdb(jd) if (jd - 2451605.0).abs() < 1e-9));

        let sim = scenario.simulation(Path::new(".")).unwrap();
        assert_eq!(sim.perturber_names().len(), 5);
        assert_eq!(sim.test_particle_names(), ["Ceres", "Tracer"]);
        // Ingestion advanced to the dated rock's epoch
        assert!((sim.epoch() - 2451574.5).abs() < 1e-6);
        assert!(sim.integrator().steps() > 0);
    }

    #[test]
    fn test_perturber_list() {
        let json = r#"{
            "model": [
                {"name": "Sun", "kind": "builtin"},
                {"name": "Jupiter", "kind": "builtin", "mass_kg": 1.9e27},
                {"name": "Planet X", "kind": "kepler", "mass_kg": 1e25,
                 "elements": {"a": 40.0, "e": 0.1, "inc": 5.0, "node": 10.0, "peri": 20.0, "mean_anomaly": 30.0}}
            ]
        }"#;
        let model = ScenarioConfig::from_json(json).unwrap().model(Path::new(".")).unwrap();
        let names: Vec<_> = model.names().collect();
        assert_eq!(names, ["Sun", "Jupiter", "Planet X"]);
        assert_eq!(model.get("Jupiter").unwrap().mass_kg, 1.9e27);
    }

    #[test]
    fn test_unknown_perturber_kind() {
        let json = r#"{"model": [{"name": "Sun", "kind": "builtin"}, {"name": "Nibiru", "kind": "rumour"}]}"#;
        let err = ScenarioConfig::from_json(json).unwrap().model(Path::new(".")).unwrap_err();
        match err.downcast_ref::<SimError>() {
            Some(SimError::UnknownBodyType { name, kind }) => {
                assert_eq!(name, "Nibiru");
                assert_eq!(kind, "rumour");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_rock_needs_one_state() {
        let json = r#"{"rocks": [{"name": "Nothing"}]}"#;
        assert!(ScenarioConfig::from_json(json).unwrap().rocks().is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30d").unwrap(), Duration::from_days(30.0));
        assert_eq!(parse_duration("12h").unwrap(), Duration::from_hours(12.0));
        assert_eq!(parse_duration("60").unwrap(), Duration::from_seconds(60.0));
        assert!((parse_duration("1y").unwrap().to_unit(hifitime::Unit::Day) - 365.25).abs() < 1e-9);
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_jd_range() {
        let start = J2000_JD;
        let end = parse_relative_jd("+10d", start, Timescale::Tdb).unwrap();
        assert!((end - (J2000_JD + 10.0)).abs() < 1e-9);
        let forward = jd_range(start, end, Duration::from_days(3.0)).unwrap();
        assert_eq!(forward.len(), 4);
        assert_eq!(forward[0], start);
        assert!((forward[3] - (start + 9.0)).abs() < 1e-9);

        let backward = jd_range(start, parse_relative_jd("-1y", start, Timescale::Tdb).unwrap(), Duration::from_days(365.25)).unwrap();
        assert_eq!(backward.len(), 2);
        assert!((backward[1] - (start - 365.25)).abs() < 1e-9);

        assert!(jd_range(start, start, Duration::ZERO).is_err());
    }

    #[test]
    fn test_parse_relative_jd_absolute_forms() {
        assert_eq!(parse_relative_jd("2451545.0", 0.0, Timescale::Tdb).unwrap(), J2000_JD);
        assert_eq!(parse_relative_jd("MJD 51544.5 TDB", 0.0, Timescale::Tdb).unwrap(), J2000_JD);
        let iso = parse_relative_jd("2000-01-01T12:00:00 TDB", 0.0, Timescale::Tdb).unwrap();
        assert!((iso - J2000_JD).abs() < 1e-8);
        assert!(parse_relative_jd("yesterday", J2000_JD, Timescale::Tdb).is_err());
    }
}
