//! Unit systems and their resolution against the integrator vocabulary
//!
//! A caller names units either by string (`"au"`) or through a canonical
//! [`UnitDef`] that lists every alias it is known by. Resolution intersects
//! those names with what the integrator understands and insists on exactly
//! one survivor.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::constants::{
    AU, DAYS_PER_JULIAN_YEAR, G, LIGHT_YEAR, M_EARTH, M_JUPITER, M_SUN, PARSEC, SECONDS_PER_DAY,
};
use crate::epoch::{TimeFormat, Timescale};

/// Which physical dimension a unit measures
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    Mass,
    Length,
    Time,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mass => "mass",
            Self::Length => "length",
            Self::Time => "time",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("No {axis} unit in the integrator vocabulary matches {unit}")]
    NoMatch { axis: Axis, unit: String },
    #[error("{axis} unit {unit} is ambiguous, matches {candidates:?}")]
    Ambiguous { axis: Axis, unit: String, candidates: Vec<String> },
}

/// A canonical unit: every name it answers to plus its size in SI
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitDef {
    pub names: &'static [&'static str],
    pub si: f64,
}

/// Canonical unit objects
pub mod defs {
    use super::*;

    pub const KILOGRAM: UnitDef = UnitDef { names: &["kg", "kilogram"], si: 1.0 };
    pub const SOLAR_MASS: UnitDef = UnitDef { names: &["solMass", "Msun", "M_sun", "solar_mass"], si: M_SUN };
    pub const EARTH_MASS: UnitDef = UnitDef { names: &["earthMass", "Mearth", "M_earth"], si: M_EARTH };
    pub const JUPITER_MASS: UnitDef = UnitDef { names: &["jupiterMass", "Mjupiter", "M_jup"], si: M_JUPITER };

    pub const METER: UnitDef = UnitDef { names: &["m", "meter"], si: 1.0 };
    pub const KILOMETER: UnitDef = UnitDef { names: &["km", "kilometer"], si: 1.0e3 };
    pub const ASTRONOMICAL_UNIT: UnitDef = UnitDef { names: &["AU", "au", "astronomical_unit"], si: AU };
    pub const PARSEC_UNIT: UnitDef = UnitDef { names: &["pc", "parsec"], si: PARSEC };

    pub const SECOND: UnitDef = UnitDef { names: &["s", "second"], si: 1.0 };
    pub const HOUR: UnitDef = UnitDef { names: &["h", "hr", "hour"], si: 3600.0 };
    pub const DAY: UnitDef = UnitDef { names: &["d", "day"], si: SECONDS_PER_DAY };
    pub const YEAR: UnitDef = UnitDef { names: &["a", "annum", "yr", "year"], si: DAYS_PER_JULIAN_YEAR * SECONDS_PER_DAY };
}

/// Names the integrator recognizes on each axis, with their SI scale
pub struct Vocabulary {
    pub masses: &'static [(&'static str, f64)],
    pub lengths: &'static [(&'static str, f64)],
    pub times: &'static [(&'static str, f64)],
}

/// Vocabulary of the bundled n-body engine
pub const INTEGRATOR_VOCABULARY: Vocabulary = Vocabulary {
    masses: &[
        ("kg", 1.0),
        ("g", 1.0e-3),
        ("msun", M_SUN),
        ("mearth", M_EARTH),
        ("mjupiter", M_JUPITER),
    ],
    lengths: &[
        ("m", 1.0),
        ("cm", 1.0e-2),
        ("km", 1.0e3),
        ("au", AU),
        ("pc", PARSEC),
        ("ly", LIGHT_YEAR),
    ],
    times: &[
        ("s", 1.0),
        ("min", 60.0),
        ("hr", 3600.0),
        ("day", SECONDS_PER_DAY),
        ("yr", DAYS_PER_JULIAN_YEAR * SECONDS_PER_DAY),
        ("jyr", DAYS_PER_JULIAN_YEAR * SECONDS_PER_DAY),
        ("kyr", 1.0e3 * DAYS_PER_JULIAN_YEAR * SECONDS_PER_DAY),
        ("myr", 1.0e6 * DAYS_PER_JULIAN_YEAR * SECONDS_PER_DAY),
    ],
};

impl Vocabulary {
    fn axis(&self, axis: Axis) -> &'static [(&'static str, f64)] {
        match axis {
            Axis::Mass => self.masses,
            Axis::Length => self.lengths,
            Axis::Time => self.times,
        }
    }
}

/// A unit as the caller wrote it
#[derive(Clone, Debug, PartialEq)]
pub enum UnitSpec {
    Name(String),
    Unit(UnitDef),
}

impl UnitSpec {
    fn describe(&self) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Unit(def) => def.names.first().copied().unwrap_or("<unnamed>").to_string(),
        }
    }

    /// Names this spec is willing to be known by
    fn candidates(&self) -> Vec<String> {
        match self {
            Self::Name(name) => vec![name.clone()],
            Self::Unit(def) => def.names.iter().map(|n| n.to_lowercase()).collect(),
        }
    }
}

impl From<&str> for UnitSpec {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<UnitDef> for UnitSpec {
    fn from(def: UnitDef) -> Self {
        Self::Unit(def)
    }
}

impl Serialize for UnitSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Canonical units are written under the name the engine knows them by,
        // so the string form resolves to the same unit when read back.
        let known = self.candidates().into_iter().find(|candidate| {
            [Axis::Mass, Axis::Length, Axis::Time]
                .iter()
                .any(|axis| INTEGRATOR_VOCABULARY.axis(*axis).iter().any(|(name, _)| *name == candidate.as_str()))
        });
        serializer.serialize_str(&known.unwrap_or_else(|| self.describe()))
    }
}

impl<'de> Deserialize<'de> for UnitSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(UnitSpec::Name)
    }
}

/// A unit the integrator accepted
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedUnit {
    pub name: String,
    pub si: f64,
}

/// Find the unique integrator name for `spec` on `axis`
pub fn resolve(spec: &UnitSpec, axis: Axis, vocabulary: &Vocabulary) -> Result<ResolvedUnit, UnitError> {
    let mut matches: Vec<ResolvedUnit> = Vec::new();
    for candidate in spec.candidates() {
        if matches.iter().any(|m| m.name == candidate) {
            continue;
        }
        if let Some((name, si)) = vocabulary.axis(axis).iter().find(|(name, _)| *name == candidate) {
            matches.push(ResolvedUnit { name: name.to_string(), si: *si });
        }
    }

    match matches.len() {
        0 => Err(UnitError::NoMatch { axis, unit: spec.describe() }),
        1 => Ok(matches.remove(0)),
        _ => Err(UnitError::Ambiguous {
            axis,
            unit: spec.describe(),
            candidates: matches.into_iter().map(|m| m.name).collect(),
        }),
    }
}

/// The unit system a caller works in
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Units {
    pub mass: UnitSpec,
    pub distance: UnitSpec,
    pub time: UnitSpec,
    pub timescale: Timescale,
    pub timeformat: TimeFormat,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            mass: UnitSpec::Unit(defs::SOLAR_MASS),
            distance: UnitSpec::Unit(defs::ASTRONOMICAL_UNIT),
            time: UnitSpec::Unit(defs::DAY),
            timescale: Timescale::Tdb,
            timeformat: TimeFormat::Jd,
        }
    }
}

impl Units {
    /// Resolve all three axes against the bundled engine's vocabulary
    pub fn resolve(&self) -> Result<SimUnits, UnitError> {
        self.resolve_with(&INTEGRATOR_VOCABULARY)
    }

    pub fn resolve_with(&self, vocabulary: &Vocabulary) -> Result<SimUnits, UnitError> {
        Ok(SimUnits::new(
            resolve(&self.mass, Axis::Mass, vocabulary)?,
            resolve(&self.distance, Axis::Length, vocabulary)?,
            resolve(&self.time, Axis::Time, vocabulary)?,
        ))
    }
}

/// Mass/length/time triplet the integrator runs in
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimUnits {
    pub mass: ResolvedUnit,
    pub length: ResolvedUnit,
    pub time: ResolvedUnit,
    /// Gravitational constant in these units
    pub g: f64,
}

impl SimUnits {
    pub fn new(mass: ResolvedUnit, length: ResolvedUnit, time: ResolvedUnit) -> Self {
        let g = G * mass.si * time.si * time.si / length.si.powi(3);
        Self { mass, length, time, g }
    }

    /// Span in days expressed in the time unit
    pub fn time_from_days(&self, days: f64) -> f64 {
        days * SECONDS_PER_DAY / self.time.si
    }

    /// Span in the time unit expressed in days
    pub fn days_from_time(&self, t: f64) -> f64 {
        t * self.time.si / SECONDS_PER_DAY
    }

    pub fn length_from_si(&self, meters: f64) -> f64 {
        meters / self.length.si
    }

    pub fn length_to_si(&self, value: f64) -> f64 {
        value * self.length.si
    }

    pub fn speed_from_si(&self, meters_per_second: f64) -> f64 {
        meters_per_second * self.time.si / self.length.si
    }

    pub fn speed_to_si(&self, value: f64) -> f64 {
        value * self.length.si / self.time.si
    }

    pub fn mass_from_si(&self, kg: f64) -> f64 {
        kg / self.mass.si
    }

    /// e.g. "msun/au/day"
    pub fn label(&self) -> String {
        format!("{}/{}/{}", self.mass.name, self.length.name, self.time.name)
    }
}
