//! Domain bodies: massive perturbers and massless rocks

use std::fmt;
use std::sync::Arc;

use rocks_core::epoch::jd_to_jc;
use rocks_core::{ChebyshevEphemeris, EpochSpec, Frame, StateVector};
use serde::{Deserialize, Serialize};

use crate::elements::{OrbitalElements, SecularRates};
use crate::error::{SimError, SimResult};

/// Stable 64-bit key derived from a body name (FNV-1a)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHash(pub u64);

impl BodyHash {
    pub fn of(name: &str) -> Self {
        let mut h: u64 = 0xcbf29ce484222325;
        for &b in name.as_bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        Self(h)
    }
}

impl fmt::Display for BodyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Anything that can report a body's state at a Julian Date (TDB)
pub trait EphemerisSource: fmt::Debug + Send + Sync {
    fn state(&self, jd_tdb: f64) -> SimResult<StateVector>;
}

impl EphemerisSource for ChebyshevEphemeris {
    fn state(&self, jd: f64) -> SimResult<StateVector> {
        ChebyshevEphemeris::state(self, jd).ok_or_else(|| SimError::EphemerisOutOfRange {
            name: self.name.clone(),
            jd_tdb: jd,
        })
    }
}

/// How a perturber's state is obtained at the session epoch
#[derive(Clone, Debug)]
pub enum PerturberSource {
    /// Analytic two-body orbit with secular drift of the elements
    Kepler { elements: OrbitalElements, rates: SecularRates },
    /// Sampled from an ephemeris
    Ephemeris(Arc<dyn EphemerisSource>),
    /// Fixed state, taken as valid at whatever epoch the session starts
    Cartesian(StateVector),
}

/// A massive body
#[derive(Clone, Debug)]
pub struct Perturber {
    pub name: String,
    pub mass_kg: f64,
    pub source: PerturberSource,
}

impl Perturber {
    pub fn new(name: impl Into<String>, mass_kg: f64, source: PerturberSource) -> Self {
        Self { name: name.into(), mass_kg, source }
    }

    pub fn kepler(name: impl Into<String>, mass_kg: f64, elements: OrbitalElements) -> Self {
        Self::new(name, mass_kg, PerturberSource::Kepler { elements, rates: SecularRates::default() })
    }

    pub fn ephemeris(name: impl Into<String>, mass_kg: f64, source: Arc<dyn EphemerisSource>) -> Self {
        Self::new(name, mass_kg, PerturberSource::Ephemeris(source))
    }

    /// Resolve to a Cartesian state at a Julian Date (TDB)
    pub fn state_at(&self, jd_tdb: f64) -> SimResult<StateVector> {
        match &self.source {
            PerturberSource::Kepler { elements, rates } => {
                elements.validate().map_err(|reason| SimError::InvalidElements {
                    name: self.name.clone(),
                    reason,
                })?;
                let jc = jd_to_jc(jd_tdb);
                Ok(elements.propagate(jc, rates).state_at(jc))
            }
            PerturberSource::Ephemeris(source) => source.state(jd_tdb),
            PerturberSource::Cartesian(state) => Ok(*state),
        }
    }
}

impl EphemerisSource for Perturber {
    fn state(&self, jd_tdb: f64) -> SimResult<StateVector> {
        self.state_at(jd_tdb)
    }
}

/// State of a rock as given by the caller
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RockState {
    Elements(OrbitalElements),
    Cartesian(StateVector),
}

/// A massless test particle (asteroid, comet, ...)
#[derive(Clone, Debug, PartialEq)]
pub struct Rock {
    pub name: String,
    pub state: RockState,
    /// Epoch the state is valid at; `None` means the session's current epoch
    pub epoch: Option<EpochSpec>,
}

impl Rock {
    pub fn cartesian(name: impl Into<String>, state: StateVector, epoch: Option<EpochSpec>) -> Self {
        Self { name: name.into(), state: RockState::Cartesian(state), epoch }
    }

    pub fn elements(name: impl Into<String>, elements: OrbitalElements, epoch: Option<EpochSpec>) -> Self {
        Self { name: name.into(), state: RockState::Elements(elements), epoch }
    }

    /// Cartesian ecliptic state, with elements taken as osculating at
    /// `jd_tdb` (the rock's resolved epoch, or the session's current one).
    pub fn ecliptic_state(&self, jd_tdb: f64) -> SimResult<StateVector> {
        let state = match &self.state {
            RockState::Cartesian(state) => *state,
            RockState::Elements(elements) => {
                elements.validate().map_err(|reason| SimError::InvalidElements {
                    name: self.name.clone(),
                    reason,
                })?;
                elements.state_at(jd_to_jc(jd_tdb))
            }
        };
        Ok(state.to_frame(Frame::Ecliptic))
    }
}
