//! Error types for simulation sessions

use rocks_core::{EpochError, UnitError};
use thiserror::Error;

use crate::integrator::IntegrationError;

/// Result type for simulation operations
pub type SimResult<T> = Result<T, SimError>;

/// Errors that can occur while building or running a simulation
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Unit resolution failed: {0}")]
    Unit(#[from] UnitError),

    #[error("Epoch resolution failed: {0}")]
    Epoch(#[from] EpochError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),

    #[error("Unknown body type '{kind}' for {name}")]
    UnknownBodyType { name: String, kind: String },

    #[error("Unknown perturber model: {0}")]
    UnknownModel(String),

    #[error("Body already registered: {0}")]
    DuplicateBody(String),

    #[error("Body not found: {0}")]
    BodyNotFound(String),

    #[error("Perturbers are given relative to different origins ({0})")]
    InconsistentOrigins(String),

    #[error("Cannot place {name} relative to the Sun: no perturber named Sun")]
    MissingOrigin { name: String },

    #[error("Invalid orbital elements for {name}: {reason}")]
    InvalidElements { name: String, reason: String },

    #[error("Ephemeris for {name} does not cover JD {jd_tdb} TDB")]
    EphemerisOutOfRange { name: String, jd_tdb: f64 },

    #[error("Ephemeris error: {0}")]
    Ephemeris(String),
}
