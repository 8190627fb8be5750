//! N-body propagation of perturbers and massless test particles

pub mod body;
pub mod elements;
pub mod error;
pub mod integrator;
pub mod model;
pub mod planets;
pub mod simulation;
pub mod trajectory;
pub mod validation;

#[cfg(test)]
mod tests;

pub use body::{BodyHash, EphemerisSource, Perturber, PerturberSource, Rock, RockState};
pub use elements::{OrbitalElements, SecularRates};
pub use error::{SimError, SimResult};
pub use integrator::{FinishMode, IntegrationError, Integrator, IntegratorConfig, NBody, Particle};
pub use model::PerturberModel;
pub use planets::Body;
pub use simulation::{IngestReport, PropagateOptions, Simulation};
pub use trajectory::{assemble, Trajectories, TrajectoryLog, TrajectoryRow, TrajectoryTable};
pub use validation::{summarize_validation, validate_body, ValidationPoint, ValidationSummary};
