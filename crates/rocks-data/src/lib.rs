//! Scenario files, ephemeris tables and result output for rocks

pub mod ephemeris;
pub mod scenario;
pub mod tables;

pub use ephemeris::{naif_id, EphemerisError};
#[cfg(feature = "spice")]
pub use ephemeris::{SpiceEphemeris, SpiceKernels};
pub use scenario::{
    jd_range, parse_duration, parse_relative_jd, EpochsConfig, ModelConfig, PerturberConfig, RockConfig,
    ScenarioConfig,
};
pub use tables::{load_ephemeris_json, read_ephemeris_json, save_trajectories_json, write_trajectories_json};
