//! Shared vocabulary for rocks: state vectors, frames, epochs and units

pub mod chebyshev;
pub mod constants;
pub mod coordinates;
pub mod epoch;
pub mod units;


pub use chebyshev::{ChebyshevEphemeris, ChebyshevSegment};
pub use coordinates::{Frame, Origin, StateVector};
pub use epoch::{EpochError, EpochSpec, TimeFormat, Timescale};
pub use units::{SimUnits, UnitDef, UnitError, UnitSpec, Units};
