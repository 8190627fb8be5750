//! SPICE kernel ephemerides through ANISE
//!
//! ANISE is a pure Rust replacement for NASA SPICE. Kernel loading is only
//! compiled with the `spice` feature; the NAIF id table is always available
//! so configuration can be checked without kernels.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EphemerisError {
    #[error("Failed to load SPK file: {0}")]
    SpkLoadError(String),
    #[error("No NAIF id known for {0}")]
    UnknownBody(String),
    #[error("Built without SPICE support (enable the `spice` feature) for {0}")]
    Unsupported(String),
}

/// NAIF id of a body by name (planets resolve to their system barycenter)
pub fn naif_id(name: &str) -> Option<i32> {
    let id = match name.trim().to_ascii_lowercase().as_str() {
        "ssb" | "barycenter" | "solar system barycenter" => 0,
        "mercury" => 1,
        "venus" => 2,
        "earth" | "emb" => 3,     // Earth-Moon barycenter
        "mars" => 4,
        "jupiter" => 5,
        "saturn" => 6,
        "uranus" => 7,
        "neptune" => 8,
        "pluto" => 9,
        "sun" => 10,
        "moon" => 301,
        "earth geocenter" => 399,
        _ => return None,
    };
    Some(id)
}

#[cfg(feature = "spice")]
pub use kernels::{SpiceEphemeris, SpiceKernels};

#[cfg(feature = "spice")]
mod kernels {
    use std::fmt;
    use std::path::Path;
    use std::sync::Arc;

    use anise::prelude::{Almanac, Frame as AniseFrame, SPK};
    use anyhow::Result;
    use nalgebra::Vector3;
    use rocks_core::epoch::epoch_from_jd_tdb;
    use rocks_core::{Frame, Origin, StateVector};
    use rocks_sim::{EphemerisSource, SimError, SimResult};

    use super::EphemerisError;

    /// A set of loaded SPK kernels
    #[derive(Clone)]
    pub struct SpiceKernels {
        almanac: Arc<Almanac>,
    }

    impl SpiceKernels {
        /// Load ephemeris from SPK file(s)
        ///
        /// Recommended: NASA DE440 from
        /// https://naif.jpl.nasa.gov/pub/naif/generic_kernels/spk/planets/
        pub fn load<P: AsRef<Path>>(spk_paths: &[P]) -> Result<Self> {
            let mut almanac = Almanac::default();

            for path in spk_paths {
                let path = path.as_ref();
                tracing::info!("Loading SPK: {:?}", path);
                let path_str = path
                    .to_str()
                    .ok_or_else(|| EphemerisError::SpkLoadError(format!("Invalid path: {:?}", path)))?;
                let spk = SPK::load(path_str)
                    .map_err(|e| EphemerisError::SpkLoadError(format!("{:?}: {}", path, e)))?;
                almanac = almanac.with_spk(spk);
            }

            Ok(Self { almanac: Arc::new(almanac) })
        }

        /// Ephemeris of `target` as seen from `observer` (NAIF ids)
        pub fn source(&self, name: impl Into<String>, target: i32, observer: i32) -> SpiceEphemeris {
            SpiceEphemeris {
                name: name.into(),
                almanac: Arc::clone(&self.almanac),
                target,
                observer,
            }
        }
    }

    /// One body out of a kernel set, in the J2000 equatorial frame
    pub struct SpiceEphemeris {
        name: String,
        almanac: Arc<Almanac>,
        target: i32,
        observer: i32,
    }

    impl fmt::Debug for SpiceEphemeris {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("SpiceEphemeris")
                .field("name", &self.name)
                .field("target", &self.target)
                .field("observer", &self.observer)
                .finish()
        }
    }

    impl EphemerisSource for SpiceEphemeris {
        fn state(&self, jd_tdb: f64) -> SimResult<StateVector> {
            let origin = match self.observer {
                0 => Origin::Barycenter,
                10 => Origin::Sun,
                other => {
                    return Err(SimError::Ephemeris(format!(
                        "{}: observer {} is neither the Sun nor the barycenter",
                        self.name, other
                    )))
                }
            };
            if self.target == self.observer {
                return Ok(StateVector::zero(origin, Frame::Equatorial));
            }

            let state = self
                .almanac
                .translate(
                    AniseFrame::from_ephem_j2000(self.target),
                    AniseFrame::from_ephem_j2000(self.observer),
                    epoch_from_jd_tdb(jd_tdb),
                    None,
                )
                .map_err(|e| SimError::Ephemeris(format!("{}: {}", self.name, e)))?;

            // ANISE works in kilometers
            Ok(StateVector::new(
                Vector3::new(state.radius_km.x, state.radius_km.y, state.radius_km.z) * 1000.0,
                Vector3::new(state.velocity_km_s.x, state.velocity_km_s.y, state.velocity_km_s.z) * 1000.0,
                origin,
                Frame::Equatorial,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naif_ids() {
        assert_eq!(naif_id("Sun"), Some(10));
        assert_eq!(naif_id(" jupiter "), Some(5));
        assert_eq!(naif_id("SSB"), Some(0));
        assert_eq!(naif_id("Vulcan"), None);
    }
}
