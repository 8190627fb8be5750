use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};
use crate::constants::{AU, OBLIQUITY_J2000, SECONDS_PER_DAY};

/// Center a state vector is measured from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Heliocentric
    Sun,
    /// Solar-system barycenter
    #[serde(alias = "ssb")]
    Barycenter,
}

/// Reference plane of a state vector (both J2000)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frame {
    /// Ecliptic and mean equinox of J2000
    #[serde(alias = "eclipj2000")]
    Ecliptic,
    /// ICRF-aligned mean equator of J2000
    #[serde(alias = "j2000")]
    Equatorial,
}

impl Frame {
    /// Rotation taking vectors expressed in `self` into `target`
    pub fn rotation_to(self, target: Frame) -> Rotation3<f64> {
        match (self, target) {
            (Frame::Ecliptic, Frame::Equatorial) => {
                Rotation3::from_axis_angle(&Vector3::x_axis(), OBLIQUITY_J2000)
            }
            (Frame::Equatorial, Frame::Ecliptic) => {
                Rotation3::from_axis_angle(&Vector3::x_axis(), -OBLIQUITY_J2000)
            }
            _ => Rotation3::identity(),
        }
    }
}

/// Cartesian state (meters, meters/second) tagged with its origin and frame
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateVector {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub origin: Origin,
    pub frame: Frame,
}

impl StateVector {
    pub fn new(position: Vector3<f64>, velocity: Vector3<f64>, origin: Origin, frame: Frame) -> Self {
        Self { position, velocity, origin, frame }
    }

    /// State at rest at the origin
    pub fn zero(origin: Origin, frame: Frame) -> Self {
        Self::new(Vector3::zeros(), Vector3::zeros(), origin, frame)
    }

    /// Build from AU and AU/day
    pub fn from_au(position: [f64; 3], velocity_per_day: [f64; 3], origin: Origin, frame: Frame) -> Self {
        Self::new(
            Vector3::from(position) * AU,
            Vector3::from(velocity_per_day) * (AU / SECONDS_PER_DAY),
            origin,
            frame,
        )
    }

    /// Position in AU
    pub fn position_au(&self) -> Vector3<f64> {
        self.position / AU
    }

    /// Velocity in AU/day
    pub fn velocity_au_per_day(&self) -> Vector3<f64> {
        self.velocity * (SECONDS_PER_DAY / AU)
    }

    pub fn distance(&self) -> f64 {
        self.position.magnitude()
    }

    pub fn speed(&self) -> f64 {
        self.velocity.magnitude()
    }

    /// Same state expressed in another reference plane
    pub fn to_frame(&self, frame: Frame) -> StateVector {
        if frame == self.frame {
            return *self;
        }
        let rot = self.frame.rotation_to(frame);
        StateVector {
            position: rot * self.position,
            velocity: rot * self.velocity,
            origin: self.origin,
            frame,
        }
    }

    /// Re-center onto `origin`, given the state of this vector's current
    /// origin as seen from the new one (same frame required).
    pub fn recentered(&self, offset: &StateVector, origin: Origin) -> StateVector {
        let offset = offset.to_frame(self.frame);
        StateVector {
            position: self.position + offset.position,
            velocity: self.velocity + offset.velocity,
            origin,
            frame: self.frame,
        }
    }
}
