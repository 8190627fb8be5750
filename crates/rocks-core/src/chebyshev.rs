//! Chebyshev polynomial ephemeris tables
//!
//! Used for high-fidelity ephemeris interpolation (e.g. JPL Horizons fits).
//! Each segment covers a JD (TDB) interval and carries one coefficient series
//! per axis, in meters.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use crate::constants::SECONDS_PER_DAY;
use crate::coordinates::{Frame, Origin, StateVector};

/// A single segment of Chebyshev coefficients valid for a time range
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChebyshevSegment {
    /// Start epoch (JD, TDB)
    pub start_jd: f64,
    /// End epoch (JD, TDB)
    pub end_jd: f64,
    /// Coefficients for X component
    pub coeffs_x: Vec<f64>,
    /// Coefficients for Y component
    pub coeffs_y: Vec<f64>,
    /// Coefficients for Z component
    pub coeffs_z: Vec<f64>,
}

impl ChebyshevSegment {
    /// Check if this segment covers the given epoch
    pub fn contains(&self, jd: f64) -> bool {
        jd >= self.start_jd && jd <= self.end_jd
    }

    /// Map time to the [-1, 1] domain
    fn normalized(&self, jd: f64) -> f64 {
        2.0 * (jd - self.start_jd) / (self.end_jd - self.start_jd) - 1.0
    }

    /// Evaluate position (meters) at given epoch
    pub fn position(&self, jd: f64) -> Vector3<f64> {
        let t = self.normalized(jd);
        Vector3::new(
            evaluate_chebyshev(&self.coeffs_x, t),
            evaluate_chebyshev(&self.coeffs_y, t),
            evaluate_chebyshev(&self.coeffs_z, t),
        )
    }

    /// Evaluate velocity (meters/second) at given epoch
    pub fn velocity(&self, jd: f64) -> Vector3<f64> {
        let t = self.normalized(jd);
        // d(tau)/d(seconds)
        let scale = 2.0 / ((self.end_jd - self.start_jd) * SECONDS_PER_DAY);
        Vector3::new(
            evaluate_chebyshev_derivative(&self.coeffs_x, t),
            evaluate_chebyshev_derivative(&self.coeffs_y, t),
            evaluate_chebyshev_derivative(&self.coeffs_z, t),
        ) * scale
    }
}

/// Evaluates Chebyshev polynomial series at normalized time t using Clenshaw recurrence
/// t must be in [-1, 1]
fn evaluate_chebyshev(coeffs: &[f64], t: f64) -> f64 {
    let n = coeffs.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return coeffs[0];
    }

    // b_k = a_k + 2*x*b_{k+1} - b_{k+2}
    let mut b2 = 0.0;
    let mut b1 = 0.0;
    let x2 = 2.0 * t;

    for i in (1..n).rev() {
        let b0 = coeffs[i] + x2 * b1 - b2;
        b2 = b1;
        b1 = b0;
    }

    coeffs[0] + t * b1 - b2
}

/// Derivative of the series with respect to normalized time.
/// T'_{k+1} = 2 T_k + 2x T'_k - T'_{k-1}
fn evaluate_chebyshev_derivative(coeffs: &[f64], t: f64) -> f64 {
    if coeffs.len() < 2 {
        return 0.0;
    }

    let (mut t_prev, mut t_cur) = (1.0, t);
    let (mut d_prev, mut d_cur) = (0.0, 1.0);
    let mut sum = coeffs[1] * d_cur;

    for &c in &coeffs[2..] {
        let t_next = 2.0 * t * t_cur - t_prev;
        let d_next = 2.0 * t_cur + 2.0 * t * d_cur - d_prev;
        sum += c * d_next;
        t_prev = t_cur;
        t_cur = t_next;
        d_prev = d_cur;
        d_cur = d_next;
    }

    sum
}

fn default_origin() -> Origin {
    Origin::Sun
}

fn default_frame() -> Frame {
    Frame::Ecliptic
}

/// Tabulated ephemeris for one body, made of consecutive segments
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChebyshevEphemeris {
    pub name: String,
    #[serde(default = "default_origin")]
    pub origin: Origin,
    #[serde(default = "default_frame")]
    pub frame: Frame,
    #[serde(default)]
    pub segments: Vec<ChebyshevSegment>,
}

impl ChebyshevEphemeris {
    pub fn new(name: impl Into<String>, origin: Origin, frame: Frame) -> Self {
        Self {
            name: name.into(),
            origin,
            frame,
            segments: Vec::new(),
        }
    }

    pub fn add_segment(&mut self, segment: ChebyshevSegment) {
        self.segments.push(segment);
        self.segments.sort_by(|a, b| a.start_jd.total_cmp(&b.start_jd));
    }

    /// First and last epoch covered, if any
    pub fn span(&self) -> Option<(f64, f64)> {
        let first = self.segments.first()?;
        let last = self.segments.iter().map(|s| s.end_jd).fold(f64::NEG_INFINITY, f64::max);
        Some((first.start_jd, last))
    }

    /// Evaluate position at epoch
    /// Returns None if epoch is outside all segments
    pub fn position(&self, jd: f64) -> Option<Vector3<f64>> {
        self.segments.iter().find(|s| s.contains(jd)).map(|s| s.position(jd))
    }

    /// Full state at epoch, or None outside the table
    pub fn state(&self, jd: f64) -> Option<StateVector> {
        let segment = self.segments.iter().find(|s| s.contains(jd))?;
        Some(StateVector::new(
            segment.position(jd),
            segment.velocity(jd),
            self.origin,
            self.frame,
        ))
    }
}
