//! Gravitational integration engine
//!
//! [`Integrator`] is the seam the simulation session drives: it only ever
//! adds particles, advances to a time, reads particle states back and shifts
//! to the centre of mass. [`NBody`] is the bundled engine behind it, a direct
//! summation Newtonian force model advanced with the adaptive Dormand-Prince
//! 5(4) embedded Runge-Kutta pair.
//!
//! Particles with zero mass are test particles: they feel every massive body
//! but exert no force themselves.

use std::collections::HashMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::body::BodyHash;

/// Errors raised while advancing the engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrationError {
    #[error("Step size underflow at t = {t} (h = {h:e})")]
    StepSizeUnderflow { t: f64, h: f64 },

    #[error("Non-finite state at t = {t}")]
    NonFinite { t: f64 },

    #[error("Particle {hash} escaped to distance {distance} at t = {t}")]
    Escaped { hash: BodyHash, distance: f64, t: f64 },

    #[error("Exceeded {steps} steps before reaching t = {target} (stopped at t = {t})")]
    MaxStepsExceeded { steps: u64, t: f64, target: f64 },

    #[error("Particle {0} already present")]
    DuplicateParticle(BodyHash),
}

/// One body as the engine sees it, in simulation units
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub hash: BodyHash,
    pub mass: f64,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl Particle {
    pub fn new(hash: BodyHash, mass: f64, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self { hash, mass, position, velocity }
    }
}

/// How the last step of an integration relates to the requested time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishMode {
    /// Shorten the final step so the engine lands on the requested time
    Exact,
    /// Keep the natural step size and stop at the first step past the time
    Overshoot,
}

impl FinishMode {
    pub fn from_exact(exact: bool) -> Self {
        if exact { Self::Exact } else { Self::Overshoot }
    }
}

/// Operations the simulation session needs from an engine
pub trait Integrator {
    /// Register a particle; hashes must be unique
    fn add(&mut self, particle: Particle) -> Result<(), IntegrationError>;

    /// Advance (or rewind) to `t`
    fn integrate(&mut self, t: f64, finish: FinishMode) -> Result<(), IntegrationError>;

    /// Current engine time
    fn time(&self) -> f64;

    /// Set the clock without moving any particle
    fn set_time(&mut self, t: f64);

    fn particles(&self) -> &[Particle];

    fn particle(&self, hash: BodyHash) -> Option<&Particle> {
        self.particles().iter().find(|p| p.hash == hash)
    }

    /// Shift positions and velocities so the centre of mass is at rest at the origin
    fn move_to_com(&mut self);

    /// Accepted steps since creation
    fn steps(&self) -> u64;
}

fn default_rtol() -> f64 {
    1e-12
}

fn default_atol() -> f64 {
    1e-15
}

fn default_max_steps() -> u64 {
    10_000_000
}

/// Tunables for [`NBody`]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntegratorConfig {
    /// Relative tolerance per component
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    /// Absolute tolerance per component (simulation units)
    #[serde(default = "default_atol")]
    pub atol: f64,
    /// First step size; estimated from the state when absent
    #[serde(default)]
    pub initial_step: Option<f64>,
    /// Step budget for a single `integrate` call
    #[serde(default = "default_max_steps")]
    pub max_steps: u64,
    /// Particles farther than this from the origin abort the integration
    #[serde(default)]
    pub max_distance: Option<f64>,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            rtol: default_rtol(),
            atol: default_atol(),
            initial_step: None,
            max_steps: default_max_steps(),
            max_distance: None,
        }
    }
}

// Dormand-Prince 5(4) tableau (the system is autonomous, so the nodes are not needed)
const A: [[f64; 6]; 7] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [19372.0 / 6561.0, -25360.0 / 2187.0, 64448.0 / 6561.0, -212.0 / 729.0, 0.0, 0.0],
    [9017.0 / 3168.0, -355.0 / 33.0, 46732.0 / 5247.0, 49.0 / 176.0, -5103.0 / 18656.0, 0.0],
    [35.0 / 384.0, 0.0, 500.0 / 1113.0, 125.0 / 192.0, -2187.0 / 6784.0, 11.0 / 84.0],
];

// Difference between the 5th and embedded 4th order weights
const E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

/// Time derivative of the full state
#[derive(Clone)]
struct Derivative {
    dx: Vec<Vector3<f64>>,
    dv: Vec<Vector3<f64>>,
}

impl Derivative {
    fn zeros(n: usize) -> Self {
        Self { dx: vec![Vector3::zeros(); n], dv: vec![Vector3::zeros(); n] }
    }
}

/// Direct-summation Newtonian n-body engine
#[derive(Clone, Debug)]
pub struct NBody {
    g: f64,
    config: IntegratorConfig,
    t: f64,
    /// Last accepted step size magnitude
    dt: Option<f64>,
    particles: Vec<Particle>,
    index: HashMap<BodyHash, usize>,
    steps: u64,
}

impl NBody {
    pub fn new(g: f64, config: IntegratorConfig) -> Self {
        Self {
            g,
            config,
            t: 0.0,
            dt: None,
            particles: Vec::new(),
            index: HashMap::new(),
            steps: 0,
        }
    }

    pub fn g(&self) -> f64 {
        self.g
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Total energy (kinetic + pairwise potential of massive bodies)
    pub fn energy(&self) -> f64 {
        let kinetic: f64 = self
            .particles
            .iter()
            .map(|p| 0.5 * p.mass * p.velocity.magnitude_squared())
            .sum();

        let mut potential = 0.0;
        for (i, a) in self.particles.iter().enumerate() {
            for b in &self.particles[i + 1..] {
                if a.mass > 0.0 && b.mass > 0.0 {
                    potential -= self.g * a.mass * b.mass / (a.position - b.position).magnitude();
                }
            }
        }
        kinetic + potential
    }

    fn massive(&self) -> Vec<(usize, f64)> {
        self.particles
            .iter()
            .enumerate()
            .filter(|(_, p)| p.mass > 0.0)
            .map(|(i, p)| (i, self.g * p.mass))
            .collect()
    }

    fn accelerations(massive: &[(usize, f64)], pos: &[Vector3<f64>], out: &mut [Vector3<f64>]) {
        for a in out.iter_mut() {
            *a = Vector3::zeros();
        }
        for &(j, gm) in massive {
            for i in 0..pos.len() {
                if i == j {
                    continue;
                }
                let d = pos[j] - pos[i];
                let r2 = d.magnitude_squared();
                out[i] += d * (gm / (r2 * r2.sqrt()));
            }
        }
    }

    fn derivative(massive: &[(usize, f64)], pos: &[Vector3<f64>], vel: &[Vector3<f64>], out: &mut Derivative) {
        out.dx.copy_from_slice(vel);
        Self::accelerations(massive, pos, &mut out.dv);
    }

    fn error_scale(&self, y: f64, y_new: f64) -> f64 {
        self.config.atol + self.config.rtol * y.abs().max(y_new.abs())
    }

    /// One trial step of size `h`; returns the new state and the scaled error norm
    fn trial(
        &self,
        massive: &[(usize, f64)],
        pos: &[Vector3<f64>],
        vel: &[Vector3<f64>],
        h: f64,
    ) -> (Vec<Vector3<f64>>, Vec<Vector3<f64>>, f64) {
        let n = pos.len();
        let mut k: Vec<Derivative> = Vec::with_capacity(7);
        let mut stage_pos = pos.to_vec();
        let mut stage_vel = vel.to_vec();

        for s in 0..7 {
            for i in 0..n {
                let mut dx = Vector3::zeros();
                let mut dv = Vector3::zeros();
                for (j, kj) in k.iter().enumerate() {
                    let a = A[s][j];
                    if a != 0.0 {
                        dx += kj.dx[i] * a;
                        dv += kj.dv[i] * a;
                    }
                }
                stage_pos[i] = pos[i] + dx * h;
                stage_vel[i] = vel[i] + dv * h;
            }
            let mut ks = Derivative::zeros(n);
            Self::derivative(massive, &stage_pos, &stage_vel, &mut ks);
            k.push(ks);
        }

        // The last row of A holds the 5th order weights, so stage 7 sits on the solution
        let new_pos = stage_pos;
        let new_vel = stage_vel;

        let mut sum = 0.0;
        for i in 0..n {
            let mut ex = Vector3::zeros();
            let mut ev = Vector3::zeros();
            for (j, kj) in k.iter().enumerate() {
                ex += kj.dx[i] * E[j];
                ev += kj.dv[i] * E[j];
            }
            ex *= h;
            ev *= h;
            for c in 0..3 {
                let sx = ex[c] / self.error_scale(pos[i][c], new_pos[i][c]);
                let sv = ev[c] / self.error_scale(vel[i][c], new_vel[i][c]);
                sum += sx * sx + sv * sv;
            }
        }
        let norm = if n == 0 { 0.0 } else { (sum / (6 * n) as f64).sqrt() };

        (new_pos, new_vel, norm)
    }

    fn rms_scaled(&self, values: &Derivative, reference_pos: &[Vector3<f64>], reference_vel: &[Vector3<f64>]) -> f64 {
        let n = values.dx.len();
        if n == 0 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..n {
            for c in 0..3 {
                let sx = values.dx[i][c] / self.error_scale(reference_pos[i][c], reference_pos[i][c]);
                let sv = values.dv[i][c] / self.error_scale(reference_vel[i][c], reference_vel[i][c]);
                sum += sx * sx + sv * sv;
            }
        }
        (sum / (6 * n) as f64).sqrt()
    }

    /// Starting step estimate (Hairer, Nørsett & Wanner, II.4)
    fn initial_step_size(&self, massive: &[(usize, f64)], pos: &[Vector3<f64>], vel: &[Vector3<f64>]) -> f64 {
        let n = pos.len();
        let y0 = Derivative { dx: pos.to_vec(), dv: vel.to_vec() };
        let mut f0 = Derivative::zeros(n);
        Self::derivative(massive, pos, vel, &mut f0);

        let d0 = self.rms_scaled(&y0, pos, vel);
        let d1 = self.rms_scaled(&f0, pos, vel);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 { 1e-6 } else { 0.01 * d0 / d1 };

        let pos1: Vec<_> = pos.iter().zip(&f0.dx).map(|(p, d)| p + d * h0).collect();
        let vel1: Vec<_> = vel.iter().zip(&f0.dv).map(|(v, d)| v + d * h0).collect();
        let mut f1 = Derivative::zeros(n);
        Self::derivative(massive, &pos1, &vel1, &mut f1);

        let diff = Derivative {
            dx: f1.dx.iter().zip(&f0.dx).map(|(a, b)| a - b).collect(),
            dv: f1.dv.iter().zip(&f0.dv).map(|(a, b)| a - b).collect(),
        };
        let d2 = self.rms_scaled(&diff, pos, vel) / h0;

        let h1 = if d1.max(d2) <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / 5.0)
        };
        (100.0 * h0).min(h1)
    }

    fn check_state(&self) -> Result<(), IntegrationError> {
        for p in &self.particles {
            if !(p.position.iter().all(|c| c.is_finite()) && p.velocity.iter().all(|c| c.is_finite())) {
                return Err(IntegrationError::NonFinite { t: self.t });
            }
            if let Some(limit) = self.config.max_distance {
                let distance = p.position.magnitude();
                if distance > limit {
                    return Err(IntegrationError::Escaped { hash: p.hash, distance, t: self.t });
                }
            }
        }
        Ok(())
    }
}

impl Integrator for NBody {
    fn add(&mut self, particle: Particle) -> Result<(), IntegrationError> {
        if self.index.contains_key(&particle.hash) {
            return Err(IntegrationError::DuplicateParticle(particle.hash));
        }
        self.index.insert(particle.hash, self.particles.len());
        self.particles.push(particle);
        Ok(())
    }

    fn integrate(&mut self, target: f64, finish: FinishMode) -> Result<(), IntegrationError> {
        if target == self.t {
            return Ok(());
        }
        if self.particles.is_empty() {
            self.t = target;
            return Ok(());
        }

        let direction = if target > self.t { 1.0 } else { -1.0 };
        let massive = self.massive();
        let mut pos: Vec<_> = self.particles.iter().map(|p| p.position).collect();
        let mut vel: Vec<_> = self.particles.iter().map(|p| p.velocity).collect();

        let mut h = match (self.dt, self.config.initial_step) {
            (Some(dt), _) => dt,
            (None, Some(h0)) => h0.abs(),
            (None, None) => self.initial_step_size(&massive, &pos, &vel),
        };

        let mut taken: u64 = 0;
        while (target - self.t) * direction > 0.0 {
            if taken >= self.config.max_steps {
                return Err(IntegrationError::MaxStepsExceeded {
                    steps: taken,
                    t: self.t,
                    target,
                });
            }

            let remaining = (target - self.t).abs();
            let clamped = finish == FinishMode::Exact && h >= remaining;
            let step = if clamped { remaining } else { h };

            let min_step = 16.0 * f64::EPSILON * self.t.abs().max(1.0);
            if step < min_step && !clamped {
                return Err(IntegrationError::StepSizeUnderflow { t: self.t, h: step });
            }

            let (new_pos, new_vel, err) = self.trial(&massive, &pos, &vel, step * direction);
            if !err.is_finite() {
                h = step * MIN_FACTOR;
                continue;
            }

            if err <= 1.0 {
                self.t = if clamped { target } else { self.t + step * direction };
                pos = new_pos;
                vel = new_vel;
                for (p, (x, v)) in self.particles.iter_mut().zip(pos.iter().zip(&vel)) {
                    p.position = *x;
                    p.velocity = *v;
                }
                self.steps += 1;
                taken += 1;
                self.check_state()?;

                let factor = (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR);
                // A shortened final step says nothing about the natural step size
                if !clamped {
                    h = step * factor;
                }
            } else {
                h = step * (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, 1.0);
            }
        }

        self.dt = Some(h);
        Ok(())
    }

    fn time(&self) -> f64 {
        self.t
    }

    fn set_time(&mut self, t: f64) {
        self.t = t;
    }

    fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn particle(&self, hash: BodyHash) -> Option<&Particle> {
        self.index.get(&hash).map(|&i| &self.particles[i])
    }

    fn move_to_com(&mut self) {
        let total: f64 = self.particles.iter().map(|p| p.mass).sum();
        if total <= 0.0 {
            return;
        }
        let com_pos = self.particles.iter().fold(Vector3::zeros(), |acc, p| acc + p.position * p.mass) / total;
        let com_vel = self.particles.iter().fold(Vector3::zeros(), |acc, p| acc + p.velocity * p.mass) / total;
        for p in &mut self.particles {
            p.position -= com_pos;
            p.velocity -= com_vel;
        }
    }

    fn steps(&self) -> u64 {
        self.steps
    }
}
