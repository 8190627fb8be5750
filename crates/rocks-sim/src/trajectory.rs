//! Trajectory log and columnar trajectory tables

use std::collections::HashMap;

use nalgebra::Vector3;
use rocks_core::SimUnits;
use serde::{Deserialize, Serialize};

use crate::body::BodyHash;

/// One recorded state, in simulation units
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRow {
    pub jd_tdb: f64,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

/// Append-only per-body history, keyed by body hash
#[derive(Clone, Debug, Default)]
pub struct TrajectoryLog {
    rows: HashMap<BodyHash, Vec<TrajectoryRow>>,
}

impl TrajectoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty history; an existing one is left untouched
    pub fn register(&mut self, hash: BodyHash) {
        self.rows.entry(hash).or_default();
    }

    pub fn append(&mut self, hash: BodyHash, row: TrajectoryRow) {
        self.rows.entry(hash).or_default().push(row);
    }

    pub fn contains(&self, hash: BodyHash) -> bool {
        self.rows.contains_key(&hash)
    }

    pub fn rows(&self, hash: BodyHash) -> Option<&[TrajectoryRow]> {
        self.rows.get(&hash).map(Vec::as_slice)
    }

    /// Whether `hash` already has a row stamped exactly `jd_tdb`
    pub fn has_row_at(&self, hash: BodyHash, jd_tdb: f64) -> bool {
        self.rows(hash)
            .is_some_and(|rows| rows.iter().any(|row| row.jd_tdb == jd_tdb))
    }

    /// Total rows across all bodies
    pub fn total_rows(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }
}

/// Flattened trajectories of a group of bodies, one row per (body, epoch)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryTable {
    pub units: SimUnits,
    pub epoch: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    pub vx: Vec<f64>,
    pub vy: Vec<f64>,
    pub vz: Vec<f64>,
    pub name: Vec<String>,
}

impl TrajectoryTable {
    pub fn new(units: SimUnits) -> Self {
        Self {
            units,
            epoch: Vec::new(),
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
            vx: Vec::new(),
            vy: Vec::new(),
            vz: Vec::new(),
            name: Vec::new(),
        }
    }

    pub fn push(&mut self, name: &str, row: &TrajectoryRow) {
        self.epoch.push(row.jd_tdb);
        self.x.push(row.position.x);
        self.y.push(row.position.y);
        self.z.push(row.position.z);
        self.vx.push(row.velocity.x);
        self.vy.push(row.velocity.y);
        self.vz.push(row.velocity.z);
        self.name.push(name.to_string());
    }

    pub fn len(&self) -> usize {
        self.epoch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epoch.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<(&str, TrajectoryRow)> {
        let name = self.name.get(index)?;
        Some((
            name.as_str(),
            TrajectoryRow {
                jd_tdb: self.epoch[index],
                position: Vector3::new(self.x[index], self.y[index], self.z[index]),
                velocity: Vector3::new(self.vx[index], self.vy[index], self.vz[index]),
            },
        ))
    }

    /// Rows of one body, in table order
    pub fn rows_for<'a>(&'a self, name: &'a str) -> impl Iterator<Item = TrajectoryRow> + 'a {
        (0..self.len())
            .filter_map(move |i| self.row(i))
            .filter(move |(n, _)| *n == name)
            .map(|(_, row)| row)
    }

    /// Distinct body names, in first-appearance order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in &self.name {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }
}

/// Result of a propagation: test particles (absent when none were ever
/// added) and perturbers
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trajectories {
    pub test_particles: Option<TrajectoryTable>,
    pub perturbers: TrajectoryTable,
}

/// Flatten the logged rows of `names` into one table.
///
/// Bodies without rows are skipped with a warning.
pub fn assemble<'a>(
    names: impl IntoIterator<Item = &'a str>,
    log: &TrajectoryLog,
    units: &SimUnits,
) -> TrajectoryTable {
    let mut table = TrajectoryTable::new(units.clone());
    for name in names {
        match log.rows(BodyHash::of(name)) {
            Some(rows) if !rows.is_empty() => {
                for row in rows {
                    table.push(name, row);
                }
            }
            _ => tracing::warn!("No trajectory data for {}", name),
        }
    }
    table
}
