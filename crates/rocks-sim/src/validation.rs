//! Validation of propagated trajectories against ephemeris data

use std::collections::BTreeMap;

use nalgebra::Vector3;
use rocks_core::constants::AU;
use rocks_core::Frame;

use crate::body::EphemerisSource;
use crate::error::{SimError, SimResult};
use crate::trajectory::TrajectoryTable;

/// Comparison for a single body at one epoch
#[derive(Clone, Debug)]
pub struct ValidationPoint {
    pub body: String,
    pub jd_tdb: f64,
    pub computed_au: Vector3<f64>,
    pub ephemeris_au: Vector3<f64>,
    pub error_km: f64,
    pub error_percent: f64,
}

/// Compare `body`'s rows in `table` against `source`.
///
/// With a `reference` body, positions are taken relative to it (e.g. `Sun`
/// for heliocentric ephemerides), otherwise the barycentric rows are used
/// as they are. Epochs outside the ephemeris span are skipped.
pub fn validate_body(
    table: &TrajectoryTable,
    body: &str,
    reference: Option<&str>,
    source: &dyn EphemerisSource,
) -> SimResult<Vec<ValidationPoint>> {
    let rows: Vec<_> = table.rows_for(body).collect();
    if rows.is_empty() {
        return Err(SimError::BodyNotFound(body.to_string()));
    }
    let reference_rows: Vec<_> = match reference {
        Some(name) => {
            let rows: Vec<_> = table.rows_for(name).collect();
            if rows.is_empty() {
                return Err(SimError::BodyNotFound(name.to_string()));
            }
            rows
        }
        None => Vec::new(),
    };

    let mut points = Vec::with_capacity(rows.len());
    for row in rows {
        let offset = match reference {
            Some(_) => match reference_rows.iter().find(|r| r.jd_tdb == row.jd_tdb) {
                Some(r) => r.position,
                None => continue,
            },
            None => Vector3::zeros(),
        };
        let computed = (row.position - offset).map(|c| table.units.length_to_si(c));

        let expected = match source.state(row.jd_tdb) {
            Ok(state) => state.to_frame(Frame::Ecliptic).position,
            Err(SimError::EphemerisOutOfRange { .. }) => {
                tracing::debug!("{} not covered at JD {}", body, row.jd_tdb);
                continue;
            }
            Err(e) => return Err(e),
        };

        let error_m = (computed - expected).magnitude();
        let distance = expected.magnitude();
        points.push(ValidationPoint {
            body: body.to_string(),
            jd_tdb: row.jd_tdb,
            computed_au: computed / AU,
            ephemeris_au: expected / AU,
            error_km: error_m / 1000.0,
            error_percent: if distance > 0.0 { error_m / distance * 100.0 } else { 0.0 },
        });
    }

    Ok(points)
}

/// Summary statistics for validation
#[derive(Clone, Debug)]
pub struct ValidationSummary {
    pub body: String,
    pub num_points: usize,
    pub mean_error_km: f64,
    pub max_error_km: f64,
    pub mean_error_percent: f64,
}

/// Compute summary statistics per body, ordered by name
pub fn summarize_validation(results: &[ValidationPoint]) -> Vec<ValidationSummary> {
    let mut by_body: BTreeMap<&str, Vec<&ValidationPoint>> = BTreeMap::new();

    for point in results {
        by_body.entry(point.body.as_str()).or_default().push(point);
    }

    by_body.into_iter().map(|(body, points)| {
        let n = points.len();
        let mean_km = points.iter().map(|p| p.error_km).sum::<f64>() / n as f64;
        let max_km = points.iter().map(|p| p.error_km).fold(0.0, f64::max);
        let mean_pct = points.iter().map(|p| p.error_percent).sum::<f64>() / n as f64;

        ValidationSummary {
            body: body.to_string(),
            num_points: n,
            mean_error_km: mean_km,
            max_error_km: max_km,
            mean_error_percent: mean_pct,
        }
    }).collect()
}
