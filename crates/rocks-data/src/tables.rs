use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use rocks_core::ChebyshevEphemeris;
use rocks_sim::Trajectories;

/// Load Chebyshev ephemeris tables from a JSON file
pub fn load_ephemeris_json<P: AsRef<Path>>(path: P) -> Result<Vec<ChebyshevEphemeris>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening ephemeris table {:?}", path))?;
    read_ephemeris_json(BufReader::new(file)).with_context(|| format!("reading ephemeris table {:?}", path))
}

pub fn read_ephemeris_json<R: Read>(reader: R) -> Result<Vec<ChebyshevEphemeris>> {
    let mut tables: Vec<ChebyshevEphemeris> = serde_json::from_reader(reader)?;
    for table in &mut tables {
        for segment in &table.segments {
            let (start, end) = (segment.start_jd, segment.end_jd);
            if !start.is_finite() || !end.is_finite() || end - start <= 0.0 {
                bail!("Ephemeris table {} has an empty segment [{}, {}]", table.name, start, end);
            }
        }
        table.segments.sort_by(|a, b| a.start_jd.total_cmp(&b.start_jd));
        if table.segments.is_empty() {
            tracing::warn!("Ephemeris table {} has no segments", table.name);
        }
    }
    Ok(tables)
}

/// Write propagation results as pretty JSON
pub fn write_trajectories_json<W: Write>(writer: W, trajectories: &Trajectories) -> Result<()> {
    serde_json::to_writer_pretty(writer, trajectories)?;
    Ok(())
}

pub fn save_trajectories_json<P: AsRef<Path>>(path: P, trajectories: &Trajectories) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path).with_context(|| format!("creating {:?}", path))?);
    write_trajectories_json(&mut writer, trajectories)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_tables_sorts_segments() {
        let json = r#"[{
            "name": "Relay",
            "origin": "ssb",
            "segments": [
                {"start_jd": 2451550.0, "end_jd": 2451560.0, "coeffs_x": [2.0], "coeffs_y": [0.0], "coeffs_z": [0.0]},
                {"start_jd": 2451540.0, "end_jd": 2451550.0, "coeffs_x": [1.0], "coeffs_y": [0.0], "coeffs_z": [0.0]}
            ]
        }]"#;
        let tables = read_ephemeris_json(json.as_bytes()).unwrap();
        assert_eq!(tables.len(), 1);
        let relay = &tables[0];
        assert_eq!(relay.origin, rocks_core::Origin::Barycenter);
        assert_eq!(relay.frame, rocks_core::Frame::Ecliptic);
        assert_eq!(relay.segments[0].start_jd, 2451540.0);
        assert_eq!(relay.position(2451545.0).map(|p| p.x), Some(1.0));
    }

    #[test]
    fn test_malformed_table() {
        assert!(read_ephemeris_json(r#"{"name": 3}"#.as_bytes()).is_err());
    }

    #[test]
    fn test_zero_length_segment_is_rejected() {
        let json = r#"[{
            "name": "Relay",
            "segments": [
                {"start_jd": 2451540.0, "end_jd": 2451550.0, "coeffs_x": [1.0], "coeffs_y": [0.0], "coeffs_z": [0.0]},
                {"start_jd": 2451550.0, "end_jd": 2451550.0, "coeffs_x": [2.0], "coeffs_y": [0.0], "coeffs_z": [0.0]}
            ]
        }]"#;
        let err = read_ephemeris_json(json.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Relay"), "{err}");

        let reversed = json.replace(r#""start_jd": 2451540.0, "end_jd": 2451550.0"#, r#""start_jd": 2451550.0, "end_jd": 2451540.0"#);
        assert!(read_ephemeris_json(reversed.as_bytes()).is_err());
    }
}
