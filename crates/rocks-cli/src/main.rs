use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rocks_core::constants::{AU, J2000_JD};
use rocks_core::epoch::detect_jd;
use rocks_core::{ChebyshevEphemeris, EpochSpec, Frame, Origin, Timescale, UnitSpec, Units};
use rocks_data::{
    jd_range, load_ephemeris_json, parse_duration, parse_relative_jd, save_trajectories_json,
    write_trajectories_json, ScenarioConfig,
};
use rocks_sim::{
    summarize_validation, validate_body, Integrator, IntegratorConfig, PerturberModel,
    PropagateOptions, Simulation,
};

#[derive(Parser)]
#[command(name = "rocks")]
#[command(about = "N-body propagation of small bodies through planetary perturbers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file and write the trajectories as JSON
    Propagate {
        /// Scenario JSON
        scenario: PathBuf,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Show a progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Show perturber positions at epoch
    Planets {
        /// Epoch (ISO or JD/MJD with an optional scale, TDB by default)
        #[arg(short, long, default_value = "2000-01-01T12:00:00 TDB")]
        epoch: String,
        /// Built-in model
        #[arg(short, long, default_value = "ALL")]
        model: String,
    },

    /// Resolve a unit system and print G in it
    Units {
        #[arg(long, default_value = "msun")]
        mass: String,
        #[arg(long, default_value = "au")]
        distance: String,
        #[arg(long, default_value = "day")]
        time: String,
    },

    /// Validate n-body propagation of the perturbers against their ephemerides
    Validate {
        /// Start epoch (relative to J2000, e.g. "-10y", or absolute)
        #[arg(long, default_value = "-10y")]
        start: String,
        /// End epoch (relative to the start, e.g. "+10y", or absolute)
        #[arg(long, default_value = "+20y")]
        end: String,
        /// Step size (e.g., "30d", "1y")
        #[arg(long, default_value = "30d")]
        step: String,
        /// Built-in model
        #[arg(short, long, default_value = "PLANETS")]
        model: String,
        /// Chebyshev ephemeris tables; the analytic orbits are used when omitted
        #[arg(long)]
        ephemeris: Option<PathBuf>,
        /// Relative tolerance of the integrator
        #[arg(long, default_value_t = 1e-12)]
        rtol: f64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Propagate { scenario, output, progress } => {
            let config = ScenarioConfig::from_path(&scenario)?;
            let base_dir = scenario.parent().unwrap_or_else(|| Path::new("."));
            let mut sim = config.simulation(base_dir)?;
            let epochs = config.epochs()?;
            let options = PropagateOptions { progress: progress || config.options.progress, ..config.options.clone() };

            tracing::info!(
                "Propagating {} rocks through {} perturbers to {} epochs ({})",
                sim.test_particle_names().len(),
                sim.perturber_names().len(),
                epochs.len(),
                sim.units().label()
            );

            let result = sim.propagate(&epochs, &options);
            // Whatever was recorded before a failure is still written out
            let trajectories = match &result {
                Ok(trajectories) => trajectories.clone(),
                Err(e) => {
                    tracing::warn!("Propagation stopped at JD {:.6}: {}", sim.epoch(), e);
                    sim.trajectories()
                }
            };

            match &output {
                Some(path) => {
                    save_trajectories_json(path, &trajectories)?;
                    println!(
                        "Wrote {} perturber rows, {} test particle rows -> {}",
                        trajectories.perturbers.len(),
                        trajectories.test_particles.as_ref().map_or(0, |t| t.len()),
                        path.display()
                    );
                }
                None => {
                    let stdout = std::io::stdout();
                    let mut lock = stdout.lock();
                    write_trajectories_json(&mut lock, &trajectories)?;
                    writeln!(lock)?;
                }
            }
            tracing::info!("{} integrator steps", sim.integrator().steps());
            result?;
        }

        Commands::Planets { epoch, model } => {
            let jd = parse_epoch(&epoch)?;
            let model = PerturberModel::builtin(&model)?;

            println!("Heliocentric ecliptic positions at JD {:.6} TDB:", jd);
            println!("{:<12} {:>15} {:>15} {:>15} {:>12}", "Body", "X (AU)", "Y (AU)", "Z (AU)", "Dist (AU)");
            for perturber in model.iter() {
                let state = perturber.state_at(jd)?.to_frame(Frame::Ecliptic);
                let p = state.position;
                println!(
                    "{:<12} {:>15.6} {:>15.6} {:>15.6} {:>12.4}",
                    perturber.name,
                    p.x / AU,
                    p.y / AU,
                    p.z / AU,
                    p.magnitude() / AU
                );
            }
        }

        Commands::Units { mass, distance, time } => {
            let units = Units {
                mass: UnitSpec::Name(mass),
                distance: UnitSpec::Name(distance),
                time: UnitSpec::Name(time),
                ..Units::default()
            };
            let resolved = units.resolve()?;
            println!("{:<10} {:>12} {:>20}", "Axis", "Unit", "SI scale");
            println!("{:<10} {:>12} {:>20.10e}", "mass", resolved.mass.name, resolved.mass.si);
            println!("{:<10} {:>12} {:>20.10e}", "length", resolved.length.name, resolved.length.si);
            println!("{:<10} {:>12} {:>20.10e}", "time", resolved.time.name, resolved.time.si);
            println!("\nG = {:.12e} {}^3 / ({} {}^2)", resolved.g, resolved.length.name, resolved.mass.name, resolved.time.name);
        }

        Commands::Validate { start, end, step, model, ephemeris, rtol } => {
            let start_jd = parse_relative_jd(&start, J2000_JD, Timescale::Tdb)?;
            let end_jd = parse_relative_jd(&end, start_jd, Timescale::Tdb)?;
            let epochs: Vec<EpochSpec> = jd_range(start_jd, end_jd, parse_duration(&step)?)?
                .into_iter()
                .map(EpochSpec::JdTdb)
                .collect();

            let model = PerturberModel::builtin(&model)?;
            let config = IntegratorConfig { rtol, ..IntegratorConfig::default() };
            let mut sim = Simulation::new(&model, Units::default(), Some(EpochSpec::JdTdb(start_jd)), config)?;

            println!("Validating from JD {:.4} to JD {:.4} with step {}", start_jd, end_jd, step);
            let options = PropagateOptions { progress: true, ..PropagateOptions::default() };
            let trajectories = sim.propagate(&epochs, &options)?;

            let tables: HashMap<String, ChebyshevEphemeris> = match &ephemeris {
                Some(path) => load_ephemeris_json(path)?
                    .into_iter()
                    .map(|table| (table.name.clone(), table))
                    .collect(),
                None => HashMap::new(),
            };

            let mut results = Vec::new();
            for perturber in model.iter().filter(|p| p.name != "Sun") {
                let points = match (&ephemeris, tables.get(&perturber.name)) {
                    (Some(_), Some(table)) => {
                        let reference = match table.origin {
                            Origin::Barycenter => None,
                            Origin::Sun => Some("Sun"),
                        };
                        validate_body(&trajectories.perturbers, &perturber.name, reference, table)?
                    }
                    (Some(path), None) => {
                        tracing::warn!("{} has no table in {:?}, skipping", perturber.name, path);
                        continue;
                    }
                    (None, _) => validate_body(&trajectories.perturbers, &perturber.name, Some("Sun"), perturber)?,
                };
                results.extend(points);
            }

            let summary = summarize_validation(&results);
            println!("\n{:<12} {:>10} {:>15} {:>15} {:>15}", "Body", "Points", "Mean (km)", "Max (km)", "Mean (%)");
            for s in &summary {
                println!(
                    "{:<12} {:>10} {:>15.1} {:>15.1} {:>15.4}",
                    s.body, s.num_points, s.mean_error_km, s.max_error_km, s.mean_error_percent
                );
            }
            println!("\n{} integrator steps", sim.integrator().steps());
        }
    }

    Ok(())
}

/// Any epoch form the library accepts, as JD TDB
fn parse_epoch(s: &str) -> Result<f64> {
    detect_jd(s, Timescale::Tdb).with_context(|| format!("invalid epoch {s:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_epoch() {
        assert_eq!(parse_epoch("2451545.0").unwrap(), 2451545.0);
        assert_eq!(parse_epoch("MJD 51544.5 TDB").unwrap(), 2451545.0);
        assert_eq!(parse_epoch("JD 2451545.0").unwrap(), 2451545.0);
        let iso = parse_epoch("2000-01-01T12:00:00 TDB").unwrap();
        assert!((iso - 2451545.0).abs() < 1e-8);
        assert!(parse_epoch("yesterday").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["rocks", "validate", "--step", "1y", "--model", "giants"]).unwrap();
        assert!(matches!(cli.command, Commands::Validate { ref step, .. } if step == "1y"));
    }
}
