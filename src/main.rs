//! Resonance Field entry point
//!
//! Headless driver: either single-steps a fixed number of ticks or runs the
//! field on its wall-clock cadence for a while, then reports what happened.

use std::error::Error;
use std::thread;
use std::time::Duration;

use clap::Parser;

use resonance_field::{FieldConfig, FieldRunner, Simulation};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// RNG seed (defaults to the reference seed)
    #[arg(long)]
    seed: Option<u64>,

    /// Number of ticks to single-step
    #[arg(long, default_value_t = 600)]
    ticks: u64,

    /// Run on the real tick cadence for this many seconds instead of stepping
    #[arg(long)]
    realtime_secs: Option<f32>,

    /// Particles to seed before the first tick
    #[arg(long, default_value_t = 4)]
    initial: usize,

    /// Config overrides as JSON, e.g. '{"max_particles": 6}'
    #[arg(long)]
    config: Option<String>,

    /// Print the final snapshot as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match args.config.as_deref() {
        Some(json) => FieldConfig::from_json(json)?,
        None => FieldConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut simulation = Simulation::new(config)?;
    let seeded = simulation.seed_particles(args.initial);
    log::info!("Seeded {} particles", seeded);

    let simulation = match args.realtime_secs {
        Some(secs) => {
            let runner = FieldRunner::start(simulation)?;
            thread::sleep(Duration::from_secs_f32(secs.max(0.0)));
            runner.stop().ok_or("field runner did not shut down cleanly")?
        }
        None => {
            let (mut collisions, mut supernovae) = (0usize, 0usize);
            for _ in 0..args.ticks {
                let report = simulation.step();
                collisions += report.collisions.len();
                supernovae += report.supernovae.len();
                if report.tick.is_multiple_of(100) {
                    log::info!(
                        "tick {}: population {}, mean amplitude {:.3}, |w| {:.5}",
                        report.tick,
                        report.population,
                        report.mean_amplitude.unwrap_or(0.0),
                        simulation.state().rotation.angular_speed()
                    );
                }
            }
            log::info!(
                "{} ticks: {} collisions, {} supernovae",
                args.ticks,
                collisions,
                supernovae
            );
            simulation
        }
    };

    let snapshot = simulation.snapshot();
    if args.json {
        println!("{}", snapshot.to_json()?);
    } else {
        println!(
            "tick {} ({} ms): {} particles, {} live collisions, {} live supernovae",
            snapshot.tick,
            snapshot.clock_ms,
            snapshot.population(),
            snapshot.collisions.len(),
            snapshot.supernovae.len()
        );
    }

    Ok(())
}
