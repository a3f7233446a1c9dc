use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use std::ops::ControlFlow;
use std::path::PathBuf;

use packetsim::clock::Clock;
use packetsim::config::Config;
use packetsim::config_loader;
use packetsim::report::{self, RunSummary, Snapshot, SnapshotWriter};
use packetsim::simulation::Simulation;

/// Discrete-time packet flow simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the simulation configuration YAML file (reference network if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(short, long, default_value = "20")]
    ticks: u64,

    /// Seed for destination selection, overriding the configuration
    #[arg(short, long)]
    seed: Option<u64>,

    /// Pace ticks at the configured tick duration instead of running flat out
    #[arg(long)]
    realtime: bool,

    /// Write one JSON snapshot per tick to this file
    #[arg(long)]
    snapshots: Option<PathBuf>,

    /// Write the final run summary as JSON to this file
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Do not print the per-tick statistics table
    #[arg(short, long)]
    quiet: bool,

    /// Write the effective configuration as YAML and exit
    #[arg(long)]
    dump_config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or(&args.log_level)).init();

    let mut config = match &args.config {
        Some(path) => config_loader::load_config(path)?,
        None => {
            info!("No configuration given, using the reference network");
            Config::default()
        }
    };
    if let Some(seed) = args.seed {
        config.general.seed = Some(seed);
    }

    if let Some(path) = &args.dump_config {
        config_loader::write_config(&config, path)?;
        return Ok(());
    }

    let mut sim = Simulation::new(config).wrap_err("Invalid simulation configuration")?;
    let clock = if args.realtime {
        Clock::paced(sim.tick_duration())
    } else {
        Clock::unpaced()
    };

    let mut writer = match &args.snapshots {
        Some(path) => Some(SnapshotWriter::create(path)?),
        None => None,
    };
    let mut write_error = None;

    sim.start();
    let topology = sim.topology().clone();
    clock.run(&mut sim, Some(args.ticks), |state| {
        let snapshot = Snapshot::from_state(state, &topology);
        if !args.quiet {
            println!("{}\n", snapshot.render_table());
        }
        if let Some(writer) = writer.as_mut() {
            if let Err(err) = writer.write(&snapshot) {
                write_error = Some(err);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    });
    sim.pause();

    if let Some(err) = write_error {
        return Err(err);
    }
    if let Some(writer) = writer {
        writer.finish()?;
    }

    let summary = RunSummary::new(sim.state(), sim.seed());
    println!("{}", summary.render_text());
    if let Some(path) = &args.summary {
        report::write_summary(&summary, path)?;
    }

    info!("Simulation finished after {} ticks", sim.state().tick);
    Ok(())
}
