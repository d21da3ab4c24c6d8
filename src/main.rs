//! Command-line demo: configure a two-vehicle race, run it to completion,
//! and print throttled snapshots as text or JSON lines.

use std::fs::File;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use env_logger::Env;

use racesim::{
    ForceKind, RaceConfig, RaceFinish, RaceOutcome, SimulationParams, SimulationRunner,
    TickSnapshot, TimeLimit, VehicleParams,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProfileArg {
    Constant,
    Increasing,
    Decreasing,
    Impulse,
}

impl From<ProfileArg> for ForceKind {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Constant => ForceKind::Constant,
            ProfileArg::Increasing => ForceKind::Increasing,
            ProfileArg::Decreasing => ForceKind::Decreasing,
            ProfileArg::Impulse => ForceKind::Impulse,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DriverArg {
    /// Advance the race on a dedicated worker thread.
    Background,
    /// Advance the race inline while polling.
    Foreground,
}

#[derive(Parser, Debug)]
#[command(name = "racesim", version, about = "Two-vehicle race simulation demo")]
struct Args {
    /// JSON file holding the full simulation parameters. When given, the
    /// individual parameter flags below are ignored.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Finish-line distance (m).
    #[arg(long, default_value_t = 100.0)]
    distance: f64,

    /// Stop the run after this much simulated time (s).
    #[arg(long, value_name = "SECONDS", conflicts_with = "unlimited")]
    time_limit: Option<f64>,

    /// Run with no time limit.
    #[arg(long)]
    unlimited: bool,

    /// Applied force for vehicle 1 (N).
    #[arg(long, default_value_t = 600.0)]
    force1: f64,

    /// Applied force for vehicle 2 (N).
    #[arg(long, default_value_t = 550.0)]
    force2: f64,

    /// Force profile for vehicle 1.
    #[arg(long, value_enum, default_value = "constant")]
    profile1: ProfileArg,

    /// Force profile for vehicle 2.
    #[arg(long, value_enum, default_value = "constant")]
    profile2: ProfileArg,

    /// Mass of vehicle 1 (kg).
    #[arg(long, default_value_t = 1000.0)]
    mass1: f64,

    /// Mass of vehicle 2 (kg).
    #[arg(long, default_value_t = 1000.0)]
    mass2: f64,

    /// Kinetic friction on vehicle 1 (N).
    #[arg(long, default_value_t = 100.0)]
    friction1: f64,

    /// Kinetic friction on vehicle 2 (N).
    #[arg(long, default_value_t = 100.0)]
    friction2: f64,

    /// Which driver advances the race.
    #[arg(long, value_enum, default_value = "background")]
    driver: DriverArg,

    /// Emit one JSON object per snapshot instead of formatted text.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn params(&self) -> Result<SimulationParams> {
        if let Some(path) = &self.config {
            let file = File::open(path)
                .with_context(|| format!("could not open config file {}", path.display()))?;
            let params: SimulationParams = serde_json::from_reader(file)
                .with_context(|| format!("could not parse config file {}", path.display()))?;
            return Ok(params);
        }

        let time_limit = if self.unlimited {
            TimeLimit::Unlimited
        } else {
            match self.time_limit {
                Some(seconds) => TimeLimit::Finite(seconds),
                None => TimeLimit::Unlimited,
            }
        };
        Ok(SimulationParams {
            vehicle1: VehicleParams {
                mass: self.mass1,
                friction: self.friction1,
                force_kind: self.profile1.into(),
                base_force: Some(self.force1),
                ..VehicleParams::default()
            },
            vehicle2: VehicleParams {
                mass: self.mass2,
                friction: self.friction2,
                force_kind: self.profile2.into(),
                base_force: Some(self.force2),
                ..VehicleParams::default()
            },
            race: RaceConfig {
                distance: Some(self.distance),
                time_limit: Some(time_limit),
            },
        })
    }
}

fn print_snapshot(snapshot: &TickSnapshot, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(snapshot)?);
    } else {
        println!(
            "t={:7.2} s | v1: x={:8.2} m v={:6.2} m/s | v2: x={:8.2} m v={:6.2} m/s",
            snapshot.sim_time,
            snapshot.vehicle1.position,
            snapshot.vehicle1.velocity,
            snapshot.vehicle2.position,
            snapshot.vehicle2.velocity,
        );
    }
    Ok(())
}

fn print_finish(finish: &RaceFinish, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(finish)?);
        return Ok(());
    }
    let snap = &finish.snapshot;
    let banner = match finish.outcome {
        RaceOutcome::Vehicle1Wins => "Vehicle 1 wins",
        RaceOutcome::Vehicle2Wins => "Vehicle 2 wins",
        RaceOutcome::Tie => "Dead heat: both vehicles finish together",
        RaceOutcome::TimeExpired => "Time limit reached before the finish line",
        RaceOutcome::Ongoing => "Race still in progress",
    };
    println!("\n{banner} at {:.2} s", snap.sim_time);
    println!(
        "  vehicle 1: x={:.2} m  v_max={:.2} m/s  work={:.0} J",
        snap.vehicle1.position, snap.vehicle1.max_velocity, snap.vehicle1.work
    );
    println!(
        "  vehicle 2: x={:.2} m  v_max={:.2} m/s  work={:.0} J",
        snap.vehicle2.position, snap.vehicle2.max_velocity, snap.vehicle2.work
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut runner = match args.driver {
        DriverArg::Background => SimulationRunner::new(),
        DriverArg::Foreground => SimulationRunner::foreground_only(),
    };
    runner.configure(args.params()?)?;
    runner.start()?;

    let finish = loop {
        if let Some(snapshot) = runner.poll()? {
            print_snapshot(&snapshot, args.json)?;
        }
        if let Some(finish) = runner.finish() {
            break finish;
        }
        thread::sleep(Duration::from_millis(16));
    };
    print_finish(&finish, args.json)?;

    let stats = runner.stats();
    log::info!(
        "run complete: {} ticks on the {} driver, {} fallback(s)",
        stats.ticks,
        stats.driver,
        stats.fallbacks
    );
    Ok(())
}
