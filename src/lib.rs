//! Two-vehicle straight-line race simulation.
//!
//! Each vehicle is a point mass under a time-varying applied force and
//! constant kinetic friction, integrated in fixed 60 Hz steps. The crate
//! splits into a deterministic physics core (`physics`) and a wall-clock
//! runtime (`runtime`) that can drive a race either on a background worker
//! thread or inline on the caller's thread, falling back from the former to
//! the latter when the worker goes quiet.
//!
//! Typical embedding:
//!
//! ```no_run
//! use racesim::{
//!     ForceKind, RaceConfig, SimulationParams, SimulationRunner, TimeLimit, VehicleParams,
//! };
//!
//! let mut runner = SimulationRunner::new();
//! runner.configure(SimulationParams {
//!     vehicle1: VehicleParams { base_force: Some(600.0), ..VehicleParams::default() },
//!     vehicle2: VehicleParams {
//!         base_force: Some(550.0),
//!         force_kind: ForceKind::Increasing,
//!         ..VehicleParams::default()
//!     },
//!     race: RaceConfig { distance: Some(100.0), time_limit: Some(TimeLimit::Unlimited) },
//! })?;
//! runner.start()?;
//! while runner.finish().is_none() {
//!     if let Some(snapshot) = runner.poll()? {
//!         println!(
//!             "t={:.2} x1={:.2} x2={:.2}",
//!             snapshot.sim_time, snapshot.vehicle1.position, snapshot.vehicle2.position
//!         );
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(16));
//! }
//! # Ok::<(), racesim::SimError>(())
//! ```

pub mod error;
pub mod physics;
pub mod runtime;

pub use error::{SimError, SimResult};
pub use physics::{
    ForceKind, Race, RaceConfig, RaceOutcome, RaceStatus, SimulationParams, TickSnapshot,
    TimeLimit, VehicleParams, VehicleSnapshot, VehicleState,
};
pub use runtime::{
    BackgroundDriver, ForegroundDriver, RaceDriver, RaceFinish, RunStatus, RunnerStats,
    SimulationRunner, StepClock,
};
