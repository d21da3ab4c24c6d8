//! Physics core: force profiles, the vehicle stepper, and the race state
//! machine. Everything in here is deterministic and single-threaded; the
//! runtime layer decides when and on which thread ticks happen.

pub mod force;
pub mod race;
pub mod vehicle;

pub use force::ForceKind;
pub use race::{
    Race, RaceConfig, RaceOutcome, RaceStatus, SimulationParams, TickSnapshot, TimeLimit,
};
pub use vehicle::{Stepper, VehicleParams, VehicleSnapshot, VehicleState};
