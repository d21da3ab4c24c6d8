//! Runtime layer: wall-clock scheduling, drivers, and the run supervisor.

pub mod background;
pub mod clock;
pub mod driver;
pub mod record;
pub mod runner;

pub use background::BackgroundDriver;
pub use clock::StepClock;
pub use driver::{ForegroundDriver, RaceDriver};
pub use record::{RecordPool, TickRecord, TICK_RECORD_LEN};
pub use runner::{RaceFinish, RunStatus, RunnerStats, SimulationRunner};
