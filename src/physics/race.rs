//! Race - Race configuration, termination rules, and the tick integrator
//!
//! Owns both vehicles' state for the duration of a run, advances them on a
//! shared simulation clock, and evaluates the finish conditions once per
//! tick. Terminal outcomes are sticky: after one is set, `advance` becomes
//! a no-op.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::physics::vehicle::{Stepper, VehicleParams, VehicleSnapshot, VehicleState};

/// Simulation time budget for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeLimit {
    /// Stop the run once the simulation clock reaches this many seconds.
    Finite(f64),
    /// Run until a vehicle finishes (or forever, if none can).
    Unlimited,
}

impl TimeLimit {
    /// Whether `sim_time` has exhausted this budget.
    pub fn expired(&self, sim_time: f64) -> bool {
        match self {
            TimeLimit::Finite(limit) => sim_time >= *limit,
            TimeLimit::Unlimited => false,
        }
    }
}

/// Race-level configuration. Both fields start unset and must be chosen
/// before a run can start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceConfig {
    /// Finish-line distance (m).
    pub distance: Option<f64>,
    /// Simulation time budget.
    pub time_limit: Option<TimeLimit>,
}

/// Full payload for `configure`: both vehicles plus the race itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub vehicle1: VehicleParams,
    pub vehicle2: VehicleParams,
    pub race: RaceConfig,
}

impl SimulationParams {
    /// Reject non-physical values before they can reach a run.
    pub fn validate(&self) -> SimResult<()> {
        self.vehicle1.validate("vehicle 1")?;
        self.vehicle2.validate("vehicle 2")?;
        if let Some(d) = self.race.distance {
            if !d.is_finite() || d <= 0.0 {
                return Err(SimError::InvalidParameter(
                    "race distance must be positive".into(),
                ));
            }
        }
        if let Some(TimeLimit::Finite(t)) = self.race.time_limit {
            if !t.is_finite() || t <= 0.0 {
                return Err(SimError::InvalidParameter(
                    "time limit must be positive".into(),
                ));
            }
        }
        Ok(())
    }

    /// Names of the required fields that are still unset, in display order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.race.distance.is_none() {
            missing.push("race distance");
        }
        if self.race.time_limit.is_none() {
            missing.push("time limit");
        }
        if self.vehicle1.base_force.is_none() {
            missing.push("vehicle 1 force");
        }
        if self.vehicle2.base_force.is_none() {
            missing.push("vehicle 2 force");
        }
        missing
    }

    /// Whether a run can start from these parameters.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// Race lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    NotStarted,
    Running,
    Finished,
}

/// How a run ended (or that it has not ended yet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceOutcome {
    Ongoing,
    Vehicle1Wins,
    Vehicle2Wins,
    Tie,
    TimeExpired,
}

impl RaceOutcome {
    /// True for every value except `Ongoing`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RaceOutcome::Ongoing)
    }
}

/// One immutable record of both vehicles' reportable state at a simulation
/// time, produced once per tick. Ownership moves to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub sim_time: f64,
    pub vehicle1: VehicleSnapshot,
    pub vehicle2: VehicleSnapshot,
}

/// Complete race state: both vehicles, the shared clock, and the outcome.
///
/// Exclusively owned by whichever driver is advancing it; drivers exchange
/// it whole during a cold handoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Race {
    /// Race configuration, immutable during a run.
    pub config: RaceConfig,
    pub vehicle1: VehicleState,
    pub vehicle2: VehicleState,
    /// Simulation clock (s), advanced by exactly `dt` per tick.
    pub sim_time: f64,
    pub status: RaceStatus,
    pub outcome: RaceOutcome,
}

impl Race {
    /// Build a race from validated parameters.
    pub fn new(params: SimulationParams) -> SimResult<Self> {
        params.validate()?;
        Ok(Self {
            config: params.race,
            vehicle1: VehicleState::new(params.vehicle1),
            vehicle2: VehicleState::new(params.vehicle2),
            sim_time: 0.0,
            status: RaceStatus::NotStarted,
            outcome: RaceOutcome::Ongoing,
        })
    }

    /// Rebuild a running race from the last consistent snapshot. Used when
    /// a stalled driver is abandoned and a fresh one takes over mid-run.
    pub fn resume_from(params: SimulationParams, snap: &TickSnapshot) -> SimResult<Self> {
        params.validate()?;
        Ok(Self {
            config: params.race,
            vehicle1: VehicleState::from_snapshot(params.vehicle1, &snap.vehicle1),
            vehicle2: VehicleState::from_snapshot(params.vehicle2, &snap.vehicle2),
            sim_time: snap.sim_time,
            status: RaceStatus::Running,
            outcome: RaceOutcome::Ongoing,
        })
    }

    /// Begin a fresh run: initial kinematics, zeroed clock, outcome cleared.
    ///
    /// Fails with `ConfigurationIncomplete` while the distance, time limit,
    /// or either vehicle's force is unset.
    pub fn start(&mut self) -> SimResult<()> {
        let missing = SimulationParams {
            vehicle1: self.vehicle1.params.clone(),
            vehicle2: self.vehicle2.params.clone(),
            race: self.config,
        }
        .missing_fields();
        if !missing.is_empty() {
            return Err(SimError::ConfigurationIncomplete {
                missing: missing.join(", "),
            });
        }
        self.vehicle1.reset();
        self.vehicle2.reset();
        self.sim_time = 0.0;
        self.status = RaceStatus::Running;
        self.outcome = RaceOutcome::Ongoing;
        Ok(())
    }

    /// Advance both vehicles by one fixed step and evaluate termination.
    ///
    /// Returns the snapshot for the step just taken, including the terminal
    /// one; returns `None` (and changes nothing) unless the race is running.
    pub fn advance(&mut self, dt: f64) -> Option<TickSnapshot> {
        if self.status != RaceStatus::Running {
            return None;
        }

        // Both vehicles step from the same clock reading.
        let t0 = self.sim_time;
        Stepper::advance(&mut self.vehicle1, t0, dt, self.config.distance);
        Stepper::advance(&mut self.vehicle2, t0, dt, self.config.distance);
        self.sim_time += dt;

        self.evaluate_outcome();
        Some(self.snapshot())
    }

    /// Termination rules, in order: tie before either single winner, so the
    /// evaluation order cannot favor one vehicle; then the time budget.
    fn evaluate_outcome(&mut self) {
        if let Some(distance) = self.config.distance {
            let v1_done = self.vehicle1.position >= distance;
            let v2_done = self.vehicle2.position >= distance;
            if v1_done && v2_done {
                self.finish(RaceOutcome::Tie);
                return;
            }
            if v1_done {
                self.finish(RaceOutcome::Vehicle1Wins);
                return;
            }
            if v2_done {
                self.finish(RaceOutcome::Vehicle2Wins);
                return;
            }
        }
        if let Some(limit) = self.config.time_limit {
            if limit.expired(self.sim_time) {
                self.finish(RaceOutcome::TimeExpired);
            }
        }
    }

    fn finish(&mut self, outcome: RaceOutcome) {
        self.outcome = outcome;
        self.status = RaceStatus::Finished;
    }

    /// Current state as a snapshot, without advancing.
    pub fn snapshot(&self) -> TickSnapshot {
        TickSnapshot {
            sim_time: self.sim_time,
            vehicle1: VehicleSnapshot::from(&self.vehicle1),
            vehicle2: VehicleSnapshot::from(&self.vehicle2),
        }
    }

    /// Back to `NotStarted` with configured initial state and cleared outcome.
    pub fn reset(&mut self) {
        self.vehicle1.reset();
        self.vehicle2.reset();
        self.sim_time = 0.0;
        self.status = RaceStatus::NotStarted;
        self.outcome = RaceOutcome::Ongoing;
    }

    /// Whether a terminal outcome has been reached.
    pub fn finished(&self) -> bool {
        self.status == RaceStatus::Finished
    }
}
