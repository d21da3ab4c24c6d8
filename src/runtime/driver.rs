//! Driver abstraction: who advances the race, and on which thread.
//!
//! Exactly one driver owns the `Race` at a time. The background driver runs
//! it on a dedicated thread; the foreground driver advances it inside the
//! caller's `pump`. Both produce the identical step sequence because all
//! stepping goes through the same `Race` and `StepClock`.

use std::time::Instant;

use crate::error::SimResult;
use crate::physics::race::{Race, RaceOutcome};
use crate::physics::TickSnapshot;
use crate::runtime::clock::StepClock;

/// A strategy for advancing a race against wall time.
///
/// `pump` is the single collection point: callers pass a buffer and receive
/// every snapshot produced since the previous pump, in step order.
pub trait RaceDriver {
    /// Take ownership of a started race and begin advancing it.
    fn begin(&mut self, race: Race) -> SimResult<()>;

    /// Deliver all snapshots produced since the last pump. For drivers that
    /// step on the caller's clock this is also where stepping happens.
    fn pump(&mut self, out: &mut Vec<TickSnapshot>) -> SimResult<()>;

    /// Stop consuming wall time. Steps already owed remain owed.
    fn pause(&mut self);

    /// Resume after `pause`. Wall time that passed while paused is not owed.
    fn resume(&mut self);

    /// Hand the race back and stop driving. `None` once given away, or when
    /// the driver cannot produce it (a stalled worker never responds).
    fn reclaim(&mut self) -> Option<Race>;

    /// Write the driver off without waiting for it. After this, dropping
    /// the driver must not block, even if its worker is wedged.
    fn abandon(&mut self);

    /// Latest known outcome of the driven race.
    fn outcome(&self) -> RaceOutcome;

    /// Short identifier for logs and stats.
    fn name(&self) -> &'static str;
}

/// Steps the race inline, on whichever thread calls `pump`.
///
/// Serves as the fallback when the background worker cannot be spawned or
/// stops ticking, and as the low-machinery option for host loops that
/// already run at a steady cadence.
#[derive(Debug, Default)]
pub struct ForegroundDriver {
    race: Option<Race>,
    clock: StepClock,
    running: bool,
    last_pump: Option<Instant>,
}

impl ForegroundDriver {
    /// Driver identifier used in logs and stats.
    pub const NAME: &'static str = "foreground";

    pub fn new() -> Self {
        Self::default()
    }
}

impl RaceDriver for ForegroundDriver {
    fn begin(&mut self, race: Race) -> SimResult<()> {
        self.race = Some(race);
        self.clock.reset();
        self.running = true;
        self.last_pump = None;
        Ok(())
    }

    fn pump(&mut self, out: &mut Vec<TickSnapshot>) -> SimResult<()> {
        let Some(race) = self.race.as_mut() else {
            return Ok(());
        };
        if !self.running || race.finished() {
            return Ok(());
        }

        let now = Instant::now();
        let elapsed = match self.last_pump {
            Some(prev) => now.duration_since(prev),
            // First pump after begin or resume anchors the clock.
            None => std::time::Duration::ZERO,
        };
        self.last_pump = Some(now);

        let due = self.clock.due_steps(elapsed);
        for _ in 0..due {
            if let Some(snap) = race.advance(StepClock::FIXED_DT) {
                out.push(snap);
            }
            if race.finished() {
                break;
            }
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.running = false;
    }

    fn resume(&mut self) {
        self.running = true;
        // Re-anchor so the paused span is dropped rather than banked.
        self.last_pump = None;
    }

    fn reclaim(&mut self) -> Option<Race> {
        self.running = false;
        self.race.take()
    }

    fn abandon(&mut self) {
        self.running = false;
        self.race = None;
    }

    fn outcome(&self) -> RaceOutcome {
        self.race
            .as_ref()
            .map(|race| race.outcome)
            .unwrap_or(RaceOutcome::Ongoing)
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::race::{RaceConfig, SimulationParams, TimeLimit};
    use crate::physics::vehicle::VehicleParams;
    use std::thread;
    use std::time::Duration;

    fn started_race() -> Race {
        let params = SimulationParams {
            vehicle1: VehicleParams {
                base_force: Some(600.0),
                ..VehicleParams::default()
            },
            vehicle2: VehicleParams {
                base_force: Some(500.0),
                ..VehicleParams::default()
            },
            race: RaceConfig {
                distance: Some(1.0e9),
                time_limit: Some(TimeLimit::Unlimited),
            },
        };
        let mut race = Race::new(params).unwrap();
        race.start().unwrap();
        race
    }

    #[test]
    fn pump_advances_with_wall_time() {
        let mut driver = ForegroundDriver::new();
        driver.begin(started_race()).unwrap();
        let mut out = Vec::new();
        driver.pump(&mut out).unwrap();
        assert!(out.is_empty(), "no wall time has passed yet");

        thread::sleep(Duration::from_millis(40));
        driver.pump(&mut out).unwrap();
        assert!(!out.is_empty());
        let last = out.last().unwrap();
        assert!((last.sim_time / StepClock::FIXED_DT).fract().abs() < 1e-6);
    }

    #[test]
    fn paused_wall_time_is_never_owed() {
        let mut driver = ForegroundDriver::new();
        driver.begin(started_race()).unwrap();
        let mut out = Vec::new();
        driver.pump(&mut out).unwrap();

        let awake_start = Instant::now();
        thread::sleep(Duration::from_millis(40));
        driver.pump(&mut out).unwrap();
        let awake = awake_start.elapsed().as_secs_f64();

        driver.pause();
        thread::sleep(Duration::from_millis(150));
        driver.resume();
        for _ in 0..8 {
            driver.pump(&mut out).unwrap();
        }

        let advanced = out.last().map(|snap| snap.sim_time).unwrap_or(0.0);
        assert!(
            advanced <= awake + 2.0 * StepClock::FIXED_DT,
            "paused span leaked into sim time: advanced {advanced}, awake {awake}"
        );
    }

    #[test]
    fn pump_while_paused_produces_nothing() {
        let mut driver = ForegroundDriver::new();
        driver.begin(started_race()).unwrap();
        driver.pause();
        thread::sleep(Duration::from_millis(30));
        let mut out = Vec::new();
        driver.pump(&mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn reclaim_hands_the_race_back_exactly_once() {
        let mut driver = ForegroundDriver::new();
        driver.begin(started_race()).unwrap();
        let race = driver.reclaim().expect("race should come back");
        assert_eq!(race.outcome, RaceOutcome::Ongoing);
        assert!(driver.reclaim().is_none());

        let mut out = Vec::new();
        driver.pump(&mut out).unwrap();
        assert!(out.is_empty());
    }
}
