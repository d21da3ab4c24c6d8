//! SimulationRunner - run-control supervisor over a race and its driver.
//!
//! The runner owns configuration, the current driver, and everything that
//! keeps a run healthy: the stall watchdog, the one-way fallback from the
//! background driver to the foreground driver, snapshot throttling for the
//! presentation layer, and per-run stats.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{SimError, SimResult};
use crate::physics::race::{Race, RaceOutcome, SimulationParams, TickSnapshot};
use crate::runtime::background::BackgroundDriver;
use crate::runtime::driver::{ForegroundDriver, RaceDriver};

/// Run-control lifecycle, one level above `RaceStatus`: it also knows
/// whether enough configuration exists to start at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Required parameters are still missing.
    Idle,
    /// Fully configured; `start` will be accepted.
    Ready,
    Running,
    Paused,
    Finished,
}

/// Terminal result of a run: the outcome plus the final snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RaceFinish {
    pub outcome: RaceOutcome,
    pub snapshot: TickSnapshot,
}

/// Point-in-time runner health, in the same spirit as a frame-stats readout.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunnerStats {
    pub status: RunStatus,
    pub driver: &'static str,
    /// Ticks observed this run.
    pub ticks: u64,
    /// Mean wall interval between observed ticks (ms), over a short window.
    pub mean_tick_interval_ms: f32,
    /// Driver fallbacks this run (spawn failures and stalls).
    pub fallbacks: u32,
}

/// Detects a background driver that has quietly stopped ticking.
#[derive(Debug)]
struct Watchdog {
    last_tick: Instant,
}

impl Watchdog {
    /// Silence longer than this while running counts as a stall.
    const TIMEOUT: Duration = Duration::from_millis(600);

    fn new(now: Instant) -> Self {
        Self { last_tick: now }
    }

    fn observe(&mut self, now: Instant) {
        self.last_tick = now;
    }

    fn expired(&self, now: Instant) -> bool {
        now.duration_since(self.last_tick) > Self::TIMEOUT
    }
}

/// Consumer-side coalescing to roughly 10 Hz. The run produces 60 ticks a
/// second; the presentation layer only wants the newest one every so often.
#[derive(Debug, Default)]
struct SnapshotThrottle {
    last_emit: Option<Instant>,
}

impl SnapshotThrottle {
    const INTERVAL: Duration = Duration::from_millis(100);

    fn ready(&mut self, now: Instant) -> bool {
        match self.last_emit {
            Some(prev) if now.duration_since(prev) < Self::INTERVAL => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }

    fn reset(&mut self) {
        self.last_emit = None;
    }
}

/// Supervisor for one simulation session.
///
/// Drives a `Race` through an exchangeable `RaceDriver`, preferring the
/// background worker and falling back to inline stepping when the worker
/// cannot be spawned or stops ticking. The fallback is one-way for the rest
/// of the run. All methods are called from the host's control thread.
pub struct SimulationRunner {
    params: SimulationParams,
    driver: Option<Box<dyn RaceDriver>>,
    /// Driver to use for the next `start`, when injected.
    pending_driver: Option<Box<dyn RaceDriver>>,
    prefer_background: bool,
    status: RunStatus,
    outcome: RaceOutcome,
    /// Newest snapshot seen, at full tick rate. Seeds driver handoffs.
    latest: Option<TickSnapshot>,
    watchdog: Option<Watchdog>,
    throttle: SnapshotThrottle,
    ticks: u64,
    /// Per-tick arrival intervals (ms) over a sliding window.
    tick_intervals: Vec<f32>,
    last_arrival: Option<Instant>,
    fallbacks: u32,
}

impl SimulationRunner {
    /// Samples kept for the mean tick interval.
    const INTERVAL_WINDOW: usize = 60;

    /// Runner that prefers the background worker thread.
    pub fn new() -> Self {
        Self::build(true, None)
    }

    /// Runner that always steps inline, never spawning a worker.
    pub fn foreground_only() -> Self {
        Self::build(false, None)
    }

    /// Runner whose next run uses `driver` instead of the built-in choice.
    /// Later runs fall back to the background preference.
    pub fn with_driver(driver: Box<dyn RaceDriver>) -> Self {
        Self::build(true, Some(driver))
    }

    fn build(prefer_background: bool, pending_driver: Option<Box<dyn RaceDriver>>) -> Self {
        Self {
            params: SimulationParams::default(),
            driver: None,
            pending_driver,
            prefer_background,
            status: RunStatus::Idle,
            outcome: RaceOutcome::Ongoing,
            latest: None,
            watchdog: None,
            throttle: SnapshotThrottle::default(),
            ticks: 0,
            tick_intervals: Vec::new(),
            last_arrival: None,
            fallbacks: 0,
        }
    }

    /// Replace the configuration. Refused while a run is in progress;
    /// clears any previous run's result.
    pub fn configure(&mut self, params: SimulationParams) -> SimResult<()> {
        if matches!(self.status, RunStatus::Running | RunStatus::Paused) {
            return Err(SimError::RunInProgress);
        }
        params.validate()?;
        self.status = if params.is_complete() {
            RunStatus::Ready
        } else {
            RunStatus::Idle
        };
        self.params = params;
        self.latest = None;
        self.outcome = RaceOutcome::Ongoing;
        Ok(())
    }

    /// Begin a fresh run on the preferred driver.
    pub fn start(&mut self) -> SimResult<()> {
        if matches!(self.status, RunStatus::Running | RunStatus::Paused) {
            return Err(SimError::RunInProgress);
        }
        let missing = self.params.missing_fields();
        if !missing.is_empty() {
            return Err(SimError::ConfigurationIncomplete {
                missing: missing.join(", "),
            });
        }

        let mut race = Race::new(self.params.clone())?;
        race.start()?;
        // Seed the handoff baseline before any tick exists.
        self.latest = Some(race.snapshot());
        self.ticks = 0;
        self.tick_intervals.clear();
        self.last_arrival = None;
        self.fallbacks = 0;

        let mut driver = self.acquire_driver();
        if driver.begin(race.clone()).is_err() {
            log::warn!("{} driver refused the race; running on the foreground driver", driver.name());
            driver.abandon();
            self.fallbacks += 1;
            driver = Box::new(ForegroundDriver::new());
            driver.begin(race)?;
        }

        self.watchdog = (driver.name() != ForegroundDriver::NAME)
            .then(|| Watchdog::new(Instant::now()));
        log::info!("race started on the {} driver", driver.name());
        self.driver = Some(driver);
        self.status = RunStatus::Running;
        self.outcome = RaceOutcome::Ongoing;
        self.throttle.reset();
        Ok(())
    }

    fn acquire_driver(&mut self) -> Box<dyn RaceDriver> {
        if let Some(driver) = self.pending_driver.take() {
            return driver;
        }
        if self.prefer_background {
            match BackgroundDriver::spawn() {
                Ok(driver) => return Box::new(driver),
                Err(err) => {
                    log::warn!("background driver unavailable ({err}); running on the foreground driver");
                    self.fallbacks += 1;
                }
            }
        }
        Box::new(ForegroundDriver::new())
    }

    /// Pump the active driver and return the newest snapshot, throttled for
    /// presentation. Also services the watchdog and run completion, so a
    /// host should call this regularly (roughly every frame) while running.
    ///
    /// A snapshot comes back at most every 100 ms, except that a run's
    /// terminal snapshot is always returned. `latest()` sees every tick
    /// regardless of the throttle.
    pub fn poll(&mut self) -> SimResult<Option<TickSnapshot>> {
        if !matches!(self.status, RunStatus::Running | RunStatus::Paused) {
            return Ok(None);
        }
        let Some(driver) = self.driver.as_mut() else {
            return Ok(None);
        };

        let mut raw = Vec::new();
        let pump_failed = driver.pump(&mut raw).is_err();

        let now = Instant::now();
        let newest = raw.last().copied();
        if let Some(newest) = newest {
            self.note_ticks(raw.len(), now);
            self.latest = Some(newest);
            if let Some(watchdog) = self.watchdog.as_mut() {
                watchdog.observe(now);
            }
        }

        // Anything pumped before the failure still counts toward `latest`,
        // so a handoff resumes from the freshest state the worker reported.
        if pump_failed {
            self.fail_over("worker thread terminated")?;
            return Ok(None);
        }
        if newest.is_none() && self.status == RunStatus::Running {
            let stalled = self.watchdog.as_ref().is_some_and(|w| w.expired(now));
            if stalled {
                self.fail_over("no ticks within the watchdog window")?;
                return Ok(None);
            }
        }

        let mut finished_now = false;
        if let Some(outcome) = self.driver.as_ref().map(|d| d.outcome()) {
            if outcome.is_terminal() {
                self.outcome = outcome;
                self.status = RunStatus::Finished;
                self.watchdog = None;
                finished_now = true;
                log::info!(
                    "race finished: {:?} at {:.3} s",
                    outcome,
                    self.latest.map(|s| s.sim_time).unwrap_or(0.0)
                );
            }
        }

        if let Some(snap) = newest {
            if finished_now || self.throttle.ready(now) {
                return Ok(Some(snap));
            }
        }
        Ok(None)
    }

    /// Abandon the current driver and continue the run inline from the last
    /// known snapshot. One-way for the rest of the run.
    fn fail_over(&mut self, reason: &str) -> SimResult<()> {
        let Some(mut old) = self.driver.take() else {
            return Err(SimError::DriverUnavailable("no driver to fail over from".into()));
        };
        log::warn!(
            "{} driver stalled ({reason}); continuing on the foreground driver",
            old.name()
        );
        old.abandon();

        let snapshot = self.latest.ok_or_else(|| {
            SimError::DriverUnavailable("no snapshot to resume the run from".into())
        })?;
        let race = Race::resume_from(self.params.clone(), &snapshot)?;
        let mut replacement = ForegroundDriver::new();
        replacement.begin(race)?;
        if self.status == RunStatus::Paused {
            replacement.pause();
        }
        self.driver = Some(Box::new(replacement));
        self.watchdog = None;
        self.fallbacks += 1;
        Ok(())
    }

    fn note_ticks(&mut self, count: usize, now: Instant) {
        self.ticks += count as u64;
        if let Some(prev) = self.last_arrival {
            let per_tick = now.duration_since(prev).as_secs_f32() * 1000.0 / count as f32;
            self.tick_intervals.push(per_tick);
            if self.tick_intervals.len() > Self::INTERVAL_WINDOW {
                self.tick_intervals.remove(0);
            }
        }
        self.last_arrival = Some(now);
    }

    /// Stop consuming wall time. Ignored unless running.
    pub fn pause(&mut self) {
        if self.status != RunStatus::Running {
            return;
        }
        if let Some(driver) = self.driver.as_mut() {
            driver.pause();
        }
        // A paused stream is legitimate silence.
        self.watchdog = None;
        self.status = RunStatus::Paused;
        log::info!(
            "race paused at {:.3} s",
            self.latest.map(|s| s.sim_time).unwrap_or(0.0)
        );
    }

    /// Continue after a pause. Ignored unless paused.
    pub fn resume(&mut self) {
        if self.status != RunStatus::Paused {
            return;
        }
        let mut armed = false;
        if let Some(driver) = self.driver.as_mut() {
            driver.resume();
            armed = driver.name() != ForegroundDriver::NAME;
        }
        self.watchdog = armed.then(|| Watchdog::new(Instant::now()));
        self.status = RunStatus::Running;
        log::info!("race resumed");
    }

    /// Tear the run down and return to `Ready` (or `Idle`), keeping the
    /// configuration.
    pub fn reset(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            let _ = driver.reclaim();
        }
        self.watchdog = None;
        self.throttle.reset();
        self.latest = None;
        self.outcome = RaceOutcome::Ongoing;
        self.ticks = 0;
        self.tick_intervals.clear();
        self.last_arrival = None;
        self.status = if self.params.is_complete() {
            RunStatus::Ready
        } else {
            RunStatus::Idle
        };
        log::info!("simulation reset");
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn outcome(&self) -> RaceOutcome {
        self.outcome
    }

    /// Newest snapshot seen this run, unthrottled.
    pub fn latest(&self) -> Option<TickSnapshot> {
        self.latest
    }

    /// Terminal result, once the run has finished.
    pub fn finish(&self) -> Option<RaceFinish> {
        if self.status != RunStatus::Finished {
            return None;
        }
        self.latest.map(|snapshot| RaceFinish {
            outcome: self.outcome,
            snapshot,
        })
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.as_ref().map(|d| d.name()).unwrap_or("idle")
    }

    pub fn stats(&self) -> RunnerStats {
        let mean = if self.tick_intervals.is_empty() {
            0.0
        } else {
            self.tick_intervals.iter().sum::<f32>() / self.tick_intervals.len() as f32
        };
        RunnerStats {
            status: self.status,
            driver: self.driver_name(),
            ticks: self.ticks,
            mean_tick_interval_ms: mean,
            fallbacks: self.fallbacks,
        }
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }
}

impl Default for SimulationRunner {
    fn default() -> Self {
        Self::new()
    }
}
