//! Background driver: a dedicated worker thread that advances the race on
//! its own clock and streams flat tick records back over a channel.
//!
//! The protocol is strict request/response plus one streaming direction:
//! commands flow host to worker, records and lifecycle events flow worker to
//! host, and consumed records are returned for reuse. The worker owns the
//! `Race` outright between `Begin` and `Reclaim`.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::{SimError, SimResult};
use crate::physics::race::{Race, RaceOutcome};
use crate::physics::TickSnapshot;
use crate::runtime::clock::StepClock;
use crate::runtime::driver::RaceDriver;
use crate::runtime::record::{RecordPool, TickRecord};

/// Host-to-worker messages.
#[derive(Debug)]
enum DriverCommand {
    Begin(Box<Race>),
    Pause,
    Resume,
    Reclaim,
    /// A consumed record coming back for the pool.
    Return(TickRecord),
    Shutdown,
}

/// Worker-to-host messages.
#[derive(Debug)]
enum DriverEvent {
    /// Sent once, before the worker enters its loop.
    Ready,
    Tick(TickRecord),
    Finished(RaceOutcome),
    Reclaimed(Box<Race>),
}

/// Advances the race on a named worker thread.
///
/// If the worker stops responding the host side never blocks on it: a
/// `reclaim` that misses its grace window marks the driver stalled, and a
/// stalled driver is abandoned on drop instead of joined.
pub struct BackgroundDriver {
    command_tx: Sender<DriverCommand>,
    event_rx: Receiver<DriverEvent>,
    handle: Option<JoinHandle<()>>,
    cached_outcome: RaceOutcome,
    stalled: bool,
}

impl BackgroundDriver {
    /// Driver identifier used in logs and stats.
    pub const NAME: &'static str = "background";
    /// Worker thread name, visible in debuggers and panic messages.
    pub const THREAD_NAME: &'static str = "race-driver";
    /// How long `spawn` waits for the worker's ready handshake.
    pub const READY_TIMEOUT: Duration = Duration::from_millis(500);
    /// How long `reclaim` waits before declaring the worker stalled.
    pub const RECLAIM_GRACE: Duration = Duration::from_millis(250);

    /// Spawn the worker thread and wait for its ready handshake.
    pub fn spawn() -> SimResult<Self> {
        let (command_tx, command_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name(Self::THREAD_NAME.into())
            .spawn(move || Worker::new(command_rx, event_tx).run())
            .map_err(|err| {
                SimError::DriverUnavailable(format!("could not spawn worker thread: {err}"))
            })?;

        match event_rx.recv_timeout(Self::READY_TIMEOUT) {
            Ok(DriverEvent::Ready) => Ok(Self {
                command_tx,
                event_rx,
                handle: Some(handle),
                cached_outcome: RaceOutcome::Ongoing,
                stalled: false,
            }),
            Ok(_) | Err(_) => Err(SimError::DriverUnavailable(
                "worker thread never reported ready".into(),
            )),
        }
    }

    fn send(&self, command: DriverCommand) -> SimResult<()> {
        self.command_tx
            .send(command)
            .map_err(|_| SimError::DriverUnavailable("worker thread is gone".into()))
    }
}

impl RaceDriver for BackgroundDriver {
    fn begin(&mut self, race: Race) -> SimResult<()> {
        self.cached_outcome = RaceOutcome::Ongoing;
        self.send(DriverCommand::Begin(Box::new(race)))
    }

    fn pump(&mut self, out: &mut Vec<TickSnapshot>) -> SimResult<()> {
        loop {
            match self.event_rx.try_recv() {
                Ok(DriverEvent::Tick(record)) => {
                    out.push(record.decode());
                    // Recycle; if the worker is gone the next pump reports it.
                    let _ = self.command_tx.send(DriverCommand::Return(record));
                }
                Ok(DriverEvent::Finished(outcome)) => {
                    self.cached_outcome = outcome;
                }
                Ok(DriverEvent::Ready) | Ok(DriverEvent::Reclaimed(_)) => {}
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => {
                    self.stalled = true;
                    return Err(SimError::DriverUnavailable(
                        "worker thread terminated unexpectedly".into(),
                    ));
                }
            }
        }
    }

    fn pause(&mut self) {
        let _ = self.command_tx.send(DriverCommand::Pause);
    }

    fn resume(&mut self) {
        let _ = self.command_tx.send(DriverCommand::Resume);
    }

    fn reclaim(&mut self) -> Option<Race> {
        if self.stalled || self.send(DriverCommand::Reclaim).is_err() {
            return None;
        }
        let deadline = Instant::now() + Self::RECLAIM_GRACE;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.event_rx.recv_timeout(remaining) {
                Ok(DriverEvent::Reclaimed(race)) => return Some(*race),
                Ok(DriverEvent::Finished(outcome)) => self.cached_outcome = outcome,
                // In-flight records ahead of the reclaim are superseded by
                // the race state itself; send them straight back.
                Ok(DriverEvent::Tick(record)) => {
                    let _ = self.command_tx.send(DriverCommand::Return(record));
                }
                Ok(DriverEvent::Ready) => {}
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    log::warn!(
                        "background driver did not return the race within {:?}; treating it as stalled",
                        Self::RECLAIM_GRACE
                    );
                    self.stalled = true;
                    return None;
                }
            }
        }
    }

    fn abandon(&mut self) {
        self.stalled = true;
    }

    fn outcome(&self) -> RaceOutcome {
        self.cached_outcome
    }

    fn name(&self) -> &'static str {
        Self::NAME
    }
}

impl Drop for BackgroundDriver {
    fn drop(&mut self) {
        let _ = self.command_tx.send(DriverCommand::Shutdown);
        if self.stalled {
            // A wedged worker would block the join forever. Leave it to the
            // process; it exits on its own if it ever wakes up.
            return;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Worker-thread state. Lives entirely on the spawned thread.
struct Worker {
    command_rx: Receiver<DriverCommand>,
    event_tx: Sender<DriverEvent>,
    race: Option<Race>,
    clock: StepClock,
    pool: RecordPool,
    active: bool,
    last_wake: Instant,
}

impl Worker {
    fn new(command_rx: Receiver<DriverCommand>, event_tx: Sender<DriverEvent>) -> Self {
        Self {
            command_rx,
            event_tx,
            race: None,
            clock: StepClock::new(),
            pool: RecordPool::new(),
            active: false,
            last_wake: Instant::now(),
        }
    }

    fn run(mut self) {
        if self.event_tx.send(DriverEvent::Ready).is_err() {
            return;
        }
        log::debug!("race worker thread up");
        loop {
            if self.active {
                if !self.run_due_steps() {
                    break;
                }
                match self.command_rx.recv_timeout(self.clock.time_to_next_step()) {
                    Ok(command) => {
                        if !self.handle(command) {
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            } else {
                match self.command_rx.recv() {
                    Ok(command) => {
                        if !self.handle(command) {
                            break;
                        }
                    }
                    Err(_) => break,
                }
            }
        }
        log::debug!("race worker thread down");
    }

    /// Returns false when the host has gone away.
    fn run_due_steps(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_wake);
        self.last_wake = now;

        let due = self.clock.due_steps(elapsed);
        let Some(race) = self.race.as_mut() else {
            return true;
        };
        for _ in 0..due {
            let Some(snap) = race.advance(StepClock::FIXED_DT) else {
                break;
            };
            let mut record = self.pool.acquire();
            record.encode(&snap);
            if self.event_tx.send(DriverEvent::Tick(record)).is_err() {
                return false;
            }
            if race.finished() {
                let outcome = race.outcome;
                self.active = false;
                return self.event_tx.send(DriverEvent::Finished(outcome)).is_ok();
            }
        }
        true
    }

    /// Returns false on shutdown.
    fn handle(&mut self, command: DriverCommand) -> bool {
        match command {
            DriverCommand::Begin(race) => {
                self.race = Some(*race);
                self.clock.reset();
                self.last_wake = Instant::now();
                self.active = true;
            }
            DriverCommand::Pause => {
                self.active = false;
            }
            DriverCommand::Resume => {
                if self.race.is_some() {
                    // Anchor past the paused span so it is not owed.
                    self.last_wake = Instant::now();
                    self.active = true;
                }
            }
            DriverCommand::Reclaim => {
                self.active = false;
                if let Some(race) = self.race.take() {
                    return self
                        .event_tx
                        .send(DriverEvent::Reclaimed(Box::new(race)))
                        .is_ok();
                }
            }
            DriverCommand::Return(record) => {
                self.pool.release(record);
            }
            DriverCommand::Shutdown => return false,
        }
        true
    }
}
