//! Fixed-step accumulator. Wall-clock frames of any length are converted
//! into a whole number of physics steps of exactly `FIXED_DT` seconds, with
//! the fractional remainder carried into the next frame.

use std::time::Duration;

/// Converts elapsed wall time into due fixed steps.
///
/// Two guards keep a stalled or late caller from wedging the simulation:
/// a single frame is clamped to `MAX_FRAME_SECONDS` before it enters the
/// accumulator, and one pump drains at most `MAX_STEPS_PER_PUMP` steps.
/// Leftover time stays banked, so a late caller catches up over the next
/// few pumps instead of all at once.
#[derive(Debug, Clone, Default)]
pub struct StepClock {
    accumulator: f64,
}

impl StepClock {
    /// Physics step size (s). Sixty steps advance the clock exactly 1 s.
    pub const FIXED_DT: f64 = 1.0 / 60.0;
    /// Largest frame admitted into the accumulator (s).
    pub const MAX_FRAME_SECONDS: f64 = 0.25;
    /// Most steps drained per pump.
    pub const MAX_STEPS_PER_PUMP: u32 = 4;

    pub fn new() -> Self {
        Self::default()
    }

    /// Bank `elapsed` and return how many fixed steps are now due, capped
    /// at `MAX_STEPS_PER_PUMP`. The remainder stays in the accumulator.
    pub fn due_steps(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed.as_secs_f64().min(Self::MAX_FRAME_SECONDS);
        let mut steps = 0;
        while self.accumulator >= Self::FIXED_DT && steps < Self::MAX_STEPS_PER_PUMP {
            self.accumulator -= Self::FIXED_DT;
            steps += 1;
        }
        steps
    }

    /// Wall time until the next step falls due, assuming no further input.
    /// Zero when backlogged. Used to size blocking waits in driver loops.
    pub fn time_to_next_step(&self) -> Duration {
        if self.accumulator >= Self::FIXED_DT {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(Self::FIXED_DT - self.accumulator)
        }
    }

    /// Drop any banked time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
