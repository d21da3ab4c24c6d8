//! Force profiles - Time-varying applied force
//!
//! Maps a base force magnitude and an elapsed simulation time to the
//! instantaneous applied force. Pure functions with no state; negative
//! times are accepted and evaluate the same formulas.

use serde::{Deserialize, Serialize};

/// How a vehicle's applied force varies over the course of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForceKind {
    /// Base magnitude, unchanged for the whole run.
    Constant,
    /// Grows linearly, +10% of the base per second, unbounded.
    Increasing,
    /// Decays linearly, -5% of the base per second, held at a 30% floor.
    Decreasing,
    /// Alternates between 150% and 50% of the base on a sine gate.
    Impulse,
}

impl ForceKind {
    const GROWTH_PER_SECOND: f64 = 0.1;
    const DECAY_PER_SECOND: f64 = 0.05;
    const DECAY_FLOOR: f64 = 0.3;
    const IMPULSE_HIGH: f64 = 1.5;
    const IMPULSE_LOW: f64 = 0.5;
    const IMPULSE_RATE: f64 = 2.0;
    const IMPULSE_GATE: f64 = 0.5;

    /// Instantaneous applied force for a base magnitude at time `t`.
    pub fn applied(&self, base: f64, t: f64) -> f64 {
        match self {
            ForceKind::Constant => base,
            ForceKind::Increasing => base * (1.0 + Self::GROWTH_PER_SECOND * t),
            ForceKind::Decreasing => {
                base * (1.0 - Self::DECAY_PER_SECOND * t).max(Self::DECAY_FLOOR)
            }
            ForceKind::Impulse => {
                if (Self::IMPULSE_RATE * t).sin() > Self::IMPULSE_GATE {
                    base * Self::IMPULSE_HIGH
                } else {
                    base * Self::IMPULSE_LOW
                }
            }
        }
    }
}

impl Default for ForceKind {
    fn default() -> Self {
        ForceKind::Constant
    }
}
