//! Vehicle - Per-vehicle parameters, kinematic state, and the stepper
//!
//! Each vehicle has fixed parameters (mass, friction, force profile) and a
//! kinematic state advanced one fixed timestep at a time. The stepper owns
//! the finish-line overshoot clamp.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::physics::force::ForceKind;

/// Configuration for a single vehicle. Fixed for the duration of a run;
/// editable only while the simulation is stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleParams {
    /// Vehicle mass (kg). Must be positive.
    pub mass: f64,
    /// Constant-magnitude kinetic friction opposing motion (N).
    pub friction: f64,
    /// Shape of the applied force over time.
    pub force_kind: ForceKind,
    /// Base applied force magnitude (N). `None` until the user picks one;
    /// a run cannot start while unset.
    pub base_force: Option<f64>,
    /// Starting position on the track (m).
    pub initial_position: f64,
    /// Starting velocity (m/s).
    pub initial_velocity: f64,
}

impl VehicleParams {
    /// Check for non-physical values. `label` names the vehicle in messages.
    pub fn validate(&self, label: &str) -> SimResult<()> {
        let bad = |what: &str| {
            Err(SimError::InvalidParameter(format!("{label}: {what}")))
        };
        if !self.mass.is_finite() || self.mass <= 0.0 {
            return bad("mass must be a positive finite number");
        }
        if !self.friction.is_finite() || self.friction < 0.0 {
            return bad("friction must be non-negative");
        }
        if let Some(force) = self.base_force {
            if !force.is_finite() || force < 0.0 {
                return bad("applied force must be non-negative");
            }
        }
        if !self.initial_position.is_finite() || self.initial_position < 0.0 {
            return bad("initial position must be non-negative");
        }
        if !self.initial_velocity.is_finite() || self.initial_velocity < 0.0 {
            return bad("initial velocity must be non-negative");
        }
        Ok(())
    }
}

impl Default for VehicleParams {
    fn default() -> Self {
        Self {
            mass: 1000.0,
            friction: 100.0,
            force_kind: ForceKind::Constant,
            base_force: None,
            initial_position: 0.0,
            initial_velocity: 0.0,
        }
    }
}

/// Complete kinematic state for a single vehicle.
///
/// `kinetic_energy` is never stored; it is derived from mass and velocity
/// on demand so the two can never disagree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleState {
    /// Configured parameters, fixed while a run is active.
    pub params: VehicleParams,
    /// Distance along the track (m). Non-decreasing while running.
    pub position: f64,
    /// Current velocity (m/s). Floored at zero; the vehicle never reverses.
    pub velocity: f64,
    /// Average acceleration over the last step (m/s^2). Report-only.
    pub acceleration: f64,
    /// Average net force over the last step (N). Report-only.
    pub net_force: f64,
    /// Cumulative work done by the net force (J).
    pub work: f64,
    /// Running maximum of post-step velocity (m/s).
    pub max_velocity: f64,
}

impl VehicleState {
    /// Create a vehicle at its configured starting state.
    pub fn new(params: VehicleParams) -> Self {
        let position = params.initial_position;
        let velocity = params.initial_velocity;
        Self {
            params,
            position,
            velocity,
            acceleration: 0.0,
            net_force: 0.0,
            work: 0.0,
            max_velocity: 0.0,
        }
    }

    /// Restore the configured starting state and zero the accumulators.
    pub fn reset(&mut self) {
        self.position = self.params.initial_position;
        self.velocity = self.params.initial_velocity;
        self.acceleration = 0.0;
        self.net_force = 0.0;
        self.work = 0.0;
        self.max_velocity = 0.0;
    }

    /// Rebuild a mid-run state from a reported snapshot (driver handoff).
    pub fn from_snapshot(params: VehicleParams, snap: &VehicleSnapshot) -> Self {
        Self {
            params,
            position: snap.position,
            velocity: snap.velocity,
            acceleration: snap.acceleration,
            net_force: snap.net_force,
            work: snap.work,
            max_velocity: snap.max_velocity,
        }
    }

    /// Kinetic energy (J), derived: `0.5 * m * v^2`.
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.params.mass * self.velocity * self.velocity
    }
}

/// Kinematic stepping logic: Heun (RK2) velocity update with trapezoidal
/// displacement and the finish-line overshoot clamp.
pub struct Stepper;

impl Stepper {
    /// Advance one vehicle by one fixed step starting at simulation time `t0`.
    ///
    /// When `finish_line` is set the displacement is clamped so the reported
    /// position never passes it; the clamped velocity is recomputed from
    /// `v^2 = v0^2 + 2*a*dx` with the averaged acceleration so the (v, x)
    /// pair stays kinematically consistent at the boundary.
    pub fn advance(state: &mut VehicleState, t0: f64, dt: f64, finish_line: Option<f64>) {
        debug_assert!(state.params.mass > 0.0, "mass validated before run start");

        let base = state.params.base_force.unwrap_or(0.0);
        let kind = state.params.force_kind;
        let friction = state.params.friction;
        let mass = state.params.mass;

        // Two force evaluations per step: start and end of the interval.
        let fnet1 = kind.applied(base, t0) - friction;
        let fnet2 = kind.applied(base, t0 + dt) - friction;
        let a1 = fnet1 / mass;
        let a2 = fnet2 / mass;
        let a_avg = 0.5 * (a1 + a2);

        // Average-acceleration velocity update, floored at zero: friction
        // cannot push the vehicle backwards in this model.
        let v0 = state.velocity;
        let mut v_new = (v0 + a_avg * dt).max(0.0);

        // Trapezoidal displacement.
        let mut dx = 0.5 * (v0 + v_new) * dt;

        // Finish-line clamp: pin the position at exactly the finish distance
        // and recompute the velocity for the clamped displacement.
        let mut crossed = None;
        if let Some(finish) = finish_line {
            let remaining = finish - state.position;
            if dx >= remaining {
                dx = remaining.max(0.0);
                v_new = (v0 * v0 + 2.0 * a_avg * dx).max(0.0).sqrt();
                crossed = Some(finish);
            }
        }

        let fnet_avg = 0.5 * (fnet1 + fnet2);
        match crossed {
            Some(finish) => state.position = finish,
            None => state.position += dx,
        }
        state.velocity = v_new;
        state.acceleration = a_avg;
        state.net_force = fnet_avg;
        state.work += fnet_avg * dx;
        if v_new > state.max_velocity {
            state.max_velocity = v_new;
        }
    }
}

/// Compact per-vehicle state for snapshots handed to the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub position: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub net_force: f64,
    pub kinetic_energy: f64,
    pub work: f64,
    pub max_velocity: f64,
}

impl From<&VehicleState> for VehicleSnapshot {
    fn from(state: &VehicleState) -> Self {
        Self {
            position: state.position,
            velocity: state.velocity,
            acceleration: state.acceleration,
            net_force: state.net_force,
            kinetic_energy: state.kinetic_energy(),
            work: state.work,
            max_velocity: state.max_velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_vehicle(mass: f64, force: f64, friction: f64) -> VehicleState {
        VehicleState::new(VehicleParams {
            mass,
            friction,
            force_kind: ForceKind::Constant,
            base_force: Some(force),
            ..VehicleParams::default()
        })
    }

    const DT: f64 = 1.0 / 60.0;

    #[test]
    fn constant_force_matches_uniform_acceleration() {
        // 1000 kg, 600 N applied, 100 N friction -> a = 0.5 m/s^2.
        let mut v = constant_vehicle(1000.0, 600.0, 100.0);
        let mut t = 0.0;
        for _ in 0..60 {
            Stepper::advance(&mut v, t, DT, None);
            t += DT;
        }
        // After 1 s: v = a*t = 0.5, x = 0.5*a*t^2 = 0.25. The trapezoidal
        // rule is exact for linear velocity, so only rounding error remains.
        assert!((v.velocity - 0.5).abs() < 1e-9, "velocity {}", v.velocity);
        assert!((v.position - 0.25).abs() < 1e-9, "position {}", v.position);
        assert!((v.acceleration - 0.5).abs() < 1e-12);
        assert!((v.net_force - 500.0).abs() < 1e-9);
    }

    #[test]
    fn velocity_floors_at_zero_under_strong_friction() {
        let mut v = constant_vehicle(100.0, 50.0, 500.0);
        v.velocity = 1.0;
        let mut t = 0.0;
        for _ in 0..120 {
            Stepper::advance(&mut v, t, DT, None);
            t += DT;
            assert!(v.velocity >= 0.0);
        }
        assert_eq!(v.velocity, 0.0);
    }

    #[test]
    fn position_is_monotonic() {
        let mut v = constant_vehicle(1000.0, 800.0, 100.0);
        let mut t = 0.0;
        let mut last = v.position;
        for _ in 0..600 {
            Stepper::advance(&mut v, t, DT, None);
            t += DT;
            assert!(v.position >= last);
            last = v.position;
        }
    }

    #[test]
    fn finish_clamp_pins_position_exactly() {
        let mut v = constant_vehicle(10.0, 500.0, 0.0);
        let finish = 3.0;
        let mut t = 0.0;
        for _ in 0..10_000 {
            Stepper::advance(&mut v, t, DT, Some(finish));
            t += DT;
            assert!(v.position <= finish);
            if v.position == finish {
                break;
            }
        }
        assert_eq!(v.position, finish);
        // Once pinned, further steps do not move it.
        Stepper::advance(&mut v, t, DT, Some(finish));
        assert_eq!(v.position, finish);
    }

    #[test]
    fn clamped_velocity_follows_kinematic_identity() {
        // One big step that overshoots: v' must satisfy v'^2 = v0^2 + 2*a*dx
        // for the clamped dx, not the velocity of the unclamped step.
        let mut v = constant_vehicle(1000.0, 600.0, 100.0);
        v.velocity = 10.0;
        let finish = v.position + 0.05; // well inside one step at 10 m/s
        Stepper::advance(&mut v, 0.0, DT, Some(finish));
        let expected = (10.0_f64 * 10.0 + 2.0 * 0.5 * 0.05).sqrt();
        assert!((v.velocity - expected).abs() < 1e-12);
        assert_eq!(v.position, finish);
    }

    #[test]
    fn work_accumulates_net_force_times_displacement() {
        let mut v = constant_vehicle(1000.0, 600.0, 100.0);
        Stepper::advance(&mut v, 0.0, DT, None);
        let dx = v.position;
        assert!((v.work - 500.0 * dx).abs() < 1e-12);
    }

    #[test]
    fn max_velocity_tracks_peak() {
        // Impulse profile rises then falls; the running max must hold the peak.
        let mut v = VehicleState::new(VehicleParams {
            mass: 100.0,
            friction: 80.0,
            force_kind: ForceKind::Impulse,
            base_force: Some(100.0),
            ..VehicleParams::default()
        });
        let mut t = 0.0;
        let mut peak = 0.0_f64;
        for _ in 0..600 {
            Stepper::advance(&mut v, t, DT, None);
            t += DT;
            peak = peak.max(v.velocity);
        }
        assert_eq!(v.max_velocity, peak);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut v = VehicleState::new(VehicleParams {
            initial_position: 5.0,
            initial_velocity: 2.0,
            base_force: Some(300.0),
            ..VehicleParams::default()
        });
        let mut t = 0.0;
        for _ in 0..100 {
            Stepper::advance(&mut v, t, DT, None);
            t += DT;
        }
        v.reset();
        assert_eq!(v.position, 5.0);
        assert_eq!(v.velocity, 2.0);
        assert_eq!(v.work, 0.0);
        assert_eq!(v.max_velocity, 0.0);
        assert_eq!(v.acceleration, 0.0);
        assert_eq!(v.net_force, 0.0);
    }

    #[test]
    fn validate_rejects_non_physical_params() {
        let mut p = VehicleParams::default();
        p.mass = 0.0;
        assert!(p.validate("vehicle 1").is_err());
        p.mass = -10.0;
        assert!(p.validate("vehicle 1").is_err());
        p.mass = f64::NAN;
        assert!(p.validate("vehicle 1").is_err());
        p.mass = 1000.0;
        p.friction = -1.0;
        assert!(p.validate("vehicle 1").is_err());
        p.friction = 0.0;
        p.base_force = Some(-5.0);
        assert!(p.validate("vehicle 1").is_err());
        p.base_force = None;
        assert!(p.validate("vehicle 1").is_ok());
    }
}
