use rand::Rng;

use racesim::{
    ForceKind, Race, RaceConfig, RaceOutcome, SimulationParams, StepClock, TickSnapshot,
    TimeLimit, VehicleParams,
};

const DT: f64 = StepClock::FIXED_DT;

/// Build params for two constant-force vehicles on the same track.
pub fn two_vehicle_params(force1: f64, force2: f64, distance: f64) -> SimulationParams {
    SimulationParams {
        vehicle1: VehicleParams {
            base_force: Some(force1),
            ..VehicleParams::default()
        },
        vehicle2: VehicleParams {
            base_force: Some(force2),
            ..VehicleParams::default()
        },
        race: RaceConfig {
            distance: Some(distance),
            time_limit: Some(TimeLimit::Unlimited),
        },
    }
}

/// Build and start a race, panicking on configuration errors.
pub fn started_race(params: SimulationParams) -> Race {
    let mut race = Race::new(params).expect("valid params");
    race.start().expect("complete params");
    race
}

/// Advance until the race reports a terminal outcome, collecting snapshots.
pub fn run_to_finish(race: &mut Race) -> Vec<TickSnapshot> {
    let mut history = Vec::new();
    for _ in 0..10_000_000 {
        match race.advance(DT) {
            Some(snap) => history.push(snap),
            None => break,
        }
        if race.finished() {
            break;
        }
    }
    history
}

// ==================================================================================
// Kinematics
// ==================================================================================

#[test]
fn canonical_step_numbers() {
    // 1000 kg, 600 N applied, 100 N friction: a = 0.5 m/s^2 independent of
    // time, so one simulated second lands on v = 0.5 and x = 0.25 exactly
    // up to accumulation error.
    let mut race = started_race(two_vehicle_params(600.0, 600.0, 1.0e9));
    for _ in 0..60 {
        race.advance(DT);
    }
    let snap = race.snapshot();
    assert!((snap.sim_time - 1.0).abs() < 1e-9, "t = {}", snap.sim_time);
    assert!(
        (snap.vehicle1.velocity - 0.5).abs() < 1e-9,
        "v = {}",
        snap.vehicle1.velocity
    );
    assert!(
        (snap.vehicle1.position - 0.25).abs() < 1e-9,
        "x = {}",
        snap.vehicle1.position
    );
    assert!((snap.vehicle1.net_force - 500.0).abs() < 1e-9);
}

#[test]
fn decreasing_profile_has_a_hard_floor() {
    // 1000 N base decays 5% per second but never below 30% of base.
    assert_eq!(ForceKind::Decreasing.applied(1000.0, 100.0), 300.0);
    assert_eq!(ForceKind::Decreasing.applied(1000.0, 14.0), 300.0);
    assert!(ForceKind::Decreasing.applied(1000.0, 13.0) > 300.0);
}

#[test]
fn runs_are_deterministic() {
    let first = run_to_finish(&mut started_race(two_vehicle_params(640.0, 610.0, 80.0)));
    let second = run_to_finish(&mut started_race(two_vehicle_params(640.0, 610.0, 80.0)));
    assert_eq!(first.len(), second.len());
    assert_eq!(first, second);
}

#[test]
fn work_matches_kinetic_energy_for_every_profile() {
    for kind in [
        ForceKind::Constant,
        ForceKind::Increasing,
        ForceKind::Decreasing,
        ForceKind::Impulse,
    ] {
        let mut params = two_vehicle_params(600.0, 600.0, 1.0e9);
        params.vehicle1.force_kind = kind;
        params.vehicle2.force_kind = kind;
        let mut race = started_race(params);
        for _ in 0..3000 {
            race.advance(DT);
        }
        let snap = race.snapshot();
        let scale = snap.vehicle1.work.abs().max(1.0);
        assert!(
            (snap.vehicle1.work - snap.vehicle1.kinetic_energy).abs() < 1e-6 * scale,
            "{kind:?}: work {} vs KE {}",
            snap.vehicle1.work,
            snap.vehicle1.kinetic_energy
        );
    }
}

// ==================================================================================
// Finish line
// ==================================================================================

#[test]
fn finish_position_is_exact_and_velocity_is_consistent() {
    let distance = 30.0;
    let mut race = started_race(two_vehicle_params(600.0, 500.0, distance));
    let history = run_to_finish(&mut race);

    let last = history.last().expect("race produced ticks");
    assert_eq!(race.outcome, RaceOutcome::Vehicle1Wins);
    assert_eq!(last.vehicle1.position, distance);
    assert!(last.vehicle1.position >= last.vehicle2.position);

    // The crossing step's velocity obeys v^2 = v0^2 + 2*a*dx with the
    // step's averaged acceleration and the clamped displacement.
    let prev = &history[history.len() - 2].vehicle1;
    let cross = &last.vehicle1;
    let expected_sq = prev.velocity * prev.velocity
        + 2.0 * cross.acceleration * (distance - prev.position);
    assert!(
        (cross.velocity * cross.velocity - expected_sq).abs() < 1e-9,
        "v^2 {} vs expected {}",
        cross.velocity * cross.velocity,
        expected_sq
    );
}

#[test]
fn position_never_exceeds_the_finish_line() {
    let distance = 12.0;
    let mut race = started_race(two_vehicle_params(900.0, 850.0, distance));
    for snap in run_to_finish(&mut race) {
        assert!(snap.vehicle1.position <= distance);
        assert!(snap.vehicle2.position <= distance);
    }
}

#[test]
fn growing_force_overtakes_equal_constant_force() {
    let mut params = two_vehicle_params(500.0, 500.0, 60.0);
    params.vehicle1.force_kind = ForceKind::Increasing;
    let mut race = started_race(params);
    run_to_finish(&mut race);
    assert_eq!(race.outcome, RaceOutcome::Vehicle1Wins);
}

#[test]
fn time_limit_lands_within_one_step() {
    let mut params = two_vehicle_params(200.0, 180.0, 1.0e9);
    params.race.time_limit = Some(TimeLimit::Finite(2.0));
    let mut race = started_race(params);
    run_to_finish(&mut race);
    assert_eq!(race.outcome, RaceOutcome::TimeExpired);
    assert!(race.sim_time >= 2.0 - 1e-9);
    assert!(race.sim_time <= 2.0 + DT + 1e-9);
}

// ==================================================================================
// Sampled parameters
// ==================================================================================

#[test]
fn sampled_parameters_hold_the_core_invariants() {
    // Forces at least 500 N against at most 140 N of friction keep the net
    // force positive through every profile (the decreasing floor is 30% of
    // base), so each sampled race must reach a terminal outcome.
    let kinds = [
        ForceKind::Constant,
        ForceKind::Increasing,
        ForceKind::Decreasing,
        ForceKind::Impulse,
    ];
    let mut rng = rand::thread_rng();

    for _ in 0..25 {
        let distance = rng.gen_range(5.0..60.0);
        let mut params = two_vehicle_params(
            rng.gen_range(500.0..1500.0),
            rng.gen_range(500.0..1500.0),
            distance,
        );
        for vehicle in [&mut params.vehicle1, &mut params.vehicle2] {
            vehicle.mass = rng.gen_range(250.0..3000.0);
            vehicle.friction = rng.gen_range(0.0..140.0);
            vehicle.force_kind = kinds[rng.gen_range(0..kinds.len())];
            vehicle.initial_velocity = rng.gen_range(0.0..3.0);
        }

        let mut race = started_race(params.clone());
        let history = run_to_finish(&mut race);
        assert!(
            race.outcome.is_terminal(),
            "no terminal outcome for {params:?}"
        );

        let mut prev: Option<&TickSnapshot> = None;
        for snap in &history {
            for vehicle in [&snap.vehicle1, &snap.vehicle2] {
                assert!(vehicle.velocity >= 0.0, "{params:?}");
                assert!(vehicle.position <= distance, "{params:?}");
                assert!(vehicle.max_velocity >= vehicle.velocity, "{params:?}");
            }
            if let Some(prev) = prev {
                assert!(snap.sim_time > prev.sim_time, "{params:?}");
                assert!(snap.vehicle1.position >= prev.vehicle1.position, "{params:?}");
                assert!(snap.vehicle2.position >= prev.vehicle2.position, "{params:?}");
            }
            prev = Some(snap);
        }

        let last = history.last().expect("race produced ticks");
        match race.outcome {
            RaceOutcome::Vehicle1Wins => assert_eq!(last.vehicle1.position, distance),
            RaceOutcome::Vehicle2Wins => assert_eq!(last.vehicle2.position, distance),
            RaceOutcome::Tie => {
                assert_eq!(last.vehicle1.position, distance);
                assert_eq!(last.vehicle2.position, distance);
            }
            other => panic!("unexpected outcome {other:?} for {params:?}"),
        }
    }
}

// ==================================================================================
// Serialization
// ==================================================================================

#[test]
fn params_survive_a_json_round_trip() {
    let mut params = two_vehicle_params(640.0, 555.0, 120.0);
    params.vehicle2.force_kind = ForceKind::Impulse;
    params.race.time_limit = Some(TimeLimit::Finite(45.0));

    let json = serde_json::to_string(&params).unwrap();
    assert!(json.contains("\"impulse\""), "{json}");
    assert!(json.contains("\"finite\""), "{json}");

    let back: SimulationParams = serde_json::from_str(&json).unwrap();
    assert_eq!(back, params);
}

#[test]
fn snapshots_serialize_for_streaming() {
    let mut race = started_race(two_vehicle_params(600.0, 500.0, 1.0e9));
    let snap = race.advance(DT).unwrap();
    let json = serde_json::to_string(&snap).unwrap();
    let back: TickSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snap);
}
