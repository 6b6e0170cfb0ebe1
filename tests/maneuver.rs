//! Maneuver controller behaviour on scripted sensor snapshots.

use autopark::maneuver::{
    ControlOutput, ManeuverConfig, ManeuverController, ManeuverStatus, Phase, SensorLayout,
    SensorSnapshot,
};
use autopark::{Error, MoveCommand, SensorId, Side, SpaceKind, TurnCommand};
use std::time::{Duration, Instant};

const TICK: Duration = Duration::from_millis(50);

fn config() -> ManeuverConfig {
    ManeuverConfig {
        parking_distance_min: 30.0,
        parking_distance_max: 100.0,
        apa_tolerance: 5.0,
        speed_parking_forward: 30.0,
        speed_parking_backward: -30.0,
        move_distance_perpendicular: 150.0,
        parallel_length: 200.0,
        timeout: Duration::from_secs(60),
    }
}

/// Drives a controller through simulated time
struct Sim {
    ctl: ManeuverController,
    now: Instant,
}

impl Sim {
    fn new(config: ManeuverConfig) -> Self {
        Self {
            ctl: ManeuverController::new(config),
            now: Instant::now(),
        }
    }

    fn start(&mut self, kind: SpaceKind, side: Side) -> ControlOutput {
        self.ctl.start(kind, side, self.now).unwrap()
    }

    fn tick(&mut self, snapshot: SensorSnapshot) -> ControlOutput {
        self.now += TICK;
        self.ctl.tick(self.now, &snapshot).unwrap()
    }

    fn wait(&mut self, duration: Duration) {
        self.now += duration;
    }

    /// Bring a fresh maneuver into the correction phase
    fn into_correcting(&mut self, kind: SpaceKind, side: Side) {
        self.start(kind, side);
        let layout = SensorLayout::new(kind, side);

        if kind == SpaceKind::Perpendicular {
            self.wait(Duration::from_secs(10));
            let out = self.tick(SensorSnapshot::clear().with_speed(30.0));
            assert_eq!(out.status, ManeuverStatus::Active(Phase::Aligning));
            let out = self.tick(
                SensorSnapshot::clear()
                    .with(layout.side_rear, 90.0)
                    .with(layout.opposite_rear, 90.0)
                    .with_speed(-30.0),
            );
            assert_eq!(out.status, ManeuverStatus::Active(Phase::Correcting));
        } else {
            let out = self.tick(
                SensorSnapshot::clear()
                    .with(layout.rear_centre, 80.0)
                    .with_speed(-30.0),
            );
            assert_eq!(out.status, ManeuverStatus::Active(Phase::Correcting));
        }
    }
}

fn mirror_sensor(id: SensorId) -> SensorId {
    use SensorId::*;
    match id {
        ApaLf => ApaRf,
        ApaLb => ApaRb,
        ApaLb2 => ApaRb2,
        ApaRf => ApaLf,
        ApaRb => ApaLb,
        ApaRb2 => ApaLb2,
        UpaFl => UpaFr,
        UpaFcl => UpaFcr,
        UpaFcr => UpaFcl,
        UpaFr => UpaFl,
        UpaBl => UpaBr,
        UpaBcl => UpaBcr,
        UpaBcr => UpaBcl,
        UpaBr => UpaBl,
    }
}

fn mirror_turn(turn: TurnCommand) -> TurnCommand {
    match turn {
        TurnCommand::FullLeft => TurnCommand::FullRight,
        TurnCommand::SlightLeft => TurnCommand::SlightRight,
        TurnCommand::Straight => TurnCommand::Straight,
        TurnCommand::SlightRight => TurnCommand::SlightLeft,
        TurnCommand::FullRight => TurnCommand::FullLeft,
    }
}

fn mirror_snapshot(snapshot: &SensorSnapshot) -> SensorSnapshot {
    let mut mirrored = SensorSnapshot::clear().with_speed(snapshot.speed);
    for id in SensorId::ALL {
        mirrored.set(mirror_sensor(id), snapshot.get(id));
    }
    mirrored
}

#[test]
fn test_rear_centre_contact_finishes_perpendicular() {
    let mut sim = Sim::new(ManeuverConfig {
        parking_distance_min: 85.0,
        parking_distance_max: 150.0,
        ..config()
    });
    sim.into_correcting(SpaceKind::Perpendicular, Side::Right);

    let out = sim.tick(
        SensorSnapshot::clear()
            .with(SensorId::ApaLb, 100.0)
            .with(SensorId::ApaRb, 100.0)
            .with(SensorId::ApaRb2, 100.0)
            .with(SensorId::UpaBcl, 80.0)
            .with(SensorId::UpaBcr, 90.0)
            .with_speed(-30.0),
    );

    assert_eq!(out.throttle(), Some(MoveCommand::STOP));
    assert_eq!(out.status, ManeuverStatus::Finished);
    assert_eq!(sim.ctl.phase(), Some(Phase::Finished));
}

#[test]
fn test_deadline_reports_timeout_and_keeps_phase() {
    let mut sim = Sim::new(ManeuverConfig {
        timeout: Duration::from_secs(30),
        ..config()
    });
    sim.into_correcting(SpaceKind::Perpendicular, Side::Right);

    let holding = SensorSnapshot::clear()
        .with(SensorId::ApaRb, 60.0)
        .with(SensorId::ApaRb2, 60.0)
        .with_speed(-30.0);
    let out = sim.tick(holding);
    assert_eq!(out.status, ManeuverStatus::Active(Phase::Correcting));

    sim.wait(Duration::from_secs(30));
    let out = sim.tick(holding);
    assert_eq!(out.status, ManeuverStatus::TimedOut(Phase::Correcting));
    assert_eq!(sim.ctl.phase(), Some(Phase::Correcting));

    // Control continues after the deadline
    let out = sim.tick(holding);
    assert_eq!(out.status, ManeuverStatus::TimedOut(Phase::Correcting));
    assert_eq!(out.throttle(), Some(MoveCommand(-30.0)));

    assert_eq!(
        sim.ctl.acknowledge().unwrap(),
        ManeuverStatus::TimedOut(Phase::Correcting)
    );
    assert!(sim.ctl.status().is_none());
}

#[test]
fn test_phases_only_move_forward() {
    let mut sim = Sim::new(config());
    sim.start(SpaceKind::Perpendicular, Side::Right);

    let mut script = Vec::new();
    // Approach: 30 cm/s, 150 cm
    script.extend(std::iter::repeat_n(SensorSnapshot::clear().with_speed(30.0), 120));
    // Reverse toward the slot
    script.extend(std::iter::repeat_n(SensorSnapshot::clear().with_speed(-30.0), 20));
    let inside = SensorSnapshot::clear()
        .with(SensorId::ApaRb, 80.0)
        .with(SensorId::ApaRb2, 95.0)
        .with(SensorId::ApaLb, 85.0)
        .with_speed(-30.0);
    script.extend(std::iter::repeat_n(inside, 10));
    let straight = inside.with(SensorId::ApaRb2, 82.0);
    script.extend(std::iter::repeat_n(straight, 10));
    script.push(straight.with(SensorId::UpaBcl, 20.0));
    script.extend(std::iter::repeat_n(straight.with_speed(0.0), 5));

    let mut phases = vec![sim.ctl.phase().unwrap()];
    for snapshot in script {
        sim.tick(snapshot);
        phases.push(sim.ctl.phase().unwrap());
    }

    assert!(phases.windows(2).all(|w| w[0] <= w[1]), "{phases:?}");
    for phase in [
        Phase::Approaching,
        Phase::Aligning,
        Phase::Correcting,
        Phase::Finished,
    ] {
        assert!(phases.contains(&phase), "{phase:?} never reached");
    }
    assert_eq!(sim.ctl.status(), Some(ManeuverStatus::Finished));
}

#[test]
fn test_finished_maneuver_holds_stop() {
    let mut sim = Sim::new(config());
    sim.into_correcting(SpaceKind::Parallel, Side::Left);

    let done = SensorSnapshot::clear()
        .with(SensorId::ApaLb, 40.0)
        .with(SensorId::ApaLb2, 42.0)
        .with(SensorId::UpaFcr, 20.0)
        .with_speed(30.0);
    let out = sim.tick(done);
    assert_eq!(out.status, ManeuverStatus::Finished);

    let out = sim.tick(done.with_speed(0.0));
    assert_eq!(out.status, ManeuverStatus::Finished);
    assert_eq!(out.throttle(), Some(MoveCommand::STOP));
    assert_eq!(out.commands.len(), 2);
}

#[test]
fn test_guarded_sensors_never_closed_in_on() {
    let min = config().parking_distance_min;
    let rear_pairs = [(50.0, 50.0), (80.0, 50.0), (50.0, 80.0)];

    for kind in [SpaceKind::Perpendicular, SpaceKind::Parallel] {
        for side in [Side::Left, Side::Right] {
            let layout = SensorLayout::new(kind, side);
            let guarded = layout
                .forward_guard()
                .into_iter()
                .map(|id| (id, true))
                .chain(layout.reverse_guard().into_iter().map(|id| (id, false)));

            for (sensor, in_front) in guarded {
                for (rear, rear2) in rear_pairs {
                    for speed in [-30.0, 0.0, 30.0] {
                        let mut sim = Sim::new(config());
                        sim.into_correcting(kind, side);

                        let snapshot = SensorSnapshot::clear()
                            .with(layout.side_rear, rear)
                            .with(layout.side_rear2, rear2)
                            .with(sensor, min - 10.0)
                            .with_speed(speed);
                        // Two ticks: the second starts from the first tick's commands
                        for _ in 0..2 {
                            let out = sim.tick(snapshot);
                            let throttle = out.throttle().unwrap();
                            let closing = if in_front {
                                throttle.is_forward()
                            } else {
                                throttle.is_reverse()
                            };
                            assert!(
                                !closing,
                                "{kind:?}/{side:?}: {sensor} at {} with throttle {:?} \
                                 (rear {rear}/{rear2}, speed {speed})",
                                min - 10.0,
                                throttle
                            );
                        }
                    }
                }
            }
        }
    }
}

#[test]
fn test_side_rear_interlock_drives_forward_when_reversing() {
    let mut sim = Sim::new(config());
    sim.into_correcting(SpaceKind::Perpendicular, Side::Left);

    let out = sim.tick(
        SensorSnapshot::clear()
            .with(SensorId::ApaLb, 20.0)
            .with(SensorId::ApaLb2, 60.0)
            .with_speed(-30.0),
    );

    let moves: Vec<_> = out
        .commands
        .iter()
        .filter_map(|c| match c {
            autopark::ActuationCommand::Move(m) => Some(*m),
            autopark::ActuationCommand::Turn(_) => None,
        })
        .collect();
    assert!(moves.contains(&MoveCommand::STOP));
    assert_eq!(out.throttle(), Some(MoveCommand(30.0)));
    assert_eq!(out.turn(), Some(TurnCommand::FullLeft));
}

#[test]
fn test_blocked_recovery_resumes_once_clear() {
    let mut sim = Sim::new(config());
    sim.into_correcting(SpaceKind::Perpendicular, Side::Right);

    // Side rear too close while reversing: recovery wants forward, front is blocked
    let out = sim.tick(
        SensorSnapshot::clear()
            .with(SensorId::ApaRb, 20.0)
            .with(SensorId::ApaRb2, 60.0)
            .with(SensorId::ApaRf, 20.0)
            .with_speed(-30.0),
    );
    assert_eq!(out.throttle(), Some(MoveCommand::STOP));
    assert_eq!(out.turn(), Some(TurnCommand::FullRight));

    // Obstacles gone, vehicle standing still
    let clear = SensorSnapshot::clear()
        .with(SensorId::ApaRb, 50.0)
        .with(SensorId::ApaRb2, 80.0);
    for _ in 0..5 {
        let out = sim.tick(clear);
        assert_eq!(out.status, ManeuverStatus::Active(Phase::Correcting));
        assert!(!out.throttle().unwrap().is_stop(), "{:?}", out.commands);
    }

    let out = sim.tick(
        SensorSnapshot::clear()
            .with(SensorId::ApaRb, 50.0)
            .with(SensorId::ApaRb2, 52.0)
            .with(SensorId::UpaBcl, 20.0)
            .with_speed(-30.0),
    );
    assert_eq!(out.status, ManeuverStatus::Finished);
}

#[test]
fn test_left_and_right_are_mirror_images() {
    let base = SensorSnapshot::clear().with_speed(-30.0);
    let script_right = vec![
        base.with(SensorId::UpaBcr, 150.0),
        base.with(SensorId::ApaRb, 20.0),
        base.with(SensorId::UpaBcr, 90.0),
        base.with(SensorId::ApaRb, 60.0).with(SensorId::ApaRb2, 40.0),
        base.with(SensorId::ApaRb, 60.0)
            .with(SensorId::ApaRb2, 40.0)
            .with_speed(30.0),
        base.with(SensorId::ApaRb, 40.0)
            .with(SensorId::ApaRb2, 60.0)
            .with(SensorId::UpaFr, 20.0)
            .with_speed(30.0),
        base.with(SensorId::ApaRb, 50.0)
            .with(SensorId::ApaRb2, 52.0)
            .with(SensorId::UpaFcl, 20.0)
            .with_speed(30.0),
    ];

    for kind in [SpaceKind::Perpendicular, SpaceKind::Parallel] {
        let mut right = Sim::new(config());
        let mut left = Sim::new(config());
        right.now = left.now;

        let r = right.start(kind, Side::Right);
        let l = left.start(kind, Side::Left);
        assert_eq!(r.turn().map(mirror_turn), l.turn());

        if kind == SpaceKind::Perpendicular {
            // Finish the approach so the script runs against reversing phases
            right.wait(Duration::from_secs(10));
            left.wait(Duration::from_secs(10));
            let approach = SensorSnapshot::clear().with_speed(30.0);
            assert_eq!(right.tick(approach).status, left.tick(approach).status);
        }

        for snapshot in &script_right {
            let r = right.tick(*snapshot);
            let l = left.tick(mirror_snapshot(snapshot));
            assert_eq!(r.throttle(), l.throttle(), "{kind:?}");
            assert_eq!(r.turn().map(mirror_turn), l.turn(), "{kind:?}");
            assert_eq!(r.status, l.status, "{kind:?}");
        }
    }
}

#[test]
fn test_restart_requires_acknowledge() {
    let mut sim = Sim::new(config());
    sim.into_correcting(SpaceKind::Parallel, Side::Right);

    let err = sim
        .ctl
        .start(SpaceKind::Perpendicular, Side::Left, sim.now)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidTransition(_)));

    let done = SensorSnapshot::clear()
        .with(SensorId::ApaRb, 40.0)
        .with(SensorId::ApaRb2, 40.0)
        .with(SensorId::UpaFcl, 10.0);
    assert_eq!(sim.tick(done).status, ManeuverStatus::Finished);
    assert!(
        sim.ctl
            .start(SpaceKind::Perpendicular, Side::Left, sim.now)
            .is_err()
    );

    sim.ctl.acknowledge().unwrap();
    assert!(
        sim.ctl
            .start(SpaceKind::Perpendicular, Side::Left, sim.now)
            .is_ok()
    );
}
