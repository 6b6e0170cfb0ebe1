//! Phase-based parking state machine.
//!
//! ```text
//! Approaching ──▶ Aligning ──▶ Correcting ──▶ Finished
//!  (perpendicular     │
//!   only)             └── parallel maneuvers start here
//! ```
//!
//! The controller is tick driven: each [`ManeuverController::tick`] reads
//! one [`SensorSnapshot`], re-publishes the current throttle and steering
//! and then applies the policy of the current phase. The deadline is
//! advisory; a timed out maneuver keeps being controlled until the caller
//! aborts it.

use super::cache::SensorSnapshot;
use super::layout::SensorLayout;
use crate::core::sensor::SensorId;
use crate::core::types::{ActuationCommand, MoveCommand, Side, SpaceKind, TurnCommand};
use crate::error::{Error, Result};
use std::time::{Duration, Instant};

/// Maneuver thresholds
#[derive(Debug, Clone)]
pub struct ManeuverConfig {
    /// Closest allowed obstacle distance
    pub parking_distance_min: f32,
    /// Rear distance at which a perpendicular maneuver is inside the space
    pub parking_distance_max: f32,
    /// Side rear sensor difference accepted as parallel to the boundary
    pub apa_tolerance: f32,
    /// Forward throttle
    pub speed_parking_forward: f32,
    /// Reverse throttle (negative)
    pub speed_parking_backward: f32,
    /// Distance driven forward before reversing into a perpendicular space
    pub move_distance_perpendicular: f32,
    /// Minimum parallel space length
    pub parallel_length: f32,
    /// Advisory maneuver deadline
    pub timeout: Duration,
}

impl Default for ManeuverConfig {
    fn default() -> Self {
        crate::config::AppConfig::default().maneuver_config()
    }
}

/// Stage of an active maneuver
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Approaching,
    Aligning,
    Correcting,
    Finished,
}

/// Externally visible maneuver state
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverStatus {
    Active(Phase),
    Finished,
    /// Deadline passed; carries the phase the maneuver was in
    TimedOut(Phase),
}

impl ManeuverStatus {
    /// Whether the caller must acknowledge before starting again
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ManeuverStatus::Active(_))
    }
}

/// Commands emitted by one controller call
#[derive(Debug, Clone, PartialEq)]
pub struct ControlOutput {
    pub commands: Vec<ActuationCommand>,
    pub status: ManeuverStatus,
}

impl ControlOutput {
    /// Last throttle emitted
    pub fn throttle(&self) -> Option<MoveCommand> {
        self.commands.iter().rev().find_map(|c| match c {
            ActuationCommand::Move(m) => Some(*m),
            ActuationCommand::Turn(_) => None,
        })
    }

    /// Last steering emitted
    pub fn turn(&self) -> Option<TurnCommand> {
        self.commands.iter().rev().find_map(|c| match c {
            ActuationCommand::Turn(t) => Some(*t),
            ActuationCommand::Move(_) => None,
        })
    }
}

/// State of the maneuver in progress
#[derive(Debug, Clone)]
struct Maneuver {
    layout: SensorLayout,
    phase: Phase,
    started_at: Instant,
    deadline: Instant,
    timed_out: bool,
    last_tick: Option<Instant>,
    /// Distance driven during the approach
    travelled: f32,
    throttle: MoveCommand,
    /// Last non-zero throttle; survives a guard hold
    heading: MoveCommand,
    turn: TurnCommand,
}

impl Maneuver {
    fn status(&self) -> ManeuverStatus {
        match (self.phase, self.timed_out) {
            (Phase::Finished, _) => ManeuverStatus::Finished,
            (phase, true) => ManeuverStatus::TimedOut(phase),
            (phase, false) => ManeuverStatus::Active(phase),
        }
    }
}

/// One parameterised state machine for all four parking variants
#[derive(Debug)]
pub struct ManeuverController {
    config: ManeuverConfig,
    maneuver: Option<Maneuver>,
}

impl ManeuverController {
    pub fn new(config: ManeuverConfig) -> Self {
        Self {
            config,
            maneuver: None,
        }
    }

    pub fn config(&self) -> &ManeuverConfig {
        &self.config
    }

    /// Status of the current maneuver, `None` when idle
    pub fn status(&self) -> Option<ManeuverStatus> {
        self.maneuver.as_ref().map(Maneuver::status)
    }

    /// Current phase, `None` when idle
    pub fn phase(&self) -> Option<Phase> {
        self.maneuver.as_ref().map(|m| m.phase)
    }

    /// Time since the maneuver started
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.maneuver
            .as_ref()
            .map(|m| now.saturating_duration_since(m.started_at))
    }

    /// Begin a maneuver into a `kind` space on `side`.
    ///
    /// Fails while another maneuver has not been acknowledged.
    pub fn start(&mut self, kind: SpaceKind, side: Side, now: Instant) -> Result<ControlOutput> {
        if let Some(m) = &self.maneuver {
            return Err(Error::InvalidTransition(format!(
                "cannot start {:?}/{:?} maneuver while {:?} is {:?}",
                kind,
                side,
                m.layout.kind,
                m.status()
            )));
        }

        let deadline = now.checked_add(self.config.timeout).ok_or_else(|| {
            Error::InvalidParameter(format!(
                "maneuver timeout {:?} is out of range",
                self.config.timeout
            ))
        })?;

        let mut maneuver = Maneuver {
            layout: SensorLayout::new(kind, side),
            phase: Phase::Approaching,
            started_at: now,
            deadline,
            timed_out: false,
            last_tick: None,
            travelled: 0.0,
            throttle: MoveCommand::STOP,
            heading: MoveCommand::STOP,
            turn: TurnCommand::Straight,
        };

        log::info!(
            "ManeuverController: starting {:?} maneuver on the {:?} side (deadline {:.0}s)",
            kind,
            side,
            self.config.timeout.as_secs_f32()
        );

        let mut out = Vec::new();
        let policy = Policy {
            config: &self.config,
            m: &mut maneuver,
            out: &mut out,
        };
        policy.enter(kind);

        let status = maneuver.status();
        self.maneuver = Some(maneuver);
        Ok(ControlOutput {
            commands: out,
            status,
        })
    }

    /// Run one control step
    pub fn tick(&mut self, now: Instant, snapshot: &SensorSnapshot) -> Result<ControlOutput> {
        let config = &self.config;
        let Some(m) = self.maneuver.as_mut() else {
            return Err(Error::InvalidTransition(
                "tick without an active maneuver".to_string(),
            ));
        };

        let mut out = vec![
            ActuationCommand::Move(m.throttle),
            ActuationCommand::Turn(m.turn),
        ];

        let dt = now
            .saturating_duration_since(m.last_tick.unwrap_or(m.started_at))
            .as_secs_f32();
        m.last_tick = Some(now);

        if m.phase != Phase::Finished {
            let phase = m.phase;
            let mut policy = Policy {
                config,
                m: &mut *m,
                out: &mut out,
            };
            match phase {
                Phase::Approaching => policy.approach(snapshot, dt),
                Phase::Aligning => policy.align(snapshot),
                Phase::Correcting => policy.correct(snapshot),
                Phase::Finished => {}
            }

            if m.phase != phase {
                log::info!("ManeuverController: {:?} -> {:?}", phase, m.phase);
            }
        }

        if !m.timed_out && m.phase != Phase::Finished && now >= m.deadline {
            m.timed_out = true;
            log::warn!(
                "ManeuverController: deadline passed in {:?} after {:.1}s",
                m.phase,
                now.saturating_duration_since(m.started_at).as_secs_f32()
            );
        }

        Ok(ControlOutput {
            commands: out,
            status: m.status(),
        })
    }

    /// Halt immediately and discard the maneuver.
    ///
    /// Always returns the stop commands, even when idle.
    pub fn abort(&mut self) -> Vec<ActuationCommand> {
        if let Some(m) = self.maneuver.take() {
            log::warn!("ManeuverController: aborted while {:?}", m.status());
        }
        vec![
            ActuationCommand::Move(MoveCommand::STOP),
            ActuationCommand::Turn(TurnCommand::Straight),
        ]
    }

    /// Reset a finished or timed out maneuver so a new one can start
    pub fn acknowledge(&mut self) -> Result<ManeuverStatus> {
        match self.status() {
            Some(status) if status.is_terminal() => {
                self.maneuver = None;
                log::debug!("ManeuverController: acknowledged {:?}", status);
                Ok(status)
            }
            Some(status) => Err(Error::InvalidTransition(format!(
                "cannot acknowledge maneuver that is {:?}",
                status
            ))),
            None => Err(Error::InvalidTransition(
                "no maneuver to acknowledge".to_string(),
            )),
        }
    }
}

/// Phase policies applied to one maneuver during one call
struct Policy<'a> {
    config: &'a ManeuverConfig,
    m: &'a mut Maneuver,
    out: &'a mut Vec<ActuationCommand>,
}

impl Policy<'_> {
    fn set_move(&mut self, throttle: MoveCommand) {
        self.m.throttle = throttle;
        if !throttle.is_stop() {
            self.m.heading = throttle;
        }
        self.out.push(ActuationCommand::Move(throttle));
    }

    fn set_turn(&mut self, turn: TurnCommand) {
        self.m.turn = turn;
        self.out.push(ActuationCommand::Turn(turn));
    }

    fn forward(&self) -> MoveCommand {
        MoveCommand(self.config.speed_parking_forward)
    }

    fn backward(&self) -> MoveCommand {
        MoveCommand(self.config.speed_parking_backward)
    }

    fn target(&self) -> Side {
        self.m.layout.side
    }

    fn opposite(&self) -> Side {
        self.m.layout.side.opposite()
    }

    /// Stop, snap the steering and drive off in `throttle`
    fn recover(&mut self, turn: TurnCommand, throttle: MoveCommand, sensor: SensorId) {
        log::warn!(
            "ManeuverController: interlock on {} in {:?}, steering {} throttle {:.0}",
            sensor,
            self.m.phase,
            turn,
            throttle.throttle()
        );
        self.set_move(MoveCommand::STOP);
        self.set_turn(turn);
        self.set_move(throttle);
    }

    fn enter(mut self, kind: SpaceKind) {
        match kind {
            SpaceKind::Perpendicular => {
                self.set_turn(TurnCommand::Straight);
                let forward = self.forward();
                self.set_move(forward);
            }
            SpaceKind::Parallel => self.enter_aligning(),
        }
    }

    fn enter_aligning(&mut self) {
        self.m.phase = Phase::Aligning;
        self.set_move(MoveCommand::STOP);
        self.set_turn(TurnCommand::full(self.target()));
        let backward = self.backward();
        self.set_move(backward);
    }

    fn approach(&mut self, s: &SensorSnapshot, dt: f32) {
        self.m.travelled += s.speed * dt;
        log::debug!(
            "ManeuverController: approached {:.1}/{:.1}",
            self.m.travelled,
            self.config.move_distance_perpendicular
        );
        if self.m.travelled >= self.config.move_distance_perpendicular {
            self.enter_aligning();
        }
    }

    fn align(&mut self, s: &SensorSnapshot) {
        let l = self.m.layout;
        let c = self.config;
        let near_wall =
            s.get(l.side_rear) < c.parking_distance_min || s.get(l.rear_corner) < c.parking_distance_min;

        match l.kind {
            SpaceKind::Perpendicular => {
                if s.get(l.side_rear) < c.parking_distance_max
                    && s.get(l.opposite_rear) < c.parking_distance_max
                {
                    self.m.phase = Phase::Correcting;
                } else if near_wall {
                    self.set_turn(TurnCommand::Straight);
                } else {
                    self.set_turn(TurnCommand::full(self.target()));
                }
            }
            SpaceKind::Parallel => {
                let rear = s.get(l.rear_centre);
                if rear < c.parallel_length / 2.0 {
                    self.set_turn(TurnCommand::full(self.opposite()));
                    self.m.phase = Phase::Correcting;
                } else if near_wall || rear < c.parallel_length {
                    self.set_turn(TurnCommand::Straight);
                } else {
                    self.set_turn(TurnCommand::full(self.target()));
                }
            }
        }
    }

    fn correct(&mut self, s: &SensorSnapshot) {
        let l = self.m.layout;
        let diff = s.get(l.side_rear) - s.get(l.side_rear2);

        // Resume after a guard hold once the way is clear
        let heading = self.m.heading;
        if self.m.throttle.is_stop()
            && !heading.is_stop()
            && self.blocker(s, heading).is_none()
        {
            log::info!(
                "ManeuverController: way clear, resuming throttle {:.0}",
                heading.throttle()
            );
            self.set_move(heading);
        }

        // Direction of travel; falls back to the heading while standing still
        let direction = if s.speed != 0.0 {
            s.speed
        } else {
            heading.throttle()
        };

        match l.kind {
            SpaceKind::Perpendicular => self.correct_perpendicular(s, diff, direction),
            SpaceKind::Parallel => self.correct_parallel(s, diff, direction),
        }

        if self.m.phase == Phase::Correcting {
            self.guard(s);
        }
    }

    /// Steer slightly toward `side` unless already at full lock there
    fn nudge(&mut self, side: Side) {
        if self.m.turn != TurnCommand::full(side) {
            self.set_turn(TurnCommand::slight(side));
        }
    }

    fn finish(&mut self) {
        self.set_move(MoveCommand::STOP);
        self.m.phase = Phase::Finished;
    }

    fn correct_perpendicular(&mut self, s: &SensorSnapshot, diff: f32, direction: f32) {
        let l = self.m.layout;
        let c = self.config;
        let (target, opposite) = (self.target(), self.opposite());

        if diff.abs() <= c.apa_tolerance {
            self.set_turn(TurnCommand::Straight);
            let backward = self.backward();
            self.set_move(backward);
            if s.min_of(&l.rear_centres) < c.parking_distance_min {
                self.finish();
            }
            return;
        }

        if direction > 0.0 {
            if diff > c.apa_tolerance {
                self.nudge(opposite);
            } else {
                self.nudge(target);
            }

            let backward = self.backward();
            if s.get(l.side_front) < c.parking_distance_min {
                self.recover(TurnCommand::full(opposite), backward, l.side_front);
            } else if s.get(l.opposite_front) < c.parking_distance_min {
                self.recover(TurnCommand::full(target), backward, l.opposite_front);
            } else if (self.m.turn == TurnCommand::full(target)
                && s.get(l.opposite_rear) > c.parking_distance_max)
                || (self.m.turn == TurnCommand::full(opposite)
                    && s.get(l.side_rear) > c.parking_distance_max)
            {
                // Pulled out of the space: straighten and reverse back in
                self.set_move(MoveCommand::STOP);
                self.set_turn(TurnCommand::Straight);
                self.set_move(backward);
            }
        } else if direction < 0.0 {
            if diff > c.apa_tolerance {
                self.nudge(target);
            } else {
                self.nudge(opposite);
            }

            if s.get(l.side_rear) < c.parking_distance_min {
                let forward = self.forward();
                self.recover(TurnCommand::full(target), forward, l.side_rear);
            } else if s.get(l.opposite_front) < c.parking_distance_min {
                let backward = self.backward();
                self.recover(TurnCommand::full(opposite), backward, l.opposite_front);
            }
        }
    }

    fn correct_parallel(&mut self, s: &SensorSnapshot, diff: f32, direction: f32) {
        let l = self.m.layout;
        let c = self.config;
        let (target, opposite) = (self.target(), self.opposite());
        let front = s.get(l.side_front).min(s.get(l.front_corner));
        let rear = s.get(l.side_rear).min(s.get(l.rear_corner));

        if diff.abs() <= c.apa_tolerance {
            self.set_turn(TurnCommand::Straight);
            let forward = self.forward();
            self.set_move(forward);
            if s.min_of(&l.front_centres) < c.parking_distance_min {
                self.finish();
            } else if front < c.parking_distance_min {
                let backward = self.backward();
                self.recover(TurnCommand::full(opposite), backward, l.side_front);
            }
            return;
        }

        if direction > 0.0 {
            if diff > c.apa_tolerance {
                self.nudge(opposite);
            } else {
                self.nudge(target);
            }

            if front < c.parking_distance_min {
                let backward = self.backward();
                self.recover(TurnCommand::full(opposite), backward, l.side_front);
            }
        } else if direction < 0.0 {
            if diff > c.apa_tolerance {
                self.nudge(target);
            } else {
                self.nudge(opposite);
            }

            if front < c.parking_distance_min {
                self.set_turn(TurnCommand::Straight);
            } else {
                self.set_turn(TurnCommand::full(opposite));
            }

            if rear < c.parking_distance_min {
                let forward = self.forward();
                self.recover(TurnCommand::full(target), forward, l.side_rear);
            }
        }
    }

    /// Never leave the tick driving toward a guarded sensor that is too close
    fn guard(&mut self, s: &SensorSnapshot) {
        let throttle = self.m.throttle;
        if let Some(sensor) = self.blocker(s, throttle) {
            log::warn!(
                "ManeuverController: {} at {:.1} blocks throttle {:.0}, holding",
                sensor,
                s.get(sensor),
                throttle.throttle()
            );
            self.set_move(MoveCommand::STOP);
        }
    }

    /// First guarded sensor too close to drive with `throttle`
    fn blocker(&self, s: &SensorSnapshot, throttle: MoveCommand) -> Option<SensorId> {
        let l = self.m.layout;
        let min = self.config.parking_distance_min;
        let guarded = if throttle.is_forward() {
            l.forward_guard()
        } else if throttle.is_reverse() {
            l.reverse_guard()
        } else {
            return None;
        };
        guarded.into_iter().find(|&id| s.get(id) < min)
    }
}
