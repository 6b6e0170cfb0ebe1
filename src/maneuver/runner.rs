//! Periodic control task around [`ManeuverController`].
//!
//! The runner ticks the controller at a fixed period through an injectable
//! [`Clock`], forwards commands to an [`ActuationSink`] and publishes the
//! status through a [`ManeuverHandle`] that other threads can poll or use
//! to abort.

use super::cache::SensorCache;
use super::controller::{ManeuverConfig, ManeuverController, ManeuverStatus, Phase};
use crate::actuation::ActuationSink;
use crate::config::TimeoutPolicy;
use crate::core::clock::Clock;
use crate::core::types::{Side, SpaceCode, SpaceKind};
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ManeuverOutcome {
    Finished,
    TimedOut(Phase),
    /// Stopped on request; carries the phase at the time, if any
    Aborted(Option<Phase>),
}

#[derive(Debug, Default)]
struct HandleState {
    status: Mutex<Option<ManeuverStatus>>,
    abort: AtomicBool,
}

/// Shared view of a running maneuver
#[derive(Debug, Clone, Default)]
pub struct ManeuverHandle {
    state: Arc<HandleState>,
}

impl ManeuverHandle {
    /// Latest status, `None` when no maneuver is running
    pub fn status(&self) -> Option<ManeuverStatus> {
        *self.state.status.lock()
    }

    /// Ask the runner to stop at its next tick
    pub fn abort(&self) {
        self.state.abort.store(true, Ordering::Release);
    }

    pub fn is_abort_requested(&self) -> bool {
        self.state.abort.load(Ordering::Acquire)
    }

    fn set_status(&self, status: Option<ManeuverStatus>) {
        *self.state.status.lock() = status;
    }

    fn clear_abort(&self) {
        self.state.abort.store(false, Ordering::Release);
    }
}

/// Drives one controller against a sensor cache and an actuation sink
pub struct ManeuverRunner<S: ActuationSink> {
    controller: ManeuverController,
    cache: Arc<SensorCache>,
    sink: S,
    clock: Arc<dyn Clock>,
    period: Duration,
    timeout_policy: TimeoutPolicy,
    handle: ManeuverHandle,
}

impl<S: ActuationSink> ManeuverRunner<S> {
    pub fn new(
        config: ManeuverConfig,
        cache: Arc<SensorCache>,
        sink: S,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            controller: ManeuverController::new(config),
            cache,
            sink,
            clock,
            period: Duration::from_millis(50),
            timeout_policy: TimeoutPolicy::Continue,
            handle: ManeuverHandle::default(),
        }
    }

    /// Time between control ticks
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// What to do once the deadline passes
    pub fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.timeout_policy = policy;
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn handle(&self) -> ManeuverHandle {
        self.handle.clone()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn controller(&self) -> &ManeuverController {
        &self.controller
    }

    /// Begin a maneuver and send its entry commands
    pub fn start(&mut self, kind: SpaceKind, side: Side) -> Result<()> {
        let out = self.controller.start(kind, side, self.clock.now())?;
        self.handle.clear_abort();
        self.handle.set_status(Some(out.status));
        self.sink.send_all(&out.commands)
    }

    /// Begin a maneuver from a selection code
    pub fn start_code(&mut self, code: SpaceCode) -> Result<()> {
        let (kind, side) = code.decode()?;
        self.start(kind, side)
    }

    /// Run a single control tick.
    ///
    /// Returns the outcome once the maneuver has ended.
    pub fn step(&mut self) -> Result<Option<ManeuverOutcome>> {
        if self.handle.is_abort_requested() {
            return self.stop().map(Some);
        }

        let snapshot = self.cache.snapshot();
        let out = self.controller.tick(self.clock.now(), &snapshot)?;
        self.sink.send_all(&out.commands)?;
        self.handle.set_status(Some(out.status));

        match out.status {
            ManeuverStatus::Finished => {
                self.controller.acknowledge()?;
                log::info!("Maneuver finished");
                Ok(Some(ManeuverOutcome::Finished))
            }
            ManeuverStatus::TimedOut(phase) if self.timeout_policy == TimeoutPolicy::Abort => {
                let commands = self.controller.abort();
                self.sink.send_all(&commands)?;
                log::warn!("Maneuver timed out in {:?}, stopping", phase);
                Ok(Some(ManeuverOutcome::TimedOut(phase)))
            }
            _ => Ok(None),
        }
    }

    /// Start a maneuver and tick it until it ends or is aborted
    pub fn run(&mut self, kind: SpaceKind, side: Side) -> Result<ManeuverOutcome> {
        self.start(kind, side)?;

        loop {
            let tick_start = self.clock.now();

            if let Some(outcome) = self.step()? {
                return Ok(outcome);
            }

            let elapsed = self.clock.now().saturating_duration_since(tick_start);
            if let Some(remaining) = self.period.checked_sub(elapsed) {
                self.clock.sleep(remaining);
            }
        }
    }

    fn stop(&mut self) -> Result<ManeuverOutcome> {
        let phase = self.controller.phase();
        let commands = self.controller.abort();
        self.sink.send_all(&commands)?;
        self.handle.set_status(None);
        self.handle.clear_abort();
        Ok(ManeuverOutcome::Aborted(phase))
    }
}
