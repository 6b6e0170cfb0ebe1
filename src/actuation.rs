//! Actuation sinks: where throttle and steering commands go.
//!
//! Commands are idempotent, so sinks may receive the same value on every
//! control tick.

use crate::core::types::{ActuationCommand, MoveCommand, TurnCommand};
use crate::error::Result;
use parking_lot::Mutex;
use std::sync::Arc;

/// Consumer of actuation commands
pub trait ActuationSink: Send {
    fn send(&mut self, command: ActuationCommand) -> Result<()>;

    /// Send commands in order, stopping at the first failure
    fn send_all(&mut self, commands: &[ActuationCommand]) -> Result<()> {
        for &command in commands {
            self.send(command)?;
        }
        Ok(())
    }
}

/// Logs each command; changes at info level, repeats at trace level
#[derive(Debug, Default)]
pub struct LogSink {
    last_move: Option<MoveCommand>,
    last_turn: Option<TurnCommand>,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActuationSink for LogSink {
    fn send(&mut self, command: ActuationCommand) -> Result<()> {
        match command {
            ActuationCommand::Move(m) => {
                if self.last_move != Some(m) {
                    log::info!("move {:.1}", m.throttle());
                    self.last_move = Some(m);
                } else {
                    log::trace!("move {:.1} (repeat)", m.throttle());
                }
            }
            ActuationCommand::Turn(t) => {
                if self.last_turn != Some(t) {
                    log::info!("turn {}", t);
                    self.last_turn = Some(t);
                } else {
                    log::trace!("turn {} (repeat)", t);
                }
            }
        }
        Ok(())
    }
}

/// Keeps every command in memory. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    commands: Arc<Mutex<Vec<ActuationCommand>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All commands received so far
    pub fn commands(&self) -> Vec<ActuationCommand> {
        self.commands.lock().clone()
    }

    pub fn last_throttle(&self) -> Option<MoveCommand> {
        self.commands.lock().iter().rev().find_map(|c| match c {
            ActuationCommand::Move(m) => Some(*m),
            ActuationCommand::Turn(_) => None,
        })
    }

    pub fn last_turn(&self) -> Option<TurnCommand> {
        self.commands.lock().iter().rev().find_map(|c| match c {
            ActuationCommand::Turn(t) => Some(*t),
            ActuationCommand::Move(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.commands.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.lock().is_empty()
    }

    pub fn clear(&self) {
        self.commands.lock().clear();
    }
}

impl ActuationSink for RecordingSink {
    fn send(&mut self, command: ActuationCommand) -> Result<()> {
        self.commands.lock().push(command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_shares_record() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();
        writer
            .send_all(&[
                MoveCommand(30.0).into(),
                TurnCommand::FullLeft.into(),
                MoveCommand::STOP.into(),
            ])
            .unwrap();

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.last_throttle(), Some(MoveCommand::STOP));
        assert_eq!(sink.last_turn(), Some(TurnCommand::FullLeft));
    }

    #[test]
    fn test_log_sink_accepts_repeats() {
        let mut sink = LogSink::new();
        sink.send(TurnCommand::Straight.into()).unwrap();
        sink.send(TurnCommand::Straight.into()).unwrap();
        assert_eq!(sink.last_turn, Some(TurnCommand::Straight));
    }
}
