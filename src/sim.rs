//! In-memory servo bus.
//!
//! [`SimulatedRobot`] stands in for the physical bus when running without
//! hardware. It keeps the last commanded angle per joint for the session,
//! enforces servo limits, and can record every command it receives in a
//! shared [`Journal`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, ThreadId};
use std::time::Instant;

use tracing::{debug, trace};

use crate::actuators::{servo_targets, Actuation, ServoState};
use crate::constants::SERVO_LIMIT_DEG;
use crate::error::ActuationError;
use crate::joint::{JointId, JointRegistry};
use crate::pose::{Pose, TorqueSetting};

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Positions(Pose),
    Torque(Vec<TorqueSetting>),
    Disable,
}

#[derive(Clone, Debug)]
pub struct JournalEntry {
    pub seq: usize,
    pub thread: ThreadId,
    pub at: Instant,
    pub command: Command,
}

/// Shared, append-only log of the commands a [`SimulatedRobot`] accepted.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, command: Command) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let seq = entries.len();
        entries.push(JournalEntry {
            seq,
            thread: thread::current().id(),
            at: Instant::now(),
            command,
        });
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Only the position commands, in the order they were issued.
    pub fn poses(&self) -> Vec<Pose> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry.command {
                Command::Positions(pose) => Some(pose),
                _ => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

pub struct SimulatedRobot {
    registry: JointRegistry,
    /// Last commanded angle per joint for this session, in degrees.
    commanded: BTreeMap<JointId, f32>,
    torques: BTreeMap<u8, f32>,
    motors_enabled: bool,
    limit_deg: f32,
    calls: usize,
    fault_at: Option<usize>,
    journal: Option<Journal>,
}

impl Default for SimulatedRobot {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRobot {
    pub fn new() -> Self {
        Self {
            registry: JointRegistry::new(),
            commanded: BTreeMap::new(),
            torques: BTreeMap::new(),
            motors_enabled: true,
            limit_deg: SERVO_LIMIT_DEG,
            calls: 0,
            fault_at: None,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn with_limit(mut self, limit_deg: f32) -> Self {
        self.limit_deg = limit_deg;
        self
    }

    /// Makes the `call`-th actuation call (1-based, counting position and
    /// torque commands) fail once with a bus fault.
    pub fn inject_fault_at(&mut self, call: usize) {
        self.fault_at = Some(self.calls + call);
    }

    pub fn commanded(&self, joint: JointId) -> Option<f32> {
        self.commanded.get(&joint).copied()
    }

    pub fn commanded_positions(&self) -> &BTreeMap<JointId, f32> {
        &self.commanded
    }

    pub fn torque(&self, actuator_id: u8) -> Option<f32> {
        self.torques.get(&actuator_id).copied()
    }

    pub fn motors_enabled(&self) -> bool {
        self.motors_enabled
    }

    fn next_call(&mut self) -> Result<(), ActuationError> {
        self.calls += 1;
        if self.fault_at == Some(self.calls) {
            self.fault_at = None;
            return Err(ActuationError::Bus(format!(
                "injected fault on call {}",
                self.calls
            )));
        }
        Ok(())
    }

    fn record(&self, command: Command) {
        if let Some(journal) = &self.journal {
            journal.record(command);
        }
    }
}

impl Actuation for SimulatedRobot {
    fn registry(&self) -> &JointRegistry {
        &self.registry
    }

    fn set_desired_positions(&mut self, pose: &Pose) -> Result<(), ActuationError> {
        self.next_call()?;
        let commands = servo_targets(&self.registry, pose)?;

        // Reject the whole pose before moving anything.
        for (command, (joint, _)) in commands.iter().zip(pose.iter()) {
            if command.position.abs() > self.limit_deg {
                return Err(ActuationError::OutOfRange {
                    joint,
                    angle: command.position,
                });
            }
        }

        trace!("sim::set_desired_positions {:?}", commands);
        for (joint, angle) in pose.iter() {
            self.commanded.insert(joint, angle);
        }
        self.record(Command::Positions(pose.clone()));
        Ok(())
    }

    fn set_torque(&mut self, settings: &[TorqueSetting]) -> Result<(), ActuationError> {
        self.next_call()?;
        if let Some(unknown) = settings
            .iter()
            .find(|setting| self.registry.by_actuator(setting.actuator_id).is_none())
        {
            return Err(ActuationError::UnknownActuator(unknown.actuator_id));
        }

        debug!("sim::set_torque {:?}", settings);
        for setting in settings {
            self.torques.insert(setting.actuator_id, setting.torque);
        }
        self.record(Command::Torque(settings.to_vec()));
        Ok(())
    }

    fn disable_motors(&mut self) -> Result<(), ActuationError> {
        debug!("sim::disable_motors");
        self.motors_enabled = false;
        self.record(Command::Disable);
        Ok(())
    }

    fn get_servo_states(&mut self) -> Result<Vec<ServoState>, ActuationError> {
        let states = self
            .registry
            .iter()
            .map(|joint| ServoState {
                actuator_id: joint.actuator_id,
                position: self.commanded.get(&joint.id).copied().unwrap_or(0.0) + joint.offset_deg,
                velocity: 0.0,
            })
            .collect::<Vec<_>>();
        self.registry.update_from(&states);
        Ok(states)
    }
}
