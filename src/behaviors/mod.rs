//! Operator-selectable behaviors.
//!
//! Every behavior except Walk is a hand-authored list of [`Step`]s played
//! back on the calling thread. Walk is a control loop and runs on its own
//! thread under the dispatcher's cancel/join protocol.

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::actuators::Actuation;
use crate::clock::Clock;
use crate::error::ActuationError;
use crate::joint::JointRegistry;
use crate::pose::{Pose, TorqueSetting};

pub mod pushups;
pub mod recovery;
pub mod stand;
pub mod walk;
pub mod wave;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BehaviorId {
    Stand,
    Walk,
    Wave,
    ForwardRecovery,
    BackwardRecovery,
    DropForward,
    Pushups,
}

impl BehaviorId {
    pub const ALL: [BehaviorId; 7] = [
        BehaviorId::Stand,
        BehaviorId::Walk,
        BehaviorId::Wave,
        BehaviorId::ForwardRecovery,
        BehaviorId::BackwardRecovery,
        BehaviorId::DropForward,
        BehaviorId::Pushups,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BehaviorId::Stand => "stand",
            BehaviorId::Walk => "walk",
            BehaviorId::Wave => "wave",
            BehaviorId::ForwardRecovery => "forward recovery",
            BehaviorId::BackwardRecovery => "backward recovery",
            BehaviorId::DropForward => "drop forward",
            BehaviorId::Pushups => "pushups",
        }
    }

    /// The fixed choreography of this behavior, or `None` for Walk and
    /// Pushups, which are loops.
    pub fn steps(self, registry: &JointRegistry) -> Option<Vec<Step>> {
        match self {
            BehaviorId::Stand => Some(stand::steps()),
            BehaviorId::Wave => Some(wave::steps()),
            BehaviorId::ForwardRecovery => Some(recovery::forward_steps(registry)),
            BehaviorId::BackwardRecovery => Some(recovery::backward_steps(registry)),
            BehaviorId::DropForward => Some(recovery::drop_forward_steps(registry)),
            BehaviorId::Walk | BehaviorId::Pushups => None,
        }
    }
}

impl fmt::Display for BehaviorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Pose(Pose),
    Wait(Duration),
    Torque(Vec<TorqueSetting>),
}

pub(crate) fn secs(seconds: f32) -> Step {
    Step::Wait(Duration::from_secs_f32(seconds))
}

/// Plays `steps` in order. The first failing step aborts the rest.
pub fn run_steps<A: Actuation + ?Sized>(
    robot: &mut A,
    clock: &dyn Clock,
    steps: &[Step],
) -> Result<(), ActuationError> {
    for (index, step) in steps.iter().enumerate() {
        debug!("behaviors::step {} of {}", index + 1, steps.len());
        match step {
            Step::Pose(pose) => robot.set_desired_positions(pose)?,
            Step::Wait(duration) => clock.sleep(*duration),
            Step::Torque(settings) => robot.set_torque(settings)?,
        }
    }
    Ok(())
}
