//! Fakes shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::clock::Clock;
use crate::error::{InputError, PolicyError, PolicyLoadError};
use crate::joint::{JointId, JointRegistry};
use crate::keyboard::{InputEvent, InputSource};
use crate::policy::{PolicyEvaluator, PolicyLoader, RobotState};
use crate::pose::Pose;

/// Records requested sleeps instead of blocking.
#[derive(Default)]
pub struct ManualClock {
    slept: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(&self) -> Duration {
        self.slept
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .sum()
    }
}

impl Clock for ManualClock {
    fn sleep(&self, duration: Duration) {
        self.slept
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}

/// Replays a script, one entry per poll. `None` entries are idle polls.
/// Once the script runs out every poll returns [`InputEvent::Quit`].
pub struct ScriptedInput {
    script: VecDeque<Option<InputEvent>>,
}

impl ScriptedInput {
    pub fn new(script: Vec<Option<InputEvent>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl InputSource for ScriptedInput {
    fn poll(&mut self, _timeout: Duration) -> Result<Option<InputEvent>, InputError> {
        Ok(self.script.pop_front().unwrap_or(Some(InputEvent::Quit)))
    }
}

/// Returns the same leg pose every tick, or fails every tick.
pub struct FixedPolicy {
    pose: Option<Pose>,
}

impl FixedPolicy {
    pub fn legs(degrees: f32) -> Self {
        let pose = JointRegistry::new()
            .policy_joints()
            .iter()
            .fold(Pose::new(), |pose, joint| pose.with(joint.id, degrees));
        Self { pose: Some(pose) }
    }

    pub fn failing() -> Self {
        Self { pose: None }
    }
}

impl PolicyEvaluator for FixedPolicy {
    fn evaluate(&mut self, _state: &RobotState) -> Result<Pose, PolicyError> {
        self.pose
            .clone()
            .ok_or_else(|| PolicyError("fixed policy failure".to_string()))
    }
}

/// Returns a standing pose for a number of ticks, then panics.
pub struct PanickingPolicy {
    remaining: usize,
}

impl PanickingPolicy {
    pub fn after(ticks: usize) -> Self {
        Self { remaining: ticks }
    }
}

impl PolicyEvaluator for PanickingPolicy {
    fn evaluate(&mut self, _state: &RobotState) -> Result<Pose, PolicyError> {
        if self.remaining == 0 {
            panic!("policy evaluator crashed");
        }
        self.remaining -= 1;
        Ok(Pose::new().with(JointId::LeftKneePitch, 0.0))
    }
}

/// Loader backed by a closure.
pub struct FnLoader<F>(pub F);

impl<F> PolicyLoader for FnLoader<F>
where
    F: Fn() -> Result<Box<dyn PolicyEvaluator>, PolicyLoadError>,
{
    fn load(&self) -> Result<Box<dyn PolicyEvaluator>, PolicyLoadError> {
        (self.0)()
    }
}
