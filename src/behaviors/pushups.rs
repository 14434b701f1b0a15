//! Pushups: a setup sequence followed by an open-ended up/down loop.
//!
//! Unlike every other synchronous behavior, Pushups keeps polling the input
//! source while it runs and stops on its own key. That stop check is local
//! to this behavior and independent of the dispatcher's cancellation flag.

use std::time::Duration;

use tracing::{debug, info};

use super::{run_steps, secs, Step};
use crate::actuators::Actuation;
use crate::clock::Clock;
use crate::constants::{TORQUE_PUSHUPS_ARMS, TORQUE_RELAXED};
use crate::error::BehaviorError;
use crate::joint::{JointId, JointId::*, JointRegistry};
use crate::keyboard::{Action, InputSource, Keymap};
use crate::pose::{Pose, TorqueSetting};

const HOLD: Duration = Duration::from_secs(1);

/// Why the loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushupsExit {
    /// The stop key was pressed.
    Stopped,
    /// The operator asked to quit the program while pushups were running.
    Quit,
}

/// Plank pose shared by every step; only arms and ankles change.
fn plank(shoulder_yaw: f32, elbow_yaw: f32, ankle_pitch: f32) -> Pose {
    Pose::from_pairs(&[
        (LeftShoulderPitch, 90.0),
        (RightShoulderPitch, -90.0),
        (LeftShoulderYaw, shoulder_yaw),
        (RightShoulderYaw, -shoulder_yaw),
        (LeftElbowYaw, elbow_yaw),
        (RightElbowYaw, -elbow_yaw),
        (LeftHipPitch, 10.0),
        (RightHipPitch, -10.0),
        (LeftHipRoll, 0.0),
        (RightHipRoll, 0.0),
        (LeftHipYaw, -5.0),
        (RightHipYaw, 5.0),
        (LeftKneePitch, 5.0),
        (RightKneePitch, -5.0),
        (LeftAnklePitch, ankle_pitch),
        (RightAnklePitch, -ankle_pitch),
    ])
}

pub fn push_up() -> Pose {
    plank(-40.0, 0.0, -70.0)
}

pub fn push_down() -> Pose {
    plank(90.0, 90.0, -80.0)
}

fn arm_yaw_torque(registry: &JointRegistry) -> Vec<TorqueSetting> {
    [LeftShoulderYaw, RightShoulderYaw, LeftElbowYaw, RightElbowYaw]
        .iter()
        .filter_map(|&id: &JointId| registry.get(id))
        .map(|joint| TorqueSetting::new(joint.actuator_id, TORQUE_PUSHUPS_ARMS))
        .collect()
}

/// Zero everything, get into the plank, then stiffen the arm yaw joints.
pub fn setup_steps(registry: &JointRegistry) -> Vec<Step> {
    vec![
        Step::Pose(Pose::neutral()),
        Step::Pose(plank(90.0, 0.0, -100.0)),
        secs(1.0),
        Step::Pose(push_down()),
        Step::Torque(arm_yaw_torque(registry)),
        secs(1.0),
    ]
}

/// Drains pending input and reports whether the loop should end.
fn poll_stop(input: &mut dyn InputSource) -> Result<Option<PushupsExit>, BehaviorError> {
    while let Some(event) = input.poll(Duration::ZERO)? {
        if Keymap::is_pushups_stop(event) {
            return Ok(Some(PushupsExit::Stopped));
        }
        if Keymap::action(event) == Some(Action::Quit) {
            return Ok(Some(PushupsExit::Quit));
        }
        debug!("pushups::ignoring {:?}", event);
    }
    Ok(None)
}

/// Runs pushups until the stop key. Torque is restored on every joint
/// exactly once on the way out.
pub fn run<A: Actuation + ?Sized>(
    robot: &mut A,
    clock: &dyn Clock,
    input: &mut dyn InputSource,
) -> Result<PushupsExit, BehaviorError> {
    run_steps(robot, clock, &setup_steps(robot.registry()))?;

    let up = push_up();
    let down = push_down();
    let mut repetitions = 0u32;
    let exit = loop {
        if let Some(exit) = poll_stop(input)? {
            break exit;
        }
        robot.set_desired_positions(&up)?;
        clock.sleep(HOLD);
        robot.set_desired_positions(&down)?;
        clock.sleep(HOLD);
        repetitions += 1;
    };

    info!("Pushups finished after {} repetitions ({:?})", repetitions, exit);
    let relaxed = TorqueSetting::all(robot.registry(), TORQUE_RELAXED);
    robot.set_torque(&relaxed)?;
    Ok(exit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::{InputEvent, Key};
    use crate::sim::{Command, Journal, SimulatedRobot};
    use crate::testing::{ManualClock, ScriptedInput};

    fn stop() -> Option<InputEvent> {
        Some(InputEvent::KeyDown(Key::Char('x')))
    }

    #[test]
    fn stops_at_next_iteration_and_restores_torque_once() {
        let journal = Journal::new();
        let mut robot = SimulatedRobot::new().with_journal(journal.clone());
        let clock = ManualClock::new();
        // Two idle polls, an unrelated key, then the stop key.
        let mut input = ScriptedInput::new(vec![
            None,
            None,
            Some(InputEvent::KeyDown(Key::Char('w'))),
            stop(),
        ]);

        let exit = run(&mut robot, &clock, &mut input).unwrap();
        assert_eq!(exit, PushupsExit::Stopped);

        let entries = journal.entries();
        let loop_poses = journal
            .poses()
            .iter()
            .skip(3)
            .filter(|pose| **pose == push_up())
            .count();
        // Two idle polls mean two repetitions; the third check drains the
        // 'w' and then sees the stop key.
        assert_eq!(loop_poses, 2);

        let relax: Vec<_> = entries
            .iter()
            .filter(|e| {
                matches!(&e.command, Command::Torque(s)
                    if s.len() == 16 && s.iter().all(|t| t.torque == TORQUE_RELAXED))
            })
            .collect();
        assert_eq!(relax.len(), 1);
        assert_eq!(relax[0].seq, entries.len() - 1);
        assert_eq!(robot.torque(15), Some(TORQUE_RELAXED));
    }

    #[test]
    fn setup_stiffens_the_four_arm_yaw_servos() {
        let registry = JointRegistry::new();
        let torque = setup_steps(&registry)
            .into_iter()
            .find_map(|step| match step {
                Step::Torque(settings) => Some(settings),
                _ => None,
            })
            .unwrap();
        let mut ids: Vec<u8> = torque.iter().map(|s| s.actuator_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![11, 12, 15, 16]);
        assert!(torque.iter().all(|s| s.torque == TORQUE_PUSHUPS_ARMS));
    }

    #[test]
    fn quit_event_ends_pushups() {
        let mut robot = SimulatedRobot::new();
        let mut input = ScriptedInput::new(vec![Some(InputEvent::Quit)]);
        let exit = run(&mut robot, &ManualClock::new(), &mut input).unwrap();
        assert_eq!(exit, PushupsExit::Quit);
        assert_eq!(robot.torque(1), Some(TORQUE_RELAXED));
    }

    #[test]
    fn actuation_error_aborts_without_looping() {
        let mut robot = SimulatedRobot::new();
        robot.inject_fault_at(2);
        let mut input = ScriptedInput::new(vec![]);
        let err = run(&mut robot, &ManualClock::new(), &mut input).unwrap_err();
        assert!(matches!(err, BehaviorError::Actuation(_)));
    }
}
