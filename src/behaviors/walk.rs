use ::std::thread;
use ::std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::actuators::Actuation;
use crate::error::BehaviorError;
use crate::joint::JointRegistry;
use crate::policy::{PolicyEvaluator, RobotState};
use crate::task::CancellationToken;

/// Reads the leg joints in policy order. There is no IMU on the servo bus,
/// so gyro and orientation stay at zero.
fn observe(joints: &JointRegistry, elapsed: Duration) -> RobotState {
    let legs = joints.policy_joints();
    RobotState {
        positions: legs.iter().map(|joint| joint.current_position).collect(),
        velocities: legs.iter().map(|joint| joint.current_velocity).collect(),
        gyro: [0.0; 3],
        euler: [0.0; 3],
        time: elapsed.as_secs_f32(),
    }
}

/// The walk control loop. Runs one tick per `tick` until `token` is
/// cancelled, and returns the number of ticks completed.
///
/// Cancellation leaves the legs wherever the last tick put them; the caller
/// is expected to command a safe pose next.
pub fn run_walk<A: Actuation + ?Sized>(
    robot: &mut A,
    policy: &mut dyn PolicyEvaluator,
    tick: Duration,
    token: &CancellationToken,
) -> Result<u64, BehaviorError> {
    let mut joints = robot.registry().clone();
    let start = Instant::now();
    let mut next_tick = start;
    let mut ticks = 0u64;

    info!("Entering walk control loop");
    while !token.is_cancelled() {
        let uuid = uuid::Uuid::new_v4();
        debug!("walk::control_tick::START uuid={}", uuid);

        let states = robot.get_servo_states()?;
        joints.update_from(&states);
        let target = policy.evaluate(&observe(&joints, start.elapsed()))?;
        robot.set_desired_positions(&target)?;
        ticks += 1;

        debug!("walk::control_tick::END uuid={}", uuid);

        // A slow tick is not made up; the rate just drops.
        next_tick += tick;
        match next_tick.checked_duration_since(Instant::now()) {
            Some(remaining) => thread::sleep(remaining),
            None => next_tick = Instant::now(),
        }
    }
    info!("Exiting walk control loop after {} ticks", ticks);
    Ok(ticks)
}
