use crate::joint::JointId;

/// Joint table: (joint, servo id, policy index, mounting offset in degrees).
///
/// Legs come first in policy order; the arms are not driven by the walking
/// policy and carry no policy index.
pub const JOINT_TABLE: [(JointId, u8, Option<usize>, f32); 16] = [
    (JointId::LeftHipPitch, 10, Some(0), 0.0),
    (JointId::LeftHipYaw, 9, Some(1), 45.0),
    (JointId::LeftHipRoll, 8, Some(2), 0.0),
    (JointId::LeftKneePitch, 7, Some(3), 0.0),
    (JointId::LeftAnklePitch, 6, Some(4), 0.0),
    (JointId::RightHipPitch, 5, Some(5), 0.0),
    (JointId::RightHipYaw, 4, Some(6), -45.0),
    (JointId::RightHipRoll, 3, Some(7), 0.0),
    (JointId::RightKneePitch, 2, Some(8), 0.0),
    (JointId::RightAnklePitch, 1, Some(9), 0.0),
    (JointId::RightElbowYaw, 11, None, 0.0),
    (JointId::RightShoulderYaw, 12, None, 0.0),
    (JointId::RightShoulderPitch, 13, None, 0.0),
    (JointId::LeftShoulderPitch, 14, None, 0.0),
    (JointId::LeftShoulderYaw, 15, None, 0.0),
    (JointId::LeftElbowYaw, 16, None, 0.0),
];

pub const NUM_POLICY_JOINTS: usize = 10;

// Torque values understood by the servo bus.
pub const TORQUE_RELAXED: f32 = 20.0; // after compliant phases
pub const TORQUE_PUSHUPS_ARMS: f32 = 50.0; // arm yaw joints while pushing

/// Servo angle limit in degrees, symmetric around zero.
pub const SERVO_LIMIT_DEG: f32 = 180.0;

// Key bindings.
pub const KEY_WALK: char = 'w';
pub const KEY_WAVE: char = 'q';
pub const KEY_FORWARD_RECOVERY: char = '1';
pub const KEY_BACKWARD_RECOVERY: char = '2';
pub const KEY_DROP_FORWARD: char = '3';
pub const KEY_PUSHUPS: char = '4';
pub const KEY_PUSHUPS_STOP: char = 'x';

pub const DEFAULT_MODEL_PATH: &str = "sim/examples/walking_micro.onnx";
