use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::actuators::ServoState;
use crate::constants::{JOINT_TABLE, NUM_POLICY_JOINTS};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JointId {
    LeftHipPitch,
    LeftHipYaw,
    LeftHipRoll,
    LeftKneePitch,
    LeftAnklePitch,
    RightHipPitch,
    RightHipYaw,
    RightHipRoll,
    RightKneePitch,
    RightAnklePitch,
    LeftShoulderPitch,
    LeftShoulderYaw,
    LeftElbowYaw,
    RightShoulderPitch,
    RightShoulderYaw,
    RightElbowYaw,
}

impl JointId {
    pub const ALL: [JointId; 16] = [
        JointId::LeftHipPitch,
        JointId::LeftHipYaw,
        JointId::LeftHipRoll,
        JointId::LeftKneePitch,
        JointId::LeftAnklePitch,
        JointId::RightHipPitch,
        JointId::RightHipYaw,
        JointId::RightHipRoll,
        JointId::RightKneePitch,
        JointId::RightAnklePitch,
        JointId::LeftShoulderPitch,
        JointId::LeftShoulderYaw,
        JointId::LeftElbowYaw,
        JointId::RightShoulderPitch,
        JointId::RightShoulderYaw,
        JointId::RightElbowYaw,
    ];

    pub fn name(self) -> &'static str {
        match self {
            JointId::LeftHipPitch => "left_hip_pitch",
            JointId::LeftHipYaw => "left_hip_yaw",
            JointId::LeftHipRoll => "left_hip_roll",
            JointId::LeftKneePitch => "left_knee_pitch",
            JointId::LeftAnklePitch => "left_ankle_pitch",
            JointId::RightHipPitch => "right_hip_pitch",
            JointId::RightHipYaw => "right_hip_yaw",
            JointId::RightHipRoll => "right_hip_roll",
            JointId::RightKneePitch => "right_knee_pitch",
            JointId::RightAnklePitch => "right_ankle_pitch",
            JointId::LeftShoulderPitch => "left_shoulder_pitch",
            JointId::LeftShoulderYaw => "left_shoulder_yaw",
            JointId::LeftElbowYaw => "left_elbow_yaw",
            JointId::RightShoulderPitch => "right_shoulder_pitch",
            JointId::RightShoulderYaw => "right_shoulder_yaw",
            JointId::RightElbowYaw => "right_elbow_yaw",
        }
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown joint name: {0}")]
pub struct UnknownJoint(pub String);

impl FromStr for JointId {
    type Err = UnknownJoint;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JointId::ALL
            .iter()
            .copied()
            .find(|id| id.name() == s)
            .ok_or_else(|| UnknownJoint(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Joint {
    pub id: JointId,
    pub actuator_id: u8,
    pub policy_index: Option<usize>,
    /// Mounting offset added at the servo boundary, in degrees.
    pub offset_deg: f32,
    /// Last observed angle in radians.
    pub current_position: f32,
    /// Last observed angular velocity in radians per second.
    pub current_velocity: f32,
}

#[derive(Clone, Debug)]
pub struct JointRegistry {
    joints: Vec<Joint>,
}

impl Default for JointRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JointRegistry {
    pub fn new() -> Self {
        let joints = JOINT_TABLE
            .iter()
            .map(|&(id, actuator_id, policy_index, offset_deg)| Joint {
                id,
                actuator_id,
                policy_index,
                offset_deg,
                current_position: 0.0,
                current_velocity: 0.0,
            })
            .collect();
        Self { joints }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter()
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn get(&self, id: JointId) -> Option<&Joint> {
        self.joints.iter().find(|joint| joint.id == id)
    }

    pub fn by_actuator(&self, actuator_id: u8) -> Option<&Joint> {
        self.joints
            .iter()
            .find(|joint| joint.actuator_id == actuator_id)
    }

    pub fn actuator_ids(&self) -> Vec<u8> {
        self.joints.iter().map(|joint| joint.actuator_id).collect()
    }

    /// Leg joints ordered by policy index.
    pub fn policy_joints(&self) -> Vec<&Joint> {
        let mut joints: Vec<&Joint> = self
            .joints
            .iter()
            .filter(|joint| joint.policy_index.is_some())
            .collect();
        joints.sort_by_key(|joint| joint.policy_index);
        debug_assert_eq!(joints.len(), NUM_POLICY_JOINTS);
        joints
    }

    /// Refreshes observed positions from servo feedback, which reports
    /// degrees. Servos missing from the feedback keep their previous value.
    pub fn update_from(&mut self, states: &[ServoState]) {
        for state in states {
            if let Some(joint) = self
                .joints
                .iter_mut()
                .find(|joint| joint.actuator_id == state.actuator_id)
            {
                joint.current_position = (state.position - joint.offset_deg).to_radians();
                joint.current_velocity = state.velocity.to_radians();
            }
        }
    }
}
