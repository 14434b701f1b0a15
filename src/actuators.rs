use crate::error::ActuationError;
use crate::joint::JointRegistry;
use crate::pose::{Pose, TorqueSetting};

/// A single position command as sent on the servo bus, in degrees with the
/// mounting offset already applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ServoCommand {
    pub actuator_id: u8,
    pub position: f32,
}

/// Servo feedback, in degrees and degrees per second as reported by the bus.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ServoState {
    pub actuator_id: u8,
    pub position: f32,
    pub velocity: f32,
}

/// The robot's actuation interface.
///
/// There is no locking behind this trait. Whoever holds the `&mut` handle is
/// the only writer; the dispatcher guarantees that by moving the handle into
/// and out of the walk thread.
pub trait Actuation: Send {
    fn registry(&self) -> &JointRegistry;

    /// Issues one command per joint named in `pose`. Joints not in the pose
    /// are left alone.
    fn set_desired_positions(&mut self, pose: &Pose) -> Result<(), ActuationError>;

    fn set_torque(&mut self, settings: &[TorqueSetting]) -> Result<(), ActuationError>;

    fn disable_motors(&mut self) -> Result<(), ActuationError>;

    fn get_servo_states(&mut self) -> Result<Vec<ServoState>, ActuationError>;
}

impl<A: Actuation + ?Sized> Actuation for Box<A> {
    fn registry(&self) -> &JointRegistry {
        (**self).registry()
    }

    fn set_desired_positions(&mut self, pose: &Pose) -> Result<(), ActuationError> {
        (**self).set_desired_positions(pose)
    }

    fn set_torque(&mut self, settings: &[TorqueSetting]) -> Result<(), ActuationError> {
        (**self).set_torque(settings)
    }

    fn disable_motors(&mut self) -> Result<(), ActuationError> {
        (**self).disable_motors()
    }

    fn get_servo_states(&mut self) -> Result<Vec<ServoState>, ActuationError> {
        (**self).get_servo_states()
    }
}

/// Converts a pose into per-servo commands, adding each joint's mounting
/// offset.
pub fn servo_targets(
    registry: &JointRegistry,
    pose: &Pose,
) -> Result<Vec<ServoCommand>, ActuationError> {
    pose.iter()
        .map(|(id, angle)| {
            let joint = registry.get(id).ok_or(ActuationError::UnknownJoint(id))?;
            Ok(ServoCommand {
                actuator_id: joint.actuator_id,
                position: angle + joint.offset_deg,
            })
        })
        .collect()
}
