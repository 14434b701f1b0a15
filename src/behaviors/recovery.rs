//! Get-up and fall choreographies.
//!
//! Steps are open loop: each pose is commanded unconditionally and the only
//! completion criterion is the wait that follows it. All three sequences
//! finish by relaxing every joint to [`TORQUE_RELAXED`]. The two recoveries
//! end standing; drop forward ends lying prone on the arms, ready for
//! forward recovery.

use super::{secs, Step};
use crate::constants::TORQUE_RELAXED;
use crate::joint::{JointId::*, JointRegistry};
use crate::pose::{Pose, TorqueSetting};

fn relax_all(registry: &JointRegistry) -> Step {
    Step::Torque(TorqueSetting::all(registry, TORQUE_RELAXED))
}

/// From lying face down to standing.
pub fn forward_steps(registry: &JointRegistry) -> Vec<Step> {
    vec![
        Step::Pose(Pose::neutral()),
        // Feet on the ground
        Step::Pose(Pose::from_pairs(&[
            (LeftHipPitch, 30.0),
            (RightHipPitch, -30.0),
            (LeftKneePitch, 50.0),
            (RightKneePitch, -50.0),
            (LeftAnklePitch, -30.0),
            (RightAnklePitch, 30.0),
        ])),
        // Hips at ninety degrees
        Step::Pose(Pose::from_pairs(&[
            (LeftShoulderPitch, 30.0),
            (RightShoulderPitch, -30.0),
            (LeftShoulderYaw, -20.0),
            (RightShoulderYaw, 20.0),
            (LeftElbowYaw, -60.0),
            (RightElbowYaw, 60.0),
            (LeftHipPitch, 30.0),
            (RightHipPitch, -30.0),
            (LeftKneePitch, 70.0),
            (RightKneePitch, -70.0),
            (LeftAnklePitch, -30.0),
            (RightAnklePitch, 30.0),
        ])),
        // Prep
        Step::Pose(Pose::from_pairs(&[
            (LeftShoulderPitch, 30.0),
            (RightShoulderPitch, -30.0),
            (LeftShoulderYaw, 20.0),
            (RightShoulderYaw, -20.0),
            (LeftElbowYaw, -20.0),
            (RightElbowYaw, 20.0),
            (LeftHipPitch, 30.0),
            (RightHipPitch, -30.0),
            (LeftKneePitch, 70.0),
            (RightKneePitch, -70.0),
            (LeftAnklePitch, 0.0),
            (RightAnklePitch, 0.0),
        ])),
        secs(1.0),
        Step::Pose(Pose::from_pairs(&[
            (LeftShoulderPitch, 120.0),
            (RightShoulderPitch, -120.0),
            (LeftHipPitch, 80.0),
            (RightHipPitch, -80.0),
        ])),
        Step::Pose(Pose::from_pairs(&[
            (LeftKneePitch, 90.0),
            (RightKneePitch, -90.0),
            (LeftAnklePitch, 40.0),
            (RightAnklePitch, -40.0),
        ])),
        Step::Pose(Pose::from_pairs(&[
            (LeftElbowYaw, 0.0),
            (RightElbowYaw, 0.0),
            (LeftKneePitch, 90.0),
            (RightKneePitch, -90.0),
            (LeftAnklePitch, 40.0),
            (RightAnklePitch, -40.0),
        ])),
        secs(2.0),
        // Box
        Step::Pose(Pose::from_pairs(&[
            (LeftShoulderYaw, -40.0),
            (RightShoulderYaw, 40.0),
            (LeftAnklePitch, 90.0),
            (RightAnklePitch, -90.0),
        ])),
        secs(2.0),
        // Tilt the torso up in three stages.
        Step::Pose(torso_tilt(50.0, 60.0, 60.0)),
        secs(2.0),
        Step::Pose(torso_tilt(22.0, 50.0, 50.0)),
        secs(2.0),
        Step::Pose(torso_tilt(10.0, 30.0, 30.0)),
        secs(2.0),
        // Straight
        Step::Pose(Pose::neutral().with(LeftHipPitch, 5.0).with(RightHipPitch, -5.0)),
        relax_all(registry),
        secs(1.0),
    ]
}

fn torso_tilt(hip: f32, knee: f32, ankle: f32) -> Pose {
    Pose::from_pairs(&[
        (LeftShoulderPitch, 120.0),
        (RightShoulderPitch, -120.0),
        (LeftShoulderYaw, -40.0),
        (RightShoulderYaw, 40.0),
        (LeftElbowYaw, 0.0),
        (RightElbowYaw, 0.0),
        (LeftHipPitch, hip),
        (RightHipPitch, -hip),
        (LeftKneePitch, knee),
        (RightKneePitch, -knee),
        (LeftAnklePitch, ankle),
        (RightAnklePitch, -ankle),
    ])
}

/// From lying on the back: tuck, push up with the arms, sit, crouch, stand.
pub fn backward_steps(registry: &JointRegistry) -> Vec<Step> {
    vec![
        Step::Pose(Pose::neutral()),
        // Tuck
        Step::Pose(Pose::from_pairs(&[
            (LeftHipPitch, 60.0),
            (RightHipPitch, -60.0),
            (LeftKneePitch, 90.0),
            (RightKneePitch, -90.0),
            (LeftAnklePitch, 30.0),
            (RightAnklePitch, -30.0),
        ])),
        secs(1.0),
        // Arms behind the torso
        Step::Pose(Pose::from_pairs(&[
            (LeftShoulderPitch, -60.0),
            (RightShoulderPitch, 60.0),
            (LeftElbowYaw, 0.0),
            (RightElbowYaw, 0.0),
        ])),
        secs(1.0),
        // Sit up
        Step::Pose(Pose::from_pairs(&[
            (LeftShoulderPitch, 30.0),
            (RightShoulderPitch, -30.0),
            (LeftHipPitch, 80.0),
            (RightHipPitch, -80.0),
        ])),
        secs(2.0),
        // Crouch over the feet
        Step::Pose(Pose::from_pairs(&[
            (LeftShoulderPitch, 0.0),
            (RightShoulderPitch, 0.0),
            (LeftHipPitch, 30.0),
            (RightHipPitch, -30.0),
            (LeftKneePitch, 70.0),
            (RightKneePitch, -70.0),
            (LeftAnklePitch, -30.0),
            (RightAnklePitch, 30.0),
        ])),
        secs(2.0),
        Step::Pose(Pose::neutral().with(LeftHipPitch, 5.0).with(RightHipPitch, -5.0)),
        relax_all(registry),
        secs(1.0),
    ]
}

/// A controlled fall onto the arms from standing. Unlike the recoveries
/// this ends prone, not upright.
pub fn drop_forward_steps(registry: &JointRegistry) -> Vec<Step> {
    vec![
        Step::Pose(Pose::neutral()),
        // Arms out front to catch the fall
        Step::Pose(Pose::from_pairs(&[
            (LeftShoulderPitch, 90.0),
            (RightShoulderPitch, -90.0),
            (LeftElbowYaw, 0.0),
            (RightElbowYaw, 0.0),
        ])),
        secs(1.0),
        // Lean
        Step::Pose(Pose::from_pairs(&[
            (LeftHipPitch, 30.0),
            (RightHipPitch, -30.0),
            (LeftKneePitch, 20.0),
            (RightKneePitch, -20.0),
            (LeftAnklePitch, 20.0),
            (RightAnklePitch, -20.0),
        ])),
        secs(1.0),
        // Drop
        Step::Pose(Pose::from_pairs(&[
            (LeftHipPitch, 60.0),
            (RightHipPitch, -60.0),
            (LeftKneePitch, 0.0),
            (RightKneePitch, 0.0),
            (LeftAnklePitch, 40.0),
            (RightAnklePitch, -40.0),
        ])),
        secs(2.0),
        relax_all(registry),
    ]
}
