use super::{secs, Step};
use crate::joint::JointId::*;
use crate::pose::Pose;

const WAVE_REPETITIONS: usize = 6;

/// Raises the left arm, swings the forearm six times, then lowers it.
pub fn steps() -> Vec<Step> {
    let initial = Pose::from_pairs(&[
        (LeftShoulderYaw, 0.0),
        (LeftShoulderPitch, 0.0),
        (LeftElbowYaw, 0.0),
    ]);
    let arm_up = Pose::from_pairs(&[(LeftShoulderPitch, 0.0), (LeftShoulderYaw, 150.0)]);
    let wave_out = Pose::from_pairs(&[(LeftElbowYaw, -90.0)]);
    let wave_in = Pose::from_pairs(&[(LeftElbowYaw, -45.0)]);

    let mut steps = vec![
        Step::Pose(initial.clone()),
        secs(0.5),
        Step::Pose(arm_up),
        secs(0.5),
    ];
    for _ in 0..WAVE_REPETITIONS {
        steps.push(Step::Pose(wave_out.clone()));
        steps.push(secs(0.3));
        steps.push(Step::Pose(wave_in.clone()));
        steps.push(secs(0.3));
    }
    steps.push(Step::Pose(initial));
    steps.push(secs(0.5));
    steps
}
