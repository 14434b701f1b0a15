use super::Step;
use crate::pose::Pose;

/// Every joint at its neutral angle, in a single command.
pub fn steps() -> Vec<Step> {
    vec![Step::Pose(Pose::neutral())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stand_is_one_neutral_pose() {
        assert_eq!(steps(), vec![Step::Pose(Pose::neutral())]);
    }
}
