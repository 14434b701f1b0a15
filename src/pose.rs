//! Partial joint targets.
//!
//! A [`Pose`] names only the joints it moves. Applying it leaves every other
//! joint at whatever it was last commanded to, so behaviors build up a
//! full-body target by layering several partial poses.

use std::collections::BTreeMap;

use crate::joint::{JointId, JointRegistry};

/// Target angles in degrees, keyed by joint.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pose {
    targets: BTreeMap<JointId, f32>,
}

impl Pose {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(JointId, f32)]) -> Self {
        Self {
            targets: pairs.iter().copied().collect(),
        }
    }

    /// Every joint at its zero angle.
    pub fn neutral() -> Self {
        Self {
            targets: JointId::ALL.iter().map(|&id| (id, 0.0)).collect(),
        }
    }

    /// Builds a pose from radians, as produced by the walking policy.
    pub fn from_radians(pairs: impl IntoIterator<Item = (JointId, f32)>) -> Self {
        Self {
            targets: pairs
                .into_iter()
                .map(|(id, angle)| (id, angle.to_degrees()))
                .collect(),
        }
    }

    pub fn with(mut self, joint: JointId, degrees: f32) -> Self {
        self.targets.insert(joint, degrees);
        self
    }

    pub fn get(&self, joint: JointId) -> Option<f32> {
        self.targets.get(&joint).copied()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointId, f32)> + '_ {
        self.targets.iter().map(|(&id, &angle)| (id, angle))
    }

    pub fn joints(&self) -> impl Iterator<Item = JointId> + '_ {
        self.targets.keys().copied()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TorqueSetting {
    pub actuator_id: u8,
    pub torque: f32,
}

impl TorqueSetting {
    pub fn new(actuator_id: u8, torque: f32) -> Self {
        Self {
            actuator_id,
            torque,
        }
    }

    /// The same torque on every joint of the registry.
    pub fn all(registry: &JointRegistry, torque: f32) -> Vec<TorqueSetting> {
        registry
            .iter()
            .map(|joint| TorqueSetting::new(joint.actuator_id, torque))
            .collect()
    }
}
