//! Walking policy evaluator.
//!
//! The walking policy was trained against a stacked observation: each control
//! tick contributes one 41-value frame (gait phase, command, joint state, the
//! previous action and IMU readings) and the policy sees the last 15 frames
//! oldest first. [`ObservationHistory`] reproduces that layout so any
//! evaluator behind [`PolicyEvaluator`] gets the input it was trained on.

use std::collections::VecDeque;
use std::f32::consts::PI;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ndarray::{s, Array1, Array2, ArrayView1};
use ort::session::Session;
use ort::value::Tensor;
use tracing::info;

use crate::error::{PolicyError, PolicyLoadError};
use crate::joint::{JointId, JointRegistry};
use crate::pose::Pose;

/// Velocity command fed to the policy.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WalkCommand {
    pub vx: f32,
    pub vy: f32,
    pub dyaw: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WalkConfig {
    pub num_actions: usize,
    pub frame_stack: usize,
    pub c_frame_stack: usize,
    /// Simulation step the policy was trained at.
    pub dt: f32,
    pub decimation: u32,
    /// Gait period in seconds.
    pub cycle_time: f32,
    pub lin_vel: f32,
    pub ang_vel: f32,
    pub dof_pos: f32,
    pub dof_vel: f32,
    pub clip_observations: f32,
    pub clip_actions: f32,
    pub action_scale: f32,
    pub command: WalkCommand,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            num_actions: 10,
            frame_stack: 15,
            c_frame_stack: 3,
            dt: 0.001,
            decimation: 20,
            cycle_time: 0.4,
            lin_vel: 2.0,
            ang_vel: 1.0,
            dof_pos: 1.0,
            dof_vel: 0.05,
            clip_observations: 18.0,
            clip_actions: 18.0,
            action_scale: 0.25,
            command: WalkCommand::default(),
        }
    }
}

impl WalkConfig {
    pub fn num_single_obs(&self) -> usize {
        11 + self.num_actions * self.c_frame_stack
    }

    pub fn num_observations(&self) -> usize {
        self.frame_stack * self.num_single_obs()
    }

    /// Control tick period the policy was designed for, to the microsecond.
    pub fn tick(&self) -> Duration {
        let seconds = self.dt * self.decimation as f32;
        Duration::from_micros((seconds * 1e6).round() as u64)
    }
}

/// What the policy observes on one tick. Joint vectors are in policy order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RobotState {
    /// Radians.
    pub positions: Vec<f32>,
    /// Radians per second.
    pub velocities: Vec<f32>,
    pub gyro: [f32; 3],
    /// Roll, pitch, yaw in radians.
    pub euler: [f32; 3],
    /// Seconds since the walk started; drives the gait phase.
    pub time: f32,
}

pub struct ObservationHistory {
    config: WalkConfig,
    frames: VecDeque<Array1<f32>>,
    last_action: Array1<f32>,
}

impl ObservationHistory {
    pub fn new(config: WalkConfig) -> Self {
        let frames = (0..config.frame_stack)
            .map(|_| Array1::zeros(config.num_single_obs()))
            .collect();
        let last_action = Array1::zeros(config.num_actions);
        Self {
            config,
            frames,
            last_action,
        }
    }

    /// Builds the frame for `state` and drops the oldest one.
    pub fn push(&mut self, state: &RobotState) -> Result<(), PolicyError> {
        let n = self.config.num_actions;
        if state.positions.len() != n || state.velocities.len() != n {
            return Err(PolicyError(format!(
                "expected {} joint readings, got {} positions and {} velocities",
                n,
                state.positions.len(),
                state.velocities.len()
            )));
        }

        let cfg = &self.config;
        let phase = 2.0 * PI * state.time / cfg.cycle_time;
        let mut frame = Array1::<f32>::zeros(cfg.num_single_obs());
        frame[0] = phase.sin();
        frame[1] = phase.cos();
        frame[2] = cfg.command.vx * cfg.lin_vel;
        frame[3] = cfg.command.vy * cfg.lin_vel;
        frame[4] = cfg.command.dyaw * cfg.ang_vel;
        frame
            .slice_mut(s![5..n + 5])
            .assign(&ArrayView1::from(&state.positions[..]).mapv(|p| p * cfg.dof_pos));
        frame
            .slice_mut(s![n + 5..2 * n + 5])
            .assign(&ArrayView1::from(&state.velocities[..]).mapv(|v| v * cfg.dof_vel));
        frame
            .slice_mut(s![2 * n + 5..3 * n + 5])
            .assign(&self.last_action);
        frame
            .slice_mut(s![3 * n + 5..3 * n + 8])
            .assign(&ArrayView1::from(&state.gyro[..]));
        frame
            .slice_mut(s![3 * n + 8..3 * n + 11])
            .assign(&ArrayView1::from(&state.euler[..]));

        let clip = cfg.clip_observations;
        frame.mapv_inplace(|v| v.clamp(-clip, clip));

        self.frames.pop_front();
        self.frames.push_back(frame);
        Ok(())
    }

    /// All frames, oldest first.
    pub fn stacked(&self) -> Array1<f32> {
        self.frames
            .iter()
            .flat_map(|frame| frame.iter().copied())
            .collect()
    }

    pub fn set_last_action(&mut self, action: Array1<f32>) {
        self.last_action = action;
    }

    /// Length of [`ObservationHistory::stacked`].
    pub fn len(&self) -> usize {
        self.config.num_observations()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Maps the robot's observable state to the next leg targets.
pub trait PolicyEvaluator: Send {
    fn evaluate(&mut self, state: &RobotState) -> Result<Pose, PolicyError>;
}

/// Produces a fresh evaluator each time Walk is selected.
pub trait PolicyLoader {
    fn load(&self) -> Result<Box<dyn PolicyEvaluator>, PolicyLoadError>;
}

/// Maps one raw network output to leg targets: clip, scale, then convert
/// from radians to a degree pose in policy joint order.
fn action_to_pose(joints: &[JointId], action: &Array1<f32>, scale: f32) -> Pose {
    Pose::from_radians(
        joints
            .iter()
            .copied()
            .zip(action.iter().map(|a| a * scale)),
    )
}

/// The trained walking network, run through ONNX Runtime.
///
/// The model takes one `[1, 615]` float input (the stacked history) and
/// returns `[1, 10]` leg actions.
pub struct OnnxPolicy {
    session: Session,
    input_name: String,
    history: ObservationHistory,
    joints: Vec<JointId>,
    num_actions: usize,
    clip_actions: f32,
    action_scale: f32,
}

impl OnnxPolicy {
    pub fn new(session: Session, config: WalkConfig) -> Result<Self, PolicyError> {
        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| PolicyError("model declares no inputs".to_string()))?;
        if session.outputs.is_empty() {
            return Err(PolicyError("model declares no outputs".to_string()));
        }
        let joints = JointRegistry::new()
            .policy_joints()
            .iter()
            .map(|joint| joint.id)
            .collect();
        Ok(Self {
            session,
            input_name,
            num_actions: config.num_actions,
            clip_actions: config.clip_actions,
            action_scale: config.action_scale,
            history: ObservationHistory::new(config),
            joints,
        })
    }

    fn infer(&self, input: Array2<f32>) -> Result<Array1<f32>, PolicyError> {
        let tensor = Tensor::from_array(input).map_err(|e| PolicyError(e.to_string()))?;
        let inputs = ort::inputs![self.input_name.as_str() => tensor]
            .map_err(|e| PolicyError(e.to_string()))?;
        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| PolicyError(e.to_string()))?;
        let action = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| PolicyError(e.to_string()))?;
        let action: Array1<f32> = action.iter().copied().collect();
        if action.len() != self.num_actions {
            return Err(PolicyError(format!(
                "model returned {} actions, expected {}",
                action.len(),
                self.num_actions
            )));
        }
        Ok(action)
    }
}

impl PolicyEvaluator for OnnxPolicy {
    fn evaluate(&mut self, state: &RobotState) -> Result<Pose, PolicyError> {
        self.history.push(state)?;
        let stacked = self.history.stacked();
        let input = stacked
            .into_shape_with_order((1, self.history.len()))
            .map_err(|e| PolicyError(e.to_string()))?;
        let clip = self.clip_actions;
        let action = self.infer(input)?.mapv(|a| a.clamp(-clip, clip));
        let pose = action_to_pose(&self.joints, &action, self.action_scale);
        self.history.set_last_action(action);
        Ok(pose)
    }
}

/// Loads the walking network from an `.onnx` file each time Walk starts.
#[derive(Clone, Debug)]
pub struct ModelFileLoader {
    path: PathBuf,
    config: WalkConfig,
}

impl ModelFileLoader {
    pub fn new(path: impl Into<PathBuf>, config: WalkConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn malformed(&self, reason: impl ToString) -> PolicyLoadError {
        PolicyLoadError::Malformed {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl PolicyLoader for ModelFileLoader {
    fn load(&self) -> Result<Box<dyn PolicyEvaluator>, PolicyLoadError> {
        if !self.path.is_file() {
            return Err(PolicyLoadError::NotFound(self.path.clone()));
        }
        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(&self.path))
            .map_err(|e| self.malformed(e))?;
        let policy = OnnxPolicy::new(session, self.config.clone()).map_err(|e| self.malformed(e.0))?;
        info!("Loaded walking policy from {}", self.path.display());
        Ok(Box::new(policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn standing_state(config: &WalkConfig) -> RobotState {
        RobotState {
            positions: vec![0.0; config.num_actions],
            velocities: vec![0.0; config.num_actions],
            ..RobotState::default()
        }
    }

    #[test]
    fn default_config_matches_trained_layout() {
        let config = WalkConfig::default();
        assert_eq!(config.num_single_obs(), 41);
        assert_eq!(config.num_observations(), 615);
        assert_eq!(config.tick(), Duration::from_millis(20));
        assert_eq!(ObservationHistory::new(config).len(), 615);
    }

    #[test]
    fn tick_follows_sim_step_and_decimation() {
        let config = WalkConfig {
            dt: 0.002,
            decimation: 5,
            ..WalkConfig::default()
        };
        assert_eq!(config.tick(), Duration::from_millis(10));
    }

    #[test]
    fn newest_frame_is_last_and_clipped() {
        let config = WalkConfig::default();
        let mut history = ObservationHistory::new(config.clone());
        let mut state = standing_state(&config);
        state.positions[0] = 0.5;
        state.velocities[1] = 1000.0;
        history.push(&state).unwrap();

        let stacked = history.stacked();
        assert_eq!(stacked.len(), 615);
        let newest = 14 * 41;
        assert_eq!(stacked[newest], 0.0); // sin(0)
        assert_eq!(stacked[newest + 1], 1.0); // cos(0)
        assert_eq!(stacked[newest + 5], 0.5);
        assert_eq!(stacked[newest + 16], 18.0);
        assert!(stacked.slice(s![..newest]).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn push_rejects_wrong_joint_count() {
        let mut history = ObservationHistory::new(WalkConfig::default());
        let state = RobotState {
            positions: vec![0.0; 3],
            velocities: vec![0.0; 3],
            ..RobotState::default()
        };
        assert!(history.push(&state).is_err());
    }

    #[test]
    fn last_action_feeds_the_next_frame() {
        let config = WalkConfig::default();
        let mut history = ObservationHistory::new(config.clone());
        history.set_last_action(Array1::from_elem(10, 2.0));
        history.push(&standing_state(&config)).unwrap();
        let stacked = history.stacked();
        let newest = 14 * 41;
        assert!(stacked
            .slice(s![newest + 25..newest + 35])
            .iter()
            .all(|&v| v == 2.0));
    }

    #[test]
    fn actions_become_leg_targets_in_degrees() {
        let joints: Vec<JointId> = JointRegistry::new()
            .policy_joints()
            .iter()
            .map(|joint| joint.id)
            .collect();
        let mut action = Array1::<f32>::zeros(10);
        action[0] = 0.4;
        let pose = action_to_pose(&joints, &action, 0.25);

        assert_eq!(pose.len(), 10);
        let expected = (0.4_f32 * 0.25).to_degrees();
        assert!((pose.get(JointId::LeftHipPitch).unwrap() - expected).abs() < 1e-4);
        assert_eq!(pose.get(JointId::RightAnklePitch), Some(0.0));
        assert_eq!(pose.get(JointId::LeftElbowYaw), None);
    }

    #[test]
    fn loader_reports_missing_file() {
        let loader = ModelFileLoader::new("/nonexistent/walking_micro.onnx", WalkConfig::default());
        assert!(matches!(loader.load(), Err(PolicyLoadError::NotFound(_))));
    }

    #[test]
    fn loader_rejects_a_file_that_is_not_a_model() {
        let mut file = tempfile::Builder::new().suffix(".onnx").tempfile().unwrap();
        file.write_all(&[0xff, 0xfe, 0x00, 0x13, 0x37]).unwrap();
        file.write_all(b"not a protobuf graph").unwrap();
        let loader = ModelFileLoader::new(file.path(), WalkConfig::default());
        match loader.load() {
            Err(PolicyLoadError::Malformed { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
