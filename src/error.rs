use std::path::PathBuf;

use thiserror::Error;

use crate::joint::JointId;

/// The actuation interface rejected a command.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActuationError {
    #[error("unknown actuator id {0}")]
    UnknownActuator(u8),
    #[error("joint {0} is not on the servo bus")]
    UnknownJoint(JointId),
    #[error("target {angle:.1} deg for {joint} is outside the servo range")]
    OutOfRange { joint: JointId, angle: f32 },
    #[error("servo bus fault: {0}")]
    Bus(String),
}

/// The walking model could not be loaded.
#[derive(Debug, Error)]
pub enum PolicyLoadError {
    #[error("model file not found at {0}")]
    NotFound(PathBuf),
    #[error("malformed model file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// The policy failed while evaluating a control tick.
#[derive(Debug, Error)]
#[error("policy evaluation failed: {0}")]
pub struct PolicyError(pub String);

/// The input event source failed.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("terminal input failed: {0}")]
    Terminal(#[from] std::io::Error),
}

/// Anything that can abort a behavior.
#[derive(Debug, Error)]
pub enum BehaviorError {
    #[error(transparent)]
    Actuation(#[from] ActuationError),
    #[error(transparent)]
    PolicyLoad(#[from] PolicyLoadError),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("failed to spawn {name} task: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} task panicked")]
    TaskPanicked(String),
    #[error("robot handle is no longer available")]
    RobotUnavailable,
}
