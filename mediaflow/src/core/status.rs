//! Task lifecycle and control signal enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle state of a task.
///
/// ```text
/// Created -> Running -> { Stopped | Paused | Done }
/// Paused  -> Running            (resume)
/// Created | Running | Paused -> Stopped   (stop)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskLifecycle {
    /// Task was created and has not run yet.
    Created,
    /// Task is running.
    Running,
    /// Task is paused at its next checkpoint.
    Paused,
    /// Task was stopped.
    Stopped,
    /// Task produced its result.
    Done,
}

impl Default for TaskLifecycle {
    fn default() -> Self {
        Self::Created
    }
}

impl fmt::Display for TaskLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Stopped => write!(f, "stopped"),
            Self::Done => write!(f, "done"),
        }
    }
}

impl TaskLifecycle {
    /// Returns true if no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Done)
    }

    /// Returns true if work may proceed past a checkpoint.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Created | Self::Running)
    }
}

/// A control signal sent to a running task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlSignal {
    /// Stop the task for good.
    Stop,
    /// Hold the task at its next checkpoint.
    Pause,
    /// Release a paused task.
    Resume,
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Pause => write!(f, "pause"),
            Self::Resume => write!(f, "resume"),
        }
    }
}
