//! Error types for the mediaflow pipeline engine.
//!
//! Cooperative aborts are not errors: a stopped task reports `Ok(None)`
//! from [`Task::run`](crate::tasks::Task::run). Everything in this module
//! describes either an operational failure raised by a stage or a misuse
//! of the task/transformer contracts.

use crate::core::{ControlSignal, TaskLifecycle};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for mediaflow operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage failed while executing.
    #[error("Stage '{stage}' failed: {message}")]
    Stage {
        /// The stage (task) name.
        stage: String,
        /// The failure message.
        message: String,
    },

    /// A lifecycle operation was attempted in a state that does not allow it.
    #[error("Cannot {operation} task '{task}' while it is {state}")]
    InvalidState {
        /// The task name.
        task: String,
        /// The attempted operation.
        operation: String,
        /// The state the task was in.
        state: TaskLifecycle,
    },

    /// A combinator was built without any members.
    #[error("Cannot combine an empty list of {what}")]
    EmptyCombination {
        /// What was being combined ("transformers", "tasks", "results").
        what: &'static str,
    },

    /// A transformer with the same name is already registered.
    #[error("Transformer '{name}' is already registered")]
    DuplicateTransformer {
        /// The conflicting name.
        name: String,
    },

    /// The driver exceeded its configured generation limit.
    #[error("Pipeline exceeded the limit of {limit} generations")]
    GenerationLimit {
        /// The configured limit.
        limit: u64,
    },

    /// A control signal could not be delivered to a task.
    #[error("Failed to {signal} task '{task}': {message}")]
    Control {
        /// The task name.
        task: String,
        /// The signal that failed.
        signal: ControlSignal,
        /// The failure message.
        message: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An opaque error raised by a stage implementation.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Creates a stage failure.
    #[must_use]
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    #[must_use]
    pub fn invalid_state(
        task: impl Into<String>,
        operation: impl Into<String>,
        state: TaskLifecycle,
    ) -> Self {
        Self::InvalidState {
            task: task.into(),
            operation: operation.into(),
            state,
        }
    }

    /// Creates a control failure.
    #[must_use]
    pub fn control(
        task: impl Into<String>,
        signal: ControlSignal,
        message: impl Into<String>,
    ) -> Self {
        Self::Control {
            task: task.into(),
            signal,
            message: message.into(),
        }
    }

    /// Returns a short, stable name for the error kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Stage { .. } => "StageFailed",
            Self::InvalidState { .. } => "InvalidState",
            Self::EmptyCombination { .. } => "EmptyCombination",
            Self::DuplicateTransformer { .. } => "DuplicateTransformer",
            Self::GenerationLimit { .. } => "GenerationLimit",
            Self::Control { .. } => "ControlFailed",
            Self::Config(_) => "Config",
            Self::Io(_) => "Io",
            Self::Serialization(_) => "Serialization",
            Self::Other(_) => "Other",
        }
    }

    /// Converts to a dictionary representation for event payloads.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("type".to_string(), serde_json::json!(self.kind()));
        map.insert("message".to_string(), serde_json::json!(self.to_string()));

        match self {
            Self::Stage { stage, .. } => {
                map.insert("stage".to_string(), serde_json::json!(stage));
            }
            Self::InvalidState { task, operation, state } => {
                map.insert("task".to_string(), serde_json::json!(task));
                map.insert("operation".to_string(), serde_json::json!(operation));
                map.insert("state".to_string(), serde_json::json!(state));
            }
            Self::Control { task, signal, .. } => {
                map.insert("task".to_string(), serde_json::json!(task));
                map.insert("signal".to_string(), serde_json::json!(signal));
            }
            Self::GenerationLimit { limit } => {
                map.insert("limit".to_string(), serde_json::json!(limit));
            }
            _ => {}
        }

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_message() {
        let err = PipelineError::stage("fetch", "connection reset");
        assert_eq!(err.to_string(), "Stage 'fetch' failed: connection reset");
        assert_eq!(err.kind(), "StageFailed");
    }

    #[test]
    fn test_invalid_state_message() {
        let err = PipelineError::invalid_state("convert", "run", TaskLifecycle::Done);
        assert_eq!(err.to_string(), "Cannot run task 'convert' while it is done");
    }

    #[test]
    fn test_control_error_message() {
        let err = PipelineError::control("fix", ControlSignal::Stop, "worker hung");
        assert_eq!(err.to_string(), "Failed to stop task 'fix': worker hung");
    }

    #[test]
    fn test_to_dict() {
        let err = PipelineError::invalid_state("convert", "run", TaskLifecycle::Running);
        let dict = err.to_dict();

        assert_eq!(dict.get("type").unwrap(), "InvalidState");
        assert_eq!(dict.get("task").unwrap(), "convert");
        assert_eq!(dict.get("state").unwrap(), "running");
    }

    #[test]
    fn test_from_anyhow() {
        let err: PipelineError = anyhow::anyhow!("disk full").into();
        assert_eq!(err.kind(), "Other");
        assert_eq!(err.to_string(), "disk full");
    }
}
