//! Tasks and results: the units a pipeline advances through.
//!
//! A [`Task`] runs once and yields a [`TaskResult`]; a result either reports
//! that the chain is finished or produces the next task. The combined
//! variants let one logical chain carry several independent branches while
//! still looking like a single task/result to the driver.

mod combined;
mod noop;
mod state;

pub use combined::{CombinedResult, CombinedTask};
pub use noop::{DoNothingResult, DoNothingTask};
pub use state::TaskState;

use crate::errors::PipelineError;
use crate::pipeline::PipelineContext;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

/// Shared handle to a task.
///
/// Tasks are shared between the driver and whoever sends control signals,
/// so every lifecycle method takes `&self`.
pub type TaskRef = Arc<dyn Task>;

/// Shared handle to a result.
pub type ResultRef = Arc<dyn TaskResult>;

/// A runnable unit of pipeline work.
///
/// Implementors provide [`Task::execute`] and poll
/// [`TaskState::checkpoint`] between sub-steps. The provided
/// [`Task::run`] drives the lifecycle around it:
///
/// - a task stopped before it started returns `Ok(None)` without executing,
/// - a second `run` is rejected with [`PipelineError::InvalidState`],
/// - a task that produced a result is marked done.
///
/// `stop`, `pause` and `resume` may be called from any thread while `run`
/// is in flight and are idempotent.
#[async_trait]
pub trait Task: Send + Sync + Debug {
    /// Returns the name of the task.
    fn name(&self) -> &str;

    /// Returns the lifecycle state of the task.
    fn state(&self) -> &TaskState;

    /// Performs the work of the task.
    ///
    /// Returns `Ok(None)` when a checkpoint reported that the task was
    /// stopped.
    async fn execute(&self) -> Result<Option<ResultRef>, PipelineError>;

    /// Runs the task.
    async fn run(&self) -> Result<Option<ResultRef>, PipelineError> {
        if !self.state().begin(self.name())? {
            debug!(task = %self.name(), "Task stopped before it started");
            return Ok(None);
        }

        let produced = self.execute().await?;
        match produced {
            Some(result) => {
                self.state().complete();
                Ok(Some(result))
            }
            None => {
                debug!(task = %self.name(), "Task aborted at a checkpoint");
                Ok(None)
            }
        }
    }

    /// Stops the task. Terminal.
    fn stop(&self) -> Result<(), PipelineError> {
        self.state().stop();
        Ok(())
    }

    /// Pauses the task at its next checkpoint.
    fn pause(&self) -> Result<(), PipelineError> {
        self.state().pause();
        Ok(())
    }

    /// Resumes a paused task.
    fn resume(&self) -> Result<(), PipelineError> {
        self.state().resume();
        Ok(())
    }

    /// Returns the child tasks of a composite task.
    fn children(&self) -> &[TaskRef] {
        &[]
    }
}

/// The outcome of running a task.
#[async_trait]
pub trait TaskResult: Send + Sync + Debug {
    /// Returns the name of the result, usually that of the producing task.
    fn name(&self) -> &str;

    /// Returns true if the chain ends with this result.
    fn is_terminating(&self) -> bool;

    /// Produces the next task of the chain.
    ///
    /// The pipeline driver does not call this on a terminating result, but
    /// a [`CombinedResult`] processes finished branches too while others
    /// are still running. The task produced from a terminating result
    /// should again yield a terminating result.
    async fn process(&self, ctx: &PipelineContext) -> Result<TaskRef, PipelineError>;

    /// Returns the child results of a composite result.
    fn children(&self) -> &[ResultRef] {
        &[]
    }
}
