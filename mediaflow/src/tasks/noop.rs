//! Neutral task and result used to fill absent branches.

use super::{ResultRef, Task, TaskRef, TaskResult, TaskState};
use crate::errors::PipelineError;
use crate::pipeline::PipelineContext;
use async_trait::async_trait;
use std::sync::Arc;

const DO_NOTHING: &str = "do-nothing";

/// A task that performs no work and yields a terminating result.
#[derive(Debug, Default)]
pub struct DoNothingTask {
    state: TaskState,
}

impl DoNothingTask {
    /// Creates a new do-nothing task.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a shared do-nothing task.
    #[must_use]
    pub fn shared() -> TaskRef {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl Task for DoNothingTask {
    fn name(&self) -> &str {
        DO_NOTHING
    }

    fn state(&self) -> &TaskState {
        &self.state
    }

    async fn execute(&self) -> Result<Option<ResultRef>, PipelineError> {
        Ok(Some(DoNothingResult::shared()))
    }
}

/// A result that always terminates its chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoNothingResult;

impl DoNothingResult {
    /// Creates a shared do-nothing result.
    #[must_use]
    pub fn shared() -> ResultRef {
        Arc::new(Self)
    }
}

#[async_trait]
impl TaskResult for DoNothingResult {
    fn name(&self) -> &str {
        DO_NOTHING
    }

    fn is_terminating(&self) -> bool {
        true
    }

    async fn process(&self, _ctx: &PipelineContext) -> Result<TaskRef, PipelineError> {
        Ok(DoNothingTask::shared())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskLifecycle;

    #[tokio::test]
    async fn test_do_nothing_task_terminates() {
        let task = DoNothingTask::new();
        let result = task.run().await.unwrap().expect("result");

        assert!(result.is_terminating());
        assert_eq!(result.name(), "do-nothing");
        assert_eq!(task.state().current(), TaskLifecycle::Done);
    }

    #[tokio::test]
    async fn test_stopped_do_nothing_task_aborts() {
        let task = DoNothingTask::new();
        task.stop().unwrap();

        assert!(task.run().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_do_nothing_result_processes_to_do_nothing_task() {
        let ctx = PipelineContext::new("noop");
        let next = DoNothingResult.process(&ctx).await.unwrap();

        assert_eq!(next.name(), "do-nothing");
        assert_eq!(next.state().current(), TaskLifecycle::Created);
    }
}
