//! Composite task and result driving several branches as one chain.
//!
//! Position `i` of a [`CombinedTask`] or [`CombinedResult`] always belongs
//! to the same branch: running a combined task yields a combined result
//! with the same arity and order, and processing that result yields the
//! next combined task, again in the same order.

use super::{ResultRef, Task, TaskRef, TaskResult, TaskState};
use crate::core::ControlSignal;
use crate::errors::PipelineError;
use crate::pipeline::PipelineContext;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

const COMBINED: &str = "combined";

/// Returns the position of the first slot holding the same object as `item`.
fn first_slot<T: ?Sized>(slots: &[Arc<T>], item: &Arc<T>) -> Option<usize> {
    let target = Arc::as_ptr(item).cast::<()>();
    slots.iter().position(|slot| Arc::as_ptr(slot).cast::<()>() == target)
}

/// A task owning an ordered list of child tasks.
///
/// Children run sequentially in list order. The combined task checks its
/// own state before starting each child, so a stop delivered between two
/// children prevents the remaining ones from starting. A child placed in
/// several slots runs once per generation and receives each signal once.
#[derive(Debug)]
pub struct CombinedTask {
    state: TaskState,
    children: Vec<TaskRef>,
}

impl CombinedTask {
    /// Creates a combined task.
    ///
    /// Fails if `children` is empty.
    pub fn new(children: Vec<TaskRef>) -> Result<Self, PipelineError> {
        if children.is_empty() {
            return Err(PipelineError::EmptyCombination { what: "tasks" });
        }
        Ok(Self {
            state: TaskState::new(),
            children,
        })
    }

    /// Returns the number of branches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Always false: a combined task has at least one child.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Sends `signal` to every child, whatever happens to the others.
    ///
    /// Failures are logged and swallowed.
    fn cascade(&self, signal: ControlSignal) {
        let mut failures = 0usize;

        for (index, child) in self.children.iter().enumerate() {
            if first_slot(&self.children[..index], child).is_some() {
                continue;
            }

            let delivered = match signal {
                ControlSignal::Stop => child.stop(),
                ControlSignal::Pause => child.pause(),
                ControlSignal::Resume => child.resume(),
            };

            if let Err(e) = delivered {
                failures += 1;
                warn!(
                    signal = %signal,
                    child = %child.name(),
                    index,
                    error = %e,
                    "Control signal failed on child task"
                );
            }
        }

        if failures > 0 {
            warn!(
                signal = %signal,
                failures,
                children = self.children.len(),
                "Control signal reached only part of the combined task"
            );
        }
    }
}

#[async_trait]
impl Task for CombinedTask {
    fn name(&self) -> &str {
        COMBINED
    }

    fn state(&self) -> &TaskState {
        &self.state
    }

    async fn execute(&self) -> Result<Option<ResultRef>, PipelineError> {
        let mut results: Vec<ResultRef> = Vec::with_capacity(self.children.len());

        for (index, child) in self.children.iter().enumerate() {
            // A task placed in several slots runs once; its result fills each of them.
            if let Some(first) = first_slot(&self.children[..index], child) {
                let shared = Arc::clone(&results[first]);
                results.push(shared);
                continue;
            }

            if !self.state.checkpoint().await {
                debug!(
                    index,
                    remaining = self.children.len() - index,
                    "Combined task stopped between children"
                );
                return Ok(None);
            }

            match child.run().await? {
                Some(result) => results.push(result),
                None => {
                    debug!(index, child = %child.name(), "Child task aborted");
                    return Ok(None);
                }
            }
        }

        let combined = CombinedResult::new(results)?;
        Ok(Some(Arc::new(combined)))
    }

    fn stop(&self) -> Result<(), PipelineError> {
        self.state.stop();
        self.cascade(ControlSignal::Stop);
        Ok(())
    }

    fn pause(&self) -> Result<(), PipelineError> {
        self.state.pause();
        self.cascade(ControlSignal::Pause);
        Ok(())
    }

    fn resume(&self) -> Result<(), PipelineError> {
        self.state.resume();
        self.cascade(ControlSignal::Resume);
        Ok(())
    }

    fn children(&self) -> &[TaskRef] {
        &self.children
    }
}

/// A result owning an ordered list of child results.
///
/// It terminates only once every child terminates. Processing it processes
/// every child, finished ones included, so slot `i` of every later
/// generation still comes from branch `i`.
#[derive(Debug)]
pub struct CombinedResult {
    children: Vec<ResultRef>,
}

impl CombinedResult {
    /// Creates a combined result.
    ///
    /// Fails if `children` is empty.
    pub fn new(children: Vec<ResultRef>) -> Result<Self, PipelineError> {
        if children.is_empty() {
            return Err(PipelineError::EmptyCombination { what: "results" });
        }
        Ok(Self { children })
    }

    /// Returns the number of branches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Always false: a combined result has at least one child.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns how many branches have finished.
    #[must_use]
    pub fn terminated_count(&self) -> usize {
        self.children.iter().filter(|c| c.is_terminating()).count()
    }
}

#[async_trait]
impl TaskResult for CombinedResult {
    fn name(&self) -> &str {
        COMBINED
    }

    fn is_terminating(&self) -> bool {
        self.children.iter().all(|c| c.is_terminating())
    }

    async fn process(&self, ctx: &PipelineContext) -> Result<TaskRef, PipelineError> {
        let mut next: Vec<TaskRef> = Vec::with_capacity(self.children.len());

        for (index, child) in self.children.iter().enumerate() {
            let task = match first_slot(&self.children[..index], child) {
                Some(first) => Arc::clone(&next[first]),
                None => child.process(ctx).await?,
            };
            next.push(task);
        }

        Ok(Arc::new(CombinedTask::new(next)?))
    }

    fn children(&self) -> &[ResultRef] {
        &self.children
    }
}
