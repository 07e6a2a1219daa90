//! Lifecycle state shared by every task.

use crate::core::TaskLifecycle;
use crate::errors::PipelineError;
use tokio::sync::watch;
use tracing::trace;

/// Thread-safe lifecycle state of a task.
///
/// Reads are possible from any thread; writes only happen through the
/// transition methods below, each of which is atomic with respect to the
/// others. Waiters parked in [`TaskState::checkpoint`] are woken on every
/// transition.
pub struct TaskState {
    tx: watch::Sender<TaskLifecycle>,
}

impl TaskState {
    /// Creates a new state in [`TaskLifecycle::Created`].
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(TaskLifecycle::Created);
        Self { tx }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn current(&self) -> TaskLifecycle {
        *self.tx.borrow()
    }

    /// Marks the start of `run`.
    ///
    /// Returns `Ok(true)` when the task moved to running, `Ok(false)` when it
    /// had already been stopped, and an error for any other state.
    pub fn begin(&self, task: &str) -> Result<bool, PipelineError> {
        let mut outcome = Ok(true);
        self.tx.send_if_modified(|state| {
            let current = *state;
            match current {
                TaskLifecycle::Created => {
                    *state = TaskLifecycle::Running;
                    true
                }
                TaskLifecycle::Stopped => {
                    outcome = Ok(false);
                    false
                }
                other => {
                    outcome = Err(PipelineError::invalid_state(task, "run", other));
                    false
                }
            }
        });
        outcome
    }

    /// Marks the normal completion of `run`.
    ///
    /// A task that was stopped while finishing stays stopped.
    pub fn complete(&self) -> bool {
        self.transition(|state| match state {
            TaskLifecycle::Running | TaskLifecycle::Paused => Some(TaskLifecycle::Done),
            _ => None,
        })
    }

    /// Moves to [`TaskLifecycle::Stopped`] unless already terminal.
    pub fn stop(&self) -> bool {
        self.transition(|state| match state {
            TaskLifecycle::Created | TaskLifecycle::Running | TaskLifecycle::Paused => {
                Some(TaskLifecycle::Stopped)
            }
            _ => None,
        })
    }

    /// Pauses a running task.
    pub fn pause(&self) -> bool {
        self.transition(|state| match state {
            TaskLifecycle::Running => Some(TaskLifecycle::Paused),
            _ => None,
        })
    }

    /// Resumes a paused task.
    pub fn resume(&self) -> bool {
        self.transition(|state| match state {
            TaskLifecycle::Paused => Some(TaskLifecycle::Running),
            _ => None,
        })
    }

    /// Non-blocking "should continue" predicate.
    #[must_use]
    pub fn should_continue(&self) -> bool {
        self.current().is_active()
    }

    /// Returns true once the task was stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.current() == TaskLifecycle::Stopped
    }

    /// Cooperative cancellation point.
    ///
    /// Waits while the task is paused. Returns `false` if the task is
    /// stopped, `true` otherwise.
    pub async fn checkpoint(&self) -> bool {
        let mut rx = self.tx.subscribe();
        let settled = match rx.wait_for(|state| *state != TaskLifecycle::Paused).await {
            Ok(state) => *state,
            Err(_) => TaskLifecycle::Stopped,
        };
        settled != TaskLifecycle::Stopped
    }

    fn transition<F>(&self, next: F) -> bool
    where
        F: FnOnce(TaskLifecycle) -> Option<TaskLifecycle>,
    {
        self.tx.send_if_modified(|state| match next(*state) {
            Some(target) if target != *state => {
                trace!(from = %state, to = %target, "Task state transition");
                *state = target;
                true
            }
            _ => false,
        })
    }
}

impl Default for TaskState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskState")
            .field("state", &self.current())
            .finish()
    }
}
