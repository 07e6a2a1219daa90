//! Scripted tasks, results and transformers for tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::core::{ControlSignal, Media, MediaKind};
use crate::errors::PipelineError;
use crate::pipeline::PipelineContext;
use crate::tasks::{ResultRef, Task, TaskRef, TaskResult, TaskState};
use crate::transform::{PipelineTransformer, Transformer};

/// Shared, ordered record of calls made on scripted objects.
///
/// Entries look like `run:<label>:<generation>`, `process:<label>:<generation>`,
/// `stop:<label>`, `pause:<label>` and `resume:<label>`.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Returns all entries in call order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Returns the entries starting with `prefix`.
    #[must_use]
    pub fn entries_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Clears the log.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Faults {
    run: bool,
    control: bool,
}

/// A leaf task that advances a generation counter.
///
/// Running the task at generation `g` yields a [`ScriptedResult`] at
/// generation `g + 1`, which terminates once it reaches `terminate_at`.
#[derive(Debug)]
pub struct ScriptedTask {
    label: String,
    generation: u32,
    terminate_at: u32,
    state: TaskState,
    log: CallLog,
    faults: Faults,
}

impl ScriptedTask {
    /// Creates a task at generation 0.
    #[must_use]
    pub fn new(label: impl Into<String>, terminate_at: u32) -> Self {
        Self {
            label: label.into(),
            generation: 0,
            terminate_at,
            state: TaskState::new(),
            log: CallLog::new(),
            faults: Faults::default(),
        }
    }

    /// Records calls into `log`.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Starts at the given generation.
    #[must_use]
    pub fn at_generation(mut self, generation: u32) -> Self {
        self.generation = generation;
        self
    }

    /// Makes `run` fail with a stage error.
    #[must_use]
    pub fn failing_run(mut self) -> Self {
        self.faults.run = true;
        self
    }

    /// Makes `stop`, `pause` and `resume` fail.
    #[must_use]
    pub fn failing_control(mut self) -> Self {
        self.faults.control = true;
        self
    }

    /// Returns the generation of the task.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    fn control(&self, signal: ControlSignal) -> Result<(), PipelineError> {
        self.log.record(format!("{signal}:{}", self.label));
        if self.faults.control {
            return Err(PipelineError::control(&self.label, signal, "scripted control failure"));
        }

        match signal {
            ControlSignal::Stop => self.state.stop(),
            ControlSignal::Pause => self.state.pause(),
            ControlSignal::Resume => self.state.resume(),
        };
        Ok(())
    }
}

#[async_trait]
impl Task for ScriptedTask {
    fn name(&self) -> &str {
        &self.label
    }

    fn state(&self) -> &TaskState {
        &self.state
    }

    async fn execute(&self) -> Result<Option<ResultRef>, PipelineError> {
        self.log.record(format!("run:{}:{}", self.label, self.generation));

        if !self.state.checkpoint().await {
            return Ok(None);
        }
        if self.faults.run {
            return Err(PipelineError::stage(&self.label, "scripted failure"));
        }

        let result = ScriptedResult {
            label: self.label.clone(),
            generation: self.generation + 1,
            terminate_at: self.terminate_at,
            log: self.log.clone(),
            faults: self.faults,
        };
        Ok(Some(Arc::new(result)))
    }

    fn stop(&self) -> Result<(), PipelineError> {
        self.control(ControlSignal::Stop)
    }

    fn pause(&self) -> Result<(), PipelineError> {
        self.control(ControlSignal::Pause)
    }

    fn resume(&self) -> Result<(), PipelineError> {
        self.control(ControlSignal::Resume)
    }
}

/// Result of a [`ScriptedTask`].
#[derive(Debug, Clone)]
pub struct ScriptedResult {
    label: String,
    generation: u32,
    terminate_at: u32,
    log: CallLog,
    faults: Faults,
}

impl ScriptedResult {
    /// Creates a result at `generation` of a chain ending at `terminate_at`.
    #[must_use]
    pub fn new(label: impl Into<String>, generation: u32, terminate_at: u32) -> Self {
        Self {
            label: label.into(),
            generation,
            terminate_at,
            log: CallLog::new(),
            faults: Faults::default(),
        }
    }

    /// Records calls into `log`.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Returns the generation of the result.
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[async_trait]
impl TaskResult for ScriptedResult {
    fn name(&self) -> &str {
        &self.label
    }

    fn is_terminating(&self) -> bool {
        self.generation >= self.terminate_at
    }

    async fn process(&self, _ctx: &PipelineContext) -> Result<TaskRef, PipelineError> {
        self.log.record(format!("process:{}:{}", self.label, self.generation));

        let task = ScriptedTask {
            label: self.label.clone(),
            generation: self.generation,
            terminate_at: self.terminate_at,
            state: TaskState::new(),
            log: self.log.clone(),
            faults: self.faults,
        };
        Ok(Arc::new(task))
    }
}

/// A long-running task that polls its checkpoint between steps.
#[derive(Debug)]
pub struct SteppedTask {
    name: String,
    steps: usize,
    delay: Duration,
    state: TaskState,
    completed: AtomicUsize,
}

impl SteppedTask {
    /// Creates a task doing `steps` steps of `delay` each.
    #[must_use]
    pub fn new(name: impl Into<String>, steps: usize, delay: Duration) -> Self {
        Self {
            name: name.into(),
            steps,
            delay,
            state: TaskState::new(),
            completed: AtomicUsize::new(0),
        }
    }

    /// Returns the number of steps done so far.
    #[must_use]
    pub fn completed_steps(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Task for SteppedTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &TaskState {
        &self.state
    }

    async fn execute(&self) -> Result<Option<ResultRef>, PipelineError> {
        for _ in 0..self.steps {
            if !self.state.checkpoint().await {
                return Ok(None);
            }
            tokio::time::sleep(self.delay).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
        }

        Ok(Some(Arc::new(ScriptedResult::new(self.name.clone(), 1, 1))))
    }
}

/// A transformer replacing the chain with a scripted branch.
///
/// Its task mapping ignores the input and yields a fresh [`ScriptedTask`]
/// labelled with the transformer name; its result mapping yields a
/// generation 0 [`ScriptedResult`].
#[derive(Debug, Clone)]
pub struct ScriptedTransformer {
    name: String,
    terminate_at: u32,
    kinds: Vec<MediaKind>,
    log: CallLog,
    task_absent: bool,
    result_absent: bool,
}

impl ScriptedTransformer {
    /// Creates a transformer usable for every media.
    #[must_use]
    pub fn new(name: impl Into<String>, terminate_at: u32) -> Self {
        Self {
            name: name.into(),
            terminate_at,
            kinds: Vec::new(),
            log: CallLog::new(),
            task_absent: false,
            result_absent: false,
        }
    }

    /// Restricts usability to the given media kinds.
    #[must_use]
    pub fn for_kinds(mut self, kinds: &[MediaKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    /// Records calls of produced tasks and results into `log`.
    #[must_use]
    pub fn with_log(mut self, log: CallLog) -> Self {
        self.log = log;
        self
    }

    /// Makes the task mapping return no task.
    #[must_use]
    pub fn without_task(mut self) -> Self {
        self.task_absent = true;
        self
    }

    /// Makes the result mapping return no result.
    #[must_use]
    pub fn without_result(mut self) -> Self {
        self.result_absent = true;
        self
    }
}

impl Transformer for ScriptedTransformer {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self, media: &Media) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&media.kind)
    }

    fn pipeline_transformer(&self) -> Arc<dyn PipelineTransformer> {
        Arc::new(self.clone())
    }
}

impl PipelineTransformer for ScriptedTransformer {
    fn transform_task(&self, _task: TaskRef) -> Option<TaskRef> {
        if self.task_absent {
            return None;
        }
        let task = ScriptedTask::new(self.name.clone(), self.terminate_at).with_log(self.log.clone());
        Some(Arc::new(task))
    }

    fn transform_result(&self, _result: ResultRef) -> Option<ResultRef> {
        if self.result_absent {
            return None;
        }
        let result = ScriptedResult::new(self.name.clone(), 0, self.terminate_at).with_log(self.log.clone());
        Some(Arc::new(result))
    }
}
