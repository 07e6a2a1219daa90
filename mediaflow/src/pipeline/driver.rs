//! The driving loop: run a task, process its result, repeat.

use super::{PipelineConfig, PipelineContext};
use crate::core::ControlSignal;
use crate::errors::PipelineError;
use crate::events::{
    EventSink, PIPELINE_ABORTED, PIPELINE_COMPLETED, PIPELINE_CONTROL, PIPELINE_FAILED,
    PIPELINE_GENERATION, PIPELINE_STARTED,
};
use crate::tasks::{DoNothingResult, DoNothingTask, ResultRef, TaskRef};
use crate::transform::{IdentityPipelineTransformer, PipelineTransformer, TransformerRegistry};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Where a pipeline starts.
#[derive(Debug)]
pub enum PipelineStart {
    /// Run this task first.
    Task(TaskRef),
    /// Continue from an existing result.
    Result(ResultRef),
}

/// How a pipeline run ended.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The chain reached a terminating result.
    Completed {
        /// Number of tasks that produced a result.
        generations: u64,
        /// The terminating result.
        result: ResultRef,
    },
    /// The chain was stopped before it finished.
    Aborted {
        /// Number of tasks that produced a result before the stop.
        generations: u64,
    },
}

impl PipelineOutcome {
    /// Returns true if the chain completed.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Returns the number of generations that ran.
    #[must_use]
    pub fn generations(&self) -> u64 {
        match self {
            Self::Completed { generations, .. } | Self::Aborted { generations } => *generations,
        }
    }

    /// Returns the terminating result of a completed chain.
    #[must_use]
    pub fn result(&self) -> Option<&ResultRef> {
        match self {
            Self::Completed { result, .. } => Some(result),
            Self::Aborted { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriverState {
    Active,
    Paused,
    Stopped,
}

/// Reports control signals to the pipeline's event sink.
struct ControlEvents {
    sink: Arc<dyn EventSink>,
    pipeline: String,
    run_id: Uuid,
}

impl ControlEvents {
    fn report(&self, signal: ControlSignal, applied: bool, task: Option<&str>) {
        self.sink.try_emit(
            PIPELINE_CONTROL,
            Some(serde_json::json!({
                "pipeline": self.pipeline,
                "run_id": self.run_id.to_string(),
                "signal": signal.to_string(),
                "applied": applied,
                "task": task,
            })),
        );
    }
}

struct HandleInner {
    state: watch::Sender<DriverState>,
    current: Mutex<Option<TaskRef>>,
    events: Option<ControlEvents>,
}

/// Cloneable control handle of a running pipeline.
///
/// Signals are forwarded to the task currently running and remembered for
/// the tasks that follow: a stopped pipeline starts no further task, a
/// paused one waits before starting the next task until resumed.
#[derive(Clone)]
pub struct PipelineHandle {
    inner: Arc<HandleInner>,
}

impl PipelineHandle {
    fn new(events: Option<ControlEvents>) -> Self {
        let (state, _rx) = watch::channel(DriverState::Active);
        Self {
            inner: Arc::new(HandleInner {
                state,
                current: Mutex::new(None),
                events,
            }),
        }
    }

    /// Stops the pipeline.
    pub fn stop(&self) {
        let stopped = self.inner.state.send_if_modified(|state| {
            let changed = *state != DriverState::Stopped;
            *state = DriverState::Stopped;
            changed
        });

        let current = self.current();
        if let Some(ref task) = current {
            if let Err(e) = task.stop() {
                warn!(task = %task.name(), error = %e, "Failed to stop current task");
            }
        }
        self.report(ControlSignal::Stop, stopped, current.as_ref());
    }

    /// Pauses the pipeline.
    pub fn pause(&self) {
        let paused = self.inner.state.send_if_modified(|state| {
            if *state == DriverState::Active {
                *state = DriverState::Paused;
                true
            } else {
                false
            }
        });

        let current = self.current();
        if paused {
            if let Some(ref task) = current {
                if let Err(e) = task.pause() {
                    warn!(task = %task.name(), error = %e, "Failed to pause current task");
                }
            }
        }
        self.report(ControlSignal::Pause, paused, current.as_ref());
    }

    /// Resumes a paused pipeline.
    pub fn resume(&self) {
        let resumed = self.inner.state.send_if_modified(|state| {
            if *state == DriverState::Paused {
                *state = DriverState::Active;
                true
            } else {
                false
            }
        });

        let current = self.current();
        if resumed {
            if let Some(ref task) = current {
                if let Err(e) = task.resume() {
                    warn!(task = %task.name(), error = %e, "Failed to resume current task");
                }
            }
        }
        self.report(ControlSignal::Resume, resumed, current.as_ref());
    }

    /// Returns true once the pipeline was stopped.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.inner.state.borrow() == DriverState::Stopped
    }

    /// Returns true while the pipeline is paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        *self.inner.state.borrow() == DriverState::Paused
    }

    /// Returns the task currently driven, if any.
    #[must_use]
    pub fn current(&self) -> Option<TaskRef> {
        self.inner.current.lock().clone()
    }

    fn report(&self, signal: ControlSignal, applied: bool, task: Option<&TaskRef>) {
        if let Some(ref events) = self.inner.events {
            events.report(signal, applied, task.map(|t| t.name()));
        }
    }

    fn attach(&self, task: TaskRef) {
        *self.inner.current.lock() = Some(task);
    }

    fn detach(&self) {
        self.inner.current.lock().take();
    }

    /// Waits while paused. Returns false if stopped.
    async fn wait_until_runnable(&self) -> bool {
        let mut rx = self.inner.state.subscribe();
        let settled = match rx.wait_for(|state| *state != DriverState::Paused).await {
            Ok(state) => *state,
            Err(_) => DriverState::Stopped,
        };
        settled != DriverState::Stopped
    }
}

impl std::fmt::Debug for PipelineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineHandle")
            .field("state", &*self.inner.state.borrow())
            .field("current", &self.current().map(|t| t.name().to_string()))
            .finish()
    }
}

/// Drives one chain of tasks and results to completion.
///
/// The driver never knows whether the chain it runs is a single branch or
/// a combination of several.
pub struct Pipeline {
    config: PipelineConfig,
    context: PipelineContext,
    transformer: Arc<dyn PipelineTransformer>,
    handle: PipelineHandle,
}

impl Pipeline {
    /// Creates a pipeline that applies no transformation.
    pub fn new(config: PipelineConfig, context: PipelineContext) -> Result<Self, PipelineError> {
        config.validate()?;
        let events = config.emit_events.then(|| ControlEvents {
            sink: Arc::clone(context.event_sink()),
            pipeline: context.pipeline_name().to_string(),
            run_id: context.run_id(),
        });
        Ok(Self {
            config,
            context,
            transformer: Arc::new(IdentityPipelineTransformer),
            handle: PipelineHandle::new(events),
        })
    }

    /// Sets the transformation applied to the starting task or result.
    #[must_use]
    pub fn with_transformer(mut self, transformer: Arc<dyn PipelineTransformer>) -> Self {
        self.transformer = transformer;
        self
    }

    /// Selects the transformation for the context's media from `registry`.
    ///
    /// Every usable transformer is applied; without media the pipeline is
    /// left untransformed.
    pub fn select_transformer(self, registry: &TransformerRegistry) -> Result<Self, PipelineError> {
        let Some(media) = self.context.media().cloned() else {
            return Ok(self);
        };

        let transformer = registry.combined_from_media(&media)?;
        debug!(transformer = %transformer.name(), media = %media.id, "Selected transformer");
        Ok(self.with_transformer(transformer.pipeline_transformer()))
    }

    /// Returns a control handle usable from other threads.
    #[must_use]
    pub fn handle(&self) -> PipelineHandle {
        self.handle.clone()
    }

    /// Returns the pipeline context.
    #[must_use]
    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the chain until it terminates, is stopped, or fails.
    pub async fn run(self, start: PipelineStart) -> Result<PipelineOutcome, PipelineError> {
        info!(
            pipeline = %self.config.name,
            run_id = %self.context.run_id(),
            "Pipeline started"
        );
        self.emit(PIPELINE_STARTED, serde_json::json!({})).await;

        let outcome = self.drive(start).await;
        self.handle.detach();

        match &outcome {
            Ok(PipelineOutcome::Completed { generations, result }) => {
                info!(pipeline = %self.config.name, generations, "Pipeline completed");
                self.emit(
                    PIPELINE_COMPLETED,
                    serde_json::json!({"generations": generations, "result": result.name()}),
                )
                .await;
            }
            Ok(PipelineOutcome::Aborted { generations }) => {
                info!(pipeline = %self.config.name, generations, "Pipeline stopped");
                self.emit(PIPELINE_ABORTED, serde_json::json!({"generations": generations}))
                    .await;
            }
            Err(e) => {
                error!(pipeline = %self.config.name, error = %e, "Pipeline failed");
                self.emit(PIPELINE_FAILED, serde_json::json!({"error": e.to_dict()}))
                    .await;
            }
        }

        outcome
    }

    async fn drive(&self, start: PipelineStart) -> Result<PipelineOutcome, PipelineError> {
        let mut generations = 0u64;

        let mut task = match start {
            PipelineStart::Task(task) => self
                .transformer
                .transform_task(task)
                .unwrap_or_else(DoNothingTask::shared),
            PipelineStart::Result(result) => {
                let result = self
                    .transformer
                    .transform_result(result)
                    .unwrap_or_else(DoNothingResult::shared);
                if result.is_terminating() {
                    return Ok(PipelineOutcome::Completed {
                        generations,
                        result,
                    });
                }
                result.process(&self.context).await?
            }
        };

        loop {
            // Attach before checking so a concurrent stop reaches the task.
            self.handle.attach(Arc::clone(&task));
            if !self.handle.wait_until_runnable().await {
                return Ok(PipelineOutcome::Aborted { generations });
            }

            if let Some(limit) = self.config.max_generations {
                if generations >= limit {
                    return Err(PipelineError::GenerationLimit { limit });
                }
            }

            let Some(result) = task.run().await? else {
                return Ok(PipelineOutcome::Aborted { generations });
            };
            generations += 1;

            let terminating = result.is_terminating();
            debug!(
                pipeline = %self.config.name,
                generation = generations,
                task = %task.name(),
                terminating,
                "Generation finished"
            );
            self.emit(
                PIPELINE_GENERATION,
                serde_json::json!({
                    "generation": generations,
                    "task": task.name(),
                    "terminating": terminating,
                }),
            )
            .await;

            if terminating {
                return Ok(PipelineOutcome::Completed {
                    generations,
                    result,
                });
            }

            task = result.process(&self.context).await?;
        }
    }

    async fn emit(&self, event_type: &str, fields: serde_json::Value) {
        if self.config.emit_events {
            let payload = self.context.event_payload(fields);
            self.context.event_sink().emit(event_type, Some(payload)).await;
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("context", &self.context)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
