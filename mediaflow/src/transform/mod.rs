//! Transformers: policies that reshape a pipeline chain for a given media.
//!
//! A [`Transformer`] decides whether it applies to a [`Media`] and hands out
//! a [`PipelineTransformer`], a pure mapping from tasks to tasks and from
//! results to results. Several transformers can be folded into one with
//! [`CombinedTransformer`], and [`TransformerRegistry`] selects the ones
//! that apply.

mod combined;
mod registry;

pub use combined::CombinedTransformer;
pub use registry::TransformerRegistry;

use crate::core::Media;
use crate::tasks::{ResultRef, TaskRef};
use std::fmt;
use std::sync::Arc;

/// Pure task/result mapping contributed by a transformer.
///
/// Returning `None` means "no stage for this branch"; combinators replace
/// it with a do-nothing stage.
pub trait PipelineTransformer: Send + Sync {
    /// Maps a task to the task that should run instead.
    fn transform_task(&self, task: TaskRef) -> Option<TaskRef>;

    /// Maps a result to the result the chain should continue from.
    fn transform_result(&self, result: ResultRef) -> Option<ResultRef>;
}

/// A policy selecting whether and how to alter a chain for a media.
pub trait Transformer: Send + Sync {
    /// Returns the registration name of the transformer.
    fn name(&self) -> &str;

    /// Returns true if the transformer applies to `media`.
    fn is_usable(&self, media: &Media) -> bool;

    /// Returns the mapping to apply to the chain.
    fn pipeline_transformer(&self) -> Arc<dyn PipelineTransformer>;
}

impl fmt::Debug for dyn Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("name", &self.name())
            .finish()
    }
}

/// Mapping that returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPipelineTransformer;

impl PipelineTransformer for IdentityPipelineTransformer {
    fn transform_task(&self, task: TaskRef) -> Option<TaskRef> {
        Some(task)
    }

    fn transform_result(&self, result: ResultRef) -> Option<ResultRef> {
        Some(result)
    }
}

/// Transformer that is always usable and changes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformer;

impl Transformer for IdentityTransformer {
    fn name(&self) -> &str {
        "identity"
    }

    fn is_usable(&self, _media: &Media) -> bool {
        true
    }

    fn pipeline_transformer(&self) -> Arc<dyn PipelineTransformer> {
        Arc::new(IdentityPipelineTransformer)
    }
}

type TaskMapping = dyn Fn(TaskRef) -> Option<TaskRef> + Send + Sync;
type ResultMapping = dyn Fn(ResultRef) -> Option<ResultRef> + Send + Sync;

/// A closure-based pipeline transformer.
pub struct FnPipelineTransformer {
    task: Box<TaskMapping>,
    result: Box<ResultMapping>,
}

impl FnPipelineTransformer {
    /// Creates a pipeline transformer from two mapping closures.
    pub fn new<T, R>(task: T, result: R) -> Self
    where
        T: Fn(TaskRef) -> Option<TaskRef> + Send + Sync + 'static,
        R: Fn(ResultRef) -> Option<ResultRef> + Send + Sync + 'static,
    {
        Self {
            task: Box::new(task),
            result: Box::new(result),
        }
    }

    /// Creates a pipeline transformer that only maps tasks.
    pub fn tasks_only<T>(task: T) -> Self
    where
        T: Fn(TaskRef) -> Option<TaskRef> + Send + Sync + 'static,
    {
        Self::new(task, Some)
    }
}

impl PipelineTransformer for FnPipelineTransformer {
    fn transform_task(&self, task: TaskRef) -> Option<TaskRef> {
        (self.task)(task)
    }

    fn transform_result(&self, result: ResultRef) -> Option<ResultRef> {
        (self.result)(result)
    }
}

impl fmt::Debug for FnPipelineTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPipelineTransformer").finish_non_exhaustive()
    }
}

/// A named transformer built from a predicate and a mapping.
pub struct PredicateTransformer<P>
where
    P: Fn(&Media) -> bool + Send + Sync,
{
    name: String,
    predicate: P,
    pipeline: Arc<dyn PipelineTransformer>,
}

impl<P> PredicateTransformer<P>
where
    P: Fn(&Media) -> bool + Send + Sync,
{
    /// Creates a new predicate transformer.
    pub fn new(
        name: impl Into<String>,
        predicate: P,
        pipeline: Arc<dyn PipelineTransformer>,
    ) -> Self {
        Self {
            name: name.into(),
            predicate,
            pipeline,
        }
    }
}

impl<P> Transformer for PredicateTransformer<P>
where
    P: Fn(&Media) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_usable(&self, media: &Media) -> bool {
        (self.predicate)(media)
    }

    fn pipeline_transformer(&self) -> Arc<dyn PipelineTransformer> {
        Arc::clone(&self.pipeline)
    }
}

impl<P> fmt::Debug for PredicateTransformer<P>
where
    P: Fn(&Media) -> bool + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateTransformer")
            .field("name", &self.name)
            .finish()
    }
}
