//! # Mediaflow
//!
//! An engine for media acquisition pipelines.
//!
//! A pipeline is a chain of alternating tasks and results: a [`Task`]
//! (fetch, download, convert, fix metadata) runs and yields a
//! [`TaskResult`], which either ends the chain or produces the next task.
//! Mediaflow provides:
//!
//! - **Interruptible tasks**: every task can be stopped, paused and resumed
//!   from another thread while it runs
//! - **Transformers**: policies, selected per [`Media`], that rewrite the
//!   tasks and results of a chain
//! - **Combination**: several transformers applied side by side, producing
//!   one combined chain that ends when every branch has ended
//! - **Event-driven observability**: progress events through an
//!   [`EventSink`](events::EventSink) and `tracing` logs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mediaflow::prelude::*;
//!
//! let registry = TransformerRegistry::new();
//! registry.register(Arc::new(RemuxTransformer::new()))?;
//!
//! let ctx = PipelineContext::new("acquire").with_media(media);
//! let pipeline = Pipeline::new(PipelineConfig::new(), ctx)?.select_transformer(&registry)?;
//! let handle = pipeline.handle();
//!
//! let outcome = pipeline.run(PipelineStart::Task(fetch_task)).await?;
//! ```
//!
//! [`Task`]: tasks::Task
//! [`TaskResult`]: tasks::TaskResult
//! [`Media`]: core::Media

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod tasks;
pub mod testing;
pub mod transform;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{ControlSignal, Media, MediaKind, TaskLifecycle};
    pub use crate::errors::PipelineError;
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::pipeline::{
        Pipeline, PipelineConfig, PipelineContext, PipelineHandle, PipelineOutcome, PipelineStart,
    };
    pub use crate::tasks::{
        CombinedResult, CombinedTask, DoNothingResult, DoNothingTask, ResultRef, Task, TaskRef,
        TaskResult, TaskState,
    };
    pub use crate::transform::{
        CombinedTransformer, FnPipelineTransformer, IdentityPipelineTransformer,
        IdentityTransformer, PipelineTransformer, PredicateTransformer, Transformer,
        TransformerRegistry,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[tokio::test]
    async fn test_prelude_drives_a_chain() {
        let pipeline = Pipeline::new(PipelineConfig::new(), PipelineContext::new("prelude")).unwrap();
        let outcome = pipeline
            .run(PipelineStart::Task(DoNothingTask::shared()))
            .await
            .unwrap();

        assert!(outcome.is_completed());
        assert_eq!(outcome.generations(), 1);
    }
}
