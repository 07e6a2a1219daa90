//! Pipeline events for observability.
//!
//! The pipeline driver reports its progress through an [`EventSink`] held
//! by the [`PipelineContext`](crate::pipeline::PipelineContext). Sinks are
//! passed in explicitly; there is no process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Emitted once when a pipeline starts.
pub const PIPELINE_STARTED: &str = "pipeline.started";
/// Emitted after every task run that produced a result.
pub const PIPELINE_GENERATION: &str = "pipeline.generation";
/// Emitted when the chain reached a terminating result.
pub const PIPELINE_COMPLETED: &str = "pipeline.completed";
/// Emitted when the chain was stopped.
pub const PIPELINE_ABORTED: &str = "pipeline.aborted";
/// Emitted by a pipeline handle for every stop, pause or resume request.
pub const PIPELINE_CONTROL: &str = "pipeline.control";
/// Emitted when a stage or the driver failed.
pub const PIPELINE_FAILED: &str = "pipeline.failed";
