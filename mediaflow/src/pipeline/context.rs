//! Context handed to results when they produce the next task.

use crate::core::Media;
use crate::events::{EventSink, NoOpEventSink};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Per-run context of a pipeline.
///
/// Passed to [`TaskResult::process`](crate::tasks::TaskResult::process) so
/// that stages can see which pipeline and media they belong to and share
/// values with later stages.
pub struct PipelineContext {
    pipeline_name: String,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    media: Option<Arc<Media>>,
    event_sink: Arc<dyn EventSink>,
    data: RwLock<HashMap<String, serde_json::Value>>,
}

impl PipelineContext {
    /// Creates a new context with a fresh run id.
    #[must_use]
    pub fn new(pipeline_name: impl Into<String>) -> Self {
        Self {
            pipeline_name: pipeline_name.into(),
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            media: None,
            event_sink: Arc::new(NoOpEventSink),
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the media the pipeline works on.
    #[must_use]
    pub fn with_media(mut self, media: impl Into<Arc<Media>>) -> Self {
        self.media = Some(media.into());
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the pipeline name.
    #[must_use]
    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns when the context was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the media, if any.
    #[must_use]
    pub fn media(&self) -> Option<&Arc<Media>> {
        self.media.as_ref()
    }

    /// Returns the event sink.
    #[must_use]
    pub fn event_sink(&self) -> &Arc<dyn EventSink> {
        &self.event_sink
    }

    /// Stores a value for later stages, returning the previous one.
    pub fn set_value(
        &self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Option<serde_json::Value> {
        self.data.write().insert(key.into(), value)
    }

    /// Reads a value stored by an earlier stage.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<serde_json::Value> {
        self.data.read().get(key).cloned()
    }

    /// Builds an event payload carrying the run identity.
    #[must_use]
    pub fn event_payload(&self, fields: serde_json::Value) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "pipeline": self.pipeline_name,
            "run_id": self.run_id.to_string(),
            "timestamp": Utc::now().to_rfc3339(),
        });

        if let Some(ref media) = self.media {
            payload["media_id"] = serde_json::json!(media.id.to_string());
        }
        if let (Some(target), serde_json::Value::Object(extra)) = (payload.as_object_mut(), fields) {
            target.extend(extra);
        }

        payload
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("pipeline_name", &self.pipeline_name)
            .field("run_id", &self.run_id)
            .field("media", &self.media.as_ref().map(|m| m.id))
            .finish_non_exhaustive()
    }
}
