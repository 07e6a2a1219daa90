//! Event sinks.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, info, warn, Level};

/// Receiver of pipeline events.
///
/// The driver emits from async code; control handles report from plain
/// methods through [`EventSink::try_emit`]. Sinks that never block only
/// implement `try_emit`.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Records an event, possibly waiting on the sink.
    async fn emit(&self, event_type: &str, data: Option<Value>) {
        self.try_emit(event_type, data);
    }

    /// Records an event without waiting. Must not fail.
    fn try_emit(&self, event_type: &str, data: Option<Value>);
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn try_emit(&self, _event_type: &str, _data: Option<Value>) {}
}

/// Writes events to the `tracing` log.
///
/// The pipeline name and run id of a payload become log fields, so events
/// of concurrent pipelines can be told apart.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl LoggingEventSink {
    /// Logs at `level`; `TRACE` is logged as debug, `ERROR` as warn.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Logs at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Logs at info level.
    #[must_use]
    pub fn info() -> Self {
        Self::new(Level::INFO)
    }
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self::info()
    }
}

impl EventSink for LoggingEventSink {
    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        let field = |key: &str| {
            data.as_ref()
                .and_then(|d| d.get(key))
                .and_then(Value::as_str)
                .unwrap_or("-")
                .to_string()
        };
        let (pipeline, run_id) = (field("pipeline"), field("run_id"));

        if self.level >= Level::DEBUG {
            debug!(event_type, %pipeline, %run_id, payload = ?data, "Pipeline event");
        } else if self.level == Level::INFO {
            info!(event_type, %pipeline, %run_id, payload = ?data, "Pipeline event");
        } else {
            warn!(event_type, %pipeline, %run_id, payload = ?data, "Pipeline event");
        }
    }
}

/// Keeps every event in memory, in arrival order.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    recorded: RwLock<Vec<(String, Option<Value>)>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<(String, Option<Value>)> {
        self.recorded.read().clone()
    }

    /// Returns the recorded event types.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.recorded
            .read()
            .iter()
            .map(|(kind, _)| kind.clone())
            .collect()
    }

    /// Returns the number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.recorded.read().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forgets every recorded event.
    pub fn clear(&self) {
        self.recorded.write().clear();
    }

    /// Returns the events whose type starts with `prefix`.
    #[must_use]
    pub fn events_of_type(&self, prefix: &str) -> Vec<(String, Option<Value>)> {
        self.recorded
            .read()
            .iter()
            .filter(|(kind, _)| kind.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Returns the payload of the most recent event of `event_type`.
    #[must_use]
    pub fn last_payload(&self, event_type: &str) -> Option<Value> {
        let recorded = self.recorded.read();
        let (_, data) = recorded.iter().rev().find(|(kind, _)| kind == event_type)?;
        data.clone()
    }
}

impl EventSink for CollectingEventSink {
    fn try_emit(&self, event_type: &str, data: Option<Value>) {
        self.recorded.write().push((event_type.to_string(), data));
    }
}
