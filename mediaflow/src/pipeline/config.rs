//! Configuration for the pipeline driver.

use crate::errors::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a [`Pipeline`](super::Pipeline).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name used in logs and events.
    #[serde(default = "default_name")]
    pub name: String,
    /// Upper bound on the number of task runs; `None` means unbounded.
    #[serde(default)]
    pub max_generations: Option<u64>,
    /// Whether to report progress to the context's event sink.
    #[serde(default = "default_emit_events")]
    pub emit_events: bool,
}

fn default_name() -> String {
    "pipeline".to_string()
}

fn default_emit_events() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            max_generations: None,
            emit_events: default_emit_events(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the generation limit.
    #[must_use]
    pub fn with_max_generations(mut self, limit: u64) -> Self {
        self.max_generations = Some(limit);
        self
    }

    /// Enables or disables event emission.
    #[must_use]
    pub fn with_events(mut self, enabled: bool) -> Self {
        self.emit_events = enabled;
        self
    }

    /// Checks the configuration for invalid values.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.name.trim().is_empty() {
            return Err(PipelineError::Config("name must not be empty".to_string()));
        }
        if self.max_generations == Some(0) {
            return Err(PipelineError::Config(
                "max_generations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}
