//! The media unit of work that transformers are selected against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// The broad kind of a media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A video stream, possibly with embedded audio.
    Video,
    /// An audio-only stream.
    Audio,
    /// A subtitle track.
    Subtitles,
    /// A still image (thumbnails, covers).
    Image,
    /// A collection of other media.
    Playlist,
    /// Anything else.
    Other,
}

impl Default for MediaKind {
    fn default() -> Self {
        Self::Other
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Subtitles => write!(f, "subtitles"),
            Self::Image => write!(f, "image"),
            Self::Playlist => write!(f, "playlist"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// A media item flowing through a pipeline.
///
/// Transformers inspect a `Media` to decide whether they apply to it. The
/// engine never interprets the fields itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    /// Unique identifier.
    pub id: Uuid,

    /// Human readable title.
    pub title: String,

    /// Where the media comes from (URL, path, ...).
    pub source: String,

    /// The kind of media.
    #[serde(default)]
    pub kind: MediaKind,

    /// Container or file format, e.g. "mp4" or "srt".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,

    /// Free-form metadata supplied by the acquiring stage.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,

    /// When the media record was created.
    pub created_at: DateTime<Utc>,
}

impl Media {
    /// Creates a new media item.
    #[must_use]
    pub fn new(title: impl Into<String>, source: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            source: source.into(),
            kind,
            container: None,
            metadata: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Sets the container format.
    #[must_use]
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Adds metadata to the media item.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns true if the container matches, ignoring ASCII case.
    #[must_use]
    pub fn has_container(&self, container: &str) -> bool {
        self.container
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case(container))
    }

    /// Gets a metadata value.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }
}
