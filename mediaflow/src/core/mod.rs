//! Core domain model types for mediaflow.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Task lifecycle states and control signals
//! - The media unit of work that transformers are selected against

mod media;
mod status;

pub use media::{Media, MediaKind};
pub use status::{ControlSignal, TaskLifecycle};
