//! Testing utilities for mediaflow pipelines.
//!
//! This module provides scripted tasks, results and transformers whose
//! behavior is fixed up front and whose calls are recorded, so pipelines
//! can be exercised without real fetch or convert stages.

mod mocks;

pub use mocks::{CallLog, ScriptedResult, ScriptedTask, ScriptedTransformer, SteppedTask};
