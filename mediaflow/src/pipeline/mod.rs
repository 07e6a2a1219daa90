//! Pipeline driving.
//!
//! This module provides:
//! - The per-run pipeline context handed to results
//! - Driver configuration
//! - The driving loop and its cross-thread control handle

mod config;
mod context;
mod driver;
#[cfg(test)]
mod integration_tests;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use driver::{Pipeline, PipelineHandle, PipelineOutcome, PipelineStart};
