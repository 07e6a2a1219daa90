//! Tracing setup for binaries and tests embedding mediaflow.
//!
//! The library itself only emits `tracing` events. Applications that do not
//! install their own subscriber can call [`init_tracing`] once at startup;
//! `RUST_LOG` overrides the default `info` filter.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Plain,
    /// One JSON object per event.
    Json,
}

/// Installs a global `fmt` subscriber.
///
/// Safe to call more than once; only the first call has an effect, and an
/// already installed subscriber is left in place.
pub fn init_tracing(format: LogFormat) {
    static INIT: OnceLock<()> = OnceLock::new();
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true);

        match format {
            LogFormat::Plain => builder.try_init().ok(),
            LogFormat::Json => builder.json().try_init().ok(),
        };
    });
}
