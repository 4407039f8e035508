//! Progress events for a migration run
//!
//! This module provides:
//! - `ProgressEvent`: phase start/end and per-item start/end notifications
//! - `EventEmitter`: the sink the pipeline reports to
//! - `EventBus`: broadcast channel for in-process subscribers
//! - `TracingEmitter`: forwards events to the log
//!
//! Sinks are purely observational: emitting never blocks and never fails.

mod bus;
mod log;
mod types;

pub use bus::EventBus;
pub use log::TracingEmitter;
pub use types::{EventEmitter, ProgressEvent, ProgressStage};
