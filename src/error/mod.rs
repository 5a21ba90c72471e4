//! Error module orchestrator.
//!
//! Callers import error types from here; definitions live in `types`.

mod types;

pub use types::{ConfigError, FrameError, HandlerError, HandlerResult, Result};
