//! Terminal front end for a built engine.

pub mod cli;

pub use cli::{CliDriver, CliDriverError, DriverResult};
