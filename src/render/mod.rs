//! Plain-text rendering of a page grid for the demo driver and debugging.

mod core;

pub use core::{GridRenderer, RenderOptions, display_width};
