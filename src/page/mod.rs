//! Page orchestrator.
//!
//! `core` holds a single slot grid, `reservation` decides which slots the
//! allocator must skip, and `registry` owns every page of one GUI together
//! with the placement records used for overflow and compaction.

mod core;
mod registry;
mod reservation;

pub use core::{Page, PageSnapshot};
pub use registry::{PageRegistry, Placement, Removal};
pub use reservation::{NavSlots, ReservationSet};
