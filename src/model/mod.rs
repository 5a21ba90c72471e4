//! Plain data shared by every other module: identifiers, page settings and
//! the opaque item handle pages store.

mod ids;
mod item;
mod setting;

pub use ids::{ContainerId, EngineId, PageId, ViewerId};
pub use item::Item;
pub use setting::{MAX_ROWS, SLOTS_PER_ROW, Setting};
